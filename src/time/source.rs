use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::protocol::NTP_UNIX_OFFSET;
use crate::util::{format_delta, format_unix};

/// First Unix second of NTP era 0 (1900-01-01T00:00:00Z)
const ERA_START_UNIX: i64 = -(NTP_UNIX_OFFSET as i64);

/// First Unix second past NTP era 0 (2036-02-07T06:28:16Z)
const ERA_END_UNIX: i64 = (1 << 32) - NTP_UNIX_OFFSET as i64;

/// Largest shift whose effect is still recoverable with modular deltas
const MAX_OFFSET_SECONDS: f64 = 2_147_483_648.0;

/// Capability object answering "what time is it" in real-valued Unix seconds
///
/// The server reads its clock only through this trait, so tests can pin or
/// shift the reported time without touching the wire format.
pub trait TimeSource: Send + Sync + fmt::Debug {
    /// Current time in seconds since the Unix epoch
    fn now(&self) -> f64;

    /// Human readable description of the clock configuration
    fn describe(&self) -> String {
        format!("System Time: {}", format_unix(self.now()))
    }
}

/// Reads the operating system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Reads the system clock as Unix seconds, negative before 1970
    pub fn unix_now() -> f64 {
        match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
            Ok(after) => after.as_secs_f64(),
            Err(before) => -before.duration().as_secs_f64(),
        }
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> f64 {
        Self::unix_now()
    }

    fn describe(&self) -> String {
        format!("System Time: {} (no adjustments)", format_unix(self.now()))
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    unix_seconds: f64,
}

impl FixedClock {
    /// Creates a clock pinned to the given Unix time
    pub fn new(unix_seconds: f64) -> Self {
        FixedClock { unix_seconds }
    }

    /// Creates a clock pinned to a date-time
    pub fn at(time: DateTime<Utc>) -> Self {
        let unix = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 / 1e9;
        FixedClock::new(unix)
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> f64 {
        self.unix_seconds
    }

    fn describe(&self) -> String {
        format!("Fixed Set Time: {}", format_unix(self.unix_seconds))
    }
}

/// System clock shifted by a signed number of seconds
#[derive(Debug, Clone, Copy)]
pub struct OffsetClock {
    delta_seconds: f64,
}

impl OffsetClock {
    /// Creates a clock running `delta_seconds` ahead (or behind, if negative)
    pub fn new(delta_seconds: f64) -> Self {
        OffsetClock { delta_seconds }
    }

    /// Returns the applied shift
    pub fn delta(&self) -> f64 {
        self.delta_seconds
    }
}

impl TimeSource for OffsetClock {
    fn now(&self) -> f64 {
        SystemClock::unix_now() + self.delta_seconds
    }

    fn describe(&self) -> String {
        let now = format_unix(self.now());
        if self.delta_seconds == 0.0 {
            format!("System Time: {} (no adjustments)", now)
        } else if self.delta_seconds > 0.0 {
            format!("Future Time: {} (System Time + {})", now, format_delta(self.delta_seconds))
        } else {
            format!("Past Time: {} (System Time - {})", now, format_delta(-self.delta_seconds))
        }
    }
}

/// Clock selection as it appears in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ClockConfig {
    /// Report the system clock unchanged
    #[default]
    System,
    /// Report a constant instant
    Fixed {
        /// RFC 3339 date-time to report
        at: DateTime<Utc>,
    },
    /// Report the system clock shifted by a signed amount
    Offset {
        /// Seconds to add; negative values report a past time
        seconds: f64,
    },
}

impl ClockConfig {
    /// Checks that the configured clock can be put on the wire
    ///
    /// A fixed instant must fall inside NTP era 0 (1900 to 2036). An offset
    /// must be finite and at most 2^31 seconds either way.
    pub fn validate(&self) -> Result<()> {
        match self {
            ClockConfig::System => Ok(()),
            ClockConfig::Fixed { at } => {
                let unix = at.timestamp();
                if (ERA_START_UNIX..ERA_END_UNIX).contains(&unix) {
                    Ok(())
                } else {
                    Err(Error::config(format!(
                        "Fixed time {} is outside the NTP era (1900-01-01 to 2036-02-07)",
                        at
                    )))
                }
            }
            ClockConfig::Offset { seconds } => {
                if seconds.is_finite() && seconds.abs() <= MAX_OFFSET_SECONDS {
                    Ok(())
                } else {
                    Err(Error::config(format!(
                        "Clock offset {} must be finite and within ±{} seconds",
                        seconds, MAX_OFFSET_SECONDS
                    )))
                }
            }
        }
    }

    /// Validates and builds the time source this configuration describes
    pub fn build(&self) -> Result<Arc<dyn TimeSource>> {
        self.validate()?;
        Ok(match self {
            ClockConfig::System => Arc::new(SystemClock),
            ClockConfig::Fixed { at } => Arc::new(FixedClock::at(*at)),
            ClockConfig::Offset { seconds } => Arc::new(OffsetClock::new(*seconds)),
        })
    }
}
