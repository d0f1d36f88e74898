//! Utility module
//!
//! Formatting helpers for reports and logs, and logging setup shared by
//! the binaries.

use chrono::{TimeZone, Utc};
use tracing_subscriber::filter::LevelFilter;

use crate::core::{Error, Result};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Formats real-valued Unix seconds as a UTC date-time with microseconds
pub fn format_unix(unix_seconds: f64) -> String {
    let secs = unix_seconds.floor();
    let nanos = ((unix_seconds - secs) * 1e9).round().min(999_999_999.0) as u32;
    match Utc.timestamp_opt(secs as i64, nanos).single() {
        Some(time) => time.format(DATETIME_FORMAT).to_string(),
        None => format!("{:.6} (out of range)", unix_seconds),
    }
}

/// Formats a non-negative span as `[N day(s), ]HH:MM:SS`
pub fn format_delta(seconds: f64) -> String {
    let total = seconds.abs().round() as u64;
    let (days, rest) = (total / 86_400, total % 86_400);
    let clock = format!("{:02}:{:02}:{:02}", rest / 3600, rest % 3600 / 60, rest % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

/// Installs the global fmt subscriber at the given level
pub fn init_logging(level: &str) -> Result<()> {
    let filter: LevelFilter = level
        .parse()
        .map_err(|_| Error::config(format!(
            "Invalid log level {:?}; valid levels are off, error, warn, info, debug, trace",
            level
        )))?;

    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::config(format!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_unix() {
        assert_eq!(format_unix(0.0), "1970-01-01 00:00:00.000000");
        assert_eq!(format_unix(1_000_000_000.25), "2001-09-09 01:46:40.250000");
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(0.0), "00:00:00");
        assert_eq!(format_delta(3_725.0), "01:02:05");
        assert_eq!(format_delta(365.0 * 86_400.0), "365 days, 00:00:00");
    }

    #[test]
    fn test_invalid_log_level() {
        assert!(matches!(init_logging("loud"), Err(Error::Config(_))));
    }
}
