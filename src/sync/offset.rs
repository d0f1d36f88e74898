use crate::protocol::timestamp::{NtpTimestamp, FRACTION_SCALE};

const HALF_ERA: i64 = 1 << 31;
const ERA: i64 = 1 << 32;

/// Signed difference `new - old` of two raw 32-bit seconds fields
///
/// The result lies in (-2^31, 2^31], so a rollover between the two samples
/// yields the short distance rather than a 136-year jump.
pub fn modular_delta(new: u32, old: u32) -> i64 {
    let diff = new as i64 - old as i64;
    if diff > HALF_ERA {
        diff - ERA
    } else if diff <= -HALF_ERA {
        diff + ERA
    } else {
        diff
    }
}

/// Difference `new - old` in seconds, rollover safe
pub fn timestamp_delta(new: NtpTimestamp, old: NtpTimestamp) -> f64 {
    let seconds = modular_delta(new.seconds, old.seconds) as f64;
    let fraction = (new.fraction as f64 - old.fraction as f64) / FRACTION_SCALE;
    seconds + fraction
}

/// The four timestamps of one client/server exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    /// T0: request left the client (client clock)
    pub origin: NtpTimestamp,
    /// T1: request reached the server (server clock)
    pub receive: NtpTimestamp,
    /// T2: response left the server (server clock)
    pub transmit: NtpTimestamp,
    /// T3: response reached the client (client clock)
    pub destination: NtpTimestamp,
}

/// Result of the on-wire offset/delay computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Estimated server clock minus client clock, in seconds
    pub offset_seconds: f64,
    /// Round-trip network delay, in seconds
    pub delay_seconds: f64,
    /// Client receive time corrected by the offset, Unix seconds
    pub server_time: f64,
    /// Client receive time (T3), Unix seconds
    pub local_time: f64,
}

impl Measurement {
    /// A negative delay means the clocks disagree by more than the round
    /// trip, or the timestamps were mixed up
    pub fn has_negative_delay(&self) -> bool {
        self.delay_seconds < 0.0
    }
}

impl ClockSample {
    /// Creates a sample from the four exchange timestamps
    pub fn new(
        origin: NtpTimestamp,
        receive: NtpTimestamp,
        transmit: NtpTimestamp,
        destination: NtpTimestamp,
    ) -> Self {
        ClockSample {
            origin,
            receive,
            transmit,
            destination,
        }
    }

    /// Creates a sample from real-valued Unix seconds
    pub fn from_unix(t0: f64, t1: f64, t2: f64, t3: f64) -> Self {
        ClockSample::new(
            NtpTimestamp::from_unix(t0),
            NtpTimestamp::from_unix(t1),
            NtpTimestamp::from_unix(t2),
            NtpTimestamp::from_unix(t3),
        )
    }

    /// Round-trip delay: `(T3 - T0) - (T2 - T1)`
    ///
    /// Not clamped; callers should treat a negative value as a diagnostic.
    pub fn delay(&self) -> f64 {
        timestamp_delta(self.destination, self.origin) - timestamp_delta(self.transmit, self.receive)
    }

    /// Clock offset: `((T1 - T0) + (T2 - T3)) / 2`
    pub fn offset(&self) -> f64 {
        (timestamp_delta(self.receive, self.origin) + timestamp_delta(self.transmit, self.destination))
            / 2.0
    }

    /// Computes offset, delay and the corrected time
    pub fn measure(&self) -> Measurement {
        let offset_seconds = self.offset();
        let local_time = self.destination.to_unix();
        Measurement {
            offset_seconds,
            delay_seconds: self.delay(),
            server_time: local_time + offset_seconds,
            local_time,
        }
    }
}
