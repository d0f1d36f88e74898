use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};
use chrono::{DateTime, TimeZone, Utc};

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// One second in fraction units (2^32)
pub(crate) const FRACTION_SCALE: f64 = 4_294_967_296.0;

const ERA_SECONDS: i64 = 1 << 32;

/// 64-bit NTP timestamp: seconds since 1900 plus a 32-bit binary fraction
///
/// The seconds field wraps every 2^32 seconds (the next rollover is in
/// February 2036). Conversions from Unix time wrap accordingly, so only
/// differences between timestamps are meaningful across a rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NtpTimestamp {
    /// Whole seconds since the NTP epoch, modulo 2^32
    pub seconds: u32,
    /// Fractional second in units of 2^-32 s
    pub fraction: u32,
}

impl NtpTimestamp {
    /// The all-zero timestamp, used for fields a sender leaves unset
    pub const ZERO: NtpTimestamp = NtpTimestamp {
        seconds: 0,
        fraction: 0,
    };

    /// Creates a timestamp from raw fields
    pub fn new(seconds: u32, fraction: u32) -> Self {
        NtpTimestamp { seconds, fraction }
    }

    /// Converts real-valued Unix seconds to an NTP timestamp
    ///
    /// Non-finite input maps to the Unix epoch. Values beyond the `i64`
    /// range saturate before wrapping into the era.
    pub fn from_unix(unix_seconds: f64) -> Self {
        if !unix_seconds.is_finite() {
            return Self::from_unix(0.0);
        }
        let whole = unix_seconds.floor();
        let mut fraction = ((unix_seconds - whole) * FRACTION_SCALE).round();
        let mut seconds = (whole as i64).saturating_add(NTP_UNIX_OFFSET as i64);

        // A fraction that rounds up to a full second carries over.
        if fraction >= FRACTION_SCALE {
            fraction -= FRACTION_SCALE;
            seconds = seconds.saturating_add(1);
        }

        NtpTimestamp {
            seconds: seconds.rem_euclid(ERA_SECONDS) as u32,
            fraction: fraction as u32,
        }
    }

    /// Converts to real-valued Unix seconds, assuming the current NTP era
    pub fn to_unix(self) -> f64 {
        self.seconds as f64 - NTP_UNIX_OFFSET as f64 + self.fraction as f64 / FRACTION_SCALE
    }

    /// Converts a `SystemTime`, including instants before 1970
    pub fn from_system_time(time: SystemTime) -> Self {
        let unix_seconds = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_secs_f64(),
            Err(before) => -before.duration().as_secs_f64(),
        };
        Self::from_unix(unix_seconds)
    }

    /// Returns the current system time as an NTP timestamp
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Converts to a UTC date-time in the current NTP era
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let unix = self.seconds as i64 - NTP_UNIX_OFFSET as i64;
        let nanos = ((self.fraction as f64 / FRACTION_SCALE) * 1e9) as u32;
        Utc.timestamp_opt(unix, nanos.min(999_999_999)).single()
    }

    /// Returns true when both fields are zero
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Packs the timestamp into its 64-bit wire representation
    pub fn to_bits(self) -> u64 {
        (self.seconds as u64) << 32 | self.fraction as u64
    }

    /// Unpacks a 64-bit wire representation
    pub fn from_bits(bits: u64) -> Self {
        NtpTimestamp {
            seconds: (bits >> 32) as u32,
            fraction: bits as u32,
        }
    }

    pub(crate) fn read_from(src: &mut impl Buf) -> Self {
        Self::from_bits(src.get_u64())
    }

    pub(crate) fn write_to(self, dst: &mut impl BufMut) {
        dst.put_u64(self.to_bits());
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for NtpTimestamp {
    fn from(time: DateTime<Tz>) -> Self {
        let unix = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 / 1e9;
        NtpTimestamp::from_unix(unix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Start of the NTP era rollover, 2036-02-07T06:28:16Z
    const ERA_END_UNIX: f64 = 2_085_978_496.0;

    #[test]
    fn test_unix_epoch() {
        let ts = NtpTimestamp::from_unix(0.0);
        assert_eq!(ts.seconds, 2_208_988_800);
        assert_eq!(ts.fraction, 0);
        assert_eq!(ts.to_unix(), 0.0);
    }

    #[test]
    fn test_half_second_fraction() {
        let ts = NtpTimestamp::from_unix(1000.5);
        assert_eq!(ts.seconds, 2_208_989_800);
        assert_eq!(ts.fraction, 1 << 31);
        assert_eq!(ts.to_unix(), 1000.5);
    }

    #[test]
    fn test_fraction_carries_into_seconds() {
        let just_below = 41.0 - 1e-12;
        let ts = NtpTimestamp::from_unix(just_below);
        assert_eq!(ts.seconds, (41 + NTP_UNIX_OFFSET) as u32);
        assert_eq!(ts.fraction, 0);
    }

    #[test]
    fn test_unix_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let t: f64 = rng.gen_range(0.0..ERA_END_UNIX);
            let back = NtpTimestamp::from_unix(t).to_unix();
            assert!(
                (back - t).abs() < 1.0 / 2_147_483_648.0,
                "round trip of {} gave {}",
                t,
                back
            );
        }
    }

    #[test]
    fn test_era_rollover_wraps() {
        let ts = NtpTimestamp::from_unix(ERA_END_UNIX + 5.0);
        assert_eq!(ts.seconds, 5);

        let before = NtpTimestamp::from_unix(ERA_END_UNIX - 5.0);
        assert_eq!(before.seconds, u32::MAX - 4);
    }

    #[test]
    fn test_out_of_range_input_does_not_overflow() {
        let huge = NtpTimestamp::from_unix(1e19);
        assert_eq!(huge.fraction, 0);
        assert_eq!(
            huge.seconds,
            i64::MAX.rem_euclid(ERA_SECONDS) as u32
        );

        NtpTimestamp::from_unix(-1e19);
        NtpTimestamp::from_unix(f64::MAX);
        assert_eq!(NtpTimestamp::from_unix(f64::NAN), NtpTimestamp::from_unix(0.0));
        assert_eq!(NtpTimestamp::from_unix(f64::INFINITY), NtpTimestamp::from_unix(0.0));
    }

    #[test]
    fn test_bits() {
        let ts = NtpTimestamp::new(0xDEAD_BEEF, 0x0123_4567);
        assert_eq!(ts.to_bits(), 0xDEAD_BEEF_0123_4567);
        assert_eq!(NtpTimestamp::from_bits(ts.to_bits()), ts);
    }

    #[test]
    fn test_chrono_conversion() {
        let time = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let ts = NtpTimestamp::from(time);
        assert_eq!(ts.to_unix(), time.timestamp() as f64);
        assert_eq!(ts.to_datetime(), Some(time));
    }

    #[test]
    fn test_system_time_before_epoch() {
        let time = UNIX_EPOCH - std::time::Duration::from_secs(10);
        let ts = NtpTimestamp::from_system_time(time);
        assert_eq!(ts.to_unix(), -10.0);
    }
}
