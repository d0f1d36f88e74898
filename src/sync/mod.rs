//! Synchronization module
//!
//! This module turns the four timestamps of a request/response exchange
//! into a clock offset and a round-trip delay.

pub mod offset;

pub use self::offset::{modular_delta, timestamp_delta, ClockSample, Measurement};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NtpTimestamp;

    const TICK: f64 = 1.0 / 4_294_967_296.0;

    #[test]
    fn test_modular_delta_across_rollover() {
        let a = 5u32;
        let b = u32::MAX - 4;

        assert_eq!(modular_delta(a, b), 10);
        assert_eq!(modular_delta(b, a), -10);
    }

    #[test]
    fn test_modular_delta_range() {
        assert_eq!(modular_delta(100, 40), 60);
        assert_eq!(modular_delta(40, 100), -60);
        assert_eq!(modular_delta(0, 0), 0);
        // Exactly half an era maps to the positive end
        assert_eq!(modular_delta(1 << 31, 0), 1 << 31);
        assert_eq!(modular_delta(0, 1 << 31), 1 << 31);
        assert_eq!(modular_delta((1 << 31) + 1, 0), -((1 << 31) - 1));
    }

    #[test]
    fn test_known_vector() {
        let sample = ClockSample::from_unix(1000.0, 1002.0, 1002.5, 1001.0);
        let m = sample.measure();

        assert_eq!(m.delay_seconds, 0.5);
        assert_eq!(m.offset_seconds, 1.75);
        assert_eq!(m.local_time, 1001.0);
        assert_eq!(m.server_time, 1002.75);
        assert!(!m.has_negative_delay());
    }

    #[test]
    fn test_symmetric_exchange() {
        let sample = ClockSample::from_unix(500.25, 500.25, 500.25, 500.25);
        let m = sample.measure();
        assert_eq!(m.offset_seconds, 0.0);
        assert_eq!(m.delay_seconds, 0.0);

        // Equal clocks, 20 ms each way, 5 ms server turnaround
        let sample = ClockSample::from_unix(10.0, 10.02, 10.025, 10.045);
        let m = sample.measure();
        assert!(m.offset_seconds.abs() < 1e-6);
        assert!((m.delay_seconds - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_exchange_straddling_rollover() {
        // Client just before the 2036 rollover, server clock 3 s ahead and
        // already past it.
        let t0 = NtpTimestamp::new(u32::MAX - 1, 0);
        let t1 = NtpTimestamp::new(1, 1 << 30);
        let t2 = NtpTimestamp::new(1, 1 << 31);
        let t3 = NtpTimestamp::new(u32::MAX - 1, 1 << 31);

        let sample = ClockSample::new(t0, t1, t2, t3);
        assert!((sample.delay() - 0.25).abs() < TICK * 4.0);
        assert!((sample.offset() - 3.125).abs() < TICK * 4.0);
    }

    #[test]
    fn test_negative_delay_is_reported() {
        // Server claims it spent longer than the whole round trip
        let sample = ClockSample::from_unix(100.0, 100.0, 102.0, 101.0);
        let m = sample.measure();
        assert_eq!(m.delay_seconds, -1.0);
        assert!(m.has_negative_delay());
    }

    #[test]
    fn test_timestamp_delta_fraction_borrow() {
        let later = NtpTimestamp::new(11, 0);
        let earlier = NtpTimestamp::new(10, 3 << 30);
        assert_eq!(timestamp_delta(later, earlier), 0.25);
        assert_eq!(timestamp_delta(earlier, later), -0.25);
    }
}
