//! Time sources for the server
//!
//! The server never reads the wall clock directly. It is handed a
//! [`TimeSource`] at construction:
//!
//! - [`SystemClock`] reports the operating system clock (the default)
//! - [`FixedClock`] always reports the same instant
//! - [`OffsetClock`] reports the system clock shifted by a signed delta
//!
//! # Examples
//!
//! ```
//! use unicast_ntp::time::{ClockConfig, TimeSource};
//!
//! let clock = ClockConfig::Offset { seconds: 3600.0 }.build()?;
//! assert!(clock.describe().starts_with("Future Time"));
//! # Ok::<(), unicast_ntp::Error>(())
//! ```

mod source;

pub use self::source::{ClockConfig, FixedClock, OffsetClock, SystemClock, TimeSource};
