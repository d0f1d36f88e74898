//! Unicast NTP: a minimal Network Time Protocol client and server
//!
//! The client sends one 48-byte request over UDP, waits for one response
//! and computes the clock offset and round-trip delay from the four
//! exchange timestamps. The server answers each request with the time
//! reported by an injected [`time::TimeSource`].
//!
//! ```no_run
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> unicast_ntp::Result<()> {
//!     let m = unicast_ntp::network::query("localhost", 1123, Duration::from_secs(5)).await?;
//!     println!("offset {:.6} s, delay {:.6} s", m.offset_seconds, m.delay_seconds);
//!     Ok(())
//! }
//! ```
pub mod core;

pub mod network;
pub mod protocol;
pub mod sync;
pub mod time;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Error, Result};
pub use crate::network::{query, Listener, NtpClient};
pub use crate::protocol::{NtpPacket, NtpTimestamp};
pub use crate::sync::{ClockSample, Measurement};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
