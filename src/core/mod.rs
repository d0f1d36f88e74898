//! Core types and traits shared by the client and the server
//!
//! This module contains the error type, configuration structures and the
//! protocol-wide constants.

pub mod error;
pub mod types;
pub mod serde;

use std::time::Duration;

pub use self::error::{Error, Result, EXIT_BIND_PERMISSION, EXIT_FAILURE};
pub use self::types::{ClientConfig, ServerConfig, ServerIdentity};

/// NTP version spoken by this crate
pub const NTP_VERSION: u8 = 4;

/// Default UDP port; unprivileged so neither side needs root
pub const DEFAULT_PORT: u16 = 1123;

/// Default client response timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Receive buffer size for a single datagram
pub const MAX_DATAGRAM_SIZE: usize = 1024;
