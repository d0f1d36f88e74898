use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Exit status used when the server may not bind its port (`EX_NOPERM`)
pub const EXIT_BIND_PERMISSION: i32 = 77;

/// Exit status for every other fatal error
pub const EXIT_FAILURE: i32 = 1;

/// Custom error types for the NTP client and server
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid packet: expected at least 48 bytes, got {len}")]
    InvalidPacket { len: usize },

    #[error("Field {field} value {value} does not fit in {bits} bits")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    #[error("Request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Permission denied binding to {addr}; ports below 1024 need elevated privileges, try a port such as 1123")]
    BindPermission { addr: SocketAddr },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new invalid packet error
    pub fn invalid_packet(len: usize) -> Self {
        Error::InvalidPacket { len }
    }

    /// Creates a new field overflow error
    pub fn field_overflow(field: &'static str, value: impl Into<u64>, bits: u32) -> Self {
        Error::FieldOverflow {
            field,
            value: value.into(),
            bits,
        }
    }

    /// Creates a new invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Error::InvalidResponse(msg.into())
    }

    /// Creates a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Error::Network(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Process exit status a binary should use when this error is fatal
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::BindPermission { .. } => EXIT_BIND_PERMISSION,
            _ => EXIT_FAILURE,
        }
    }
}
