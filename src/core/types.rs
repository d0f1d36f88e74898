use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{Error, Result};
use crate::time::ClockConfig;

/// Static identity a server embeds in every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerIdentity {
    /// Stratum advertised to clients (2 = secondary reference)
    pub stratum: u8,
    /// Poll interval exponent, log2 seconds
    pub poll: i8,
    /// Clock precision exponent, log2 seconds
    pub precision: i8,
    /// Reference identifier, at most four ASCII characters
    pub reference_id: String,
    /// Root delay in seconds
    pub root_delay: f64,
    /// Root dispersion in seconds
    pub root_dispersion: f64,
}

impl Default for ServerIdentity {
    fn default() -> Self {
        ServerIdentity {
            stratum: 2,
            poll: 6,
            precision: -20,
            reference_id: "GPS".to_string(),
            root_delay: 0.0,
            root_dispersion: 0.0,
        }
    }
}

/// Configuration for the NTP server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub host: String,
    /// UDP port to listen on
    pub port: u16,
    /// Log level for the tracing subscriber
    pub log_level: String,
    /// Values embedded in each response
    pub identity: ServerIdentity,
    /// Clock the server reports
    pub clock: ClockConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: super::DEFAULT_PORT,
            log_level: "info".to_string(),
            identity: ServerIdentity::default(),
            clock: ClockConfig::System,
        }
    }
}

impl ServerConfig {
    /// Reads server configuration from a TOML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        read_toml(path.as_ref())
    }

    /// Resolves the configured host and port to a bind address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::config(format!("Invalid bind address {}: {}", self.host, e)))?
            .next()
            .ok_or_else(|| Error::config(format!("No address found for {}", self.host)))
    }
}

/// Configuration for the NTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or address
    pub host: String,
    /// Server UDP port
    pub port: u16,
    /// How long to wait for the response
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "localhost".to_string(),
            port: super::DEFAULT_PORT,
            timeout: super::DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Reads client configuration from a TOML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        read_toml(path.as_ref())
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Couldn't read {}: {}", path.display(), e)))?;
    toml::from_str(&text)
        .map_err(|e| Error::config(format!("Couldn't parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.port, 1123);
        assert_eq!(server.identity.stratum, 2);
        assert_eq!(server.identity.precision, -20);
        assert!(matches!(server.clock, ClockConfig::System));

        let client = ClientConfig::default();
        assert_eq!(client.host, "localhost");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_server_config_from_toml() {
        let text = r#"
            port = 2123

            [identity]
            stratum = 1
            reference_id = "PPS"

            [clock]
            mode = "offset"
            seconds = -86400.0
        "#;

        let config: ServerConfig = toml::from_str(text).unwrap();
        assert_eq!(config.port, 2123);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.identity.stratum, 1);
        assert_eq!(config.identity.poll, 6);
        assert_eq!(config.identity.reference_id, "PPS");
        assert!(matches!(config.clock, ClockConfig::Offset { seconds } if seconds == -86400.0));
    }

    #[test]
    fn test_unrepresentable_clock_offset_from_toml() {
        for seconds in ["1e19", "nan", "inf"] {
            let text = format!("[clock]\nmode = \"offset\"\nseconds = {}\n", seconds);
            let config: ServerConfig = toml::from_str(&text).unwrap();
            let err = config.clock.validate().unwrap_err();
            assert!(matches!(err, Error::Config(_)), "seconds = {}", seconds);
        }
    }

    #[test]
    fn test_client_config_json() {
        let config = ClientConfig {
            timeout: Duration::from_millis(1500),
            ..Default::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.timeout, Duration::from_millis(1500));
        assert_eq!(parsed.port, 1123);
    }

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        };
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:0".parse().unwrap());
    }

    #[test]
    fn test_read_missing_file() {
        let err = ServerConfig::read("/nonexistent/ntp-server.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
