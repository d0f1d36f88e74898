//! Runs the NTP server until interrupted.
//!
//! ```text
//! ntp-server [PORT] [--host ADDR] [--fixed-time RFC3339 | --offset SECS] [--config FILE]
//! ```
//!
//! Listens on `0.0.0.0:1123` by default; port 123 needs elevated
//! privileges.
//!
//! Exit status: 0 after a clean shutdown, 77 when binding the port is not
//! permitted, 1 for any other startup failure.

use std::path::PathBuf;
use std::process;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{error, info};

use unicast_ntp::core::ServerConfig;
use unicast_ntp::time::ClockConfig;
use unicast_ntp::util::init_logging;
use unicast_ntp::{Listener, Result};

#[derive(Parser)]
#[command(name = "ntp-server")]
#[command(version, about = "Answer NTP client requests with the configured clock")]
struct Cli {
    /// UDP port to listen on
    port: Option<u16>,

    /// Address to bind to
    #[arg(long)]
    host: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Always report this instant (e.g. 2030-01-02T03:04:05Z)
    #[arg(long, conflicts_with = "offset")]
    fixed_time: Option<DateTime<Utc>>,

    /// Report the system time shifted by this many seconds (negative for the past)
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<f64>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::read(path)?,
            None => ServerConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(at) = self.fixed_time {
            config.clock = ClockConfig::Fixed { at };
        }
        if let Some(seconds) = self.offset {
            config.clock = ClockConfig::Offset { seconds };
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Unable to listen for interrupt; stop the process to shut down");
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;
    init_logging(&config.log_level)?;

    let listener = Listener::from_config(&config).await?;
    info!("{}", listener.responder().clock().describe());
    info!("Waiting for NTP requests... (Press Ctrl+C to stop)");

    listener.serve_until(shutdown_signal()).await?;
    drop(listener);
    info!("NTP Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        process::exit(err.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_flag_validated() {
        for offset in ["1e19", "nan", "-inf"] {
            let arg = format!("--offset={}", offset);
            let config = Cli::parse_from(["ntp-server", arg.as_str()]).into_config().unwrap();
            assert!(config.clock.validate().is_err(), "--offset {}", offset);
        }

        let config = Cli::parse_from(["ntp-server", "--offset", "-3600"])
            .into_config()
            .unwrap();
        assert_eq!(config.clock, ClockConfig::Offset { seconds: -3600.0 });
        assert!(config.clock.validate().is_ok());
    }
}
