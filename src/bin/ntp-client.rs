//! Queries an NTP server once and prints the measured clock offset.
//!
//! ```text
//! ntp-client [HOST] [PORT] [--timeout SECS] [--config FILE]
//! ```
//!
//! Defaults to `localhost:1123`.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use unicast_ntp::core::ClientConfig;
use unicast_ntp::network::{Exchange, NtpClient};
use unicast_ntp::util::{format_unix, init_logging};
use unicast_ntp::{Error, Result};

#[derive(Parser)]
#[command(name = "ntp-client")]
#[command(version, about = "Query an NTP server once and report the clock offset")]
struct Cli {
    /// NTP server hostname
    host: Option<String>,

    /// NTP server port
    port: Option<u16>,

    /// Seconds to wait for the response
    #[arg(short, long)]
    timeout: Option<f64>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn into_config(self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::read(path)?,
            None => ClientConfig::default(),
        };
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::try_from_secs_f64(secs)
                .map_err(|e| Error::config(format!("Invalid timeout {}: {}", secs, e)))?;
        }
        Ok(config)
    }
}

fn report(exchange: &Exchange) {
    let sample = &exchange.sample;
    let m = &exchange.measurement;

    println!("\nResponse from {}", exchange.server);
    println!(
        "t0: {}, t1: {}, t2: {}, t3: {}",
        sample.origin.to_unix(),
        sample.receive.to_unix(),
        sample.transmit.to_unix(),
        sample.destination.to_unix()
    );
    println!(
        "Server: stratum {}, reference {}",
        exchange.response.stratum, exchange.response.reference_id
    );
    println!("NTP Time: {}", format_unix(m.server_time));
    println!("Local Time: {}", format_unix(m.local_time));
    println!("Offset: {:.6} seconds", m.offset_seconds);
    println!("Delay: {:.6} seconds", m.delay_seconds);
}

async fn run(cli: Cli) -> Result<()> {
    init_logging(&cli.log_level)?;
    let config = cli.into_config()?;

    println!("NTP Client Test");
    println!("===============");
    println!("Querying NTP server at {}:{}...", config.host, config.port);

    let exchange = NtpClient::from_config(&config)
        .exchange(&config.host, config.port)
        .await?;
    report(&exchange);
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
    fn test_defaults() {
        let cli = Cli::parse_from(["ntp-client"]);
        assert_eq!(cli.log_level, "info");

        let config = cli.into_config().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1123);
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let cli = Cli::parse_from(["ntp-client", "--timeout=-1"]);
        assert!(matches!(cli.into_config(), Err(Error::Config(_))));
    }
}
