use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::net::{lookup_host, UdpSocket};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::core::{ClientConfig, Error, Result, MAX_DATAGRAM_SIZE};
use crate::protocol::{Mode, NtpCodec, NtpPacket, NtpTimestamp, PACKET_SIZE};
use crate::sync::{ClockSample, Measurement};
use crate::time::{SystemClock, TimeSource};

/// Everything learned from one request/response exchange
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Address the response came from
    pub server: SocketAddr,
    /// Decoded server response
    pub response: NtpPacket,
    /// The four exchange timestamps
    pub sample: ClockSample,
    /// Offset, delay and corrected time
    pub measurement: Measurement,
}

/// One-shot NTP client
///
/// Each query binds a fresh socket, sends exactly one request and waits
/// for exactly one response. The socket is closed when the query returns.
#[derive(Debug, Clone)]
pub struct NtpClient {
    timeout: Duration,
    clock: Arc<dyn TimeSource>,
}

impl NtpClient {
    /// Creates a client reading the system clock
    pub fn new(timeout: Duration) -> Self {
        NtpClient {
            timeout,
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a client from configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        NtpClient::new(config.timeout)
    }

    /// Replaces the local clock used for T0 and T3
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the response timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Queries `host:port` and returns the measured offset and delay
    pub async fn query(&self, host: &str, port: u16) -> Result<Measurement> {
        self.exchange(host, port).await.map(|exchange| exchange.measurement)
    }

    /// Queries `host:port` and returns the full exchange
    pub async fn exchange(&self, host: &str, port: u16) -> Result<Exchange> {
        let server = lookup_host((host, port))
            .await
            .map_err(|e| Error::network(format!("Failed to resolve {}: {}", host, e)))?
            .next()
            .ok_or_else(|| Error::network(format!("No address found for {}", host)))?;

        let local: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| Error::network(format!("Failed to bind socket: {}", e)))?;
        // Connected sockets drop datagrams from any other peer
        socket
            .connect(server)
            .await
            .map_err(|e| Error::network(format!("Failed to connect to {}: {}", server, e)))?;

        let mut codec = NtpCodec::new();
        let mut send_buffer = BytesMut::with_capacity(PACKET_SIZE);

        let t0 = NtpTimestamp::from_unix(self.clock.now());
        codec.encode(NtpPacket::client_request(t0), &mut send_buffer)?;
        socket
            .send(&send_buffer)
            .await
            .map_err(|e| Error::network(format!("Failed to send request: {}", e)))?;
        debug!(%server, "Sent NTP request");

        let mut recv_buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        let size = match tokio::time::timeout(self.timeout, socket.recv(&mut recv_buffer)).await {
            Ok(received) => {
                received.map_err(|e| Error::network(format!("Failed to receive response: {}", e)))?
            }
            Err(_) => return Err(Error::TimedOut(self.timeout)),
        };
        let t3 = NtpTimestamp::from_unix(self.clock.now());

        let mut frame = BytesMut::from(&recv_buffer[..size]);
        let response = codec
            .decode_eof(&mut frame)?
            .ok_or_else(|| Error::invalid_packet(size))?;
        debug!(%server, size, "Received NTP response");

        if response.mode != Mode::Server {
            return Err(Error::invalid_response(format!(
                "expected server mode, got {:?}",
                response.mode
            )));
        }
        if response.origin_timestamp != t0 {
            warn!(
                %server,
                sent = ?t0,
                echoed = ?response.origin_timestamp,
                "Server did not echo our transmit timestamp"
            );
        }

        let sample = ClockSample::new(t0, response.receive_timestamp, response.transmit_timestamp, t3);
        let measurement = sample.measure();
        if measurement.has_negative_delay() {
            warn!(
                %server,
                delay = measurement.delay_seconds,
                "Negative round-trip delay; clocks disagree or timestamps are out of order"
            );
        }

        Ok(Exchange {
            server,
            response,
            sample,
            measurement,
        })
    }
}

impl Default for NtpClient {
    fn default() -> Self {
        NtpClient::new(crate::core::DEFAULT_TIMEOUT)
    }
}

/// Queries an NTP server once with the system clock
pub async fn query(host: &str, port: u16, timeout: Duration) -> Result<Measurement> {
    NtpClient::new(timeout).query(host, port).await
}
