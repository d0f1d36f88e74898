use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info, warn};

use crate::core::{Error, Result, ServerConfig, MAX_DATAGRAM_SIZE};
use crate::protocol::{NtpCodec, Responder, PACKET_SIZE};

/// Pause after a failed receive so a persistent socket fault cannot spin
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Bound NTP server socket
///
/// Requests are handled one at a time: receive, decode, build the
/// response, send, then read the next datagram. Dropping the listener
/// closes the socket.
#[derive(Debug)]
pub struct Listener {
    socket: UdpSocket,
    responder: Responder,
}

impl Listener {
    /// Binds the server socket
    ///
    /// A refused privileged port surfaces as `Error::BindPermission` so the
    /// caller can exit with a distinct status.
    pub async fn bind(addr: SocketAddr, responder: Responder) -> Result<Self> {
        let socket = bind_socket(addr).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => Error::BindPermission { addr },
            _ => Error::network(format!("Failed to bind socket to {}: {}", addr, e)),
        })?;
        let socket = UdpSocket::from_std(socket.into())
            .map_err(|e| Error::network(format!("Failed to register socket: {}", e)))?;

        let local = socket.local_addr()?;
        info!(addr = %local, "NTP server listening");
        Ok(Listener { socket, responder })
    }

    /// Binds using the address, identity and clock from configuration
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        let responder = Responder::new(&config.identity, config.clock.build()?)?;
        Listener::bind(config.bind_addr()?, responder).await
    }

    /// Returns the bound address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| Error::network(format!("Failed to get local address: {}", e)))
    }

    /// Returns the response builder
    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    /// Serves requests until the process is stopped
    ///
    /// Malformed datagrams and per-request socket faults are logged and
    /// skipped; they never end the loop.
    pub async fn serve_forever(&self) -> Result<()> {
        let mut codec = NtpCodec::new();
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut out = BytesMut::with_capacity(PACKET_SIZE);
        loop {
            let (size, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    recv_error_backoff(&e).await;
                    continue;
                }
            };
            let mut frame = BytesMut::from(&buf[..size]);
            self.handle_datagram(&mut codec, &mut frame, &mut out, peer).await;
        }
    }

    /// Serves requests until `shutdown` completes
    pub async fn serve_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.serve_forever() => result,
            _ = shutdown => {
                info!("Shutting down NTP server");
                Ok(())
            }
        }
    }

    /// Handles one inbound datagram to completion
    async fn handle_datagram(
        &self,
        codec: &mut NtpCodec,
        frame: &mut BytesMut,
        out: &mut BytesMut,
        peer: SocketAddr,
    ) {
        let decoded = codec
            .decode_eof(frame)
            .and_then(|request| request.ok_or_else(|| Error::invalid_packet(0)));
        let request = match decoded {
            Ok(request) => request,
            Err(Error::InvalidPacket { len }) => {
                warn!(%peer, size = len, "Received invalid packet, discarding");
                return;
            }
            Err(e) => {
                error!(%peer, error = %e, "Error handling request");
                return;
            }
        };
        debug!(%peer, mode = ?request.mode, version = request.version, "Received NTP request");

        out.clear();
        if let Err(e) = codec.encode(self.responder.reply(&request), out) {
            error!(%peer, error = %e, "Error encoding response");
            return;
        }
        match self.socket.send_to(&out[..], peer).await {
            Ok(_) => debug!(%peer, "Sent NTP response"),
            Err(e) => error!(%peer, error = %e, "Failed to send response"),
        }
    }
}

async fn recv_error_backoff(e: &io::Error) {
    error!(error = %e, "Error receiving datagram");
    tokio::time::sleep(RECV_ERROR_BACKOFF).await;
}

/// Creates a non-blocking UDP socket bound to `addr`
fn bind_socket(addr: SocketAddr) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if addr.is_ipv6() && addr.ip().is_unspecified() {
        // Accept IPv4-mapped clients on the wildcard address as well
        socket.set_only_v6(false)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(socket)
}
