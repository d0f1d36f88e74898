use std::sync::Arc;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use super::codec::NtpCodec;
use super::packet::{LeapIndicator, Mode, NtpPacket, NtpShort, ReferenceId, PACKET_SIZE};
use super::timestamp::NtpTimestamp;
use crate::core::{Error, Result, ServerIdentity};
use crate::time::TimeSource;

/// Builds server replies from client requests
///
/// Stateless apart from the static identity and the injected clock: every
/// request is answered on its own.
#[derive(Debug, Clone)]
pub struct Responder {
    stratum: u8,
    poll: i8,
    precision: i8,
    root_delay: NtpShort,
    root_dispersion: NtpShort,
    reference_id: ReferenceId,
    clock: Arc<dyn TimeSource>,
}

impl Responder {
    /// Creates a responder; fails if the identity cannot be put on the wire
    pub fn new(identity: &ServerIdentity, clock: Arc<dyn TimeSource>) -> Result<Self> {
        Ok(Responder {
            stratum: identity.stratum,
            poll: identity.poll,
            precision: identity.precision,
            root_delay: NtpShort::from_seconds(identity.root_delay)?,
            root_dispersion: NtpShort::from_seconds(identity.root_dispersion)?,
            reference_id: ReferenceId::from_ascii(&identity.reference_id)?,
            clock,
        })
    }

    /// Returns the clock the responder stamps with
    pub fn clock(&self) -> &Arc<dyn TimeSource> {
        &self.clock
    }

    /// Reads the injected clock as an NTP timestamp
    pub fn now(&self) -> NtpTimestamp {
        NtpTimestamp::from_unix(self.clock.now())
    }

    /// Builds the reply to `request` received at `receive`
    ///
    /// The client's transmit timestamp is echoed as the origin. The
    /// transmit timestamp is left zero until [`Responder::finish`].
    pub fn build(&self, request: &NtpPacket, receive: NtpTimestamp) -> NtpPacket {
        NtpPacket {
            leap: LeapIndicator::NoWarning,
            version: request.version,
            mode: Mode::Server,
            stratum: self.stratum,
            poll: self.poll,
            precision: self.precision,
            root_delay: self.root_delay,
            root_dispersion: self.root_dispersion,
            reference_id: self.reference_id,
            reference_timestamp: receive,
            origin_timestamp: request.transmit_timestamp,
            receive_timestamp: receive,
            transmit_timestamp: NtpTimestamp::ZERO,
        }
    }

    /// Stamps the transmit timestamp as late as possible and encodes
    pub fn finish(&self, response: NtpPacket) -> Result<[u8; PACKET_SIZE]> {
        self.stamp_transmit(response).encode()
    }

    /// Answers a decoded request: stamp receive, build, stamp transmit
    pub fn reply(&self, request: &NtpPacket) -> NtpPacket {
        let receive = self.now();
        self.stamp_transmit(self.build(request, receive))
    }

    /// Answers one datagram through [`NtpCodec`]
    ///
    /// Datagrams shorter than a packet (including empty ones) yield
    /// `Error::InvalidPacket`.
    pub fn respond(&self, datagram: &[u8]) -> Result<(NtpPacket, [u8; PACKET_SIZE])> {
        let mut codec = NtpCodec::new();
        let request = codec
            .decode_eof(&mut BytesMut::from(datagram))?
            .ok_or_else(|| Error::invalid_packet(0))?;
        let receive = self.now();
        let bytes = self.finish(self.build(&request, receive))?;
        Ok((request, bytes))
    }

    fn stamp_transmit(&self, mut response: NtpPacket) -> NtpPacket {
        response.transmit_timestamp = self.now();
        response
    }
}
