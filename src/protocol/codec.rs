use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use super::packet::{NtpPacket, PACKET_SIZE};
use crate::core::Error;

/// Datagram codec for NTP packets, shared by the client and the server loop
///
/// Each buffer handed to the decoder holds exactly one UDP payload, so a
/// decoded frame consumes the whole buffer and any bytes past the 48-byte
/// header are dropped with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NtpCodec;

impl NtpCodec {
    /// Creates a new packet codec
    pub fn new() -> Self {
        NtpCodec
    }
}

impl Decoder for NtpCodec {
    type Item = NtpPacket;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PACKET_SIZE {
            // Need more data for a full header
            return Ok(None);
        }

        let packet = NtpPacket::decode(src)?;
        src.clear();
        Ok(Some(packet))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if src.is_empty() => Ok(None),
            None => {
                let len = src.len();
                src.clear();
                Err(Error::invalid_packet(len))
            }
        }
    }
}

impl Encoder<NtpPacket> for NtpCodec {
    type Error = Error;

    fn encode(&mut self, item: NtpPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(PACKET_SIZE);
        item.encode_into(dst)
    }
}
