use std::fmt;

use bytes::{Buf, BufMut};

use super::timestamp::NtpTimestamp;
use crate::core::{Error, Result, NTP_VERSION};

/// Size of an NTP packet without extension fields
pub const PACKET_SIZE: usize = 48;

const VERSION_BITS: u32 = 3;

/// Leap second warning carried in the top two bits of the first byte
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeapIndicator {
    #[default]
    NoWarning = 0,
    /// Last minute of the day has 61 seconds
    AddSecond = 1,
    /// Last minute of the day has 59 seconds
    DeleteSecond = 2,
    /// Clock unsynchronized
    Unknown = 3,
}

impl LeapIndicator {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::AddSecond,
            2 => LeapIndicator::DeleteSecond,
            _ => LeapIndicator::Unknown,
        }
    }
}

/// Association mode carried in the low three bits of the first byte
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Reserved = 0,
    SymmetricActive = 1,
    SymmetricPassive = 2,
    Client = 3,
    Server = 4,
    Broadcast = 5,
    Control = 6,
    Private = 7,
}

impl Mode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::Control,
            _ => Mode::Private,
        }
    }
}

/// 32-bit NTP short format: 16 bits of seconds, 16 bits of fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NtpShort(pub u32);

impl NtpShort {
    /// Converts non-negative seconds below 65536 to the short format
    pub fn from_seconds(seconds: f64) -> Result<Self> {
        if !(0.0..65_536.0).contains(&seconds) {
            return Err(Error::config(format!(
                "{} seconds is outside the NTP short format range",
                seconds
            )));
        }
        let raw = (seconds * 65_536.0).round().min(u32::MAX as f64);
        Ok(NtpShort(raw as u32))
    }

    /// Returns the value in seconds
    pub fn to_seconds(self) -> f64 {
        self.0 as f64 / 65_536.0
    }
}

/// Four-byte reference identifier
///
/// For stratum 1 servers this is an ASCII clock name such as `GPS`,
/// otherwise it is opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReferenceId(pub [u8; 4]);

impl ReferenceId {
    /// Builds an identifier from up to four ASCII characters, zero padded
    pub fn from_ascii(name: &str) -> Result<Self> {
        if !name.is_ascii() || name.len() > 4 {
            return Err(Error::config(format!(
                "Reference id {:?} must be at most four ASCII characters",
                name
            )));
        }
        let mut bytes = [0u8; 4];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(ReferenceId(bytes))
    }

    /// Returns the identifier as a big-endian integer
    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trimmed: &[u8] = match self.0.iter().position(|&b| b == 0) {
            Some(end) => &self.0[..end],
            None => &self.0,
        };
        if !trimmed.is_empty() && trimmed.iter().all(|b| b.is_ascii_graphic()) {
            // graphic ASCII is valid UTF-8
            f.write_str(std::str::from_utf8(trimmed).map_err(|_| fmt::Error)?)
        } else {
            write!(f, "0x{:08X}", self.to_u32())
        }
    }
}

/// Network Time Protocol packet (RFC 5905 header, no extension fields)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpPacket {
    /// 2-bit field warning of leap seconds
    pub leap: LeapIndicator,
    /// 3-bit protocol version
    pub version: u8,
    /// 3-bit association mode
    pub mode: Mode,
    /// Server stratum, or 0 for unspecified
    pub stratum: u8,
    /// Max interval between successive messages, log2 seconds
    pub poll: i8,
    /// System clock precision, log2 seconds
    pub precision: i8,
    /// Total round-trip delay to the primary reference source
    pub root_delay: NtpShort,
    /// Maximum error relative to the primary reference source
    pub root_dispersion: NtpShort,
    /// Reference source identifier
    pub reference_id: ReferenceId,
    /// Last time the system clock was set or corrected
    pub reference_timestamp: NtpTimestamp,
    /// Time the request departed the client
    pub origin_timestamp: NtpTimestamp,
    /// Time the request arrived at the server
    pub receive_timestamp: NtpTimestamp,
    /// Time the packet departed its sender
    pub transmit_timestamp: NtpTimestamp,
}

impl Default for NtpPacket {
    fn default() -> Self {
        NtpPacket {
            leap: LeapIndicator::NoWarning,
            version: NTP_VERSION,
            mode: Mode::Client,
            stratum: 0,
            poll: 0,
            precision: 0,
            root_delay: NtpShort::default(),
            root_dispersion: NtpShort::default(),
            reference_id: ReferenceId::default(),
            reference_timestamp: NtpTimestamp::ZERO,
            origin_timestamp: NtpTimestamp::ZERO,
            receive_timestamp: NtpTimestamp::ZERO,
            transmit_timestamp: NtpTimestamp::ZERO,
        }
    }
}

impl NtpPacket {
    /// Creates a client request (LI 0, VN 4, mode 3) carrying the send time
    pub fn client_request(transmit: NtpTimestamp) -> Self {
        NtpPacket {
            transmit_timestamp: transmit,
            ..Default::default()
        }
    }

    /// Packs the first byte; fails when the version needs more than 3 bits
    fn li_vn_mode(&self) -> Result<u8> {
        if self.version >> VERSION_BITS != 0 {
            return Err(Error::field_overflow("version", self.version, VERSION_BITS));
        }
        Ok((self.leap as u8) << 6 | self.version << 3 | self.mode as u8)
    }

    /// Encodes into exactly `PACKET_SIZE` bytes in network byte order
    pub fn encode(&self) -> Result<[u8; PACKET_SIZE]> {
        let mut out = [0u8; PACKET_SIZE];
        self.encode_into(&mut &mut out[..])?;
        Ok(out)
    }

    /// Appends the encoded packet to `dst`
    ///
    /// Nothing is written when a field does not fit its bit width.
    pub fn encode_into(&self, dst: &mut impl BufMut) -> Result<()> {
        let first = self.li_vn_mode()?;
        if dst.remaining_mut() < PACKET_SIZE {
            return Err(Error::network(format!(
                "Output buffer holds {} bytes, packet needs {}",
                dst.remaining_mut(),
                PACKET_SIZE
            )));
        }

        dst.put_u8(first);
        dst.put_u8(self.stratum);
        dst.put_i8(self.poll);
        dst.put_i8(self.precision);
        dst.put_u32(self.root_delay.0);
        dst.put_u32(self.root_dispersion.0);
        dst.put_slice(&self.reference_id.0);
        self.reference_timestamp.write_to(dst);
        self.origin_timestamp.write_to(dst);
        self.receive_timestamp.write_to(dst);
        self.transmit_timestamp.write_to(dst);
        Ok(())
    }

    /// Decodes the first `PACKET_SIZE` bytes; trailing bytes are ignored
    ///
    /// Only the bit fields are extracted. Whether the version or mode is
    /// acceptable is up to the caller.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < PACKET_SIZE {
            return Err(Error::invalid_packet(src.len()));
        }

        let mut buf = &src[..PACKET_SIZE];
        let first = buf.get_u8();
        let stratum = buf.get_u8();
        let poll = buf.get_i8();
        let precision = buf.get_i8();
        let root_delay = NtpShort(buf.get_u32());
        let root_dispersion = NtpShort(buf.get_u32());
        let mut reference_id = [0u8; 4];
        buf.copy_to_slice(&mut reference_id);

        Ok(NtpPacket {
            leap: LeapIndicator::from_bits(first >> 6),
            version: (first >> 3) & 0b111,
            mode: Mode::from_bits(first),
            stratum,
            poll,
            precision,
            root_delay,
            root_dispersion,
            reference_id: ReferenceId(reference_id),
            reference_timestamp: NtpTimestamp::read_from(&mut buf),
            origin_timestamp: NtpTimestamp::read_from(&mut buf),
            receive_timestamp: NtpTimestamp::read_from(&mut buf),
            transmit_timestamp: NtpTimestamp::read_from(&mut buf),
        })
    }
}
