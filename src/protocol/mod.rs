//! Protocol implementation module
//!
//! This module defines the 48-byte NTP packet, its timestamp format, the
//! datagram codec and the server-side response builder.
//!
//! Wire layout (all integers big-endian):
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 1 | LI (2 bits), VN (3 bits), Mode (3 bits) |
//! | 1 | 1 | Stratum |
//! | 2 | 1 | Poll (signed) |
//! | 3 | 1 | Precision (signed) |
//! | 4 | 4 | Root Delay (16.16) |
//! | 8 | 4 | Root Dispersion (16.16) |
//! | 12 | 4 | Reference ID |
//! | 16 | 8 | Reference Timestamp |
//! | 24 | 8 | Origin Timestamp |
//! | 32 | 8 | Receive Timestamp |
//! | 40 | 8 | Transmit Timestamp |

pub mod codec;
pub mod packet;
pub mod response;
pub mod timestamp;

pub use self::codec::NtpCodec;
pub use self::packet::{LeapIndicator, Mode, NtpPacket, NtpShort, ReferenceId, PACKET_SIZE};
pub use self::response::Responder;
pub use self::timestamp::{NtpTimestamp, NTP_UNIX_OFFSET};
