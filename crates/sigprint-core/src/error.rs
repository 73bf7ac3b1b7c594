//! Error types for the SIGPRINT stream protocol
//!
//! Decoder-side errors carry enough context for debugging without heap
//! allocation, so they work in `no_std` environments. The encoder itself
//! is total: it cannot fail on well-typed inputs.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors raised while decoding a SIGPRINT packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolError {
    /// Header magic did not match `0x5347` ("SG").
    InvalidMagic {
        /// The magic value that was read
        got: u16,
    },
    /// Unsupported protocol version.
    UnsupportedVersion {
        /// The version byte that was read
        got: u8,
    },
    /// Unknown packet type byte.
    InvalidPacketType {
        /// The unrecognized type value
        packet_type: u8,
    },
    /// Header payload-length field does not match the fixed format.
    PayloadLengthMismatch {
        /// Length carried in the header
        length: u16,
        /// Length required by the format
        expected: u16,
    },
    /// Payload CRC does not match the header CRC field.
    CrcMismatch {
        /// CRC recomputed over the payload
        computed: u16,
        /// CRC carried in the header
        stored: u16,
    },
    /// Not enough bytes for a complete frame.
    IncompletePacket {
        /// Bytes received
        received: usize,
        /// Bytes expected
        expected: usize,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic { got } => {
                write!(f, "Invalid magic: 0x{got:04X}")
            }
            Self::UnsupportedVersion { got } => {
                write!(f, "Unsupported protocol version: 0x{got:02X}")
            }
            Self::InvalidPacketType { packet_type } => {
                write!(f, "Invalid packet type: 0x{packet_type:02X}")
            }
            Self::PayloadLengthMismatch { length, expected } => {
                write!(f, "Payload length {length} does not match format ({expected})")
            }
            Self::CrcMismatch { computed, stored } => {
                write!(f, "CRC mismatch: computed 0x{computed:04X}, stored 0x{stored:04X}")
            }
            Self::IncompletePacket { received, expected } => {
                write!(f, "Incomplete packet: got {received}/{expected} bytes")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

#[cfg(feature = "defmt")]
impl defmt::Format for ProtocolError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::InvalidMagic { got } => {
                defmt::write!(f, "Bad magic: {:04X}", got);
            }
            Self::UnsupportedVersion { got } => {
                defmt::write!(f, "Bad version: {:02X}", got);
            }
            Self::InvalidPacketType { packet_type } => {
                defmt::write!(f, "Bad type: {:02X}", packet_type);
            }
            Self::PayloadLengthMismatch { length, expected } => {
                defmt::write!(f, "Length: {} != {}", length, expected);
            }
            Self::CrcMismatch { computed, stored } => {
                defmt::write!(f, "CRC: {:04X} != {:04X}", computed, stored);
            }
            Self::IncompletePacket { received, expected } => {
                defmt::write!(f, "Incomplete: {}/{}", received, expected);
            }
        }
    }
}
