use crate::error::{CodecError, MqttError};
use crate::types::VariableByteInteger;

use super::PacketType;

/// The first two to five bytes of every packet: type and flags, followed by the remaining length.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    /// Lower four bits of the first byte.
    pub flags: u8,
    /// Number of bytes following the fixed header.
    pub remaining_length: usize,
    /// Number of bytes the fixed header itself occupies.
    pub header_len: usize,
}

impl FixedHeader {

    const TYPE_AND_FLAGS_LEN: usize = 1;
    const FLAGS_MASK: u8 = 0b00001111;

    /// Parses the fixed header at the start of `src`.
    ///
    /// Fails with `InsufficientData` unless `src` also holds all `remaining_length` bytes that follow, so a successful
    /// result guarantees the whole packet is available. Errors report the offset of the field that could not be read:
    /// 0 for the first byte, 1 for the remaining length and `header_len` for the body.
    pub fn decode(src: &[u8]) -> Result<Self, CodecError> {
        let first_byte = match src.first() {
            Some(b) => *b,
            None => return Err(MqttError::insufficient(2, 0).at(0)),
        };

        let packet_type = PacketType::try_from(first_byte).map_err(|e| e.at(0))?;
        let flags = first_byte & Self::FLAGS_MASK;
        if let Some(expected) = packet_type.fixed_flags() {
            if flags != expected {
                return Err(MqttError::invalid_fixed_flags(packet_type, &first_byte).at(0))
            }
        }

        let (remaining_length, length_len) = match VariableByteInteger::decode_from(&src[Self::TYPE_AND_FLAGS_LEN..]) {
            Ok((value, len)) => (value as usize, len),
            Err(MqttError::InsufficientData { needed, available }) => {
                return Err(MqttError::insufficient(needed + Self::TYPE_AND_FLAGS_LEN, available + Self::TYPE_AND_FLAGS_LEN)
                    .at(Self::TYPE_AND_FLAGS_LEN))
            },
            Err(e) => return Err(e.at(Self::TYPE_AND_FLAGS_LEN)),
        };

        let header_len = Self::TYPE_AND_FLAGS_LEN + length_len;
        if src.len() < header_len + remaining_length {
            return Err(MqttError::insufficient(header_len + remaining_length, src.len()).at(header_len))
        }

        Ok(FixedHeader { packet_type, flags, remaining_length, header_len })
    }

    /// Total size of the packet this header belongs to.
    pub fn packet_len(&self) -> usize {
        self.header_len + self.remaining_length
    }
}
