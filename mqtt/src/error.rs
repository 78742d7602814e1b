//! Custom error types used throughout the crate.
//!
//! [MqttError] describes *what* went wrong, [CodecError] additionally records *where*: the number of bytes that had
//! been consumed (or written) by the failing operation when the error occurred.

use thiserror::Error;

use crate::packet::PacketType;
use crate::types::ReasonCode;

/// The four categories every [MqttError] falls into.
///
/// Callers use these to decide whether to wait for more bytes, close the connection or report a local mistake.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The buffer ended before a field or the declared remaining length was complete.
    InsufficientData,
    /// Structurally invalid encoding.
    MalformedPacket,
    /// Structurally valid, but not allowed for this packet type or protocol version.
    ProtocolError,
    /// Local misuse of the API.
    InvalidArgument,
}

/// Custom error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MqttError {

    /// The source buffer holds fewer bytes than needed to complete the current field or packet.
    #[error("Insufficient data: need {needed} bytes, {available} available")]
    InsufficientData { needed: usize, available: usize },

    /// Syntactical error indicating that a control packet could not be fully parsed.
    /// See MQTT 5 sections `1.2` and `4.13`.
    #[error("Malformed Packet: {0}")]
    MalformedPacket(String),

    /// Used for packets containing invalid or inconsistent data.
    /// See MQTT 5 sections `1.2` and `4.13`.
    #[error("Protocol Error: {0}")]
    ProtocolError(String),

    /// MQTT 3.1.1 has no notion of a protocol error reason, content it cannot accept is refused with the
    /// "server unavailable" return code instead.
    #[error("Refused, server unavailable: {0}")]
    ServerUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A packet identifier of `0` where the packet type requires one. See `MQTT-2.2.1-3`.
    #[error("Packet identifier must not be zero")]
    PacketIdZero,

    /// A return or reason code that is not permitted for the packet type and protocol version.
    #[error("Invalid return code: 0x{0:02X}")]
    InvalidReturnCode(u8),

    /// The destination buffer cannot hold the encoded packet.
    #[error("Buffer too small: need {needed} bytes, {available} available")]
    BufferTooSmall { needed: usize, available: usize },
}

impl MqttError {

    /// The flag bits of a fixed header that must carry fixed values.
    pub fn invalid_fixed_flags(packet_type: PacketType, first_byte: &u8) -> Self {
        MqttError::MalformedPacket(format!("Invalid fixed header flags for {}: {:08b}", packet_type, first_byte))
    }

    pub(crate) fn insufficient(needed: usize, available: usize) -> Self {
        MqttError::InsufficientData { needed, available }
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MqttError::InsufficientData { .. } => ErrorKind::InsufficientData,
            MqttError::MalformedPacket(_) => ErrorKind::MalformedPacket,
            MqttError::ProtocolError(_) |
            MqttError::ServerUnavailable(_) => ErrorKind::ProtocolError,
            MqttError::InvalidArgument(_) |
            MqttError::PacketIdZero |
            MqttError::InvalidReturnCode(_) |
            MqttError::BufferTooSmall { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// The MQTT 5 reason code a connection handler would send in a `DISCONNECT` after failing to decode an incoming
    /// packet with this error. Returns `None` for errors that are not a reason to close the connection.
    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            MqttError::MalformedPacket(_) => Some(ReasonCode::MALFORMED_PACKET),
            MqttError::ProtocolError(_) => Some(ReasonCode::PROTOCOL_ERROR),
            MqttError::ServerUnavailable(_) => Some(ReasonCode::SERVER_UNAVAILABLE),
            _ => None,
        }
    }

    /// Attaches the number of bytes consumed so far.
    pub fn at(self, consumed: usize) -> CodecError {
        CodecError { consumed, error: self }
    }
}

/// An [MqttError] along with the number of bytes the failing operation had consumed or written at that point.
///
/// The offset is relative to the start of the buffer that was passed to the operation, so for a decode it points at
/// the first byte that could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (at byte {consumed})")]
pub struct CodecError {
    pub consumed: usize,
    #[source]
    pub error: MqttError,
}

impl CodecError {

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Moves the offset forward by `base` bytes, for errors raised on a sub-slice.
    pub(crate) fn shift(self, base: usize) -> Self {
        CodecError { consumed: self.consumed + base, error: self.error }
    }
}

impl From<CodecError> for MqttError {
    fn from(src: CodecError) -> Self {
        src.error
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(ErrorKind::InsufficientData, MqttError::insufficient(2, 1).kind());
        assert_eq!(ErrorKind::MalformedPacket, MqttError::MalformedPacket("x".into()).kind());
        assert_eq!(ErrorKind::ProtocolError, MqttError::ServerUnavailable("x".into()).kind());
        assert_eq!(ErrorKind::InvalidArgument, MqttError::PacketIdZero.kind());
        assert_eq!(ErrorKind::InvalidArgument, MqttError::InvalidReturnCode(3).kind());
    }

    #[test]
    fn disconnect_reasons() {
        assert_eq!(Some(ReasonCode::MALFORMED_PACKET), MqttError::MalformedPacket("x".into()).reason_code());
        assert_eq!(Some(ReasonCode::PROTOCOL_ERROR), MqttError::ProtocolError("x".into()).reason_code());
        assert_eq!(None, MqttError::insufficient(5, 3).reason_code());
    }

    #[test]
    fn display() {
        let err = MqttError::InvalidReturnCode(0x03).at(4);
        assert_eq!("Invalid return code: 0x03 (at byte 4)", err.to_string());
        assert_eq!(
            "Malformed Packet: Invalid fixed header flags for DISCONNECT: 00100000",
            MqttError::invalid_fixed_flags(PacketType::DISCONNECT, &0b00100000).to_string()
        );
    }
}
