//! A configurable front end to [packet::decode()](crate::packet::decode()) and
//! [packet::encode()](crate::packet::encode()) for use on a byte stream.
//!
//! # Examples
//!
//! ```
//! use mqtt_codec::codec::Codec;
//! use mqtt_codec::packet::Message;
//! use mqtt_codec::types::ProtocolVersion;
//!
//! let codec = Codec::new(ProtocolVersion::V311).with_max_packet_size(1024);
//!
//! // the second packet is still incomplete
//! let stream = [0xC0, 0x00, 0xD0];
//! let (message, consumed) = codec.decode(&stream).unwrap().unwrap();
//! assert!(matches!(message, Message::Pingreq(_)));
//! assert!(codec.decode(&stream[consumed..]).unwrap().is_none());
//! ```

use tracing::{debug, trace};

use crate::error::{CodecError, MqttError};
use crate::packet::{self, FixedHeader, Message};
use crate::types::{ProtocolVersion, VariableByteInteger};

/// Largest possible packet: a five byte fixed header followed by the maximum remaining length.
pub const MAX_PACKET_SIZE: u32 = 5 + VariableByteInteger::MAX;

/// Decodes and encodes packets of one protocol version, subject to a maximum packet size.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Codec {
    version: ProtocolVersion,
    max_packet_size: u32,
}

impl Codec {

    pub fn new(version: ProtocolVersion) -> Self {
        Codec { version, max_packet_size: MAX_PACKET_SIZE }
    }

    /// Limits the total size, fixed header included, of packets this codec accepts or produces.
    pub fn with_max_packet_size(mut self, max_packet_size: u32) -> Self {
        self.max_packet_size = max_packet_size;
        self
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn max_packet_size(&self) -> u32 {
        self.max_packet_size
    }

    /// Decodes the first packet in `buf`.
    ///
    /// Returns `Ok(None)` if `buf` does not hold a complete packet yet. Packets larger than the configured maximum are
    /// rejected as soon as their fixed header is known, without waiting for the rest of them. Once a packet is
    /// complete, contents that run past its end are a malformed packet.
    pub fn decode(&self, buf: &[u8]) -> Result<Option<(Message, usize)>, CodecError> {
        let packet_len = match FixedHeader::decode(buf) {
            Ok(header) => header.packet_len(),
            Err(CodecError { error: MqttError::InsufficientData { needed, .. }, .. }) => {
                if self.exceeds_max(needed) {
                    return Err(self.too_large(needed))
                }
                trace!(needed, available = buf.len(), "waiting for more data");
                return Ok(None)
            },
            Err(err) => {
                debug!(kind = ?err.kind(), consumed = err.consumed, "invalid fixed header: {}", err.error);
                return Err(err)
            },
        };

        if self.exceeds_max(packet_len) {
            return Err(self.too_large(packet_len))
        }

        // the whole packet is in `buf`, so running out of bytes inside it cannot be fixed by reading more
        packet::decode(self.version, buf).map(Some).map_err(|err| match err.error {
            MqttError::InsufficientData { needed, available } => {
                debug!(needed, available, consumed = err.consumed, "packet shorter than its contents");
                MqttError::MalformedPacket(format!(
                    "Packet of {} bytes ends before its contents: need {} bytes, {} available",
                    packet_len, needed, available))
                    .at(err.consumed)
            },
            _ => err,
        })
    }

    /// Encodes `message` into `dst`, returning the number of bytes written.
    pub fn encode(&self, message: &Message, dst: &mut [u8]) -> Result<usize, CodecError> {
        let encoded_len = message.encoded_len();
        if self.exceeds_max(encoded_len) {
            return Err(MqttError::InvalidArgument(format!(
                "Encoded size of {} bytes exceeds the maximum packet size of {}",
                encoded_len, self.max_packet_size))
                .at(0))
        }
        if message.version() != self.version {
            return Err(MqttError::InvalidArgument(format!(
                "Cannot encode an MQTT {} message with an MQTT {} codec", message.version(), self.version))
                .at(0))
        }
        packet::encode(message, dst)
    }

    fn exceeds_max(&self, packet_len: usize) -> bool {
        packet_len > self.max_packet_size as usize
    }

    fn too_large(&self, packet_len: usize) -> CodecError {
        debug!(packet_len, max_packet_size = self.max_packet_size, "packet too large");
        MqttError::MalformedPacket(format!(
            "Packet of {} bytes exceeds the maximum packet size of {}", packet_len, self.max_packet_size))
            .at(0)
    }
}

impl Default for Codec {
    /// An MQTT 5 codec without a size limit beyond the protocol maximum.
    fn default() -> Self {
        Codec::new(ProtocolVersion::V50)
    }
}

#[cfg(test)]
mod tests {

    use crate::error::ErrorKind;
    use crate::packet::{MqttControlPacket, PacketType, Publish};
    use crate::types::{ReasonCode, UTF8String};

    use super::*;

    #[test]
    fn defaults() {
        let codec = Codec::default();
        assert_eq!(ProtocolVersion::V50, codec.version());
        assert_eq!(268_435_460, codec.max_packet_size());
    }

    #[test]
    fn incomplete() {
        let codec = Codec::new(ProtocolVersion::V311);
        assert_eq!(Ok(None), codec.decode(&[]));
        assert_eq!(Ok(None), codec.decode(&[0x40]));
        assert_eq!(Ok(None), codec.decode(&[0x40, 0x02, 0x00]));
        assert!(codec.decode(&[0x40, 0x02, 0x00, 0x07]).unwrap().is_some());
    }

    #[test]
    fn insufficient_data_inside_packet() {
        // the declared length is there, but too short for a packet identifier
        let codec = Codec::new(ProtocolVersion::V311);
        let err = codec.decode(&[0x40, 0x01, 0x07]).unwrap_err();
        assert_eq!(ErrorKind::MalformedPacket, err.kind());
        assert_eq!(Some(ReasonCode::MALFORMED_PACKET), err.error.reason_code());
        assert_eq!(2, err.consumed);

        // more data does not change the outcome
        assert_eq!(Err(err), codec.decode(&[0x40, 0x01, 0x07, 0xC0, 0x00]));

        // properties length runs past the end of the packet
        let codec = Codec::new(ProtocolVersion::V50);
        let err = codec.decode(&[0x40, 0x04, 0x00, 0x07, 0x00, 0x09]).unwrap_err();
        assert_eq!(ErrorKind::MalformedPacket, err.kind());
        assert_eq!(Some(ReasonCode::MALFORMED_PACKET), err.error.reason_code());

        // packet::decode itself keeps reporting the short field
        let err = packet::decode(ProtocolVersion::V311, &[0x40, 0x01, 0x07]).unwrap_err();
        assert_eq!(ErrorKind::InsufficientData, err.kind());
    }

    #[test]
    fn too_large() {
        let codec = Codec::new(ProtocolVersion::V311).with_max_packet_size(10);

        // only the fixed header has arrived
        let err = codec.decode(&[0x30, 0x7F]).unwrap_err();
        assert_eq!(ErrorKind::MalformedPacket, err.kind());
        assert_eq!(0, err.consumed);

        let mut publish = Publish::new(ProtocolVersion::V311);
        publish.topic = UTF8String::new("a/b").unwrap();
        publish.payload = vec![0_u8; 32].into();
        let msg = Message::Publish(publish);
        let mut dst = vec![0_u8; msg.encoded_len()];
        assert_eq!(ErrorKind::InvalidArgument, codec.encode(&msg, &mut dst).unwrap_err().kind());

        let codec = codec.with_max_packet_size(64);
        assert_eq!(Ok(39), codec.encode(&msg, &mut dst));
        let (decoded, consumed) = codec.decode(&dst).unwrap().unwrap();
        assert_eq!(39, consumed);
        assert_eq!(msg, decoded);
    }

    #[test]
    fn version_mismatch() {
        let codec = Codec::new(ProtocolVersion::V311);
        let mut ack = Message::new(ProtocolVersion::V50, PacketType::PUBACK).unwrap();
        ack.packet_mut().set_packet_id(1);
        let err = codec.encode(&ack, &mut [0; 8]).unwrap_err();
        assert_eq!(ErrorKind::InvalidArgument, err.kind());
    }
}
