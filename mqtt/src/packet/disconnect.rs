use crate::{types::{ProtocolVersion, ReasonCode}, error::MqttError};

use super::{Header, MqttControlPacket, PacketType};

/// A `DISCONNECT` message cleanly severs the connection between client and server.
///
/// In MQTT 3.1.1 it has no variable header at all, the packet is always two bytes. MQTT 5 adds an optional reason
/// code and optional properties; a remaining length of `0` means "normal disconnection".
///
/// See [the MQTT 5 standard](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901205)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    header: Header,

    /// Details about the disconnect. MQTT 5 only.
    pub reason_code: ReasonCode,
}

impl Disconnect {

    /// Returns a [`Disconnect`] with [normal disconnection](crate::types::ReasonCode::NORMAL_DISCONNECTION) and no
    /// properties.
    pub fn new(version: ProtocolVersion) -> Self {
        Disconnect { header: Header::new(PacketType::DISCONNECT, version), reason_code: ReasonCode::NORMAL_DISCONNECTION }
    }
}

impl MqttControlPacket for Disconnect {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn size(&self) -> usize {
        match self.header.version {
            ProtocolVersion::V311 => 0,
            ProtocolVersion::V50 => self.header.reason_tail_len(self.reason_code),
        }
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        match self.header.version {
            ProtocolVersion::V311 if !src.is_empty() => {
                Err(MqttError::ServerUnavailable(format!("DISCONNECT with a remaining length of {}", src.len())))
            },
            ProtocolVersion::V311 => Ok(()),
            ProtocolVersion::V50 => {
                self.reason_code = self.header.decode_reason_tail(src)?;
                Ok(())
            },
        }
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        match self.header.version {
            ProtocolVersion::V311 if self.reason_code != ReasonCode::NORMAL_DISCONNECTION => {
                Err(MqttError::InvalidReturnCode(self.reason_code.0))
            },
            ProtocolVersion::V311 => Ok(()),
            ProtocolVersion::V50 => {
                if !self.reason_code.is_valid_for_type(PacketType::DISCONNECT) {
                    return Err(MqttError::InvalidReturnCode(self.reason_code.0))
                }
                self.header.validate_properties()?;
                self.header.encode_reason_tail(self.reason_code, dst);
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {

    use crate::error::ErrorKind;
    use crate::packet::{decode, encode, DataRepresentation, Message, PropertyIdentifier};
    use crate::types::UTF8String;

    use super::*;

    const FIRST_BYTE: u8 = 0b11100000;

    fn encode_to_vec(disconnect: Disconnect) -> Vec<u8> {
        let msg = Message::Disconnect(disconnect);
        let mut buf = vec![0_u8; msg.encoded_len()];
        encode(&msg, &mut buf).unwrap();
        buf
    }

    fn decode_disconnect(version: ProtocolVersion, binary: &[u8]) -> Disconnect {
        match decode(version, binary).unwrap() {
            (Message::Disconnect(d), consumed) => {
                assert_eq!(binary.len(), consumed);
                d
            },
            (els, _) => panic!("not a DISCONNECT: {:?}", els),
        }
    }

    #[test]
    fn encode_and_decode() {
        for version in [ProtocolVersion::V311, ProtocolVersion::V50] {
            let encoded = encode_to_vec(Disconnect::new(version));
            assert_eq!(vec![FIRST_BYTE, 0], encoded);
            assert_eq!(ReasonCode::NORMAL_DISCONNECTION, decode_disconnect(version, &encoded).reason_code);
        }
    }

    #[test]
    fn encode_reason_code() {
        let mut disconnect = Disconnect::new(ProtocolVersion::V50);
        disconnect.reason_code = ReasonCode::NOT_AUTHORIZED;
        assert_eq!(vec![FIRST_BYTE, 1, 0x87], encode_to_vec(disconnect));
    }

    #[test]
    fn encode_with_properties() {
        let mut disconnect = Disconnect::new(ProtocolVersion::V50);
        let properties = disconnect.header_mut().properties_mut().unwrap();
        properties.push(PropertyIdentifier::SessionExpiryInterval, DataRepresentation::FourByteInt(180)).unwrap();
        properties.push(PropertyIdentifier::ReasonString, DataRepresentation::UTF8(UTF8String::new("because").unwrap())).unwrap();

        let expected: Vec<u8> = vec![FIRST_BYTE, 17, 0, 15, 17, 0, 0, 0, 180, 31, 0, 7, 98, 101, 99, 97, 117, 115, 101];
        assert_eq!(expected, encode_to_vec(disconnect));
    }

    #[test]
    fn decode_with_properties() {
        let binary: Vec<u8> = vec![FIRST_BYTE, 17, 0, 15, 17, 0, 0, 0, 180, 31, 0, 7, 98, 101, 99, 97, 117, 115, 101];
        let disconnect = decode_disconnect(ProtocolVersion::V50, &binary);

        let properties = disconnect.header().properties().unwrap();
        assert_eq!(Some(&DataRepresentation::FourByteInt(180)), properties.get(PropertyIdentifier::SessionExpiryInterval));
        assert_eq!(
            Some(&DataRepresentation::UTF8(UTF8String::new("because").unwrap())),
            properties.get(PropertyIdentifier::ReasonString)
        );
    }

    #[test]
    fn decode_reason_code() {
        assert_eq!(ReasonCode::PROTOCOL_ERROR, decode_disconnect(ProtocolVersion::V50, &[224, 1, 130]).reason_code);
        assert_eq!(ReasonCode::UNSPECIFIED_ERROR, decode_disconnect(ProtocolVersion::V50, &[224, 2, 128, 0]).reason_code);
        assert_eq!(ReasonCode::DISCONNECT_WITH_WILL_MESSAGE, decode_disconnect(ProtocolVersion::V50, &[224, 2, 4, 0]).reason_code);
        assert_eq!(ReasonCode::NORMAL_DISCONNECTION, decode_disconnect(ProtocolVersion::V50, &[224, 1, 0]).reason_code);
    }

    #[test]
    fn v311_has_no_variable_header() {
        let err = decode(ProtocolVersion::V311, &[FIRST_BYTE, 1, 0]).unwrap_err();
        assert_eq!(ErrorKind::ProtocolError, err.kind());
        assert_eq!(Some(ReasonCode::SERVER_UNAVAILABLE), err.error.reason_code());

        let mut disconnect = Disconnect::new(ProtocolVersion::V311);
        disconnect.reason_code = ReasonCode::SERVER_BUSY;
        assert_eq!(
            MqttError::InvalidReturnCode(0x89),
            encode(&Message::Disconnect(disconnect), &mut [0; 4]).unwrap_err().error
        );
    }

    #[test]
    fn invalid_reason_code() {
        // granted QoS 1 means nothing in a DISCONNECT
        let err = decode(ProtocolVersion::V50, &[FIRST_BYTE, 1, 0x01]).unwrap_err();
        assert_eq!(ErrorKind::ProtocolError, err.kind());
        assert_eq!(2, err.consumed);
    }

    #[test]
    fn trailing_garbage() {
        let err = decode(ProtocolVersion::V50, &[FIRST_BYTE, 5, 0, 0, 2, 3, 4]).unwrap_err();
        assert_eq!(ErrorKind::MalformedPacket, err.kind());
        assert_eq!(4, err.consumed);
    }
}
