use crate::error::MqttError;
use crate::types::{ProtocolVersion, ReasonCode};

use super::{Header, MqttControlPacket, PacketType};

/// `PUBACK`, `PUBREC`, `PUBREL` and `PUBCOMP` share the same shape: a packet identifier and, in MQTT 5, an optional
/// reason code followed by optional properties.
///
/// Encoding always uses the shortest form: no reason code for `Success` without properties, no property length if
/// there are no properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    header: Header,

    /// Always `Success` in MQTT 3.1.1.
    pub reason_code: ReasonCode,
}

impl Ack {

    /// Fails for packet types other than the four acknowledgements.
    pub fn new(packet_type: PacketType, version: ProtocolVersion) -> Result<Self, MqttError> {
        match packet_type {
            PacketType::PUBACK |
            PacketType::PUBREC |
            PacketType::PUBREL |
            PacketType::PUBCOMP => Ok(Ack { header: Header::new(packet_type, version), reason_code: ReasonCode::SUCCESS }),
            els => Err(MqttError::InvalidArgument(format!("{} is not a publish acknowledgement", els))),
        }
    }

    fn validate_reason_code(&self) -> Result<(), MqttError> {
        let valid = match self.header.version {
            ProtocolVersion::V311 => self.reason_code == ReasonCode::SUCCESS,
            ProtocolVersion::V50 => self.reason_code.is_valid_for_type(self.header.packet_type),
        };
        match valid {
            true => Ok(()),
            false => Err(MqttError::InvalidReturnCode(self.reason_code.0)),
        }
    }
}

impl MqttControlPacket for Ack {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn size(&self) -> usize {
        match self.header.version {
            ProtocolVersion::V311 => 2,
            ProtocolVersion::V50 => 2 + self.header.reason_tail_len(self.reason_code),
        }
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        self.header.decode_packet_id(src)?;
        if self.header.version.has_properties() {
            self.reason_code = self.header.decode_reason_tail(src)?;
        }
        Ok(())
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        self.header.check_packet_id()?;
        self.validate_reason_code()?;
        if self.header.version.has_properties() {
            self.header.validate_properties()?;
        }

        self.header.encode_packet_id(dst);
        if self.header.version.has_properties() {
            self.header.encode_reason_tail(self.reason_code, dst);
        }
        Ok(())
    }
}
