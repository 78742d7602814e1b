use crate::{error::MqttError, types::{MqttDataType, ProtocolVersion, ReasonCode}};

use super::{invalid_reason_code, Header, MqttControlPacket, PacketType};

const SESSION_PRESENT: u8 = 0b00000001;

/// A `CONNACK` MQTT control packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connack {
    header: Header,

    /// Whether this connect/connack exchange resumes an existing session or starts a new one.
    /// Must be `false` if the connection is refused.
    pub session_present: bool,

    /// Indicates whether the connection attempt was successful, and if not why.
    /// [Anything above 0x80 is an error](crate::types::ReasonCode::is_err()) in MQTT 5, MQTT 3.1.1 uses the return
    /// codes `0x00` to `0x05`.
    pub reason_code: ReasonCode,
}

impl Connack {

    pub fn new(version: ProtocolVersion) -> Self {
        Connack { header: Header::new(PacketType::CONNACK, version), session_present: false, reason_code: ReasonCode::SUCCESS }
    }

    fn is_valid(&self, code: ReasonCode) -> bool {
        match self.header.version {
            ProtocolVersion::V311 => code <= ReasonCode::REFUSED_NOT_AUTHORIZED,
            ProtocolVersion::V50 => code.is_valid_for_type(PacketType::CONNACK),
        }
    }
}

impl MqttControlPacket for Connack {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn size(&self) -> usize {
        2 + self.header.properties_len()
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        let mut cursor = *src;
        let ack_flags = u8::decode(&mut cursor)?;
        if ack_flags & !SESSION_PRESENT != 0 {
            return Err(MqttError::MalformedPacket(format!("Reserved CONNACK flags set: {:08b}", ack_flags)))
        }
        *src = cursor;

        let code = match src.first() {
            Some(b) => ReasonCode(*b),
            None => return Err(MqttError::insufficient(1, 0)),
        };
        if !self.is_valid(code) {
            return Err(invalid_reason_code(self.header.version, PacketType::CONNACK, code))
        }
        if ack_flags == SESSION_PRESENT && code != ReasonCode::SUCCESS {
            return Err(MqttError::ProtocolError(format!("Session present with a refused connection: {}", code)))
        }
        *src = &src[1..];

        self.session_present = ack_flags == SESSION_PRESENT;
        self.reason_code = code;
        self.header.decode_properties(src)
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        if !self.is_valid(self.reason_code) {
            return Err(MqttError::InvalidReturnCode(self.reason_code.0))
        }
        if self.session_present && self.reason_code != ReasonCode::SUCCESS {
            return Err(MqttError::InvalidArgument("Session present must not be set for a refused connection".into()))
        }
        self.header.validate_properties()?;

        let ack_flags = match self.session_present {
            true => SESSION_PRESENT,
            false => 0,
        };
        ack_flags.encode(dst);
        self.reason_code.encode(dst);
        self.header.encode_properties(dst);
        Ok(())
    }
}
