use crate::{types::{MqttDataType, ProtocolVersion, ReasonCode}, error::MqttError};

use super::{invalid_reason_code, Header, MqttControlPacket, PacketType};

/// Confirms an `UNSUBSCRIBE`. MQTT 3.1.1 only carries the packet identifier, MQTT 5 adds properties and one reason
/// code per topic filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsuback {
    header: Header,
    reason_codes: Vec<ReasonCode>,
}

impl Unsuback {

    pub fn new(version: ProtocolVersion) -> Self {
        Unsuback { header: Header::new(PacketType::UNSUBACK, version), reason_codes: Vec::new() }
    }

    pub fn reason_codes(&self) -> &[ReasonCode] {
        &self.reason_codes
    }

    /// Fails for MQTT 3.1.1 and for codes not allowed in an `UNSUBACK`.
    pub fn add_reason_code(&mut self, code: ReasonCode) -> Result<(), MqttError> {
        if !self.header.version.has_properties() || !code.is_valid_for_type(PacketType::UNSUBACK) {
            return Err(MqttError::InvalidReturnCode(code.0))
        }
        self.reason_codes.push(code);
        Ok(())
    }
}

impl MqttControlPacket for Unsuback {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn size(&self) -> usize {
        2 + self.header.properties_len() + self.reason_codes.len()
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        self.header.decode_packet_id(src)?;
        if !self.header.version.has_properties() {
            return Ok(())
        }

        self.header.decode_properties(src)?;
        if src.is_empty() {
            return Err(MqttError::ProtocolError("UNSUBACK without reason codes".into()))
        }
        while let Some(b) = src.first() {
            let code = ReasonCode(*b);
            if !code.is_valid_for_type(PacketType::UNSUBACK) {
                return Err(invalid_reason_code(self.header.version, PacketType::UNSUBACK, code))
            }
            self.reason_codes.push(code);
            *src = &src[1..];
        }
        Ok(())
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        self.header.check_packet_id()?;
        if self.header.version.has_properties() {
            if self.reason_codes.is_empty() {
                return Err(MqttError::InvalidArgument("UNSUBACK requires at least one reason code".into()))
            }
            self.header.validate_properties()?;
        }

        self.header.encode_packet_id(dst);
        self.header.encode_properties(dst);
        for code in &self.reason_codes {
            code.encode(dst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use crate::error::ErrorKind;

    use super::*;

    #[test]
    fn v311() {
        let mut unsuback = Unsuback::new(ProtocolVersion::V311);
        unsuback.set_packet_id(513);
        assert!(unsuback.add_reason_code(ReasonCode::SUCCESS).is_err());

        let mut buf = [0_u8; 2];
        assert_eq!(Ok(2), unsuback.encode_message(&mut buf));
        assert_eq!([2, 1], buf);

        let mut decoded = Unsuback::new(ProtocolVersion::V311);
        assert_eq!(Ok(2), decoded.decode_message(&buf));
        assert_eq!(unsuback, decoded);
    }

    #[test]
    fn v5() {
        let mut unsuback = Unsuback::new(ProtocolVersion::V50);
        unsuback.set_packet_id(7);
        unsuback.add_reason_code(ReasonCode::SUCCESS).unwrap();
        unsuback.add_reason_code(ReasonCode::NO_SUBSCRIPTION_EXISTED).unwrap();
        assert!(unsuback.add_reason_code(ReasonCode::GRANTED_QOS_1).is_err());

        let mut buf = vec![0_u8; unsuback.size()];
        unsuback.encode_message(&mut buf).unwrap();
        assert_eq!(vec![0, 7, 0, 0x00, 0x11], buf);

        let mut decoded = Unsuback::new(ProtocolVersion::V50);
        assert_eq!(Ok(5), decoded.decode_message(&buf));
        assert_eq!(&[ReasonCode::SUCCESS, ReasonCode::NO_SUBSCRIPTION_EXISTED], decoded.reason_codes());
    }

    #[test]
    fn invalid_code() {
        let mut decoded = Unsuback::new(ProtocolVersion::V50);
        let err = decoded.decode_message(&[0, 7, 0, 0x11, 0x02]).unwrap_err();
        assert_eq!(ErrorKind::ProtocolError, err.kind());
        assert_eq!(4, err.consumed);
    }
}
