use crate::{types::{ProtocolVersion, ReasonCode}, error::MqttError};

use super::{Header, MqttControlPacket, PacketType};

/// Extended authentication exchange, MQTT 5 only.
///
/// A remaining length of `0` means `Success` without properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    header: Header,
    pub reason_code: ReasonCode,
}

impl Auth {

    /// Fails for MQTT 3.1.1, which has no `AUTH` packet.
    pub fn new(version: ProtocolVersion) -> Result<Self, MqttError> {
        match version {
            ProtocolVersion::V50 => Ok(Auth { header: Header::new(PacketType::AUTH, version), reason_code: ReasonCode::SUCCESS }),
            ProtocolVersion::V311 => Err(MqttError::InvalidArgument("AUTH is not part of MQTT 3.1.1".into())),
        }
    }
}

impl MqttControlPacket for Auth {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn size(&self) -> usize {
        self.header.reason_tail_len(self.reason_code)
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        self.reason_code = self.header.decode_reason_tail(src)?;
        Ok(())
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        if !self.reason_code.is_valid_for_type(PacketType::AUTH) {
            return Err(MqttError::InvalidReturnCode(self.reason_code.0))
        }
        self.header.validate_properties()?;
        self.header.encode_reason_tail(self.reason_code, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use crate::error::ErrorKind;
    use crate::packet::{DataRepresentation, PropertyIdentifier};
    use crate::types::{BinaryData, UTF8String};

    use super::*;

    #[test]
    fn empty() {
        let auth = Auth::new(ProtocolVersion::V50).unwrap();
        assert_eq!(0, auth.size());

        let mut decoded = Auth::new(ProtocolVersion::V50).unwrap();
        assert_eq!(Ok(0), decoded.decode_message(&[]));
        assert_eq!(auth, decoded);
    }

    #[test]
    fn continue_authentication() {
        let mut auth = Auth::new(ProtocolVersion::V50).unwrap();
        auth.reason_code = ReasonCode::CONTINUE_AUTHENTICATION;
        let properties = auth.header_mut().properties_mut().unwrap();
        properties.push(PropertyIdentifier::AuthenticationMethod, DataRepresentation::UTF8(UTF8String::new("SCRAM").unwrap())).unwrap();
        properties.push(PropertyIdentifier::AuthenticationData, DataRepresentation::BinaryData(BinaryData::new(vec![1, 2, 3]).unwrap())).unwrap();

        let mut buf = vec![0_u8; auth.size()];
        assert_eq!(Ok(16), auth.encode_message(&mut buf));
        assert_eq!(vec![0x18, 14, 21, 0, 5, 83, 67, 82, 65, 77, 22, 0, 3, 1, 2, 3], buf);

        let mut decoded = Auth::new(ProtocolVersion::V50).unwrap();
        assert_eq!(Ok(16), decoded.decode_message(&buf));
        assert_eq!(auth, decoded);
    }

    #[test]
    fn invalid_reason_code() {
        let mut auth = Auth::new(ProtocolVersion::V50).unwrap();
        assert_eq!(ErrorKind::ProtocolError, auth.decode_message(&[0x87, 0]).unwrap_err().kind());

        auth.reason_code = ReasonCode::NOT_AUTHORIZED;
        assert_eq!(ErrorKind::InvalidArgument, auth.encode_message(&mut [0; 4]).unwrap_err().kind());
    }

    #[test]
    fn v311() {
        assert!(Auth::new(ProtocolVersion::V311).is_err());
    }
}
