use crate::{types::{MqttDataType, ProtocolVersion, ReasonCode}, error::MqttError};

use super::{invalid_reason_code, Header, MqttControlPacket, PacketType};

/// A `SUBACK` packet is sent by the Server to the Client to confirm receipt and processing of a `SUBSCRIBE` packet.
///
/// The payload contains a list of [Reason Codes](crate::types::ReasonCode) that specify the maximum QoS level that was
/// granted or the error which was found for each Subscription that was requested by the
/// [`SUBSCRIBE`](crate::packet::Subscribe). In MQTT 3.1.1 these can only be a granted QoS level or `0x80`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suback {
    header: Header,
    return_codes: Vec<ReasonCode>,
}

impl Suback {

    pub fn new(version: ProtocolVersion) -> Self {
        Suback { header: Header::new(PacketType::SUBACK, version), return_codes: Vec::new() }
    }

    pub fn return_codes(&self) -> &[ReasonCode] {
        &self.return_codes
    }

    /// Fails with `InvalidReturnCode` if `code` is not allowed in a `SUBACK` of this protocol version.
    pub fn add_return_code(&mut self, code: ReasonCode) -> Result<(), MqttError> {
        if !self.is_valid(code) {
            return Err(MqttError::InvalidReturnCode(code.0))
        }
        self.return_codes.push(code);
        Ok(())
    }

    /// Adds all codes or none of them.
    pub fn add_return_codes(&mut self, codes: impl IntoIterator<Item = ReasonCode>) -> Result<(), MqttError> {
        let codes: Vec<ReasonCode> = codes.into_iter().collect();
        if let Some(invalid) = codes.iter().find(|c| !self.is_valid(**c)) {
            return Err(MqttError::InvalidReturnCode(invalid.0))
        }
        self.return_codes.extend(codes);
        Ok(())
    }

    fn is_valid(&self, code: ReasonCode) -> bool {
        match self.header.version {
            ProtocolVersion::V311 => code.is_valid_qos_grant(),
            ProtocolVersion::V50 => code.is_valid_for_type(PacketType::SUBACK),
        }
    }
}

impl MqttControlPacket for Suback {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn size(&self) -> usize {
        2 + self.header.properties_len() + self.return_codes.len()
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        self.header.decode_packet_id(src)?;
        self.header.decode_properties(src)?;

        if src.is_empty() {
            return Err(MqttError::ProtocolError("SUBACK without return codes".into()))
        }
        // each code is checked before it is consumed, so an error points right at it
        while let Some(b) = src.first() {
            let code = ReasonCode(*b);
            if !self.is_valid(code) {
                return Err(invalid_reason_code(self.header.version, PacketType::SUBACK, code))
            }
            self.return_codes.push(code);
            *src = &src[1..];
        }
        Ok(())
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        self.header.check_packet_id()?;
        if self.return_codes.is_empty() {
            return Err(MqttError::InvalidArgument("SUBACK requires at least one return code".into()))
        }
        self.header.validate_properties()?;

        self.header.encode_packet_id(dst);
        self.header.encode_properties(dst);
        for code in &self.return_codes {
            code.encode(dst);
        }
        Ok(())
    }
}
