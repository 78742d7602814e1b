use crate::{error::MqttError, types::{MqttDataType, ProtocolVersion, UTF8String}};

use super::{Header, MqttControlPacket, PacketType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    header: Header,
    pub topic_filters: Vec<UTF8String>,
}

impl Unsubscribe {

    pub fn new(version: ProtocolVersion) -> Self {
        Unsubscribe { header: Header::new(PacketType::UNSUBSCRIBE, version), topic_filters: Vec::new() }
    }
}

impl MqttControlPacket for Unsubscribe {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn size(&self) -> usize {
        2 + self.header.properties_len() + self.topic_filters.iter().map(|f| f.encoded_len()).sum::<usize>()
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        self.header.decode_packet_id(src)?;
        self.header.decode_properties(src)?;

        if src.is_empty() {
            return Err(MqttError::ProtocolError("UNSUBSCRIBE without topic filters".into()))
        }
        while !src.is_empty() {
            self.topic_filters.push(UTF8String::decode(src)?);
        }
        Ok(())
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        self.header.check_packet_id()?;
        if self.topic_filters.is_empty() {
            return Err(MqttError::InvalidArgument("UNSUBSCRIBE requires at least one topic filter".into()))
        }
        self.header.validate_properties()?;

        self.header.encode_packet_id(dst);
        self.header.encode_properties(dst);
        for filter in &self.topic_filters {
            filter.encode(dst);
        }
        Ok(())
    }
}
