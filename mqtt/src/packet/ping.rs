use crate::error::MqttError;
use crate::types::ProtocolVersion;

use super::{Header, MqttControlPacket, PacketType};

/// `PINGREQ` or `PINGRESP`. Neither has a variable header or payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ping {
    header: Header,
}

impl Ping {

    pub fn new(packet_type: PacketType, version: ProtocolVersion) -> Result<Self, MqttError> {
        match packet_type {
            PacketType::PINGREQ | PacketType::PINGRESP => Ok(Ping { header: Header::new(packet_type, version) }),
            els => Err(MqttError::InvalidArgument(format!("{} is not a ping", els))),
        }
    }
}

impl MqttControlPacket for Ping {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn size(&self) -> usize {
        0
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        match src.is_empty() {
            true => Ok(()),
            false => Err(MqttError::MalformedPacket(format!("Invalid {} packet: {:?}", self.header.packet_type, src))),
        }
    }

    fn encode_body(&self, _dst: &mut &mut [u8]) -> Result<(), MqttError> {
        Ok(())
    }
}
