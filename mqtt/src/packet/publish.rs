use bytes::{Buf, BufMut, Bytes};

use crate::{types::{MqttDataType, ProtocolVersion, QoS, UTF8String}, error::MqttError};

use super::{Header, MqttControlPacket, PacketType, PropertyIdentifier};

/// An MQTT `PUBLISH` packet is used to send a specific message to a topic.
///
/// # Examples
///
/// ```
/// use mqtt_codec::packet::{MqttControlPacket, Publish};
/// use mqtt_codec::types::{ProtocolVersion, QoS};
///
/// let mut publish = Publish::new(ProtocolVersion::V311);
/// publish.topic = "/some/topic/name".try_into().unwrap();
/// publish.payload = vec![0_u8, 1, 2, 3, 4].into();
/// publish.qos = QoS::AtLeastOnce;
/// publish.set_packet_id(12);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    header: Header,

    // FIXED HEADER
    /// If `true` this message is considered an attempted re-delivery.
    /// Defaults to `false`, and **must** be so if QoS is `0`.
    pub dup: bool,

    /// QoS for this message.
    pub qos: QoS,

    /// Whether the server should keep this message for future subscribers or not.
    /// Defaults to `false`.
    pub retain: bool,

    // VARIABLE HEADER

    /// Name of the topic to publish to. Must not contain wildcards. May only be empty in MQTT 5, and then only if a
    /// topic alias is set.
    pub topic: UTF8String,

    // PAYLOAD

    /// Everything after the variable header. It is valid for a `PUBLISH` packet to contain a zero length payload.
    pub payload: Bytes,
}

impl Publish {

    const DUP_FLAG_MASK: u8 = 0b00001000;
    const RETAIN_FLAG_MASK: u8 = 0b00000001;
    const QOS_MASK: u8 = 0b00000110;

    /// The packet identifier is only included in the binary message if QoS is > 0.
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            header: Header::new(PacketType::PUBLISH, version),
            dup: false,
            qos: QoS::AtMostOnce,
            retain: false,
            topic: UTF8String::default(),
            payload: Bytes::new(),
        }
    }

    fn has_packet_id(&self) -> bool {
        self.qos != QoS::AtMostOnce
    }

    fn has_topic_alias(&self) -> bool {
        self.header.properties().is_some_and(|p| p.get(PropertyIdentifier::TopicAlias).is_some())
    }

    /// Returns a description of what is wrong with the topic, if anything.
    fn check_topic(&self) -> Option<&'static str> {
        if self.topic.as_str().contains(['+', '#']) {
            return Some("Topic name must not contain wildcards")
        }
        if self.topic.is_empty() && !self.has_topic_alias() {
            return Some("Topic name must not be empty without a topic alias")
        }
        None
    }
}

impl MqttControlPacket for Publish {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn flags(&self) -> u8 {
        let mut flags = u8::from(self.qos) << 1;
        if self.dup {
            flags |= Publish::DUP_FLAG_MASK;
        }
        if self.retain {
            flags |= Publish::RETAIN_FLAG_MASK;
        }
        flags
    }

    fn decode_flags(&mut self, flags: u8) -> Result<(), MqttError> {
        self.qos = QoS::try_from((flags & Publish::QOS_MASK) >> 1)?;
        self.dup = flags & Publish::DUP_FLAG_MASK != 0;
        self.retain = flags & Publish::RETAIN_FLAG_MASK != 0;

        if self.dup && self.qos == QoS::AtMostOnce {
            return Err(MqttError::MalformedPacket("DUP flag set on a QoS 0 PUBLISH".into()))
        }
        Ok(())
    }

    fn size(&self) -> usize {
        let packet_id_len = match self.has_packet_id() {
            true => 2,
            false => 0,
        };
        self.topic.encoded_len() + packet_id_len + self.header.properties_len() + self.payload.len()
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        self.topic = UTF8String::decode(src)?;
        if self.has_packet_id() {
            self.header.decode_packet_id(src)?;
        }
        self.header.decode_properties(src)?;

        // checked once the properties are known because of the topic alias
        if let Some(problem) = self.check_topic() {
            return Err(MqttError::ProtocolError(problem.into()))
        }

        self.payload = Bytes::copy_from_slice(src);
        src.advance(src.len());
        Ok(())
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        if self.has_packet_id() {
            self.header.check_packet_id()?;
        }
        if self.dup && !self.has_packet_id() {
            return Err(MqttError::InvalidArgument("DUP must not be set for QoS 0".into()))
        }
        if let Some(problem) = self.check_topic() {
            return Err(MqttError::InvalidArgument(problem.into()))
        }
        self.header.validate_properties()?;

        self.topic.encode(dst);
        if self.has_packet_id() {
            self.header.encode_packet_id(dst);
        }
        self.header.encode_properties(dst);
        dst.put_slice(&self.payload);
        Ok(())
    }
}
