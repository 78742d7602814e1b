use crate::{types::{MqttDataType, ProtocolVersion, QoS, UTF8String}, error::MqttError};

use super::{Header, MqttControlPacket, PacketType};

/// A `SUBSCRIBE` packet: a packet identifier, MQTT 5 properties and at least one [TopicFilter].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    header: Header,
    pub topic_filters: Vec<TopicFilter>,
}

/// A topic filter along with its subscription options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    pub filter: UTF8String,
    /// Defaults to [crate::types::QoS::AtMostOnce]
    pub maximum_qos: QoS,
    /// Default: `false`. MQTT 5 only.
    pub no_local: bool,
    /// Default: `false`. MQTT 5 only.
    pub retain_as_published: bool,
    /// Defaults to `0`. MQTT 5 only.
    pub retain_handling: RetainHandling,
}

/// Defines how retained messages are to be dealt with by the server.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd)]
pub enum RetainHandling {
    /// Sends retained messages directly on subscribe
    #[default]
    OnSubscribe = 0,
    /// Send only if this subscription does not yet exist
    NewSubOnly = 1,
    /// Self-explanatory
    Never = 2,
}

const QOS_MASK: u8 = 0b00000011;
const NO_LOCAL: u8 = 0b00000100;
const RETAIN_AS_PUBLISHED: u8 = 0b00001000;
const RETAIN_HANDLING_MASK: u8 = 0b00110000;
const RESERVED_V311: u8 = 0b11111100;
const RESERVED_V5: u8 = 0b11000000;

impl Subscribe {

    pub fn new(version: ProtocolVersion) -> Self {
        Subscribe { header: Header::new(PacketType::SUBSCRIBE, version), topic_filters: Vec::new() }
    }
}

impl TopicFilter {

    /// Creates a new filter with default options.
    pub fn new(filter: impl Into<String>) -> Result<Self, MqttError> {
        Ok(TopicFilter {
            filter: UTF8String::new(filter)?,
            maximum_qos: QoS::AtMostOnce,
            no_local: false,
            retain_as_published: false,
            retain_handling: RetainHandling::OnSubscribe,
        })
    }

    fn encoded_len(&self) -> usize {
        self.filter.encoded_len() + 1
    }

    fn options(&self) -> u8 {
        // setting bits 0 and 1 directly is just easier
        let mut options = u8::from(self.maximum_qos);

        if self.no_local {
            options |= NO_LOCAL;
        }

        if self.retain_as_published {
            options |= RETAIN_AS_PUBLISHED;
        }

        options | (self.retain_handling as u8) << 4
    }

    fn validate(&self, version: ProtocolVersion) -> Result<(), MqttError> {
        if self.filter.is_empty() {
            return Err(MqttError::InvalidArgument("Topic filter must not be empty".into()))
        }
        if !version.has_properties()
            && (self.no_local || self.retain_as_published || self.retain_handling != RetainHandling::OnSubscribe) {
            return Err(MqttError::InvalidArgument("Subscription options other than QoS require MQTT 5".into()))
        }
        Ok(())
    }

    fn encode(&self, dst: &mut &mut [u8]) {
        self.filter.encode(dst);
        self.options().encode(dst);
    }

    /// `src` is left at the start of the filter on error.
    fn decode(version: ProtocolVersion, src: &mut &[u8]) -> Result<Self, MqttError> {
        let mut cursor = *src;
        let filter = UTF8String::decode(&mut cursor)?;
        if filter.is_empty() {
            return Err(MqttError::ProtocolError("Topic filter must not be empty".into()))
        }

        let options = u8::decode(&mut cursor)?;
        let reserved = match version {
            ProtocolVersion::V311 => RESERVED_V311,
            ProtocolVersion::V50 => RESERVED_V5,
        };
        if options & reserved != 0 {
            return Err(MqttError::MalformedPacket(format!("Reserved bits set in subscription options: {:08b}", options)))
        }

        let maximum_qos = QoS::try_from(options & QOS_MASK)?;
        let no_local = options & NO_LOCAL != 0;
        let retain_as_published = options & RETAIN_AS_PUBLISHED != 0;
        let retain_handling = match (options & RETAIN_HANDLING_MASK) >> 4 {
            0 => RetainHandling::OnSubscribe,
            1 => RetainHandling::NewSubOnly,
            2 => RetainHandling::Never,
            els => return Err(MqttError::ProtocolError(format!("Illegal value for [retain handling]: {:?}", els)))
        };

        *src = cursor;
        Ok(Self {
            filter,
            maximum_qos,
            no_local,
            retain_as_published,
            retain_handling,
        })
    }
}

impl MqttControlPacket for Subscribe {

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
            return Err(MqttError::ProtocolError("SUBSCRIBE without topic filters".into()))
        }
        while !src.is_empty() {
            self.topic_filters.push(TopicFilter::decode(self.header.version, src)?);
        }
        Ok(())
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        self.header.check_packet_id()?;
        if self.topic_filters.is_empty() {
            return Err(MqttError::InvalidArgument("SUBSCRIBE requires at least one topic filter".into()))
        }
        for filter in &self.topic_filters {
            filter.validate(self.header.version)?;
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
