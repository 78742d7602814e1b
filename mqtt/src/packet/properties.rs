//! Properties can occur in almost any MQTT 5 control packet as well as the last will. Since all packets work on the
//! same (sub-) set of them, they're collected here. Which identifiers a packet may carry is decided by
//! [PropertyIdentifier::is_allowed_in()].

use crate::{
    error::MqttError,
    types::{BinaryData, MqttDataType, UTF8String, UTF8StringPair, VariableByteInteger},
};

use super::PacketType;

/// Numeric IDs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PropertyIdentifier {
    PayloadFormatIndicator = 1,
    MessageExpiryInterval = 2,
    ContentType = 3,
    ResponseTopic = 8,
    CorrelationData = 9,
    SubscriptionIdentifier = 11,
    SessionExpiryInterval = 17,
    AssignedClientIdentifier = 18,
    ServerKeepAlive = 19,
    AuthenticationMethod = 21,
    AuthenticationData = 22,
    RequestProblemInformation = 23,
    WillDelayInterval = 24,
    RequestResponseInformation = 25,
    ResponseInformation = 26,
    ServerReference = 28,
    ReasonString = 31,
    ReceiveMaximum = 33,
    TopicAliasMaximum = 34,
    TopicAlias = 35,
    MaximumQos = 36,
    RetainAvailable = 37,
    UserProperty = 38,
    MaximumPacketSize = 39,
    WildcardSubscriptionAvailable = 40,
    SubscriptionIdentifierAvailable = 41,
    SharedSubscriptionAvailable = 42,
}

/// Where a set of properties lives: in the variable header of a packet, or in the will section of a `CONNECT`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PropertyScope {
    Packet(PacketType),
    Will,
}

/// MQTT control packets may include optional properties as part of the variable header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttProperty {
    /// One of the defined IDs.
    pub identifier: PropertyIdentifier,

    /// A "container" for holding the actual data.
    pub value: DataRepresentation,
}

/// A wrapper around the actual datatypes so properties of different types can live in one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataRepresentation {
    /// Single byte value
    Byte(u8),

    /// Unsigned 16-bit integer
    TwoByteInt(u16),

    /// Unsigned 32-bit integer
    FourByteInt(u32),

    /// Variable Byte Integer, see `MQTT 1.5.5`
    VariByteInt(VariableByteInteger),

    /// UTF-8 String, with 16-bit length info.
    UTF8(UTF8String),

    /// Key-value pair
    UTF8Pair(UTF8StringPair),

    /// Binary data, with preceding 16-bit length info.
    BinaryData(BinaryData),
}

/// An ordered list of properties. Insertion order is kept when encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<MqttProperty>,
}

impl PropertyIdentifier {

    /// Whether this property may appear in `scope`. See the table in MQTT 5 section 2.2.2.2.
    pub fn is_allowed_in(&self, scope: PropertyScope) -> bool {
        use PacketType::*;
        use PropertyIdentifier::*;

        let packet_type = match scope {
            PropertyScope::Will => return matches!(self,
                PayloadFormatIndicator |
                MessageExpiryInterval |
                ContentType |
                ResponseTopic |
                CorrelationData |
                WillDelayInterval |
                UserProperty),
            PropertyScope::Packet(packet_type) => packet_type,
        };

        match self {
            PayloadFormatIndicator |
            MessageExpiryInterval |
            ContentType |
            ResponseTopic |
            CorrelationData |
            TopicAlias => packet_type == PUBLISH,
            SubscriptionIdentifier => matches!(packet_type, PUBLISH | SUBSCRIBE),
            SessionExpiryInterval => matches!(packet_type, CONNECT | CONNACK | DISCONNECT),
            AuthenticationMethod |
            AuthenticationData => matches!(packet_type, CONNECT | CONNACK | AUTH),
            RequestProblemInformation |
            RequestResponseInformation => packet_type == CONNECT,
            ReceiveMaximum |
            TopicAliasMaximum |
            MaximumPacketSize => matches!(packet_type, CONNECT | CONNACK),
            AssignedClientIdentifier |
            ServerKeepAlive |
            ResponseInformation |
            MaximumQos |
            RetainAvailable |
            WildcardSubscriptionAvailable |
            SubscriptionIdentifierAvailable |
            SharedSubscriptionAvailable => packet_type == CONNACK,
            ServerReference => matches!(packet_type, CONNACK | DISCONNECT),
            ReasonString => matches!(packet_type,
                CONNACK | PUBACK | PUBREC | PUBREL | PUBCOMP | SUBACK | UNSUBACK | DISCONNECT | AUTH),
            UserProperty => !matches!(packet_type, PINGREQ | PINGRESP),
            WillDelayInterval => false,
        }
    }

    /// User Property may always appear more than once, Subscription Identifier only in a `PUBLISH`.
    pub fn is_repeatable_in(&self, scope: PropertyScope) -> bool {
        match self {
            PropertyIdentifier::UserProperty => true,
            PropertyIdentifier::SubscriptionIdentifier => scope == PropertyScope::Packet(PacketType::PUBLISH),
            _ => false,
        }
    }

    fn is_repeatable_anywhere(&self) -> bool {
        matches!(self, PropertyIdentifier::UserProperty | PropertyIdentifier::SubscriptionIdentifier)
    }

    /// Whether `value` has the data type this property is defined with.
    pub fn accepts(&self, value: &DataRepresentation) -> bool {
        use PropertyIdentifier::*;

        match self {
            PayloadFormatIndicator |
            RequestProblemInformation |
            RequestResponseInformation |
            MaximumQos |
            RetainAvailable |
            WildcardSubscriptionAvailable |
            SubscriptionIdentifierAvailable |
            SharedSubscriptionAvailable => matches!(value, DataRepresentation::Byte(_)),
            ServerKeepAlive |
            ReceiveMaximum |
            TopicAliasMaximum |
            TopicAlias => matches!(value, DataRepresentation::TwoByteInt(_)),
            MessageExpiryInterval |
            SessionExpiryInterval |
            MaximumPacketSize |
            WillDelayInterval => matches!(value, DataRepresentation::FourByteInt(_)),
            ContentType |
            ResponseTopic |
            AssignedClientIdentifier |
            AuthenticationMethod |
            ResponseInformation |
            ServerReference |
            ReasonString => matches!(value, DataRepresentation::UTF8(_)),
            CorrelationData |
            AuthenticationData => matches!(value, DataRepresentation::BinaryData(_)),
            SubscriptionIdentifier => matches!(value, DataRepresentation::VariByteInt(_)),
            UserProperty => matches!(value, DataRepresentation::UTF8Pair(_)),
        }
    }

    fn decode_value(&self, src: &mut &[u8]) -> Result<DataRepresentation, MqttError> {
        use PropertyIdentifier::*;

        let value = match self {
            PayloadFormatIndicator |
            RequestProblemInformation |
            RequestResponseInformation |
            MaximumQos |
            RetainAvailable |
            WildcardSubscriptionAvailable |
            SubscriptionIdentifierAvailable |
            SharedSubscriptionAvailable => DataRepresentation::Byte(u8::decode(src)?),
            ServerKeepAlive |
            ReceiveMaximum |
            TopicAliasMaximum |
            TopicAlias => DataRepresentation::TwoByteInt(u16::decode(src)?),
            MessageExpiryInterval |
            SessionExpiryInterval |
            MaximumPacketSize |
            WillDelayInterval => DataRepresentation::FourByteInt(u32::decode(src)?),
            ContentType |
            ResponseTopic |
            AssignedClientIdentifier |
            AuthenticationMethod |
            ResponseInformation |
            ServerReference |
            ReasonString => DataRepresentation::UTF8(UTF8String::decode(src)?),
            CorrelationData |
            AuthenticationData => DataRepresentation::BinaryData(BinaryData::decode(src)?),
            SubscriptionIdentifier => DataRepresentation::VariByteInt(VariableByteInteger::decode(src)?),
            UserProperty => DataRepresentation::UTF8Pair(UTF8StringPair::decode(src)?),
        };

        Ok(value)
    }

    /// Range checks beyond the data type.
    fn check_value(&self, value: &DataRepresentation) -> Result<(), String> {
        use PropertyIdentifier::*;

        match (self, value) {
            (MaximumQos, DataRepresentation::Byte(qos)) if *qos > 1 => {
                Err(format!("illegal value for [{:?}]: {}", self, qos))
            },
            (PayloadFormatIndicator |
             RequestProblemInformation |
             RequestResponseInformation |
             RetainAvailable |
             WildcardSubscriptionAvailable |
             SubscriptionIdentifierAvailable |
             SharedSubscriptionAvailable, _) => bool::try_from(value).map(|_| ()).map_err(|e| format!("{:?}: {}", self, e)),
            (ReceiveMaximum | TopicAlias, DataRepresentation::TwoByteInt(0)) |
            (MaximumPacketSize, DataRepresentation::FourByteInt(0)) |
            (SubscriptionIdentifier, DataRepresentation::VariByteInt(VariableByteInteger { value: 0 })) => {
                Err(format!("[{:?}] must not be 0", self))
            },
            _ => Ok(()),
        }
    }
}

impl TryFrom<u32> for PropertyIdentifier {
    type Error = MqttError;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let result: PropertyIdentifier = match value {
            1 => Self::PayloadFormatIndicator,
            2 => Self::MessageExpiryInterval,
            3 => Self::ContentType,
            8 => Self::ResponseTopic,
            9 => Self::CorrelationData,
            11 => Self::SubscriptionIdentifier,
            17 => Self::SessionExpiryInterval,
            18 => Self::AssignedClientIdentifier,
            19 => Self::ServerKeepAlive,
            21 => Self::AuthenticationMethod,
            22 => Self::AuthenticationData,
            23 => Self::RequestProblemInformation,
            24 => Self::WillDelayInterval,
            25 => Self::RequestResponseInformation,
            26 => Self::ResponseInformation,
            28 => Self::ServerReference,
            31 => Self::ReasonString,
            33 => Self::ReceiveMaximum,
            34 => Self::TopicAliasMaximum,
            35 => Self::TopicAlias,
            36 => Self::MaximumQos,
            37 => Self::RetainAvailable,
            38 => Self::UserProperty,
            39 => Self::MaximumPacketSize,
            40 => Self::WildcardSubscriptionAvailable,
            41 => Self::SubscriptionIdentifierAvailable,
            42 => Self::SharedSubscriptionAvailable,
            _ => {
                return Err(MqttError::ProtocolError(format!(
                    "Unknown property identifier: {}",
                    value
                )))
            }
        };

        Ok(result)
    }
}

impl DataRepresentation {
    pub fn encoded_len(&self) -> usize {
        match self {
            DataRepresentation::Byte(v) => v.encoded_len(),
            DataRepresentation::TwoByteInt(v) => v.encoded_len(),
            DataRepresentation::FourByteInt(v) => v.encoded_len(),
            DataRepresentation::VariByteInt(v) => v.encoded_len(),
            DataRepresentation::UTF8(v) => v.encoded_len(),
            DataRepresentation::UTF8Pair(v) => v.encoded_len(),
            DataRepresentation::BinaryData(v) => v.encoded_len(),
        }
    }

    pub fn encode(&self, dst: &mut &mut [u8]) {
        match self {
            DataRepresentation::Byte(v) => v.encode(dst),
            DataRepresentation::TwoByteInt(v) => v.encode(dst),
            DataRepresentation::FourByteInt(v) => v.encode(dst),
            DataRepresentation::VariByteInt(v) => v.encode(dst),
            DataRepresentation::UTF8(v) => v.encode(dst),
            DataRepresentation::UTF8Pair(v) => v.encode(dst),
            DataRepresentation::BinaryData(v) => v.encode(dst),
        }
    }
}

impl TryFrom<&DataRepresentation> for bool {
    type Error = MqttError;

    fn try_from(value: &DataRepresentation) -> Result<Self, Self::Error> {
        match value {
            DataRepresentation::Byte(0) => Ok(false),
            DataRepresentation::Byte(1) => Ok(true),
            DataRepresentation::Byte(v) => Err(MqttError::ProtocolError(format!("illegal value for bool: {}", v))),
            _ => Err(MqttError::ProtocolError(format!("only DataRepresentation::Byte can be converted to bool. Is: {:?}", value))),
        }
    }
}

impl MqttProperty {

    fn identifier_len(&self) -> usize {
        VariableByteInteger { value: self.identifier as u32 }.encoded_len()
    }
}

impl MqttDataType for MqttProperty {
    fn encoded_len(&self) -> usize {
        self.identifier_len() + self.value.encoded_len()
    }

    fn encode(&self, dst: &mut &mut [u8]) {
        VariableByteInteger { value: self.identifier as u32 }.encode(dst);
        self.value.encode(dst);
    }

    /// Decodes a single property, without checking whether it is allowed anywhere.
    fn decode(src: &mut &[u8]) -> Result<Self, MqttError> {
        let mut cursor = *src;
        let identifier = PropertyIdentifier::try_from(VariableByteInteger::decode(&mut cursor)?.value)?;
        let value = identifier.decode_value(&mut cursor)?;
        *src = cursor;
        Ok(MqttProperty { identifier, value })
    }
}

impl Properties {

    pub fn new() -> Self {
        Properties::default()
    }

    /// Appends a property. Fails with `InvalidArgument` if the value has the wrong type or is out of range, or if a
    /// property that may never appear twice is already present.
    pub fn push(&mut self, identifier: PropertyIdentifier, value: DataRepresentation) -> Result<(), MqttError> {
        if !identifier.accepts(&value) {
            return Err(MqttError::InvalidArgument(format!("{:?} cannot hold {:?}", identifier, value)))
        }
        identifier.check_value(&value).map_err(MqttError::InvalidArgument)?;
        if !identifier.is_repeatable_anywhere() && self.get(identifier).is_some() {
            return Err(MqttError::InvalidArgument(format!("{:?} is already set", identifier)))
        }
        self.entries.push(MqttProperty { identifier, value });
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MqttProperty> {
        self.entries.iter()
    }

    /// The first value for `identifier`.
    pub fn get(&self, identifier: PropertyIdentifier) -> Option<&DataRepresentation> {
        self.get_all(identifier).next()
    }

    pub fn get_all(&self, identifier: PropertyIdentifier) -> impl Iterator<Item = &DataRepresentation> {
        self.entries.iter().filter(move |p| p.identifier == identifier).map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that every property is allowed in `scope` and that only repeatable ones occur more than once.
    pub fn validate(&self, scope: PropertyScope) -> Result<(), MqttError> {
        for (index, property) in self.entries.iter().enumerate() {
            if !property.identifier.is_allowed_in(scope) {
                return Err(not_allowed(property.identifier, scope))
            }
            if !property.identifier.is_repeatable_in(scope)
                && self.entries[..index].iter().any(|p| p.identifier == property.identifier) {
                return Err(duplicate(property.identifier, scope))
            }
        }
        Ok(())
    }

    fn content_len(&self) -> usize {
        self.entries.iter().map(|p| p.encoded_len()).sum()
    }

    /// Size of the whole block, including the length prefix.
    pub fn encoded_len(&self) -> usize {
        let content_len = self.content_len();
        VariableByteInteger { value: content_len as u32 }.encoded_len() + content_len
    }

    /// Writes the length prefix followed by every property in insertion order. Legality is not checked here, see
    /// [Properties::validate()].
    pub fn encode(&self, dst: &mut &mut [u8]) {
        VariableByteInteger { value: self.content_len() as u32 }.encode(dst);
        for property in &self.entries {
            property.encode(dst);
        }
    }

    /// Reads a length prefix and as many properties as fit in that length. `src` is left untouched on error.
    ///
    /// Unknown identifiers, identifiers not allowed in `scope`, out-of-range values and repeated singletons are
    /// protocol errors. A value reaching past the declared length means the length is wrong: malformed packet.
    pub fn decode(scope: PropertyScope, src: &mut &[u8]) -> Result<Self, MqttError> {
        let mut cursor = *src;
        let length = VariableByteInteger::decode(&mut cursor)?.value as usize;
        if cursor.len() < length {
            return Err(MqttError::insufficient(src.len() - cursor.len() + length, src.len()))
        }

        let mut block = &cursor[..length];
        let mut properties = Properties::default();

        while !block.is_empty() {
            let property = MqttProperty::decode(&mut block).map_err(overrun)?;
            let identifier = property.identifier;

            if !identifier.is_allowed_in(scope) {
                return Err(not_allowed(identifier, scope))
            }
            identifier.check_value(&property.value).map_err(MqttError::ProtocolError)?;
            if !identifier.is_repeatable_in(scope) && properties.get(identifier).is_some() {
                return Err(duplicate(identifier, scope))
            }

            properties.entries.push(property);
        }

        *src = &cursor[length..];
        Ok(properties)
    }
}

fn overrun(err: MqttError) -> MqttError {
    match err {
        MqttError::InsufficientData { .. } => MqttError::MalformedPacket("Property exceeds the property length".into()),
        other => other,
    }
}

fn not_allowed(identifier: PropertyIdentifier, scope: PropertyScope) -> MqttError {
    MqttError::ProtocolError(format!("{:?} is not allowed in {:?}", identifier, scope))
}

fn duplicate(identifier: PropertyIdentifier, scope: PropertyScope) -> MqttError {
    MqttError::ProtocolError(format!("{:?} included more than once in {:?}", identifier, scope))
}
