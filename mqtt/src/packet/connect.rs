use bytes::Bytes;

use crate::{types::{BinaryData, MqttDataType, ProtocolVersion, QoS, UTF8String}, error::MqttError};

use super::{Header, MqttControlPacket, PacketType, Properties, PropertyScope};

const PROTOCOL_NAME: &str = "MQTT";
// two bytes length, "MQTT", protocol level, connect flags, keep alive
const FIXED_VARIABLE_HEADER_LEN: usize = 2 + 4 + 1 + 1 + 2;

const USER_NAME_FLAG: u8 = 0b10000000;
const PASSWORD_FLAG: u8 = 0b01000000;
const WILL_RETAIN_FLAG: u8 = 0b00100000;
const WILL_QOS_MASK: u8 = 0b00011000;
const WILL_FLAG: u8 = 0b00000100;
const CLEAN_START_FLAG: u8 = 0b00000010;
const RESERVED_FLAG: u8 = 0b00000001;

/// The first packet a client sends after establishing a network connection.
///
/// # Examples
///
/// ```
/// use mqtt_codec::packet::{Connect, LastWill};
/// use mqtt_codec::types::{ProtocolVersion, QoS};
///
/// let mut connect = Connect::new(ProtocolVersion::V50);
/// connect.client_id = "my-client".try_into().unwrap();
/// connect.keep_alive = 30;
///
/// let mut will = LastWill::new("/clients/my-client/status", "gone").unwrap();
/// will.qos = QoS::AtLeastOnce;
/// connect.will = Some(will);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    header: Header,

    /// Called "clean session" in MQTT 3.1.1. Defaults to `true`.
    pub clean_start: bool,

    /// Maximum interval in seconds between two control packets sent by the client. `0` turns the mechanism off.
    pub keep_alive: u16,

    /// May be empty, in which case the server assigns one.
    pub client_id: UTF8String,

    /// Message the server publishes when the connection ends without a `DISCONNECT`.
    pub will: Option<LastWill>,

    pub user_name: Option<UTF8String>,

    pub password: Option<BinaryData>,
}

/// The will message of a [Connect].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastWill {
    pub qos: QoS,
    pub retain: bool,
    pub topic: UTF8String,
    pub payload: BinaryData,
    /// Will properties, MQTT 5 only.
    pub properties: Properties,
}

impl LastWill {

    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Result<Self, MqttError> {
        Ok(LastWill {
            qos: QoS::AtMostOnce,
            retain: false,
            topic: UTF8String::new(topic)?,
            payload: BinaryData::new(payload)?,
            properties: Properties::default(),
        })
    }

    fn encoded_len(&self, version: ProtocolVersion) -> usize {
        let properties_len = match version.has_properties() {
            true => self.properties.encoded_len(),
            false => 0,
        };
        properties_len + self.topic.encoded_len() + self.payload.encoded_len()
    }

    fn flags(&self) -> u8 {
        let mut flags = WILL_FLAG | u8::from(self.qos) << 3;
        if self.retain {
            flags |= WILL_RETAIN_FLAG;
        }
        flags
    }

    fn validate(&self, version: ProtocolVersion) -> Result<(), MqttError> {
        if self.topic.is_empty() || self.topic.as_str().contains(['+', '#']) {
            return Err(MqttError::InvalidArgument(format!("Invalid will topic: '{}'", self.topic)))
        }
        match version.has_properties() {
            true => self.properties.validate(PropertyScope::Will),
            false if !self.properties.is_empty() => {
                Err(MqttError::InvalidArgument("Will properties require MQTT 5".into()))
            },
            false => Ok(()),
        }
    }

    fn encode(&self, version: ProtocolVersion, dst: &mut &mut [u8]) {
        if version.has_properties() {
            self.properties.encode(dst);
        }
        self.topic.encode(dst);
        self.payload.encode(dst);
    }

    fn decode(version: ProtocolVersion, flags: u8, src: &mut &[u8]) -> Result<Self, MqttError> {
        let properties = match version.has_properties() {
            true => Properties::decode(PropertyScope::Will, src)?,
            false => Properties::default(),
        };
        let topic = UTF8String::decode(src)?;
        let payload = BinaryData::decode(src)?;

        Ok(LastWill {
            qos: QoS::try_from((flags & WILL_QOS_MASK) >> 3)?,
            retain: flags & WILL_RETAIN_FLAG != 0,
            topic,
            payload,
            properties,
        })
    }
}

impl Connect {

    pub fn new(version: ProtocolVersion) -> Self {
        Connect {
            header: Header::new(PacketType::CONNECT, version),
            clean_start: true,
            keep_alive: 0,
            client_id: UTF8String::default(),
            will: None,
            user_name: None,
            password: None,
        }
    }

    fn connect_flags(&self) -> u8 {
        let mut flags = match &self.will {
            Some(will) => will.flags(),
            None => 0,
        };
        if self.clean_start {
            flags |= CLEAN_START_FLAG;
        }
        if self.user_name.is_some() {
            flags |= USER_NAME_FLAG;
        }
        if self.password.is_some() {
            flags |= PASSWORD_FLAG;
        }
        flags
    }

    /// Reads and checks the protocol name and level. `src` is left untouched on error.
    fn decode_protocol(&self, src: &mut &[u8]) -> Result<(), MqttError> {
        let mut cursor = *src;
        let name = UTF8String::decode(&mut cursor)?;
        if name != PROTOCOL_NAME {
            return Err(MqttError::ProtocolError(format!("Unknown protocol name: {}", name)))
        }
        let level = u8::decode(&mut cursor)?;
        if level != u8::from(self.header.version) {
            return Err(MqttError::ProtocolError(format!(
                "Protocol level {} does not match version {}", level, self.header.version)))
        }
        *src = cursor;
        Ok(())
    }

    /// Checks the connect flags for reserved and inconsistent bits. `src` is left untouched on error.
    fn decode_connect_flags(&self, src: &mut &[u8]) -> Result<u8, MqttError> {
        let mut cursor = *src;
        let flags = u8::decode(&mut cursor)?;

        if flags & RESERVED_FLAG != 0 {
            return Err(MqttError::MalformedPacket("Reserved connect flag is set".into()))
        }
        if flags & WILL_FLAG == 0 && flags & (WILL_QOS_MASK | WILL_RETAIN_FLAG) != 0 {
            return Err(MqttError::MalformedPacket("Will QoS or retain set without a will".into()))
        }
        if flags & WILL_QOS_MASK == WILL_QOS_MASK {
            return Err(MqttError::MalformedPacket("Will QoS 3".into()))
        }
        if !self.header.version.has_properties() && flags & PASSWORD_FLAG != 0 && flags & USER_NAME_FLAG == 0 {
            return Err(MqttError::MalformedPacket("Password without user name".into()))
        }

        *src = cursor;
        Ok(flags)
    }
}

impl MqttControlPacket for Connect {

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn size(&self) -> usize {
        let version = self.header.version;
        FIXED_VARIABLE_HEADER_LEN
            + self.header.properties_len()
            + self.client_id.encoded_len()
            + self.will.as_ref().map_or(0, |w| w.encoded_len(version))
            + self.user_name.as_ref().map_or(0, |u| u.encoded_len())
            + self.password.as_ref().map_or(0, |p| p.encoded_len())
    }

    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        self.decode_protocol(src)?;
        let flags = self.decode_connect_flags(src)?;
        self.clean_start = flags & CLEAN_START_FLAG != 0;
        self.keep_alive = u16::decode(src)?;
        self.header.decode_properties(src)?;

        self.client_id = UTF8String::decode(src)?;
        if flags & WILL_FLAG != 0 {
            self.will = Some(LastWill::decode(self.header.version, flags, src)?);
        }
        if flags & USER_NAME_FLAG != 0 {
            self.user_name = Some(UTF8String::decode(src)?);
        }
        if flags & PASSWORD_FLAG != 0 {
            self.password = Some(BinaryData::decode(src)?);
        }
        Ok(())
    }

    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError> {
        let version = self.header.version;
        if !version.has_properties() && self.password.is_some() && self.user_name.is_none() {
            return Err(MqttError::InvalidArgument("MQTT 3.1.1 requires a user name along with a password".into()))
        }
        if let Some(will) = &self.will {
            will.validate(version)?;
        }
        self.header.validate_properties()?;

        UTF8String::new(PROTOCOL_NAME)?.encode(dst);
        u8::from(version).encode(dst);
        self.connect_flags().encode(dst);
        self.keep_alive.encode(dst);
        self.header.encode_properties(dst);

        self.client_id.encode(dst);
        if let Some(will) = &self.will {
            will.encode(version, dst);
        }
        if let Some(user_name) = &self.user_name {
            user_name.encode(dst);
        }
        if let Some(password) = &self.password {
            password.encode(dst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use crate::error::ErrorKind;
    use crate::packet::{decode, encode, DataRepresentation, Message, PropertyIdentifier};

    use super::*;

    const MINIMAL_V311: [u8; 17] = [0x10, 15, 0, 4, 77, 81, 84, 84, 4, 0b00000010, 0, 60, 0, 3, 97, 98, 99];

    fn encode_to_vec(connect: Connect) -> Vec<u8> {
        let msg = Message::Connect(connect);
        let mut buf = vec![0_u8; msg.encoded_len()];
        assert_eq!(Ok(buf.len()), encode(&msg, &mut buf));
        buf
    }

    fn decode_connect(version: ProtocolVersion, binary: &[u8]) -> Connect {
        match decode(version, binary).unwrap() {
            (Message::Connect(c), consumed) => {
                assert_eq!(binary.len(), consumed);
                c
            },
            (els, _) => panic!("not a CONNECT: {:?}", els),
        }
    }

    #[test]
    fn encode_minimal() {
        let mut connect = Connect::new(ProtocolVersion::V311);
        connect.client_id = UTF8String::new("abc").unwrap();
        connect.keep_alive = 60;
        assert_eq!(MINIMAL_V311.to_vec(), encode_to_vec(connect));
    }

    #[test]
    fn decode_minimal() {
        let connect = decode_connect(ProtocolVersion::V311, &MINIMAL_V311);
        assert!(connect.clean_start);
        assert_eq!(60, connect.keep_alive);
        assert_eq!(connect.client_id, "abc");
        assert!(connect.will.is_none());
        assert!(connect.user_name.is_none());
        assert!(connect.password.is_none());
    }

    #[test]
    fn all_fields_v5() {
        let binary = [
            0x10, 38,
            0, 4, 77, 81, 84, 84, 5, 0xEE, 0, 10,
            5, 17, 0, 0, 0, 30,
            0, 1, 99,
            5, 24, 0, 0, 0, 10, 0, 1, 119, 0, 2, 1, 2,
            0, 1, 117,
            0, 1, 9,
        ];

        let connect = decode_connect(ProtocolVersion::V50, &binary);
        assert_eq!(10, connect.keep_alive);
        assert_eq!(
            Some(&DataRepresentation::FourByteInt(30)),
            connect.header().properties().unwrap().get(PropertyIdentifier::SessionExpiryInterval)
        );
        let will = connect.will.as_ref().unwrap();
        assert_eq!(QoS::AtLeastOnce, will.qos);
        assert!(will.retain);
        assert_eq!(will.topic, "w");
        assert_eq!(&[1_u8, 2][..], &will.payload.as_bytes()[..]);
        assert_eq!(Some(&DataRepresentation::FourByteInt(10)), will.properties.get(PropertyIdentifier::WillDelayInterval));
        assert_eq!(Some(UTF8String::new("u").unwrap()), connect.user_name);
        assert_eq!(Some(BinaryData::new(vec![9]).unwrap()), connect.password);

        assert_eq!(binary.to_vec(), encode_to_vec(connect));
    }

    #[test]
    fn protocol_name_and_level() {
        let mut binary = MINIMAL_V311;
        binary[7] = 88;
        let err = decode(ProtocolVersion::V311, &binary).unwrap_err();
        assert_eq!(ErrorKind::ProtocolError, err.kind());
        assert_eq!(2, err.consumed);

        // a 3.1.1 CONNECT handed to a 5.0 decoder
        let err = decode(ProtocolVersion::V50, &MINIMAL_V311).unwrap_err();
        assert_eq!(ErrorKind::ProtocolError, err.kind());
    }

    #[test]
    fn invalid_flags() {
        for flags in [0b00000011, 0b00001010, 0b00100010, 0b01000010, 0b00011110] {
            let mut binary = MINIMAL_V311;
            binary[9] = flags;
            let err = decode(ProtocolVersion::V311, &binary).unwrap_err();
            assert_eq!(ErrorKind::MalformedPacket, err.kind(), "flags {:08b}", flags);
            assert_eq!(9, err.consumed);
        }
    }

    #[test]
    fn truncated_payload() {
        // user name flag set, but no user name follows
        let mut binary = MINIMAL_V311;
        binary[9] = 0b10000010;
        let err = decode(ProtocolVersion::V311, &binary).unwrap_err();
        assert_eq!(ErrorKind::InsufficientData, err.kind());
    }

    #[test]
    fn encode_invalid() {
        let mut connect = Connect::new(ProtocolVersion::V311);
        connect.password = Some(BinaryData::new(vec![1]).unwrap());
        assert_eq!(ErrorKind::InvalidArgument, encode(&Message::Connect(connect), &mut [0; 32]).unwrap_err().kind());

        let mut connect = Connect::new(ProtocolVersion::V311);
        let mut will = LastWill::new("a/b", "x").unwrap();
        will.properties.push(PropertyIdentifier::WillDelayInterval, DataRepresentation::FourByteInt(5)).unwrap();
        connect.will = Some(will);
        assert_eq!(ErrorKind::InvalidArgument, encode(&Message::Connect(connect), &mut [0; 32]).unwrap_err().kind());

        let mut connect = Connect::new(ProtocolVersion::V50);
        let mut will = LastWill::new("a/b", "x").unwrap();
        will.properties.push(PropertyIdentifier::SessionExpiryInterval, DataRepresentation::FourByteInt(5)).unwrap();
        connect.will = Some(will);
        assert_eq!(ErrorKind::ProtocolError, encode(&Message::Connect(connect), &mut [0; 32]).unwrap_err().kind());
    }
}
