use std::fmt::Display;

use bytes::{Buf, BufMut};

use crate::error::MqttError;

use super::{require, MqttDataType};

/// A String with a max length of 65,535 bytes (not characters!).
/// The encoded value also includes the length in two bytes.
/// See [MQTT-1.5.4](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901010).
///
/// The null character `U+0000` is not allowed anywhere in the string.
#[derive(Debug, Clone, Default, PartialEq, Hash, Eq)]
pub struct UTF8String {
    value: String,
}

/// Just two [UTF8String]s in a row.
/// See [the MQTT 5 standard](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901013).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UTF8StringPair {
    pub key: UTF8String,
    pub value: UTF8String,
}

impl UTF8String {

    const LENGTH_FIELD_SIZE: usize = 2;
    const MAX_LENGTH: usize = u16::MAX as usize;

    /// Returns an `InvalidArgument` error if `value` is too long or contains a null character.
    pub fn new(value: impl Into<String>) -> Result<Self, MqttError> {
        let value = value.into();
        Self::validate(&value).map_err(MqttError::InvalidArgument)?;
        Ok(UTF8String { value })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.len() > Self::MAX_LENGTH {
            return Err(format!("String exceeds 65535 bytes: {}", value.len()))
        }
        if value.contains('\u{0}') {
            return Err("String must not contain the null character".into())
        }
        Ok(())
    }
}

impl MqttDataType for UTF8String {

    fn encoded_len(&self) -> usize {
        Self::LENGTH_FIELD_SIZE + self.value.len()
    }

    fn encode(&self, dst: &mut &mut [u8]) {
        dst.put_u16(self.value.len() as u16);
        dst.put_slice(self.value.as_bytes());
    }

    fn decode(src: &mut &[u8]) -> Result<Self, MqttError> {
        require(src, Self::LENGTH_FIELD_SIZE)?;
        let length = u16::from_be_bytes([src[0], src[1]]) as usize;
        require(src, Self::LENGTH_FIELD_SIZE + length)?;

        let raw = &src[Self::LENGTH_FIELD_SIZE..Self::LENGTH_FIELD_SIZE + length];
        let value = match std::str::from_utf8(raw) {
            Ok(s) => s.to_owned(),
            Err(e) => return Err(MqttError::MalformedPacket(format!("Error decoding bytes to String: {}", e))),
        };
        Self::validate(&value).map_err(MqttError::MalformedPacket)?;

        src.advance(Self::LENGTH_FIELD_SIZE + length);
        Ok(UTF8String { value })
    }
}

impl TryFrom<String> for UTF8String {
    type Error = MqttError;

    fn try_from(val: String) -> Result<Self, Self::Error> {
        UTF8String::new(val)
    }
}

impl TryFrom<&str> for UTF8String {
    type Error = MqttError;

    fn try_from(val: &str) -> Result<Self, Self::Error> {
        UTF8String::new(val)
    }
}

impl From<UTF8String> for String {
    fn from(src: UTF8String) -> Self {
        src.value
    }
}

impl PartialEq<UTF8String> for String {
    fn eq(&self, other: &UTF8String) -> bool {
        self.eq(&other.value)
    }
}

impl PartialEq<&str> for UTF8String {
    fn eq(&self, other: &&str) -> bool {
        self.value.eq(other)
    }
}

impl Display for UTF8String {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

impl UTF8StringPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, MqttError> {
        Ok(UTF8StringPair { key: UTF8String::new(key)?, value: UTF8String::new(value)? })
    }
}

impl MqttDataType for UTF8StringPair {

    fn encoded_len(&self) -> usize {
        self.key.encoded_len() + self.value.encoded_len()
    }

    fn encode(&self, dst: &mut &mut [u8]) {
        self.key.encode(dst);
        self.value.encode(dst);
    }

    fn decode(src: &mut &[u8]) -> Result<Self, MqttError> {
        // work on a copy so a failing value leaves `src` where it was
        let mut cursor = *src;
        let key = UTF8String::decode(&mut cursor)?;
        let value = UTF8String::decode(&mut cursor)?;
        *src = cursor;
        Ok(UTF8StringPair { key, value })
    }
}
