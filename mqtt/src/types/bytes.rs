use bytes::{Buf, BufMut, Bytes};

use crate::error::MqttError;

use super::{require, MqttDataType};

const MAX_LENGTH: usize = u16::MAX as usize;
const LENGTH_FIELD_SIZE: usize = 2;

/// A simple wrapper around a sequence of bytes, prefixed with a two byte length when encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BinaryData {
    inner: Bytes,
}

impl BinaryData {

    /// Returns an `MqttError` if the data exceeds the maximum allowed number of bytes (65535).
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self, MqttError> {
        let inner = bytes.into();
        if inner.len() > MAX_LENGTH {
            return Err(MqttError::InvalidArgument("Max length for binary elements is 65535".to_string()));
        }

        Ok(BinaryData { inner })
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<BinaryData> for Bytes {
    fn from(src: BinaryData) -> Self {
        src.inner
    }
}

impl MqttDataType for BinaryData {

    /// The length of the binary data plus 2 bytes for the full binary representation in an MQTT packet.
    fn encoded_len(&self) -> usize {
        self.inner.len() + LENGTH_FIELD_SIZE
    }

    fn encode(&self, dst: &mut &mut [u8]) {
        dst.put_u16(self.inner.len() as u16);
        dst.put_slice(&self.inner);
    }

    fn decode(src: &mut &[u8]) -> Result<Self, MqttError> {
        require(src, LENGTH_FIELD_SIZE)?;
        let length = u16::from_be_bytes([src[0], src[1]]) as usize;
        require(src, LENGTH_FIELD_SIZE + length)?;

        src.advance(LENGTH_FIELD_SIZE);
        let inner = Bytes::copy_from_slice(&src[..length]);
        src.advance(length);

        Ok(BinaryData { inner })
    }
}
