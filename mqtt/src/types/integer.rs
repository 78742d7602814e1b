use bytes::{Buf, BufMut};

use crate::error::MqttError;

use super::{require, MqttDataType};

/// MQTT-1.5.5
///
/// Seven bits of the value per byte, least significant group first, with the high bit of each byte signalling that
/// another one follows. At most four bytes, so the largest value is `268,435,455`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct VariableByteInteger {
    pub value: u32,
}

impl VariableByteInteger {

    /// `0xFF, 0xFF, 0xFF, 0x7F`
    pub const MAX: u32 = 268_435_455;

    const MAX_BYTES: usize = 4;
    const CONTINUATION: u8 = 0b10000000;
    const VALUE_MASK: u8 = 0b01111111;

    /// Returns an error if `value` exceeds [VariableByteInteger::MAX].
    pub fn new(value: u32) -> Result<Self, MqttError> {
        if value > Self::MAX {
            return Err(MqttError::InvalidArgument(
                format!("{} exceeds the maximum for a variable byte integer ({})", value, Self::MAX)))
        }
        Ok(VariableByteInteger { value })
    }

    /// Encodes `value` into `dst`, returning the number of bytes written.
    pub fn encode_into(value: u32, dst: &mut [u8]) -> Result<usize, MqttError> {
        let vbi = Self::new(value)?;
        let len = vbi.encoded_len();
        if dst.len() < len {
            return Err(MqttError::BufferTooSmall { needed: len, available: dst.len() })
        }
        let mut cursor = dst;
        vbi.encode(&mut cursor);
        Ok(len)
    }

    /// Decodes a value from the start of `src`, returning it along with the number of bytes it occupied.
    pub fn decode_from(src: &[u8]) -> Result<(u32, usize), MqttError> {
        let mut cursor = src;
        let vbi = Self::decode(&mut cursor)?;
        Ok((vbi.value, src.len() - cursor.len()))
    }
}

impl From<VariableByteInteger> for u32 {
    fn from(src: VariableByteInteger) -> Self {
        src.value
    }
}

impl MqttDataType for VariableByteInteger {

    fn encoded_len(&self) -> usize {
        match self.value {
            x if x <= 127 => 1,
            x if x <= 16383 => 2,
            x if x <= 2097151 => 3,
            _=> 4,
        }
    }

    /// Values above [VariableByteInteger::MAX] are truncated to 28 bits, use [VariableByteInteger::new()] to
    /// rule them out.
    fn encode(&self, dst: &mut &mut [u8]) {
        let mut val = self.value;
        for _ in 0..Self::MAX_BYTES {
            let mut byte = (val % 128) as u8;
            val /= 128;
            if val > 0 {
                byte |= Self::CONTINUATION;
            }
            dst.put_u8(byte);
            if val == 0 {
                break
            }
        }
    }

    /// Attempts to read an unsigned integer (between 7 and 28 bits) value from one to four bytes
    /// according to section 1.5.5 of the MQTT 5 standard.
    ///
    /// Running out of bytes before the last one is an `InsufficientData` error, a continuation bit on the fourth byte
    /// is a malformed packet.
    fn decode(src: &mut &[u8]) -> Result<Self, MqttError> {
        let mut value: u32 = 0;
        let mut multiplier: u32 = 1;

        for index in 0..Self::MAX_BYTES {
            let byte = match src.get(index) {
                Some(b) => *b,
                None => return Err(MqttError::insufficient(index + 1, src.len())),
            };

            value += (byte & Self::VALUE_MASK) as u32 * multiplier;

            // stop at the first byte where the MSB is not set
            if byte & Self::CONTINUATION == 0 {
                src.advance(index + 1);
                return Ok(VariableByteInteger { value })
            }
            multiplier *= 128;
        }

        Err(MqttError::MalformedPacket("Variable byte integer exceeds four bytes".into()))
    }
}

/*
  Blanket trait impls for standard rust types.
  These map to the MQTT types `Byte`, `Two Byte Integer` and `Four Byte Integer`
 */
impl MqttDataType for u8 {
    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, dst: &mut &mut [u8]) {
        dst.put_u8(*self)
    }

    fn decode(src: &mut &[u8]) -> Result<Self, MqttError> {
        require(src, 1)?;
        Ok(src.get_u8())
    }
}

impl MqttDataType for u16 {
    fn encoded_len(&self) -> usize {
        2
    }

    fn encode(&self, dst: &mut &mut [u8]) {
        dst.put_u16(*self)
    }

    fn decode(src: &mut &[u8]) -> Result<Self, MqttError> {
        require(src, 2)?;
        Ok(src.get_u16())
    }
}

impl MqttDataType for u32 {
    fn encoded_len(&self) -> usize {
        4
    }

    fn encode(&self, dst: &mut &mut [u8]) {
        dst.put_u32(*self)
    }

    fn decode(src: &mut &[u8]) -> Result<Self, MqttError> {
        require(src, 4)?;
        Ok(src.get_u32())
    }
}
