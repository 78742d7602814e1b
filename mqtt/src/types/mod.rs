//! MQTT data types and representations.
//!
//! These types all map more or less to rust data types directly,
//! and exist as a bridge to the binary-level protocol.
//!
//! | MQTT type | rust type | Crate type | Description |
//! | --------- | --------- | ---------- | ----------- |
//! | Bits | [u8] | - | Big-Endian single byte |
//! | 2 Byte Int | [u16] | - | Unsigned 16-bit integer (Big-Endian) |
//! | 4 Byte Int | [u32] | - | Unsigned 32-bit integer (Big Endian) |
//! | Variable Byte Int | [u32] | [VariableByteInteger] | Unsigned big-endian integer represented from 8 to 28 bits, depending on the value |
//! | Binary Data | `Bytes` | [BinaryData] | A sequence of bytes, max length is 65,535 |
//! | UTF-8 String | [String] | [UTF8String] |Max length 65,535 bytes (not characters!) |
//! | UTF-8 String pair | (String, String) | [UTF8StringPair] | Length restrictions count per each individually |
//!
//! Where "wrapper" structs exists for their respective rust data types, it is for necessary additional logic in
//! encoding/decoding, such as the algorithm for [VariableByteInteger] or additional length bytes for
//! Strings and binary data.
//!
//! # Integers
//! The simpler integer types (`u8`, `u16`, `u32`) will use whatever Endianness the platform is using, however they
//! will always be Big-Endian in their encoded form.
//!
//! # Buffers
//! Decoding reads from a `&mut &[u8]` cursor that is advanced past every value read, encoding writes into a
//! caller-owned `&mut &mut [u8]` that is advanced the same way. Encoding never allocates and never checks for
//! space: callers size the destination with [MqttDataType::encoded_len] first.

mod bytes;
mod codes;
mod integer;
mod qos;
mod string;
mod version;

pub use self::bytes::BinaryData;
pub use self::codes::ReasonCode;
pub use self::integer::VariableByteInteger;
pub use self::qos::QoS;
pub use self::string::UTF8String;
pub use self::string::UTF8StringPair;
pub use self::version::ProtocolVersion;

use crate::error::MqttError;

/// A data type as defined by the MQTT standard.
pub trait MqttDataType: Sized {

    /// Returns the size in number of bytes that this type will use in a binary MQTT packet.
    fn encoded_len(&self) -> usize;

    /// Writes the binary representation to `dst` and advances it. `dst` must have at least
    /// [encoded_len()](Self::encoded_len) bytes left.
    fn encode(&self, dst: &mut &mut [u8]);

    /// Reads a value from the front of `src` and advances it past the bytes used.
    /// `src` is left untouched if an error is returned.
    fn decode(src: &mut &[u8]) -> Result<Self, MqttError>;
}

/// Returns an `InsufficientData` error if `src` is shorter than `needed`.
pub(crate) fn require(src: &[u8], needed: usize) -> Result<(), MqttError> {
    match src.len() < needed {
        true => Err(MqttError::insufficient(needed, src.len())),
        false => Ok(()),
    }
}
