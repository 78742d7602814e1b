//! A codec for MQTT 3.1.1 and MQTT 5.0 control packets, translating between raw bytes and typed messages.
//!
//! Whenever documentation in this crate refers to a section number, it refers to the official
//! [OASIS MQTTv5 standard](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html).
//!
//! The crate does no I/O: [packet::decode()] reads one packet from the start of a byte slice and [packet::encode()]
//! writes one into a caller-provided buffer. [codec::Codec] wraps both for use on a stream, adding a maximum packet
//! size and a way to tell an incomplete packet from a broken one.
//!
//! # Examples
//!
//! ```
//! use mqtt_codec::packet::{decode, encode, Message, MqttControlPacket, PacketType};
//! use mqtt_codec::types::{ProtocolVersion, ReasonCode};
//!
//! let mut msg = Message::new(ProtocolVersion::V50, PacketType::PUBACK).unwrap();
//! msg.packet_mut().set_packet_id(7);
//!
//! let mut buf = vec![0_u8; msg.encoded_len()];
//! encode(&msg, &mut buf).unwrap();
//! assert_eq!(vec![0x40, 0x02, 0x00, 0x07], buf);
//!
//! let (decoded, consumed) = decode(ProtocolVersion::V50, &buf).unwrap();
//! assert_eq!(4, consumed);
//! match decoded {
//!     Message::Puback(ack) => assert_eq!(ReasonCode::SUCCESS, ack.reason_code),
//!     els => panic!("unexpected message: {:?}", els),
//! }
//! ```
//!
//! Errors carry an [error::ErrorKind] to decide what to do next, and the number of bytes consumed when the error
//! occurred.
//!
//! The crate logs through [tracing](https://docs.rs/tracing) but never installs a subscriber.

pub mod codec;
pub mod error;
pub mod packet;
pub mod types;

pub use codec::Codec;
pub use error::{CodecError, ErrorKind, MqttError};
pub use packet::{decode, encode, Message};
pub use types::ProtocolVersion;
