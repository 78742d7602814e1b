//! Representations of MQTT control packets.
//! Includes serialization and deserialization of packets into and from binary.
//!
//! Every packet type is its own struct implementing [MqttControlPacket], embedding a [Header] with the fields that
//! are common to all of them (packet type, protocol version, packet identifier and, for MQTT 5, properties). The
//! structs only deal with what follows the fixed header; [decode()] and [encode()] take care of the fixed header and
//! select the right struct via the closed [Message] enum.
//!
//! The protocol version is fixed when a message is created and decides which fields exist on the wire. Properties
//! are only accessible through [Header::properties()] and [Header::properties_mut()] which both refuse to hand them
//! out for MQTT 3.1.1.
//!
//! # Buffers
//! Decoding never reads past the declared remaining length: the body of a packet is handed to the struct as a slice
//! bounded by it. Encoding writes into a caller-owned buffer, use [Message::encoded_len()] to size it.

mod ack;
mod auth;
mod connack;
mod connect;
mod disconnect;
mod fixed_header;
mod ping;
mod properties;
mod publish;
mod suback;
mod subscribe;
mod unsuback;
mod unsub;

use std::fmt::Display;

use tracing::{debug, trace};

use crate::error::{CodecError, MqttError};
use crate::types::{MqttDataType, ProtocolVersion, ReasonCode, VariableByteInteger};

pub use self::ack::Ack;
pub use self::auth::Auth;
pub use self::connack::Connack;
pub use self::connect::{Connect, LastWill};
pub use self::disconnect::Disconnect;
pub use self::fixed_header::FixedHeader;
pub use self::ping::Ping;
pub use self::properties::{DataRepresentation, MqttProperty, Properties, PropertyIdentifier, PropertyScope};
pub use self::publish::Publish;
pub use self::suback::Suback;
pub use self::subscribe::{RetainHandling, Subscribe, TopicFilter};
pub use self::unsuback::Unsuback;
pub use self::unsub::Unsubscribe;

/// MQTT control packet types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PacketType {
    CONNECT = 1,
    CONNACK = 2,
    PUBLISH = 3,
    PUBACK = 4,
    PUBREC = 5,
    PUBREL = 6,
    PUBCOMP = 7,
    SUBSCRIBE = 8,
    SUBACK = 9,
    UNSUBSCRIBE = 10,
    UNSUBACK = 11,
    PINGREQ = 12,
    PINGRESP = 13,
    DISCONNECT = 14,
    AUTH = 15,
}

impl PacketType {

    /// The flags nibble every packet of this type must carry. `None` for `PUBLISH`, where the flags hold DUP, QoS
    /// and RETAIN.
    pub fn fixed_flags(&self) -> Option<u8> {
        match self {
            PacketType::PUBLISH => None,
            PacketType::PUBREL |
            PacketType::SUBSCRIBE |
            PacketType::UNSUBSCRIBE => Some(0b0010),
            _ => Some(0),
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = MqttError;

    /// Only looks at the upper four bits.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let shifted = value >> 4;

        match shifted {
            1 => Ok(PacketType::CONNECT),
            2 => Ok(PacketType::CONNACK),
            3 => Ok(PacketType::PUBLISH),
            4 => Ok(PacketType::PUBACK),
            5 => Ok(PacketType::PUBREC),
            6 => Ok(PacketType::PUBREL),
            7 => Ok(PacketType::PUBCOMP),
            8 => Ok(PacketType::SUBSCRIBE),
            9 => Ok(PacketType::SUBACK),
            10 => Ok(PacketType::UNSUBSCRIBE),
            11 => Ok(PacketType::UNSUBACK),
            12 => Ok(PacketType::PINGREQ),
            13 => Ok(PacketType::PINGRESP),
            14 => Ok(PacketType::DISCONNECT),
            15 => Ok(PacketType::AUTH),
            _=> Err(MqttError::MalformedPacket(format!("undefined packet type: {}", shifted))),
        }
    }
}

impl Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            PacketType::CONNECT => write!(f, "CONNECT"),
            PacketType::CONNACK => write!(f, "CONNACK"),
            PacketType::PUBLISH => write!(f, "PUBLISH"),
            PacketType::PUBACK => write!(f, "PUBACK"),
            PacketType::PUBREC => write!(f, "PUBREC"),
            PacketType::PUBREL => write!(f, "PUBREL"),
            PacketType::PUBCOMP => write!(f, "PUBCOMP"),
            PacketType::SUBSCRIBE => write!(f, "SUBSCRIBE"),
            PacketType::SUBACK => write!(f, "SUBACK"),
            PacketType::UNSUBSCRIBE => write!(f, "UNSUBSCRIBE"),
            PacketType::UNSUBACK => write!(f, "UNSUBACK"),
            PacketType::PINGREQ => write!(f, "PINGREQ"),
            PacketType::PINGRESP => write!(f, "PINGRESP"),
            PacketType::DISCONNECT => write!(f, "DISCONNECT"),
            PacketType::AUTH => write!(f, "AUTH"),
        }
    }
}

/// The fields every packet carries, whether or not they end up on the wire for its type and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    packet_type: PacketType,
    version: ProtocolVersion,
    /// `0` means "not set"
    packet_id: u16,
    properties: Properties,
}

impl Header {

    pub(crate) fn new(packet_type: PacketType, version: ProtocolVersion) -> Self {
        Header { packet_type, version, packet_id: 0, properties: Properties::default() }
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn packet_id(&self) -> u16 {
        self.packet_id
    }

    pub fn set_packet_id(&mut self, packet_id: u16) {
        self.packet_id = packet_id
    }

    /// `None` for MQTT 3.1.1.
    pub fn properties(&self) -> Option<&Properties> {
        match self.version.has_properties() {
            true => Some(&self.properties),
            false => None,
        }
    }

    /// Returns an `InvalidArgument` error for MQTT 3.1.1.
    pub fn properties_mut(&mut self) -> Result<&mut Properties, MqttError> {
        match self.version.has_properties() {
            true => Ok(&mut self.properties),
            false => Err(MqttError::InvalidArgument(format!("{} packets have no properties in MQTT 3.1.1", self.packet_type))),
        }
    }

    /// Size of the properties block including its length prefix, `0` for MQTT 3.1.1.
    pub(crate) fn properties_len(&self) -> usize {
        match self.version.has_properties() {
            true => self.properties.encoded_len(),
            false => 0,
        }
    }

    pub(crate) fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }

    pub(crate) fn validate_properties(&self) -> Result<(), MqttError> {
        self.properties.validate(PropertyScope::Packet(self.packet_type))
    }

    pub(crate) fn encode_properties(&self, dst: &mut &mut [u8]) {
        if self.version.has_properties() {
            self.properties.encode(dst)
        }
    }

    pub(crate) fn decode_properties(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        if self.version.has_properties() {
            self.properties = Properties::decode(PropertyScope::Packet(self.packet_type), src)?;
        }
        Ok(())
    }

    pub(crate) fn check_packet_id(&self) -> Result<(), MqttError> {
        match self.packet_id {
            0 => Err(MqttError::PacketIdZero),
            _ => Ok(()),
        }
    }

    pub(crate) fn encode_packet_id(&self, dst: &mut &mut [u8]) {
        self.packet_id.encode(dst)
    }

    /// Leaves `src` untouched if the identifier is missing or `0`.
    pub(crate) fn decode_packet_id(&mut self, src: &mut &[u8]) -> Result<(), MqttError> {
        let mut cursor = *src;
        let packet_id = u16::decode(&mut cursor)?;
        if packet_id == 0 {
            return Err(MqttError::ProtocolError(format!("{} with packet identifier 0", self.packet_type)))
        }
        self.packet_id = packet_id;
        *src = cursor;
        Ok(())
    }

    /// Size of an optional reason code followed by optional properties, in their shortest form.
    pub(crate) fn reason_tail_len(&self, reason_code: ReasonCode) -> usize {
        match (reason_code == ReasonCode::SUCCESS, self.has_properties()) {
            (true, false) => 0,
            (false, false) => 1,
            (_, true) => 1 + self.properties.encoded_len(),
        }
    }

    pub(crate) fn encode_reason_tail(&self, reason_code: ReasonCode, dst: &mut &mut [u8]) {
        if self.has_properties() {
            reason_code.encode(dst);
            self.properties.encode(dst);
        } else if reason_code != ReasonCode::SUCCESS {
            reason_code.encode(dst);
        }
    }

    /// Reads an optional reason code and optional properties, each present only if there are bytes left.
    /// A missing reason code means `Success`.
    pub(crate) fn decode_reason_tail(&mut self, src: &mut &[u8]) -> Result<ReasonCode, MqttError> {
        let code = match src.first() {
            Some(b) => ReasonCode(*b),
            None => return Ok(ReasonCode::SUCCESS),
        };
        if !code.is_valid_for_type(self.packet_type) {
            return Err(invalid_reason_code(self.version, self.packet_type, code))
        }
        *src = &src[1..];

        if !src.is_empty() {
            self.decode_properties(src)?;
        }
        Ok(code)
    }
}

/// The error for a reason code that is not allowed in an incoming packet. MQTT 3.1.1 refuses it as
/// "server unavailable", MQTT 5 treats it as a protocol error.
pub(crate) fn invalid_reason_code(version: ProtocolVersion, packet_type: PacketType, code: ReasonCode) -> MqttError {
    match version {
        ProtocolVersion::V311 => MqttError::ServerUnavailable(format!("Invalid return code for {}: 0x{:02X}", packet_type, code.0)),
        ProtocolVersion::V50 => MqttError::ProtocolError(format!("Invalid reason code for {}: 0x{:02X}", packet_type, code.0)),
    }
}

/// Common behavior for MQTT control packets.
///
/// Implementations only deal with the variable header and payload, the fixed header is handled by [decode()] and
/// [encode()]. Both directions take a buffer starting at the first byte after the fixed header.
pub trait MqttControlPacket {

    fn header(&self) -> &Header;

    fn header_mut(&mut self) -> &mut Header;

    fn packet_id(&self) -> u16 {
        self.header().packet_id()
    }

    fn set_packet_id(&mut self, packet_id: u16) {
        self.header_mut().set_packet_id(packet_id)
    }

    /// The lower four bits of the first byte.
    fn flags(&self) -> u8 {
        self.header().packet_type().fixed_flags().unwrap_or(0)
    }

    /// Applies the flags of an incoming fixed header. Fixed flags have already been checked at this point.
    fn decode_flags(&mut self, _flags: u8) -> Result<(), MqttError> {
        Ok(())
    }

    /// Encoded length of the variable header and payload, which is the packet's remaining length.
    fn size(&self) -> usize;

    /// Reads the variable header and payload from `src`, which holds exactly the packet's remaining length.
    /// On error `src` points at the first byte that was not accepted.
    fn decode_body(&mut self, src: &mut &[u8]) -> Result<(), MqttError>;

    /// Writes exactly [size()](Self::size) bytes. Fails before writing anything if the packet cannot be encoded.
    fn encode_body(&self, dst: &mut &mut [u8]) -> Result<(), MqttError>;

    /// Decodes the variable header and payload, returning the number of bytes consumed.
    fn decode_message(&mut self, src: &[u8]) -> Result<usize, CodecError> {
        let mut cursor = src;
        match self.decode_body(&mut cursor) {
            Ok(()) => Ok(src.len() - cursor.len()),
            Err(e) => Err(e.at(src.len() - cursor.len())),
        }
    }

    /// Encodes the variable header and payload, returning the number of bytes written.
    fn encode_message(&self, dst: &mut [u8]) -> Result<usize, CodecError> {
        let size = self.size();
        if dst.len() < size {
            return Err(MqttError::BufferTooSmall { needed: size, available: dst.len() }.at(0))
        }

        let mut cursor = &mut dst[..size];
        match self.encode_body(&mut cursor) {
            Ok(()) => {
                debug_assert!(cursor.is_empty(), "{} wrote less than its size", self.header().packet_type());
                Ok(size - cursor.len())
            },
            Err(e) => Err(e.at(size - cursor.len())),
        }
    }
}

/// One variant per [PacketType].
///
/// [Ack] and [Ping] serve several packet types. The packet inside a variant must be of that variant's type, which
/// [Message::new()] and [decode()] guarantee and [encode()] checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Connect(Connect),
    Connack(Connack),
    Publish(Publish),
    Puback(Ack),
    Pubrec(Ack),
    Pubrel(Ack),
    Pubcomp(Ack),
    Subscribe(Subscribe),
    Suback(Suback),
    Unsubscribe(Unsubscribe),
    Unsuback(Unsuback),
    Pingreq(Ping),
    Pingresp(Ping),
    Disconnect(Disconnect),
    Auth(Auth),
}

impl Message {

    /// An empty message of the given type, ready to be populated. `AUTH` does not exist in MQTT 3.1.1.
    pub fn new(version: ProtocolVersion, packet_type: PacketType) -> Result<Self, MqttError> {
        let message = match packet_type {
            PacketType::CONNECT => Message::Connect(Connect::new(version)),
            PacketType::CONNACK => Message::Connack(Connack::new(version)),
            PacketType::PUBLISH => Message::Publish(Publish::new(version)),
            PacketType::PUBACK => Message::Puback(Ack::new(packet_type, version)?),
            PacketType::PUBREC => Message::Pubrec(Ack::new(packet_type, version)?),
            PacketType::PUBREL => Message::Pubrel(Ack::new(packet_type, version)?),
            PacketType::PUBCOMP => Message::Pubcomp(Ack::new(packet_type, version)?),
            PacketType::SUBSCRIBE => Message::Subscribe(Subscribe::new(version)),
            PacketType::SUBACK => Message::Suback(Suback::new(version)),
            PacketType::UNSUBSCRIBE => Message::Unsubscribe(Unsubscribe::new(version)),
            PacketType::UNSUBACK => Message::Unsuback(Unsuback::new(version)),
            PacketType::PINGREQ => Message::Pingreq(Ping::new(packet_type, version)?),
            PacketType::PINGRESP => Message::Pingresp(Ping::new(packet_type, version)?),
            PacketType::DISCONNECT => Message::Disconnect(Disconnect::new(version)),
            PacketType::AUTH => Message::Auth(Auth::new(version)?),
        };
        Ok(message)
    }

    pub fn packet(&self) -> &dyn MqttControlPacket {
        match self {
            Message::Connect(p) => p,
            Message::Connack(p) => p,
            Message::Publish(p) => p,
            Message::Puback(p) |
            Message::Pubrec(p) |
            Message::Pubrel(p) |
            Message::Pubcomp(p) => p,
            Message::Subscribe(p) => p,
            Message::Suback(p) => p,
            Message::Unsubscribe(p) => p,
            Message::Unsuback(p) => p,
            Message::Pingreq(p) |
            Message::Pingresp(p) => p,
            Message::Disconnect(p) => p,
            Message::Auth(p) => p,
        }
    }

    pub fn packet_mut(&mut self) -> &mut dyn MqttControlPacket {
        match self {
            Message::Connect(p) => p,
            Message::Connack(p) => p,
            Message::Publish(p) => p,
            Message::Puback(p) |
            Message::Pubrec(p) |
            Message::Pubrel(p) |
            Message::Pubcomp(p) => p,
            Message::Subscribe(p) => p,
            Message::Suback(p) => p,
            Message::Unsubscribe(p) => p,
            Message::Unsuback(p) => p,
            Message::Pingreq(p) |
            Message::Pingresp(p) => p,
            Message::Disconnect(p) => p,
            Message::Auth(p) => p,
        }
    }

    pub fn header(&self) -> &Header {
        self.packet().header()
    }

    pub fn packet_type(&self) -> PacketType {
        self.header().packet_type()
    }

    fn variant_type(&self) -> PacketType {
        match self {
            Message::Connect(_) => PacketType::CONNECT,
            Message::Connack(_) => PacketType::CONNACK,
            Message::Publish(_) => PacketType::PUBLISH,
            Message::Puback(_) => PacketType::PUBACK,
            Message::Pubrec(_) => PacketType::PUBREC,
            Message::Pubrel(_) => PacketType::PUBREL,
            Message::Pubcomp(_) => PacketType::PUBCOMP,
            Message::Subscribe(_) => PacketType::SUBSCRIBE,
            Message::Suback(_) => PacketType::SUBACK,
            Message::Unsubscribe(_) => PacketType::UNSUBSCRIBE,
            Message::Unsuback(_) => PacketType::UNSUBACK,
            Message::Pingreq(_) => PacketType::PINGREQ,
            Message::Pingresp(_) => PacketType::PINGRESP,
            Message::Disconnect(_) => PacketType::DISCONNECT,
            Message::Auth(_) => PacketType::AUTH,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.header().version()
    }

    /// Number of bytes following the fixed header.
    pub fn remaining_length(&self) -> usize {
        self.packet().size()
    }

    /// Total number of bytes [encode()] will write, fixed header included.
    pub fn encoded_len(&self) -> usize {
        let remaining = self.remaining_length();
        1 + VariableByteInteger { value: remaining as u32 }.encoded_len() + remaining
    }
}

/// Decodes the first packet in `buf`, returning it along with the number of bytes it occupied.
///
/// Bytes following the packet are left alone. On error, the offset in the [CodecError] is relative to the start of
/// `buf`.
pub fn decode(version: ProtocolVersion, buf: &[u8]) -> Result<(Message, usize), CodecError> {
    match decode_packet(version, buf) {
        Ok((message, consumed)) => {
            trace!(packet_type = %message.packet_type(), %version, consumed, "decoded packet");
            Ok((message, consumed))
        },
        Err(err) => {
            debug!(kind = ?err.kind(), consumed = err.consumed, %version, "failed to decode packet: {}", err.error);
            Err(err)
        },
    }
}

fn decode_packet(version: ProtocolVersion, buf: &[u8]) -> Result<(Message, usize), CodecError> {
    let fixed = FixedHeader::decode(buf)?;

    if fixed.packet_type == PacketType::AUTH && !version.has_properties() {
        return Err(MqttError::ProtocolError("AUTH is not part of MQTT 3.1.1".into()).at(0))
    }

    let mut message = Message::new(version, fixed.packet_type).map_err(|e| e.at(0))?;
    message.packet_mut().decode_flags(fixed.flags).map_err(|e| e.at(0))?;

    let body = &buf[fixed.header_len..fixed.header_len + fixed.remaining_length];
    let consumed = message.packet_mut()
        .decode_message(body)
        .map_err(|e| e.shift(fixed.header_len))?;

    if consumed != fixed.remaining_length {
        return Err(MqttError::MalformedPacket(format!(
            "{} declares a remaining length of {} but only {} bytes belong to it",
            fixed.packet_type, fixed.remaining_length, consumed))
            .at(fixed.header_len + consumed))
    }

    Ok((message, fixed.header_len + consumed))
}

/// Encodes `message` into `dst`, returning the number of bytes written.
///
/// `dst` must hold at least [Message::encoded_len()] bytes.
pub fn encode(message: &Message, dst: &mut [u8]) -> Result<usize, CodecError> {
    match encode_packet(message, dst) {
        Ok(written) => {
            trace!(packet_type = %message.packet_type(), version = %message.version(), written, "encoded packet");
            Ok(written)
        },
        Err(err) => {
            debug!(kind = ?err.kind(), packet_type = %message.packet_type(), "failed to encode packet: {}", err.error);
            Err(err)
        },
    }
}

fn encode_packet(message: &Message, dst: &mut [u8]) -> Result<usize, CodecError> {
    if message.variant_type() != message.packet_type() {
        return Err(MqttError::InvalidArgument(format!(
            "{} packet cannot be sent as {}", message.packet_type(), message.variant_type()))
            .at(0))
    }
    let packet = message.packet();
    let remaining = packet.size();
    if remaining > VariableByteInteger::MAX as usize {
        return Err(MqttError::InvalidArgument(format!("Packet too large: {} bytes", remaining)).at(0))
    }

    let remaining_length = VariableByteInteger { value: remaining as u32 };
    let header_len = 1 + remaining_length.encoded_len();
    let total = header_len + remaining;
    if dst.len() < total {
        return Err(MqttError::BufferTooSmall { needed: total, available: dst.len() }.at(0))
    }

    let (head, body) = dst.split_at_mut(header_len);
    let mut cursor = head;
    ((message.packet_type() as u8) << 4 | packet.flags()).encode(&mut cursor);
    remaining_length.encode(&mut cursor);

    let written = packet.encode_message(body).map_err(|e| e.shift(header_len))?;
    Ok(header_len + written)
}
