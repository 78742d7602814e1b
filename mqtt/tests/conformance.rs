use mqtt_codec::error::{ErrorKind, MqttError};
use mqtt_codec::packet::{
    decode, encode, DataRepresentation, LastWill, Message, MqttControlPacket, PacketType, PropertyIdentifier,
    TopicFilter,
};
use mqtt_codec::types::{BinaryData, ProtocolVersion, QoS, ReasonCode, UTF8String, UTF8StringPair, VariableByteInteger};

use proptest::prelude::*;

const VERSIONS: [ProtocolVersion; 2] = [ProtocolVersion::V311, ProtocolVersion::V50];

fn encode_to_vec(msg: &Message) -> Vec<u8> {
    let mut buf = vec![0_u8; msg.encoded_len()];
    let written = encode(msg, &mut buf).unwrap();
    assert_eq!(buf.len(), written, "{} wrote fewer bytes than announced", msg.packet_type());
    buf
}

fn user_property(msg: &mut Message, key: &str, value: &str) {
    msg.packet_mut().header_mut().properties_mut().unwrap()
        .push(PropertyIdentifier::UserProperty, DataRepresentation::UTF8Pair(UTF8StringPair::new(key, value).unwrap()))
        .unwrap();
}

/// At least one populated message of every type the version knows about.
fn sample_messages(version: ProtocolVersion) -> Vec<Message> {
    let v5 = version.has_properties();
    let mut messages = Vec::new();

    let mut msg = Message::new(version, PacketType::CONNECT).unwrap();
    if let Message::Connect(connect) = &mut msg {
        connect.client_id = UTF8String::new("conformance").unwrap();
        connect.keep_alive = 120;
        let mut will = LastWill::new("clients/conformance", "offline").unwrap();
        will.qos = QoS::ExactlyOnce;
        will.retain = true;
        if v5 {
            will.properties.push(PropertyIdentifier::WillDelayInterval, DataRepresentation::FourByteInt(60)).unwrap();
        }
        connect.will = Some(will);
        connect.user_name = Some(UTF8String::new("user").unwrap());
        connect.password = Some(BinaryData::new(vec![1, 2, 3]).unwrap());
    }
    if v5 {
        user_property(&mut msg, "k", "v");
    }
    messages.push(msg);

    let mut msg = Message::new(version, PacketType::CONNACK).unwrap();
    if let Message::Connack(connack) = &mut msg {
        connack.session_present = true;
    }
    messages.push(msg);

    let mut msg = Message::new(version, PacketType::CONNACK).unwrap();
    if let Message::Connack(connack) = &mut msg {
        connack.reason_code = match v5 {
            true => ReasonCode::BANNED,
            false => ReasonCode::REFUSED_IDENTIFIER_REJECTED,
        };
    }
    messages.push(msg);

    for qos in [QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce] {
        let mut msg = Message::new(version, PacketType::PUBLISH).unwrap();
        if let Message::Publish(publish) = &mut msg {
            publish.topic = UTF8String::new("sensors/temperature").unwrap();
            publish.payload = vec![21_u8, 5].into();
            publish.qos = qos;
            publish.retain = qos == QoS::ExactlyOnce;
            if qos != QoS::AtMostOnce {
                publish.dup = true;
                publish.set_packet_id(4711);
            }
        }
        if v5 {
            msg.packet_mut().header_mut().properties_mut().unwrap()
                .push(PropertyIdentifier::ContentType, DataRepresentation::UTF8(UTF8String::new("text/plain").unwrap()))
                .unwrap();
        }
        messages.push(msg);
    }

    for packet_type in [PacketType::PUBACK, PacketType::PUBREC, PacketType::PUBREL, PacketType::PUBCOMP] {
        let mut msg = Message::new(version, packet_type).unwrap();
        msg.packet_mut().set_packet_id(65535);
        messages.push(msg);
    }
    if v5 {
        let mut msg = Message::new(version, PacketType::PUBACK).unwrap();
        msg.packet_mut().set_packet_id(3);
        if let Message::Puback(ack) = &mut msg {
            ack.reason_code = ReasonCode::NO_MATCHING_SUBSCRIBERS;
        }
        messages.push(msg);

        let mut msg = Message::new(version, PacketType::PUBREL).unwrap();
        msg.packet_mut().set_packet_id(4);
        user_property(&mut msg, "trace", "1");
        messages.push(msg);
    }

    let mut msg = Message::new(version, PacketType::SUBSCRIBE).unwrap();
    msg.packet_mut().set_packet_id(9);
    if let Message::Subscribe(subscribe) = &mut msg {
        let mut filter = TopicFilter::new("sensors/+/temperature").unwrap();
        filter.maximum_qos = QoS::AtLeastOnce;
        if v5 {
            filter.no_local = true;
        }
        subscribe.topic_filters.push(filter);
        subscribe.topic_filters.push(TopicFilter::new("alerts/#").unwrap());
    }
    messages.push(msg);

    let mut msg = Message::new(version, PacketType::SUBACK).unwrap();
    msg.packet_mut().set_packet_id(9);
    if let Message::Suback(suback) = &mut msg {
        suback.add_return_codes([ReasonCode::GRANTED_QOS_1, ReasonCode::SUBACK_FAILURE]).unwrap();
    }
    messages.push(msg);

    let mut msg = Message::new(version, PacketType::UNSUBSCRIBE).unwrap();
    msg.packet_mut().set_packet_id(10);
    if let Message::Unsubscribe(unsubscribe) = &mut msg {
        unsubscribe.topic_filters.push(UTF8String::new("alerts/#").unwrap());
    }
    messages.push(msg);

    let mut msg = Message::new(version, PacketType::UNSUBACK).unwrap();
    msg.packet_mut().set_packet_id(10);
    if let Message::Unsuback(unsuback) = &mut msg {
        if v5 {
            unsuback.add_reason_code(ReasonCode::NO_SUBSCRIPTION_EXISTED).unwrap();
        }
    }
    messages.push(msg);

    messages.push(Message::new(version, PacketType::PINGREQ).unwrap());
    messages.push(Message::new(version, PacketType::PINGRESP).unwrap());
    messages.push(Message::new(version, PacketType::DISCONNECT).unwrap());

    if v5 {
        let mut msg = Message::new(version, PacketType::DISCONNECT).unwrap();
        if let Message::Disconnect(disconnect) = &mut msg {
            disconnect.reason_code = ReasonCode::SERVER_SHUTTING_DOWN;
        }
        messages.push(msg);

        messages.push(Message::new(version, PacketType::AUTH).unwrap());

        let mut msg = Message::new(version, PacketType::AUTH).unwrap();
        if let Message::Auth(auth) = &mut msg {
            auth.reason_code = ReasonCode::CONTINUE_AUTHENTICATION;
        }
        msg.packet_mut().header_mut().properties_mut().unwrap()
            .push(PropertyIdentifier::AuthenticationMethod, DataRepresentation::UTF8(UTF8String::new("SCRAM-SHA-1").unwrap()))
            .unwrap();
        messages.push(msg);
    }

    messages
}

#[test]
fn round_trip() {
    for version in VERSIONS {
        for msg in sample_messages(version) {
            let encoded = encode_to_vec(&msg);
            let (decoded, consumed) = decode(version, &encoded)
                .unwrap_or_else(|e| panic!("{} under {} failed to decode: {}", msg.packet_type(), version, e));
            assert_eq!(encoded.len(), consumed);
            assert_eq!(msg, decoded, "{} under {}", msg.packet_type(), version);
        }
    }
}

#[test]
fn idempotent_re_decode() {
    for version in VERSIONS {
        for msg in sample_messages(version) {
            let original = encode_to_vec(&msg);

            let (first, _) = decode(version, &original).unwrap();
            let first_encoded = encode_to_vec(&first);
            let (second, _) = decode(version, &first_encoded).unwrap();
            let second_encoded = encode_to_vec(&second);

            assert_eq!(original, first_encoded);
            assert_eq!(first_encoded, second_encoded);
            assert_eq!(first, second);
        }
    }
}

#[test]
fn variable_byte_integer_boundaries() {
    let cases: [(u32, usize); 8] = [
        (0, 1), (127, 1), (128, 2), (16_383, 2), (16_384, 3), (2_097_151, 3), (2_097_152, 4), (268_435_455, 4)
    ];
    for (value, expected_len) in cases {
        let mut buf = [0_u8; 4];
        assert_eq!(Ok(expected_len), VariableByteInteger::encode_into(value, &mut buf), "value {}", value);
        assert_eq!(Ok((value, expected_len)), VariableByteInteger::decode_from(&buf[..expected_len]));
    }

    let mut buf = [0_u8; 8];
    let err = VariableByteInteger::encode_into(268_435_456, &mut buf).unwrap_err();
    assert_eq!(ErrorKind::InvalidArgument, err.kind());
}

#[test]
fn packet_id_zero_rejected() {
    for version in VERSIONS {
        for packet_type in [
            PacketType::PUBACK, PacketType::PUBREC, PacketType::PUBREL, PacketType::PUBCOMP,
            PacketType::SUBSCRIBE, PacketType::SUBACK, PacketType::UNSUBSCRIBE, PacketType::UNSUBACK,
        ] {
            let msg = Message::new(version, packet_type).unwrap();
            let mut buf = [0_u8; 16];
            let err = encode(&msg, &mut buf).unwrap_err();
            assert_eq!(ErrorKind::InvalidArgument, err.kind(), "{} under {}", packet_type, version);
            assert_eq!(MqttError::PacketIdZero, err.error);
        }
    }
}

#[test]
fn disconnect_shape_by_version() {
    for version in VERSIONS {
        let (msg, consumed) = decode(version, &[0xE0, 0x00]).unwrap();
        assert!(matches!(msg, Message::Disconnect(_)));
        assert_eq!(2, consumed);
    }

    let (msg, consumed) = decode(ProtocolVersion::V50, &[0xE0, 0x01, 0x00]).unwrap();
    assert_eq!(3, consumed);
    match msg {
        Message::Disconnect(d) => assert_eq!(ReasonCode::NORMAL_DISCONNECTION, d.reason_code),
        els => panic!("not a DISCONNECT: {:?}", els),
    }

    let err = decode(ProtocolVersion::V311, &[0xE0, 0x01, 0x00]).unwrap_err();
    assert_eq!(ErrorKind::ProtocolError, err.kind());
}

#[test]
fn suback_return_codes() {
    for version in VERSIONS {
        let binary: &[u8] = match version {
            ProtocolVersion::V311 => &[0x90, 0x03, 0x00, 0x01, 0x80],
            ProtocolVersion::V50 => &[0x90, 0x04, 0x00, 0x01, 0x00, 0x80],
        };
        match decode(version, binary).unwrap() {
            (Message::Suback(suback), _) => assert_eq!(&[ReasonCode::SUBACK_FAILURE], suback.return_codes()),
            (els, _) => panic!("not a SUBACK: {:?}", els),
        }
    }

    let err = decode(ProtocolVersion::V311, &[0x90, 0x03, 0x00, 0x01, 0x03]).unwrap_err();
    assert_eq!(ErrorKind::ProtocolError, err.kind());
    assert_eq!(4, err.consumed);
}

#[test]
fn insufficient_data() {
    for version in VERSIONS {
        let err = decode(version, &[0x40, 0x02, 0x07]).unwrap_err();
        assert_eq!(ErrorKind::InsufficientData, err.kind());
    }
}

#[test]
fn reason_code_tables() {
    assert!(ReasonCode::SUCCESS.is_valid_for_type(PacketType::PUBACK));
    assert!(ReasonCode::PACKET_IDENTIFIER_NOT_FOUND.is_valid_for_type(PacketType::PUBREL));
    assert!(!ReasonCode::NOT_AUTHORIZED.is_valid_for_type(PacketType::PUBREL));
    assert!(ReasonCode::DISCONNECT_WITH_WILL_MESSAGE.is_valid_for_type(PacketType::DISCONNECT));
    assert!(!ReasonCode::SUCCESS.is_valid_for_type(PacketType::PUBLISH));
    assert!(ReasonCode::RE_AUTHENTICATE.is_valid_for_type(PacketType::AUTH));
}

fn qos_strategy() -> impl Strategy<Value = QoS> {
    prop_oneof![
        Just(QoS::AtMostOnce),
        Just(QoS::AtLeastOnce),
        Just(QoS::ExactlyOnce),
    ]
}

fn version_strategy() -> impl Strategy<Value = ProtocolVersion> {
    prop_oneof![Just(ProtocolVersion::V311), Just(ProtocolVersion::V50)]
}

proptest! {
    #[test]
    fn prop_variable_byte_integer_round_trip(value in 0..=VariableByteInteger::MAX) {
        let mut buf = [0_u8; 4];
        let written = VariableByteInteger::encode_into(value, &mut buf).unwrap();
        prop_assert_eq!(Ok((value, written)), VariableByteInteger::decode_from(&buf));
    }

    #[test]
    fn prop_publish_round_trip(
        version in version_strategy(),
        qos in qos_strategy(),
        retain in any::<bool>(),
        packet_id in 1..=u16::MAX,
        topic in "[a-z0-9/]{1,32}",
        payload in prop::collection::vec(any::<u8>(), 0..=1024),
    ) {
        let mut msg = Message::new(version, PacketType::PUBLISH).unwrap();
        if let Message::Publish(publish) = &mut msg {
            publish.topic = UTF8String::new(topic).unwrap();
            publish.payload = payload.into();
            publish.qos = qos;
            publish.retain = retain;
            if qos != QoS::AtMostOnce {
                publish.set_packet_id(packet_id);
            }
        }

        let encoded = encode_to_vec(&msg);
        let (decoded, consumed) = decode(version, &encoded).unwrap();
        prop_assert_eq!(encoded.len(), consumed);
        prop_assert_eq!(msg, decoded);
    }

    #[test]
    fn prop_ack_round_trip(
        version in version_strategy(),
        packet_type in prop_oneof![
            Just(PacketType::PUBACK), Just(PacketType::PUBREC), Just(PacketType::PUBREL), Just(PacketType::PUBCOMP)
        ],
        packet_id in 1..=u16::MAX,
        reason_string in proptest::option::of("[ -~]{0,16}"),
    ) {
        let mut msg = Message::new(version, packet_type).unwrap();
        msg.packet_mut().set_packet_id(packet_id);
        if let (Some(reason), true) = (reason_string, version.has_properties()) {
            msg.packet_mut().header_mut().properties_mut().unwrap()
                .push(PropertyIdentifier::ReasonString, DataRepresentation::UTF8(UTF8String::new(reason).unwrap()))
                .unwrap();
        }

        let encoded = encode_to_vec(&msg);
        let (decoded, _) = decode(version, &encoded).unwrap();
        prop_assert_eq!(msg, decoded);
    }

    #[test]
    fn prop_decode_never_panics(version in version_strategy(), bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        if let Ok((msg, consumed)) = decode(version, &bytes) {
            prop_assert!(consumed <= bytes.len());
            prop_assert_eq!(version, msg.version());
        }
    }
}
