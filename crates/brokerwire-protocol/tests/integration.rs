//! Integration tests for the brokerwire-protocol crate.
//!
//! These tests drive two codec contexts through a full handshake and
//! exchange structure traffic between them, verifying the negotiated
//! settings hold end to end.

use brokerwire_core::config::CodecConfig;
use brokerwire_core::error::ErrorKind;
use brokerwire_protocol::command::{
    CommandHeader, ConnectionId, ConnectionInfo, ConsumerId, MessageDispatchNotification,
    MessageId, ProducerId, RemoveInfo, Response, SessionId, SessionInfo,
};
use brokerwire_protocol::{Destination, EncodingMode, Structure, WireFormatContext};

fn handshake(
    client_config: CodecConfig,
    broker_config: CodecConfig,
) -> (WireFormatContext, WireFormatContext) {
    let mut client = WireFormatContext::new(client_config);
    let mut broker = WireFormatContext::new(broker_config);

    // Each side sends its preferences as a frame and negotiates on what
    // arrives, the way a transport would.
    let client_hello = client
        .marshal(&Structure::WireFormatInfo(client.local_wire_format_info()))
        .unwrap();
    let broker_hello = broker
        .marshal(&Structure::WireFormatInfo(broker.local_wire_format_info()))
        .unwrap();

    let Structure::WireFormatInfo(from_client) = broker.unmarshal(&client_hello).unwrap() else {
        panic!("broker received a non-negotiation frame");
    };
    let Structure::WireFormatInfo(from_broker) = client.unmarshal(&broker_hello).unwrap() else {
        panic!("client received a non-negotiation frame");
    };

    broker.negotiate(&from_client).unwrap();
    client.negotiate(&from_broker).unwrap();
    (client, broker)
}

#[test]
fn test_full_session_over_tight_encoding() {
    let (mut client, mut broker) = handshake(CodecConfig::default(), CodecConfig::default());
    assert_eq!(client.encoding_mode(), EncodingMode::Tight);
    assert!(client.cache_enabled());
    assert_eq!(client.version(), broker.version());

    let connection = Structure::ConnectionInfo(ConnectionInfo {
        header: CommandHeader { command_id: 1, response_required: true },
        connection_id: Some(ConnectionId { value: "client-1".into() }),
        client_id: Some("app".into()),
        ..ConnectionInfo::default()
    });
    let session = Structure::SessionInfo(SessionInfo {
        header: CommandHeader { command_id: 2, response_required: true },
        session_id: Some(SessionId { connection_id: "client-1".into(), value: 1 }),
    });
    let response = Structure::Response(Response {
        header: CommandHeader { command_id: 3, response_required: false },
        correlation_id: 1,
    });

    for command in [&connection, &session] {
        let frame = client.marshal(command).unwrap();
        assert_eq!(&broker.unmarshal(&frame).unwrap(), command);
    }
    let frame = broker.marshal(&response).unwrap();
    assert_eq!(client.unmarshal(&frame).unwrap(), response);
}

#[test]
fn test_repeated_dispatch_uses_cache_slots() {
    let (mut client, mut broker) = handshake(CodecConfig::default(), CodecConfig::default());

    let notification = Structure::MessageDispatchNotification(MessageDispatchNotification {
        header: CommandHeader { command_id: 40, response_required: false },
        consumer_id: Some(ConsumerId {
            connection_id: "client-1".into(),
            session_id: 1,
            value: 4,
        }),
        destination: Some(Destination::Queue("orders".into())),
        delivery_sequence_id: 1,
        message_id: Some(MessageId {
            producer_id: Some(ProducerId {
                connection_id: "client-1".into(),
                value: 2,
                session_id: 1,
            }),
            producer_sequence_id: 1,
            broker_sequence_id: 1,
        }),
    });

    let first = broker.marshal(&notification).unwrap();
    let second = broker.marshal(&notification).unwrap();
    // Slot references are 2 bytes; the deduplicated consumer id, destination,
    // and producer id must save at least their string payloads.
    let dedup_floor = 2 * "client-1".len() + "orders".len();
    assert!(
        first.len() - second.len() >= dedup_floor,
        "repeat frame was {} bytes, first was {}, expected a saving of at least {dedup_floor}",
        second.len(),
        first.len()
    );

    let decoded_first = client.unmarshal(&first).unwrap();
    let decoded_second = client.unmarshal(&second).unwrap();
    assert_eq!(decoded_first, notification);
    assert_eq!(decoded_second, decoded_first);
}

#[test]
fn test_mixed_version_session_gates_fields() {
    let old_broker = CodecConfig { preferred_version: 4, ..CodecConfig::default() };
    let (mut client, mut broker) = handshake(CodecConfig::default(), old_broker);
    assert_eq!(client.version(), 4);

    // lastDeliveredSequenceId arrived in version 5, so a v4 session drops it.
    let remove = Structure::RemoveInfo(RemoveInfo {
        header: CommandHeader { command_id: 9, response_required: true },
        object_id: Some(Box::new(Structure::ConsumerId(ConsumerId {
            connection_id: "client-1".into(),
            session_id: 1,
            value: 4,
        }))),
        last_delivered_sequence_id: 77,
    });
    let frame = client.marshal(&remove).unwrap();
    let Structure::RemoveInfo(decoded) = broker.unmarshal(&frame).unwrap() else {
        panic!("decoded wrong structure type");
    };
    assert_eq!(decoded.last_delivered_sequence_id, 0);
    assert_eq!(
        decoded.object_id.as_deref(),
        Some(&Structure::ConsumerId(ConsumerId {
            connection_id: "client-1".into(),
            session_id: 1,
            value: 4,
        }))
    );
}

#[test]
fn test_traffic_rejected_until_handshake_completes() {
    let mut client = WireFormatContext::new(CodecConfig::default());
    let hello = client
        .marshal(&Structure::WireFormatInfo(client.local_wire_format_info()))
        .unwrap();
    assert!(!client.is_active());

    let session = Structure::SessionInfo(SessionInfo::default());
    assert!(matches!(client.marshal(&session), Err(ErrorKind::HandshakeIncomplete)));

    // A structure frame arriving before negotiation is rejected too.
    let mut broker = WireFormatContext::new(CodecConfig::default());
    let bad = [brokerwire_protocol::command::type_codes::SESSION_INFO, 0, 0, 0, 0, 1, 0];
    assert!(matches!(broker.unmarshal(&bad), Err(ErrorKind::HandshakeIncomplete)));

    // The hello itself is fine.
    assert!(broker.unmarshal(&hello).is_ok());
}

#[test]
fn test_closed_context_is_terminal() {
    let (mut client, _) = handshake(CodecConfig::default(), CodecConfig::default());
    client.close();
    let session = Structure::SessionInfo(SessionInfo::default());
    assert!(matches!(client.marshal(&session), Err(ErrorKind::ContextClosed)));
    let remote = client.local_wire_format_info();
    assert!(matches!(client.negotiate(&remote), Err(ErrorKind::ContextClosed)));
}
