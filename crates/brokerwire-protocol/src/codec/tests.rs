use brokerwire_core::config::CodecConfig;
use brokerwire_core::constants::MAGIC;
use brokerwire_core::error::ErrorKind;

use super::wire_format::{EncodingMode, WireFormatContext};
use crate::command::{
    CommandHeader, ConnectionId, ConnectionInfo, ConsumerId, ConsumerInfo, ExceptionResponse,
    KeepAliveInfo, MessageDispatchNotification, MessageId, ProducerId, RemoteError, Structure,
    WireFormatInfo,
};
use crate::destination::Destination;

fn connected_pair(a: CodecConfig, b: CodecConfig) -> (WireFormatContext, WireFormatContext) {
    let mut left = WireFormatContext::new(a);
    let mut right = WireFormatContext::new(b);
    let left_info = left.local_wire_format_info();
    let right_info = right.local_wire_format_info();
    left.negotiate(&right_info).unwrap();
    right.negotiate(&left_info).unwrap();
    (left, right)
}

fn sample_consumer_info() -> Structure {
    Structure::ConsumerInfo(ConsumerInfo {
        header: CommandHeader { command_id: 7, response_required: true },
        consumer_id: Some(ConsumerId {
            connection_id: "conn-1".into(),
            session_id: 2,
            value: 3,
        }),
        browser: false,
        destination: Some(Destination::Queue("orders".into())),
        prefetch_size: 1000,
        maximum_pending_message_limit: -1,
        dispatch_async: true,
        selector: Some("priority > 4".into()),
        subscription_name: None,
        no_local: false,
        exclusive: true,
        retroactive: false,
        priority: 5,
        broker_path: None,
    })
}

#[test]
fn test_negotiation_picks_minimum_version() {
    let (left, right) = connected_pair(
        CodecConfig { preferred_version: 9, ..CodecConfig::default() },
        CodecConfig { preferred_version: 7, ..CodecConfig::default() },
    );
    assert_eq!(left.version(), 7);
    assert_eq!(right.version(), 7);
    assert!(left.is_active());
    assert_eq!(left.encoding_mode(), EncodingMode::Tight);
}

#[test]
fn test_negotiation_falls_back_to_loose() {
    let (left, right) = connected_pair(
        CodecConfig::default(),
        CodecConfig { tight_encoding: false, ..CodecConfig::default() },
    );
    assert_eq!(left.encoding_mode(), EncodingMode::Loose);
    assert_eq!(right.encoding_mode(), EncodingMode::Loose);
    assert!(!left.cache_enabled());
}

#[test]
fn test_renegotiation_cannot_rewrite_frozen_settings() {
    let (mut left, mut right) = connected_pair(CodecConfig::default(), CodecConfig::default());
    assert_eq!(left.version(), 9);
    assert_eq!(left.encoding_mode(), EncodingMode::Tight);

    // Warm the cache so a reset would desynchronize the peers.
    let first = left.marshal(&sample_consumer_info()).unwrap();
    right.unmarshal(&first).unwrap();

    let downgrade = WireFormatInfo {
        version: 2,
        tight_encoding_enabled: false,
        cache_enabled: false,
        ..WireFormatInfo::default()
    };
    left.negotiate(&downgrade).unwrap();
    assert_eq!(left.version(), 9);
    assert_eq!(left.encoding_mode(), EncodingMode::Tight);
    assert!(left.cache_enabled());

    // The warmed cache still resolves: a repeat frame stays decodable.
    let repeat = left.marshal(&sample_consumer_info()).unwrap();
    assert_eq!(right.unmarshal(&repeat).unwrap(), sample_consumer_info());
}

#[test]
fn test_negotiation_rejects_bad_magic() {
    let mut ctx = WireFormatContext::new(CodecConfig::default());
    let remote = WireFormatInfo { magic: *b"00000000", ..WireFormatInfo::default() };
    assert!(matches!(ctx.negotiate(&remote), Err(ErrorKind::MalformedField(_))));
}

#[test]
fn test_negotiation_rejects_unsupported_version() {
    let mut ctx = WireFormatContext::new(CodecConfig::default());
    let remote = WireFormatInfo { magic: MAGIC, version: 0, ..WireFormatInfo::default() };
    assert!(matches!(
        ctx.negotiate(&remote),
        Err(ErrorKind::VersionUnsupported { proposed: 0, minimum: 1 })
    ));
}

#[test]
fn test_tight_round_trip_consumer_info() {
    let (mut left, mut right) = connected_pair(CodecConfig::default(), CodecConfig::default());
    let original = sample_consumer_info();
    let frame = left.marshal(&original).unwrap();
    let decoded = right.unmarshal(&frame).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_loose_round_trip_consumer_info() {
    let loose = CodecConfig { tight_encoding: false, ..CodecConfig::default() };
    let (mut left, mut right) = connected_pair(loose.clone(), loose);
    let original = sample_consumer_info();
    let frame = left.marshal(&original).unwrap();
    let decoded = right.unmarshal(&frame).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_cache_shrinks_repeated_frames() {
    let (mut left, mut right) = connected_pair(CodecConfig::default(), CodecConfig::default());
    assert!(left.cache_enabled());
    let notification = Structure::MessageDispatchNotification(MessageDispatchNotification {
        header: CommandHeader { command_id: 20, response_required: false },
        consumer_id: Some(ConsumerId {
            connection_id: "conn-cache".into(),
            session_id: 1,
            value: 1,
        }),
        destination: Some(Destination::Topic("events".into())),
        delivery_sequence_id: 41,
        message_id: Some(MessageId {
            producer_id: Some(ProducerId {
                connection_id: "conn-cache".into(),
                value: 9,
                session_id: 1,
            }),
            producer_sequence_id: 100,
            broker_sequence_id: 0,
        }),
    });
    let first = left.marshal(&notification).unwrap();
    let second = left.marshal(&notification).unwrap();
    // The repeated consumer id, destination, and producer id collapse to
    // 2-byte slot references; the saving must cover at least their string
    // payloads ("conn-cache" twice, "events" once).
    let dedup_floor = 2 * "conn-cache".len() + "events".len();
    assert!(
        first.len() - second.len() >= dedup_floor,
        "saved {} bytes, expected at least {dedup_floor}",
        first.len() - second.len()
    );
    let decoded_first = right.unmarshal(&first).unwrap();
    let decoded_second = right.unmarshal(&second).unwrap();
    assert_eq!(decoded_first, notification);
    assert_eq!(decoded_second, notification);
}

#[test]
fn test_version_gate_drops_client_ip_on_old_peer() {
    let old = CodecConfig { preferred_version: 7, ..CodecConfig::default() };
    let (mut left, mut right) = connected_pair(CodecConfig::default(), old);
    let info = Structure::ConnectionInfo(ConnectionInfo {
        header: CommandHeader { command_id: 1, response_required: true },
        connection_id: Some(ConnectionId { value: "conn-7".into() }),
        client_ip: Some("10.0.0.1".into()),
        ..ConnectionInfo::default()
    });
    let frame = left.marshal(&info).unwrap();
    let decoded = right.unmarshal(&frame).unwrap();
    let Structure::ConnectionInfo(decoded) = decoded else {
        panic!("decoded wrong structure type");
    };
    assert_eq!(decoded.client_ip, None);
    assert_eq!(decoded.connection_id, Some(ConnectionId { value: "conn-7".into() }));
}

#[test]
fn test_version_gate_keeps_client_ip_on_current_peer() {
    let (mut left, mut right) = connected_pair(CodecConfig::default(), CodecConfig::default());
    let info = Structure::ConnectionInfo(ConnectionInfo {
        header: CommandHeader { command_id: 1, response_required: true },
        client_ip: Some("10.0.0.1".into()),
        ..ConnectionInfo::default()
    });
    let frame = left.marshal(&info).unwrap();
    let decoded = right.unmarshal(&frame).unwrap();
    let Structure::ConnectionInfo(decoded) = decoded else {
        panic!("decoded wrong structure type");
    };
    assert_eq!(decoded.client_ip.as_deref(), Some("10.0.0.1"));
}

#[test]
fn test_exception_response_cause_chain() {
    let (mut left, mut right) = connected_pair(CodecConfig::default(), CodecConfig::default());
    let response = Structure::ExceptionResponse(ExceptionResponse {
        header: CommandHeader { command_id: 12, response_required: false },
        correlation_id: 11,
        exception: Some(RemoteError {
            exception_class: "org.example.BrokerException".into(),
            message: Some("queue full".into()),
            cause: Some(Box::new(RemoteError {
                exception_class: "org.example.StoreException".into(),
                message: None,
                cause: None,
            })),
        }),
    });
    let frame = left.marshal(&response).unwrap();
    let decoded = right.unmarshal(&frame).unwrap();
    assert_eq!(decoded, response);
}

#[test]
fn test_marshal_before_handshake_is_rejected() {
    let mut ctx = WireFormatContext::new(CodecConfig::default());
    let keep_alive = Structure::KeepAliveInfo(KeepAliveInfo::default());
    assert!(matches!(ctx.marshal(&keep_alive), Err(ErrorKind::HandshakeIncomplete)));
}

#[test]
fn test_wire_format_info_allowed_before_handshake() {
    let mut sender = WireFormatContext::new(CodecConfig::default());
    let mut receiver = WireFormatContext::new(CodecConfig::default());
    let info = Structure::WireFormatInfo(sender.local_wire_format_info());
    let frame = sender.marshal(&info).unwrap();
    let decoded = receiver.unmarshal(&frame).unwrap();
    assert_eq!(decoded, info);
}

#[test]
fn test_closed_context_rejects_everything() {
    let (mut left, _) = connected_pair(CodecConfig::default(), CodecConfig::default());
    left.close();
    let keep_alive = Structure::KeepAliveInfo(KeepAliveInfo::default());
    assert!(matches!(left.marshal(&keep_alive), Err(ErrorKind::ContextClosed)));
    assert!(matches!(left.unmarshal(&[10]), Err(ErrorKind::ContextClosed)));
}

#[test]
fn test_unknown_type_code() {
    let (_, mut right) = connected_pair(CodecConfig::default(), CodecConfig::default());
    assert!(matches!(right.unmarshal(&[0xEE, 0, 0]), Err(ErrorKind::UnknownTypeCode(0xEE))));
}

#[test]
fn test_truncated_frame() {
    let (mut left, mut right) = connected_pair(CodecConfig::default(), CodecConfig::default());
    let frame = left.marshal(&sample_consumer_info()).unwrap();
    let err = right.unmarshal(&frame[..frame.len() - 4]).unwrap_err();
    assert!(matches!(
        err,
        ErrorKind::TruncatedStream | ErrorKind::StreamExhausted | ErrorKind::MalformedField(_)
    ));
}

#[test]
fn test_shrunken_flag_block_exhausts_stream() {
    let (mut left, mut right) = connected_pair(CodecConfig::default(), CodecConfig::default());
    let frame = left.marshal(&sample_consumer_info()).unwrap();

    // Frame layout: [type code][flag block size][packed flags][payload].
    // Re-declare one flag byte fewer than the field walk consumes; the
    // decoder must underrun on the flags, never misread the payload.
    let declared = frame[1] as usize;
    assert!((2..64).contains(&declared), "flag block marker was {declared}");
    let mut corrupted = Vec::with_capacity(frame.len() - 1);
    corrupted.push(frame[0]);
    corrupted.push((declared - 1) as u8);
    corrupted.extend_from_slice(&frame[2..1 + declared]);
    corrupted.extend_from_slice(&frame[2 + declared..]);

    assert!(matches!(right.unmarshal(&corrupted), Err(ErrorKind::StreamExhausted)));
}

#[test]
fn test_keep_alive_round_trip() {
    let (mut left, mut right) = connected_pair(CodecConfig::default(), CodecConfig::default());
    let keep_alive = Structure::KeepAliveInfo(KeepAliveInfo {
        header: CommandHeader { command_id: 99, response_required: false },
    });
    let frame = left.marshal(&keep_alive).unwrap();
    assert_eq!(right.unmarshal(&frame).unwrap(), keep_alive);
}
