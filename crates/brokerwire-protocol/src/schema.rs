//! Static per-type field descriptions.
//!
//! These tables are the hand-authored equivalent of what an offline schema
//! generator would emit: for every structure type, the ordered field list
//! with wire kind and version range. The ordering *is* the wire format —
//! there is no field tagging on the wire, only position — so the marshallers
//! walk fields in exactly this order and consult [`FieldDescriptor::in_scope`]
//! for version gates. The runtime never inspects type metadata dynamically.

use crate::command::type_codes;

/// Wire kind of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    /// Boolean: one flag in tight mode, one byte in loose mode.
    Bool,
    /// Single unsigned byte.
    Byte,
    /// Big-endian 32-bit integer.
    Int,
    /// 64-bit integer; variable-length (0/2/4/8 bytes) in tight mode.
    Long,
    /// Length-prefixed UTF-8 string (u16 length).
    Str,
    /// Length-prefixed byte array (u32 length).
    ByteArray,
    /// Constant-length byte array; no length prefix on the wire.
    FixedByteArray(usize),
    /// Nested structure, prefixed by its own type code.
    Nested,
    /// Cache-eligible nested structure (fresh-or-slot protocol).
    Cached,
    /// Counted array of nested structures (u16 count).
    StructArray,
    /// Recursive remote-error encoding.
    Throwable,
}

/// Describes one field of a structure type.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Declared field name, for diagnostics.
    pub name: &'static str,
    /// Position in the marshalling sequence; defines on-wire order and must
    /// match across every version that includes the field.
    pub sequence: u8,
    /// How the field is encoded.
    pub kind: WireKind,
    /// First protocol version carrying the field.
    pub introduced: u32,
    /// Version the field was retired in, if any (exclusive bound).
    pub retired: Option<u32>,
}

impl FieldDescriptor {
    /// Field present since version 1.
    pub const fn new(name: &'static str, sequence: u8, kind: WireKind) -> Self {
        Self { name, sequence, kind, introduced: 1, retired: None }
    }

    /// Field introduced in a later version.
    pub const fn since(name: &'static str, sequence: u8, kind: WireKind, version: u32) -> Self {
        Self { name, sequence, kind, introduced: version, retired: None }
    }

    /// True if the field is on the wire for the given negotiated version.
    pub fn in_scope(&self, version: u32) -> bool {
        version >= self.introduced && self.retired.map_or(true, |r| version < r)
    }
}

/// Describes one structure type: its code, cache eligibility, supertype
/// chain, and ordered field list.
#[derive(Debug)]
pub struct SchemaDescriptor {
    /// One-byte wire type code; `None` for abstract bases that never appear
    /// as a top-level or nested type themselves.
    pub type_code: Option<u8>,
    /// Declared type name, for diagnostics.
    pub name: &'static str,
    /// True if instances participate in the cached-object dictionary.
    pub cached_type: bool,
    /// Supertype whose fields precede this type's fields on the wire.
    pub parent: Option<&'static SchemaDescriptor>,
    /// This type's own fields, in marshalling order.
    pub fields: &'static [FieldDescriptor],
}

use WireKind::*;

/// Abstract base shared by all commands.
pub static BASE_COMMAND: SchemaDescriptor = SchemaDescriptor {
    type_code: None,
    name: "BaseCommand",
    cached_type: false,
    parent: None,
    fields: &[
        FieldDescriptor::new("commandId", 1, Int),
        FieldDescriptor::new("responseRequired", 2, Bool),
    ],
};

/// ConnectionId wire schema.
pub static CONNECTION_ID: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::CONNECTION_ID),
    name: "ConnectionId",
    cached_type: true,
    parent: None,
    fields: &[FieldDescriptor::new("value", 1, Str)],
};

/// SessionId wire schema.
pub static SESSION_ID: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::SESSION_ID),
    name: "SessionId",
    cached_type: true,
    parent: None,
    fields: &[
        FieldDescriptor::new("connectionId", 1, Str),
        FieldDescriptor::new("value", 2, Long),
    ],
};

/// ConsumerId wire schema.
pub static CONSUMER_ID: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::CONSUMER_ID),
    name: "ConsumerId",
    cached_type: true,
    parent: None,
    fields: &[
        FieldDescriptor::new("connectionId", 1, Str),
        FieldDescriptor::new("sessionId", 2, Long),
        FieldDescriptor::new("value", 3, Long),
    ],
};

/// ProducerId wire schema. Note the historical connectionId, value,
/// sessionId ordering.
pub static PRODUCER_ID: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::PRODUCER_ID),
    name: "ProducerId",
    cached_type: true,
    parent: None,
    fields: &[
        FieldDescriptor::new("connectionId", 1, Str),
        FieldDescriptor::new("value", 2, Long),
        FieldDescriptor::new("sessionId", 3, Long),
    ],
};

/// BrokerId wire schema.
pub static BROKER_ID: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::BROKER_ID),
    name: "BrokerId",
    cached_type: true,
    parent: None,
    fields: &[FieldDescriptor::new("value", 1, Str)],
};

/// MessageId wire schema.
pub static MESSAGE_ID: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::MESSAGE_ID),
    name: "MessageId",
    cached_type: false,
    parent: None,
    fields: &[
        FieldDescriptor::new("producerId", 1, Cached),
        FieldDescriptor::new("producerSequenceId", 2, Long),
        FieldDescriptor::new("brokerSequenceId", 3, Long),
    ],
};

/// Shared shape of the four destination schemas.
static DESTINATION_FIELDS: [FieldDescriptor; 1] =
    [FieldDescriptor::new("physicalName", 1, Str)];

/// Queue destination wire schema.
pub static QUEUE: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::QUEUE),
    name: "Queue",
    cached_type: true,
    parent: None,
    fields: &DESTINATION_FIELDS,
};

/// Topic destination wire schema.
pub static TOPIC: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::TOPIC),
    name: "Topic",
    cached_type: true,
    parent: None,
    fields: &DESTINATION_FIELDS,
};

/// Temporary queue destination wire schema.
pub static TEMP_QUEUE: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::TEMP_QUEUE),
    name: "TemporaryQueue",
    cached_type: true,
    parent: None,
    fields: &DESTINATION_FIELDS,
};

/// Temporary topic destination wire schema.
pub static TEMP_TOPIC: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::TEMP_TOPIC),
    name: "TemporaryTopic",
    cached_type: true,
    parent: None,
    fields: &DESTINATION_FIELDS,
};

/// WireFormatInfo wire schema. Not a command: it carries no header and is
/// exchanged before negotiation completes.
pub static WIREFORMAT_INFO: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::WIREFORMAT_INFO),
    name: "WireFormatInfo",
    cached_type: false,
    parent: None,
    fields: &[
        FieldDescriptor::new("magic", 1, FixedByteArray(8)),
        FieldDescriptor::new("version", 2, Int),
        FieldDescriptor::new("tightEncodingEnabled", 3, Bool),
        FieldDescriptor::new("cacheEnabled", 4, Bool),
        FieldDescriptor::new("maxFrameSize", 5, Int),
        FieldDescriptor::new("maxInactivityDuration", 6, Int),
        FieldDescriptor::new("marshalledProperties", 7, ByteArray),
    ],
};

/// ConnectionInfo wire schema.
pub static CONNECTION_INFO: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::CONNECTION_INFO),
    name: "ConnectionInfo",
    cached_type: false,
    parent: Some(&BASE_COMMAND),
    fields: &[
        FieldDescriptor::new("connectionId", 1, Cached),
        FieldDescriptor::new("clientId", 2, Str),
        FieldDescriptor::new("password", 3, Str),
        FieldDescriptor::new("userName", 4, Str),
        FieldDescriptor::new("brokerPath", 5, StructArray),
        FieldDescriptor::new("brokerMasterConnector", 6, Bool),
        FieldDescriptor::new("manageable", 7, Bool),
        FieldDescriptor::since("clientMaster", 8, Bool, 2),
        FieldDescriptor::since("faultTolerant", 9, Bool, 6),
        FieldDescriptor::since("failoverReconnect", 10, Bool, 6),
        FieldDescriptor::since("clientIp", 11, Str, 8),
    ],
};

/// Field indices into [`CONNECTION_INFO`] for the version-gated tail.
pub mod connection_info {
    /// `clientMaster`, since version 2.
    pub const CLIENT_MASTER: usize = 7;
    /// `faultTolerant`, since version 6.
    pub const FAULT_TOLERANT: usize = 8;
    /// `failoverReconnect`, since version 6.
    pub const FAILOVER_RECONNECT: usize = 9;
    /// `clientIp`, since version 8.
    pub const CLIENT_IP: usize = 10;
}

/// SessionInfo wire schema.
pub static SESSION_INFO: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::SESSION_INFO),
    name: "SessionInfo",
    cached_type: false,
    parent: Some(&BASE_COMMAND),
    fields: &[FieldDescriptor::new("sessionId", 1, Cached)],
};

/// ConsumerInfo wire schema.
pub static CONSUMER_INFO: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::CONSUMER_INFO),
    name: "ConsumerInfo",
    cached_type: false,
    parent: Some(&BASE_COMMAND),
    fields: &[
        FieldDescriptor::new("consumerId", 1, Cached),
        FieldDescriptor::new("browser", 2, Bool),
        FieldDescriptor::new("destination", 3, Cached),
        FieldDescriptor::new("prefetchSize", 4, Int),
        FieldDescriptor::new("maximumPendingMessageLimit", 5, Int),
        FieldDescriptor::new("dispatchAsync", 6, Bool),
        FieldDescriptor::new("selector", 7, Str),
        FieldDescriptor::new("subscriptionName", 8, Str),
        FieldDescriptor::new("noLocal", 9, Bool),
        FieldDescriptor::new("exclusive", 10, Bool),
        FieldDescriptor::new("retroactive", 11, Bool),
        FieldDescriptor::new("priority", 12, Byte),
        FieldDescriptor::new("brokerPath", 13, StructArray),
    ],
};

/// ProducerInfo wire schema.
pub static PRODUCER_INFO: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::PRODUCER_INFO),
    name: "ProducerInfo",
    cached_type: false,
    parent: Some(&BASE_COMMAND),
    fields: &[
        FieldDescriptor::new("producerId", 1, Cached),
        FieldDescriptor::new("destination", 2, Cached),
        FieldDescriptor::new("brokerPath", 3, StructArray),
        FieldDescriptor::since("dispatchAsync", 4, Bool, 2),
        FieldDescriptor::since("windowSize", 5, Int, 3),
    ],
};

/// Field indices into [`PRODUCER_INFO`] for the version-gated tail.
pub mod producer_info {
    /// `dispatchAsync`, since version 2.
    pub const DISPATCH_ASYNC: usize = 3;
    /// `windowSize`, since version 3.
    pub const WINDOW_SIZE: usize = 4;
}

/// KeepAliveInfo wire schema; the base command fields only.
pub static KEEP_ALIVE_INFO: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::KEEP_ALIVE_INFO),
    name: "KeepAliveInfo",
    cached_type: false,
    parent: Some(&BASE_COMMAND),
    fields: &[],
};

/// ShutdownInfo wire schema; the base command fields only.
pub static SHUTDOWN_INFO: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::SHUTDOWN_INFO),
    name: "ShutdownInfo",
    cached_type: false,
    parent: Some(&BASE_COMMAND),
    fields: &[],
};

/// RemoveInfo wire schema.
pub static REMOVE_INFO: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::REMOVE_INFO),
    name: "RemoveInfo",
    cached_type: false,
    parent: Some(&BASE_COMMAND),
    fields: &[
        FieldDescriptor::new("objectId", 1, Cached),
        FieldDescriptor::since("lastDeliveredSequenceId", 2, Long, 5),
    ],
};

/// Field indices into [`REMOVE_INFO`] for the version-gated tail.
pub mod remove_info {
    /// `lastDeliveredSequenceId`, since version 5.
    pub const LAST_DELIVERED_SEQUENCE_ID: usize = 1;
}

/// MessageDispatchNotification wire schema.
pub static MESSAGE_DISPATCH_NOTIFICATION: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::MESSAGE_DISPATCH_NOTIFICATION),
    name: "MessageDispatchNotification",
    cached_type: false,
    parent: Some(&BASE_COMMAND),
    fields: &[
        FieldDescriptor::new("consumerId", 1, Cached),
        FieldDescriptor::new("destination", 2, Cached),
        FieldDescriptor::new("deliverySequenceId", 3, Long),
        FieldDescriptor::new("messageId", 4, Nested),
    ],
};

/// Response wire schema.
pub static RESPONSE: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::RESPONSE),
    name: "Response",
    cached_type: false,
    parent: Some(&BASE_COMMAND),
    fields: &[FieldDescriptor::new("correlationId", 1, Int)],
};

/// ExceptionResponse wire schema; extends [`RESPONSE`] on the wire.
pub static EXCEPTION_RESPONSE: SchemaDescriptor = SchemaDescriptor {
    type_code: Some(type_codes::EXCEPTION_RESPONSE),
    name: "ExceptionResponse",
    cached_type: false,
    parent: Some(&RESPONSE),
    fields: &[FieldDescriptor::new("exception", 1, Throwable)],
};

/// All concrete (wire-visible) schema descriptors.
pub static ALL: &[&SchemaDescriptor] = &[
    &CONNECTION_ID,
    &SESSION_ID,
    &CONSUMER_ID,
    &PRODUCER_ID,
    &BROKER_ID,
    &MESSAGE_ID,
    &QUEUE,
    &TOPIC,
    &TEMP_QUEUE,
    &TEMP_TOPIC,
    &WIREFORMAT_INFO,
    &CONNECTION_INFO,
    &SESSION_INFO,
    &CONSUMER_INFO,
    &PRODUCER_INFO,
    &KEEP_ALIVE_INFO,
    &SHUTDOWN_INFO,
    &REMOVE_INFO,
    &MESSAGE_DISPATCH_NOTIFICATION,
    &RESPONSE,
    &EXCEPTION_RESPONSE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for descriptor in ALL {
            let code = descriptor.type_code.expect("concrete descriptor");
            assert!(seen.insert(code), "duplicate type code {code} ({})", descriptor.name);
        }
    }

    #[test]
    fn test_field_sequences_are_ordered() {
        for descriptor in ALL {
            for pair in descriptor.fields.windows(2) {
                assert!(
                    pair[0].sequence < pair[1].sequence,
                    "{}: field order must follow sequence",
                    descriptor.name
                );
            }
        }
    }

    #[test]
    fn test_version_gates() {
        let client_ip = &CONNECTION_INFO.fields[connection_info::CLIENT_IP];
        assert_eq!(client_ip.name, "clientIp");
        assert!(!client_ip.in_scope(7));
        assert!(client_ip.in_scope(8));
        assert!(client_ip.in_scope(9));

        let retired = FieldDescriptor {
            name: "legacy",
            sequence: 1,
            kind: WireKind::Int,
            introduced: 2,
            retired: Some(5),
        };
        assert!(!retired.in_scope(1));
        assert!(retired.in_scope(4));
        assert!(!retired.in_scope(5));
    }

    #[test]
    fn test_cache_eligible_types() {
        for descriptor in [&CONNECTION_ID, &SESSION_ID, &CONSUMER_ID, &PRODUCER_ID, &BROKER_ID] {
            assert!(descriptor.cached_type, "{} must be cache-eligible", descriptor.name);
        }
        assert!(QUEUE.cached_type && TEMP_TOPIC.cached_type);
        assert!(!MESSAGE_ID.cached_type);
        assert!(!CONNECTION_INFO.cached_type);
    }

    #[test]
    fn test_delegation_chain() {
        assert!(EXCEPTION_RESPONSE.parent.unwrap().type_code == RESPONSE.type_code);
        assert!(RESPONSE.parent.unwrap().type_code.is_none());
    }
}
