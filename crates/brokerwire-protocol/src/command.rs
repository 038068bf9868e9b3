//! Structure types marshalled by the codec.
//!
//! Every marshallable entity is a [`Structure`]; each concrete type carries a
//! stable one-byte type code that is the sole decode-side dispatch key.
//! Command types additionally embed a [`CommandHeader`] (correlation id plus
//! response-required flag) whose fields precede the subtype's own fields on
//! the wire.

use crate::destination::Destination;

/// Stable one-byte type codes, unique per schema type across all versions.
pub mod type_codes {
    /// Negotiation structure exchanged during the handshake.
    pub const WIREFORMAT_INFO: u8 = 1;
    /// Connection establishment command.
    pub const CONNECTION_INFO: u8 = 3;
    /// Session establishment command.
    pub const SESSION_INFO: u8 = 4;
    /// Consumer registration command.
    pub const CONSUMER_INFO: u8 = 5;
    /// Producer registration command.
    pub const PRODUCER_INFO: u8 = 6;
    /// Liveness probe command.
    pub const KEEP_ALIVE_INFO: u8 = 10;
    /// Orderly shutdown command.
    pub const SHUTDOWN_INFO: u8 = 11;
    /// Resource removal command.
    pub const REMOVE_INFO: u8 = 12;
    /// Positive reply to a response-required command.
    pub const RESPONSE: u8 = 30;
    /// Error reply carrying a remote exception.
    pub const EXCEPTION_RESPONSE: u8 = 31;
    /// Broker-to-broker dispatch notification.
    pub const MESSAGE_DISPATCH_NOTIFICATION: u8 = 90;
    /// Queue destination.
    pub const QUEUE: u8 = 100;
    /// Topic destination.
    pub const TOPIC: u8 = 101;
    /// Temporary queue destination.
    pub const TEMP_QUEUE: u8 = 102;
    /// Temporary topic destination.
    pub const TEMP_TOPIC: u8 = 103;
    /// Message identifier.
    pub const MESSAGE_ID: u8 = 110;
    /// Connection identifier.
    pub const CONNECTION_ID: u8 = 120;
    /// Session identifier.
    pub const SESSION_ID: u8 = 121;
    /// Consumer identifier.
    pub const CONSUMER_ID: u8 = 122;
    /// Producer identifier.
    pub const PRODUCER_ID: u8 = 123;
    /// Broker identifier.
    pub const BROKER_ID: u8 = 124;
}

/// Fields shared by every command: the correlation id used for
/// request/response framing and the response-required flag.
///
/// On the wire these precede the subtype's own fields, mirroring the
/// delegation chain in the marshallers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CommandHeader {
    /// Correlation id assigned by the sender.
    pub command_id: i32,
    /// True if the sender expects a [`Response`] carrying this id.
    pub response_required: bool,
}

/// Identifier of one client connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    /// Unique connection identifier string.
    pub value: String,
}

/// Identifier of one session within a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SessionId {
    /// Owning connection's identifier string.
    pub connection_id: String,
    /// Session sequence within the connection.
    pub value: i64,
}

/// Identifier of one consumer within a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConsumerId {
    /// Owning connection's identifier string.
    pub connection_id: String,
    /// Owning session sequence.
    pub session_id: i64,
    /// Consumer sequence within the session.
    pub value: i64,
}

/// Identifier of one producer within a session.
///
/// Wire order is connection id, value, session id (a historical quirk kept
/// for schema stability).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProducerId {
    /// Owning connection's identifier string.
    pub connection_id: String,
    /// Producer sequence within the session.
    pub value: i64,
    /// Owning session sequence.
    pub session_id: i64,
}

/// Identifier of one broker in a network of brokers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BrokerId {
    /// Unique broker identifier string.
    pub value: String,
}

/// Identifier of one message, scoped to the producer that sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MessageId {
    /// Producer that originated the message; cache-eligible.
    pub producer_id: Option<ProducerId>,
    /// Sequence assigned by the producer.
    pub producer_sequence_id: i64,
    /// Sequence assigned by the broker on store.
    pub broker_sequence_id: i64,
}

/// A remote error carried inside an [`ExceptionResponse`].
///
/// Encoded as `[present][class][message][recursive cause]`; the cause chain
/// nests arbitrarily deep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RemoteError {
    /// Error class or category name on the remote peer.
    pub exception_class: String,
    /// Human-readable message, if any.
    pub message: Option<String>,
    /// The error that caused this one, if any.
    pub cause: Option<Box<RemoteError>>,
}

/// Negotiation structure exchanged during the connection handshake.
///
/// This is the only structure a context accepts before it is active; it is
/// always loose-encoded at the base protocol version so either peer can parse
/// it before any agreement exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WireFormatInfo {
    /// Fixed 8-byte magic preamble identifying the protocol.
    pub magic: [u8; 8],
    /// Highest protocol version the sender is willing to speak.
    pub version: u32,
    /// True if the sender offers tight encoding.
    pub tight_encoding_enabled: bool,
    /// True if the sender offers the cached-object dictionary.
    pub cache_enabled: bool,
    /// Max frame size in bytes the sender will accept.
    pub max_frame_size: i32,
    /// Max read-inactivity duration in milliseconds the sender tolerates.
    pub max_inactivity_duration: i32,
    /// Opaque extension properties; ignored by peers that carry none.
    pub marshalled_properties: Option<Vec<u8>>,
}

impl Default for WireFormatInfo {
    fn default() -> Self {
        Self {
            magic: brokerwire_core::constants::MAGIC,
            version: brokerwire_core::constants::PROTOCOL_VERSION,
            tight_encoding_enabled: false,
            cache_enabled: false,
            max_frame_size: brokerwire_core::constants::DEFAULT_MAX_FRAME_SIZE,
            max_inactivity_duration: brokerwire_core::constants::DEFAULT_MAX_INACTIVITY_DURATION,
            marshalled_properties: None,
        }
    }
}

/// Opens a connection to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionInfo {
    /// Shared command fields.
    pub header: CommandHeader,
    /// The connection being established; cache-eligible.
    pub connection_id: Option<ConnectionId>,
    /// Client-assigned identifier.
    pub client_id: Option<String>,
    /// Authentication credential.
    pub password: Option<String>,
    /// Authentication principal.
    pub user_name: Option<String>,
    /// Brokers this command already passed through.
    pub broker_path: Option<Vec<BrokerId>>,
    /// True for broker-to-broker bridge connections.
    pub broker_master_connector: bool,
    /// True if the connection accepts management commands.
    pub manageable: bool,
    /// Master election preference. Since version 2.
    pub client_master: bool,
    /// True if the client reconnects on failure. Since version 6.
    pub fault_tolerant: bool,
    /// True when this connection is a failover reconnect. Since version 6.
    pub failover_reconnect: bool,
    /// Client address as observed by the broker. Since version 8.
    pub client_ip: Option<String>,
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            header: CommandHeader::default(),
            connection_id: None,
            client_id: None,
            password: None,
            user_name: None,
            broker_path: None,
            broker_master_connector: false,
            manageable: false,
            // Pre-version-2 peers always behave as masters.
            client_master: true,
            fault_tolerant: false,
            failover_reconnect: false,
            client_ip: None,
        }
    }
}

/// Opens a session within an established connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SessionInfo {
    /// Shared command fields.
    pub header: CommandHeader,
    /// The session being established; cache-eligible.
    pub session_id: Option<SessionId>,
}

/// Registers a consumer on a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConsumerInfo {
    /// Shared command fields.
    pub header: CommandHeader,
    /// The consumer being registered; cache-eligible.
    pub consumer_id: Option<ConsumerId>,
    /// True if this consumer only browses without consuming.
    pub browser: bool,
    /// Destination consumed from; cache-eligible.
    pub destination: Option<Destination>,
    /// Number of messages the broker may dispatch ahead of acknowledgment.
    pub prefetch_size: i32,
    /// Max pending messages before the broker starts discarding; negative
    /// means no limit.
    pub maximum_pending_message_limit: i32,
    /// True if dispatch to this consumer may be asynchronous.
    pub dispatch_async: bool,
    /// Message selector expression, if any.
    pub selector: Option<String>,
    /// Durable subscription name, if any.
    pub subscription_name: Option<String>,
    /// True if locally produced messages are skipped.
    pub no_local: bool,
    /// True if this consumer demands exclusive access.
    pub exclusive: bool,
    /// True if a retroactive (history-replaying) consumer.
    pub retroactive: bool,
    /// Dispatch priority relative to other consumers.
    pub priority: u8,
    /// Brokers this command already passed through.
    pub broker_path: Option<Vec<BrokerId>>,
}

/// Registers a producer on a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProducerInfo {
    /// Shared command fields.
    pub header: CommandHeader,
    /// The producer being registered; cache-eligible.
    pub producer_id: Option<ProducerId>,
    /// Destination produced to; cache-eligible.
    pub destination: Option<Destination>,
    /// Brokers this command already passed through.
    pub broker_path: Option<Vec<BrokerId>>,
    /// True if sends need no broker acknowledgment. Since version 2.
    pub dispatch_async: bool,
    /// Producer flow-control window in bytes; zero disables. Since version 3.
    pub window_size: i32,
}

/// Liveness probe; carries no fields of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeepAliveInfo {
    /// Shared command fields.
    pub header: CommandHeader,
}

/// Announces an orderly shutdown; carries no fields of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShutdownInfo {
    /// Shared command fields.
    pub header: CommandHeader,
}

/// Removes a previously registered resource (connection, session, consumer,
/// or producer), named by its identifier structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RemoveInfo {
    /// Shared command fields.
    pub header: CommandHeader,
    /// Identifier of the resource to remove; cache-eligible and
    /// generically typed (any id structure may appear here).
    pub object_id: Option<Box<Structure>>,
    /// Last dispatched-and-delivered sequence, for graceful consumer
    /// removal. Since version 5.
    pub last_delivered_sequence_id: i64,
}

/// Broker-to-broker notification that a message was dispatched to a
/// consumer, used to keep duplicated subscription state in sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MessageDispatchNotification {
    /// Shared command fields.
    pub header: CommandHeader,
    /// Consumer the message was dispatched to; cache-eligible.
    pub consumer_id: Option<ConsumerId>,
    /// Destination the message was consumed from; cache-eligible.
    pub destination: Option<Destination>,
    /// Broker delivery sequence.
    pub delivery_sequence_id: i64,
    /// The dispatched message's identifier.
    pub message_id: Option<MessageId>,
}

/// Positive reply to a command that required a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Response {
    /// Shared command fields.
    pub header: CommandHeader,
    /// `command_id` of the command being answered.
    pub correlation_id: i32,
}

/// Error reply to a command that required a response.
///
/// Extends [`Response`] on the wire: the correlation id precedes the
/// exception, mirroring the marshaller delegation chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExceptionResponse {
    /// Shared command fields.
    pub header: CommandHeader,
    /// `command_id` of the command being answered.
    pub correlation_id: i32,
    /// The error raised by the remote peer.
    pub exception: Option<RemoteError>,
}

/// Any marshallable entity known to the codec.
///
/// The variant's declared type code is immutable and is the sole key used
/// for decode-side dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Structure {
    /// Connection identifier (cache-eligible).
    ConnectionId(ConnectionId),
    /// Session identifier (cache-eligible).
    SessionId(SessionId),
    /// Consumer identifier (cache-eligible).
    ConsumerId(ConsumerId),
    /// Producer identifier (cache-eligible).
    ProducerId(ProducerId),
    /// Broker identifier (cache-eligible).
    BrokerId(BrokerId),
    /// Message identifier.
    MessageId(MessageId),
    /// Destination (cache-eligible; four concrete type codes).
    Destination(Destination),
    /// Negotiation structure.
    WireFormatInfo(WireFormatInfo),
    /// Connection establishment command.
    ConnectionInfo(ConnectionInfo),
    /// Session establishment command.
    SessionInfo(SessionInfo),
    /// Consumer registration command.
    ConsumerInfo(ConsumerInfo),
    /// Producer registration command.
    ProducerInfo(ProducerInfo),
    /// Liveness probe command.
    KeepAliveInfo(KeepAliveInfo),
    /// Orderly shutdown command.
    ShutdownInfo(ShutdownInfo),
    /// Resource removal command.
    RemoveInfo(RemoveInfo),
    /// Dispatch notification command.
    MessageDispatchNotification(MessageDispatchNotification),
    /// Positive command reply.
    Response(Response),
    /// Error command reply.
    ExceptionResponse(ExceptionResponse),
}

impl Structure {
    /// Returns the structure's declared one-byte type code.
    pub fn type_code(&self) -> u8 {
        match self {
            Structure::ConnectionId(_) => type_codes::CONNECTION_ID,
            Structure::SessionId(_) => type_codes::SESSION_ID,
            Structure::ConsumerId(_) => type_codes::CONSUMER_ID,
            Structure::ProducerId(_) => type_codes::PRODUCER_ID,
            Structure::BrokerId(_) => type_codes::BROKER_ID,
            Structure::MessageId(_) => type_codes::MESSAGE_ID,
            Structure::Destination(d) => d.type_code(),
            Structure::WireFormatInfo(_) => type_codes::WIREFORMAT_INFO,
            Structure::ConnectionInfo(_) => type_codes::CONNECTION_INFO,
            Structure::SessionInfo(_) => type_codes::SESSION_INFO,
            Structure::ConsumerInfo(_) => type_codes::CONSUMER_INFO,
            Structure::ProducerInfo(_) => type_codes::PRODUCER_INFO,
            Structure::KeepAliveInfo(_) => type_codes::KEEP_ALIVE_INFO,
            Structure::ShutdownInfo(_) => type_codes::SHUTDOWN_INFO,
            Structure::RemoveInfo(_) => type_codes::REMOVE_INFO,
            Structure::MessageDispatchNotification(_) => {
                type_codes::MESSAGE_DISPATCH_NOTIFICATION
            }
            Structure::Response(_) => type_codes::RESPONSE,
            Structure::ExceptionResponse(_) => type_codes::EXCEPTION_RESPONSE,
        }
    }

    /// Returns the shared command header if this structure is a command.
    pub fn command_header(&self) -> Option<&CommandHeader> {
        match self {
            Structure::ConnectionInfo(c) => Some(&c.header),
            Structure::SessionInfo(c) => Some(&c.header),
            Structure::ConsumerInfo(c) => Some(&c.header),
            Structure::ProducerInfo(c) => Some(&c.header),
            Structure::KeepAliveInfo(c) => Some(&c.header),
            Structure::ShutdownInfo(c) => Some(&c.header),
            Structure::RemoveInfo(c) => Some(&c.header),
            Structure::MessageDispatchNotification(c) => Some(&c.header),
            Structure::Response(c) => Some(&c.header),
            Structure::ExceptionResponse(c) => Some(&c.header),
            _ => None,
        }
    }

    /// Returns true if this structure's type participates in the
    /// cached-object dictionary.
    pub fn is_cache_eligible(&self) -> bool {
        matches!(
            self,
            Structure::ConnectionId(_)
                | Structure::SessionId(_)
                | Structure::ConsumerId(_)
                | Structure::ProducerId(_)
                | Structure::BrokerId(_)
                | Structure::Destination(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        let id = Structure::SessionId(SessionId { connection_id: "c1".into(), value: 2 });
        assert_eq!(id.type_code(), type_codes::SESSION_ID);
        assert!(id.is_cache_eligible());
        assert!(id.command_header().is_none());

        let cmd = Structure::ShutdownInfo(ShutdownInfo::default());
        assert_eq!(cmd.type_code(), type_codes::SHUTDOWN_INFO);
        assert!(!cmd.is_cache_eligible());
        assert!(cmd.command_header().is_some());
    }

    #[test]
    fn test_id_value_equality() {
        let a = ConsumerId { connection_id: "c".into(), session_id: 1, value: 9 };
        let b = ConsumerId { connection_id: "c".into(), session_id: 1, value: 9 };
        assert_eq!(a, b);
        assert_ne!(a, ConsumerId { connection_id: "c".into(), session_id: 1, value: 10 });
    }
}
