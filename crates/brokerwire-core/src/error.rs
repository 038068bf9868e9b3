use std::io;

use thiserror::Error;

/// Errors surfaced by the codec.
///
/// Every variant is fatal to the connection it occurred on: the flag stream
/// and the cache table have no resynchronization mechanism, so a corrupted
/// structure invalidates the whole frame and the transport must tear the
/// connection down.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A decode frame carried a type code with no registered marshaller.
    #[error("unknown structure type code: {0}")]
    UnknownTypeCode(u8),

    /// A cached-field reference named a slot that was never assigned,
    /// meaning the two peers' cache state has diverged.
    #[error("unknown cache slot: {0}")]
    UnknownCacheSlot(u16),

    /// More boolean flags were consumed than the flag block carried. This
    /// indicates a version or schema mismatch between the peers.
    #[error("bit flag stream exhausted")]
    StreamExhausted,

    /// The input ended before the structure was complete.
    #[error("truncated input stream")]
    TruncatedStream,

    /// A length prefix, discriminant, or field payload was invalid.
    #[error("malformed field: {0}")]
    MalformedField(String),

    /// Negotiation could not reconcile the two proposals to a supported
    /// version.
    #[error("unsupported protocol version {proposed} (minimum supported is {minimum})")]
    VersionUnsupported {
        /// The effective version the reconciliation arrived at.
        proposed: u32,
        /// The lowest version this codec supports.
        minimum: u32,
    },

    /// A codec operation other than the negotiation exchange was attempted
    /// before the context reached the active state.
    #[error("wire format negotiation has not completed")]
    HandshakeIncomplete,

    /// A codec operation was attempted on a closed context.
    #[error("wire format context is closed")]
    ContextClosed,
}

impl From<io::Error> for ErrorKind {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => ErrorKind::TruncatedStream,
            _ => ErrorKind::MalformedField(e.to_string()),
        }
    }
}

/// Result alias used throughout the codec.
pub type Result<T> = std::result::Result<T, ErrorKind>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ErrorKind::UnknownTypeCode(200).to_string(),
            "unknown structure type code: 200"
        );
        assert_eq!(ErrorKind::UnknownCacheSlot(7).to_string(), "unknown cache slot: 7");
        assert_eq!(
            ErrorKind::VersionUnsupported { proposed: 0, minimum: 1 }.to_string(),
            "unsupported protocol version 0 (minimum supported is 1)"
        );
    }

    #[test]
    fn test_eof_maps_to_truncated_stream() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(ErrorKind::from(eof), ErrorKind::TruncatedStream));

        let other = io::Error::new(io::ErrorKind::InvalidData, "bad");
        assert!(matches!(ErrorKind::from(other), ErrorKind::MalformedField(_)));
    }
}
