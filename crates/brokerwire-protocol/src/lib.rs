#![warn(missing_docs)]

//! brokerwire-protocol: structure types, schema tables, and the wire codec.
//!
//! The codec converts typed command/data structures to and from the compact
//! binary representation exchanged between clients and brokers. Two encoding
//! strategies are supported per connection:
//!
//! - *tight* encoding: a precomputed boolean-flag block plus a cached-object
//!   dictionary that deduplicates frequently repeated reference structures;
//! - *loose* encoding: every field written unconditionally with explicit
//!   presence markers, larger on the wire but single-pass.
//!
//! Which strategy applies, and which protocol version gates the field set,
//! is fixed by a single handshake exchange per connection
//! (see [`codec::WireFormatContext`]).

/// Command and identifier structure types.
pub mod command;
/// The marshalling engine: flag stream, cache table, marshallers, registry,
/// and the per-connection wire-format context.
pub mod codec;
/// Destination types and their capability queries.
pub mod destination;
/// Static per-type field descriptions consumed by the marshallers.
pub mod schema;

pub use codec::{BitFlagStream, EncodingMode, MarshallerRegistry, ObjectCacheTable, WireFormatContext};
pub use command::{CommandHeader, Structure, WireFormatInfo};
pub use destination::Destination;
