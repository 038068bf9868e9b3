//! The marshalling engine.
//!
//! Layers, bottom up:
//!
//! - [`bit_flags`]: the tight-mode boolean flag block;
//! - [`primitives`]: field-level encodings shared by every marshaller;
//! - [`cache`]: the per-connection cached-object dictionary;
//! - [`marshaller`]: the per-type encode/decode contract plus helpers for
//!   nested, cached, array, and throwable fields;
//! - [`marshallers`]: one implementation per structure type;
//! - [`registry`]: type-code-indexed dispatch;
//! - [`wire_format`]: the per-connection context and negotiation.

pub mod bit_flags;
pub mod cache;
pub mod marshaller;
pub mod marshallers;
pub mod primitives;
pub mod registry;
pub mod wire_format;

pub use bit_flags::BitFlagStream;
pub use cache::ObjectCacheTable;
pub use marshaller::{DecodeContext, EncodeContext, Marshaller};
pub use registry::MarshallerRegistry;
pub use wire_format::{EncodingMode, WireFormatContext};

#[cfg(test)]
mod tests;
