#![warn(missing_docs)]

//! brokerwire-core: foundational types and utilities.
//!
//! This crate provides the minimal set of core items shared across all layers:
//! - Configuration types
//! - Error handling
//! - Protocol constants
//!
//! Codec logic lives in `brokerwire-protocol`.

/// Protocol constants shared across layers.
pub mod constants {
    /// Magic bytes opening every negotiation frame.
    pub const MAGIC: [u8; 8] = *b"BrkrWire";
    /// Highest protocol version this codec can speak.
    pub const PROTOCOL_VERSION: u32 = 9;
    /// Lowest protocol version a peer may negotiate down to.
    pub const MINIMUM_VERSION: u32 = 1;
    /// Version used for the negotiation exchange itself, before any
    /// agreement exists. Negotiation frames are always loose-encoded at
    /// this version so both peers can parse them unconditionally.
    pub const BASE_VERSION: u32 = 1;
    /// Default upper bound on a single frame, in bytes.
    pub const DEFAULT_MAX_FRAME_SIZE: i32 = 100 * 1024 * 1024;
    /// Default read-inactivity bound advertised during negotiation, in
    /// milliseconds. Enforcement belongs to the transport.
    pub const DEFAULT_MAX_INACTIVITY_DURATION: i32 = 30_000;
    /// Default ceiling on encode-side cache slots per connection. Past the
    /// ceiling, repeated structures re-encode in full; the wire stays
    /// symmetric because the decoder registers exactly once per fresh flag.
    pub const DEFAULT_CACHE_SIZE: usize = 16 * 1024;
}

/// Configuration options for the codec.
pub mod config;
/// Error types and results.
pub mod error;
