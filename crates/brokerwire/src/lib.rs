#![warn(missing_docs)]

//! Brokerwire: a small public API facade for the workspace.
//!
//! This crate provides a clean, stable surface that re-exports
//! the most commonly used types for speaking the broker wire format:
//!
//! - The per-connection codec (`WireFormatContext`, `EncodingMode`)
//! - Structure types (`Structure`, `Destination`, command structs)
//! - Core configuration and errors (`CodecConfig`, `ErrorKind`)
//!
//! Example
//! ```
//! use brokerwire::{CodecConfig, Structure, WireFormatContext};
//! use brokerwire::command::{CommandHeader, KeepAliveInfo};
//!
//! let mut client = WireFormatContext::new(CodecConfig::default());
//! let mut broker = WireFormatContext::new(CodecConfig::default());
//!
//! // Exchange preferences, then freeze the connection settings.
//! let client_hello = client.local_wire_format_info();
//! let broker_hello = broker.local_wire_format_info();
//! client.negotiate(&broker_hello).unwrap();
//! broker.negotiate(&client_hello).unwrap();
//!
//! let ping = Structure::KeepAliveInfo(KeepAliveInfo {
//!     header: CommandHeader { command_id: 1, response_required: false },
//! });
//! let frame = client.marshal(&ping).unwrap();
//! assert_eq!(broker.unmarshal(&frame).unwrap(), ping);
//! ```

// Core configuration, errors, and protocol constants
pub use brokerwire_core::config::CodecConfig;
pub use brokerwire_core::constants;
pub use brokerwire_core::error::{ErrorKind, Result};
// Protocol: the codec and the structure types it carries
pub use brokerwire_protocol::{
    command, destination, schema, Destination, EncodingMode, Structure, WireFormatContext,
    WireFormatInfo,
};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        CodecConfig, Destination, EncodingMode, ErrorKind, Result, Structure, WireFormatContext,
        WireFormatInfo,
    };
}
