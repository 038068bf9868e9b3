//! Per-type marshaller implementations.
//!
//! One marshaller per structure type, grouped by family:
//!
//! - [`ids`] - identifier structures
//! - [`destinations`] - the four destination kinds
//! - [`commands`] - command structures and the negotiation frame
//!
//! Command marshallers delegate to the shared base-command encoding first,
//! so base fields precede subtype fields on the wire.

pub mod commands;
pub mod destinations;
pub mod ids;

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use brokerwire_core::error::{ErrorKind, Result};

use super::bit_flags::BitFlagStream;
use crate::command::{CommandHeader, ConsumerId, MessageId, ProducerId, SessionId, Structure};
use crate::command::ConnectionId;
use crate::destination::Destination;

/// Shared encoding of the base-command fields (command id, response
/// required). Every command marshaller invokes these before its own fields.
pub(crate) mod base {
    use super::*;

    /// Tight flags pass: the response-required flag plus 4 fixed bytes for
    /// the command id.
    pub fn tight_flags(header: &CommandHeader, flags: &mut BitFlagStream) -> usize {
        flags.write(header.response_required);
        4
    }

    /// Tight payload pass.
    pub fn tight_payload(
        header: &CommandHeader,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        out.write_i32::<BigEndian>(header.command_id)?;
        flags.read()?;
        Ok(())
    }

    /// Tight decode.
    pub fn tight_decode(
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<CommandHeader> {
        let command_id = input.read_i32::<BigEndian>()?;
        let response_required = flags.read()?;
        Ok(CommandHeader { command_id, response_required })
    }

    /// Loose encode.
    pub fn loose_write(header: &CommandHeader, out: &mut Vec<u8>) -> Result<()> {
        out.write_i32::<BigEndian>(header.command_id)?;
        super::super::primitives::loose_write_bool(header.response_required, out)
    }

    /// Loose decode.
    pub fn loose_read(input: &mut Cursor<&[u8]>) -> Result<CommandHeader> {
        let command_id = input.read_i32::<BigEndian>()?;
        let response_required = super::super::primitives::loose_read_bool(input)?;
        Ok(CommandHeader { command_id, response_required })
    }
}

fn unexpected(expected: &'static str, got: Structure) -> ErrorKind {
    ErrorKind::MalformedField(format!(
        "expected {expected}, decoded type code {}",
        got.type_code()
    ))
}

/// Downcasts a decoded optional structure to a `ConnectionId` field.
pub(crate) fn as_connection_id(value: Option<Structure>) -> Result<Option<ConnectionId>> {
    match value {
        None => Ok(None),
        Some(Structure::ConnectionId(id)) => Ok(Some(id)),
        Some(other) => Err(unexpected("ConnectionId", other)),
    }
}

/// Downcasts a decoded optional structure to a `SessionId` field.
pub(crate) fn as_session_id(value: Option<Structure>) -> Result<Option<SessionId>> {
    match value {
        None => Ok(None),
        Some(Structure::SessionId(id)) => Ok(Some(id)),
        Some(other) => Err(unexpected("SessionId", other)),
    }
}

/// Downcasts a decoded optional structure to a `ConsumerId` field.
pub(crate) fn as_consumer_id(value: Option<Structure>) -> Result<Option<ConsumerId>> {
    match value {
        None => Ok(None),
        Some(Structure::ConsumerId(id)) => Ok(Some(id)),
        Some(other) => Err(unexpected("ConsumerId", other)),
    }
}

/// Downcasts a decoded optional structure to a `ProducerId` field.
pub(crate) fn as_producer_id(value: Option<Structure>) -> Result<Option<ProducerId>> {
    match value {
        None => Ok(None),
        Some(Structure::ProducerId(id)) => Ok(Some(id)),
        Some(other) => Err(unexpected("ProducerId", other)),
    }
}

/// Downcasts a decoded optional structure to a `MessageId` field.
pub(crate) fn as_message_id(value: Option<Structure>) -> Result<Option<MessageId>> {
    match value {
        None => Ok(None),
        Some(Structure::MessageId(id)) => Ok(Some(id)),
        Some(other) => Err(unexpected("MessageId", other)),
    }
}

/// Downcasts a decoded optional structure to a `Destination` field.
pub(crate) fn as_destination(value: Option<Structure>) -> Result<Option<Destination>> {
    match value {
        None => Ok(None),
        Some(Structure::Destination(destination)) => Ok(Some(destination)),
        Some(other) => Err(unexpected("Destination", other)),
    }
}
