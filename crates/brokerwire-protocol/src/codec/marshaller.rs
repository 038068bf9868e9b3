//! The per-type marshalling contract and composite field helpers.
//!
//! A [`Marshaller`] implements the encode/decode contract for exactly one
//! structure type. Tight encoding is three-phase: a flags pass walks the
//! fields writing booleans and accumulating the fixed byte count, the packed
//! flag block is emitted, then a payload pass re-walks the same fields in
//! the same order writing actual bytes and replaying the recorded flags to
//! pick branches. Loose encoding is single-pass. Decode mirrors each mode
//! symmetrically, applying the same version gate to select the field subset
//! and the same flag-consumption order.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use brokerwire_core::error::{ErrorKind, Result};

use super::bit_flags::BitFlagStream;
use super::cache::ObjectCacheTable;
use super::primitives;
use super::registry::MarshallerRegistry;
use crate::command::{BrokerId, RemoteError, Structure};
use crate::schema::SchemaDescriptor;

/// Deepest remote-error cause chain accepted on decode.
const MAX_ERROR_CAUSE_DEPTH: usize = 32;

/// Per-call encode state: the frozen negotiation outcome plus the
/// connection's registry and cache table.
pub struct EncodeContext<'a> {
    /// Negotiated protocol version gating the field set.
    pub version: u32,
    /// True if the cached-object dictionary is in use.
    pub cache_enabled: bool,
    /// The connection's dispatch table.
    pub registry: &'a MarshallerRegistry,
    /// The connection's slot table (encode side).
    pub cache: &'a mut ObjectCacheTable,
}

/// Per-call decode state, mirroring [`EncodeContext`].
pub struct DecodeContext<'a> {
    /// Negotiated protocol version gating the field set.
    pub version: u32,
    /// True if the cached-object dictionary is in use.
    pub cache_enabled: bool,
    /// The connection's dispatch table.
    pub registry: &'a MarshallerRegistry,
    /// The connection's slot table (decode side).
    pub cache: &'a mut ObjectCacheTable,
}

/// Encode/decode contract for one structure type.
///
/// Implementations delegate to their supertype's field encoding first (base
/// fields precede subtype fields on the wire) and walk their own fields in
/// schema order, consulting the static field table for version gates.
pub trait Marshaller: Send + Sync {
    /// The one-byte type code this marshaller handles.
    fn type_code(&self) -> u8;

    /// The static schema this marshaller encodes against.
    fn schema(&self) -> &'static SchemaDescriptor;

    /// Tight phase 1: writes this structure's boolean flags and returns the
    /// byte count its payload will occupy.
    fn tight_encode_flags(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize>;

    /// Tight phase 2: writes payload bytes, replaying the recorded flags.
    fn tight_encode_payload(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()>;

    /// Tight decode: consumes flags and payload bytes in encode order.
    fn tight_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure>;

    /// Loose single-pass encode with explicit presence markers.
    fn loose_encode(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()>;

    /// Loose single-pass decode.
    fn loose_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure>;
}

/// Error for a marshaller handed a structure of a different type; reaching
/// this means the registry and the structure's declared code disagree.
pub(crate) fn wrong_structure(expected: &'static str, got: &Structure) -> ErrorKind {
    ErrorKind::MalformedField(format!(
        "{expected} marshaller received type code {}",
        got.type_code()
    ))
}

// ----- nested structures ---------------------------------------------------
//
// Wire shape: [present:flag][type code][fields...]

/// Tight flags pass for an optional nested structure.
pub fn tight_nested_flags(
    value: Option<&Structure>,
    ctx: &mut EncodeContext<'_>,
    flags: &mut BitFlagStream,
) -> Result<usize> {
    match value {
        None => {
            flags.write(false);
            Ok(0)
        }
        Some(nested) => {
            flags.write(true);
            let registry = ctx.registry;
            let marshaller = registry.for_structure(nested)?;
            let rc = marshaller.tight_encode_flags(nested, ctx, flags)?;
            Ok(rc + 1)
        }
    }
}

/// Tight payload pass for an optional nested structure.
pub fn tight_nested_payload(
    value: Option<&Structure>,
    ctx: &mut EncodeContext<'_>,
    out: &mut Vec<u8>,
    flags: &mut BitFlagStream,
) -> Result<()> {
    if flags.read()? {
        let nested = value.ok_or_else(|| {
            ErrorKind::MalformedField("presence flag set for absent nested structure".into())
        })?;
        out.write_u8(nested.type_code())?;
        let registry = ctx.registry;
        let marshaller = registry.for_structure(nested)?;
        marshaller.tight_encode_payload(nested, ctx, out, flags)?;
    }
    Ok(())
}

/// Tight decode of an optional nested structure.
pub fn tight_nested_decode(
    ctx: &mut DecodeContext<'_>,
    input: &mut Cursor<&[u8]>,
    flags: &mut BitFlagStream,
) -> Result<Option<Structure>> {
    if flags.read()? {
        let code = input.read_u8()?;
        let registry = ctx.registry;
        let marshaller = registry.for_type_code(code)?;
        Ok(Some(marshaller.tight_decode(ctx, input, flags)?))
    } else {
        Ok(None)
    }
}

/// Loose encode of an optional nested structure.
pub fn loose_nested_write(
    value: Option<&Structure>,
    ctx: &mut EncodeContext<'_>,
    out: &mut Vec<u8>,
) -> Result<()> {
    match value {
        None => primitives::loose_write_bool(false, out),
        Some(nested) => {
            primitives::loose_write_bool(true, out)?;
            out.write_u8(nested.type_code())?;
            let registry = ctx.registry;
            let marshaller = registry.for_structure(nested)?;
            marshaller.loose_encode(nested, ctx, out)
        }
    }
}

/// Loose decode of an optional nested structure.
pub fn loose_nested_read(
    ctx: &mut DecodeContext<'_>,
    input: &mut Cursor<&[u8]>,
) -> Result<Option<Structure>> {
    if primitives::loose_read_bool(input)? {
        let code = input.read_u8()?;
        let registry = ctx.registry;
        let marshaller = registry.for_type_code(code)?;
        Ok(Some(marshaller.loose_decode(ctx, input)?))
    } else {
        Ok(None)
    }
}

// ----- cached structures ---------------------------------------------------
//
// Wire shape: [present:flag][fresh:flag][if fresh: type code + fields;
// else: u16 slot]. Fresh entries never carry a slot number; the decoder
// reconstructs it from the registration sequence. With caching negotiated
// off, the field degrades to plain nested encoding. Loose mode never uses
// the cache.

/// Tight flags pass for an optional cache-eligible structure. Assigns the
/// slot here so the payload pass and every later occurrence observe it.
pub fn tight_cached_flags(
    value: Option<&Structure>,
    ctx: &mut EncodeContext<'_>,
    flags: &mut BitFlagStream,
) -> Result<usize> {
    if !ctx.cache_enabled {
        return tight_nested_flags(value, ctx, flags);
    }
    match value {
        None => {
            flags.write(false);
            Ok(0)
        }
        Some(structure) => {
            flags.write(true);
            let (_, fresh) = ctx.cache.assign_if_absent(structure);
            flags.write(fresh);
            if fresh {
                let registry = ctx.registry;
                let marshaller = registry.for_structure(structure)?;
                let rc = marshaller.tight_encode_flags(structure, ctx, flags)?;
                Ok(rc + 1)
            } else {
                Ok(2)
            }
        }
    }
}

/// Tight payload pass for an optional cache-eligible structure.
pub fn tight_cached_payload(
    value: Option<&Structure>,
    ctx: &mut EncodeContext<'_>,
    out: &mut Vec<u8>,
    flags: &mut BitFlagStream,
) -> Result<()> {
    if !ctx.cache_enabled {
        return tight_nested_payload(value, ctx, out, flags);
    }
    if flags.read()? {
        let structure = value.ok_or_else(|| {
            ErrorKind::MalformedField("presence flag set for absent cached structure".into())
        })?;
        if flags.read()? {
            out.write_u8(structure.type_code())?;
            let registry = ctx.registry;
            let marshaller = registry.for_structure(structure)?;
            marshaller.tight_encode_payload(structure, ctx, out, flags)?;
        } else {
            let slot = ctx.cache.slot_of(structure).ok_or_else(|| {
                ErrorKind::MalformedField("cached flag set for unassigned structure".into())
            })?;
            out.write_u16::<BigEndian>(slot)?;
        }
    }
    Ok(())
}

/// Tight decode of an optional cache-eligible structure. Fresh entries are
/// registered at the next sequential slot, mirroring the encoder.
pub fn tight_cached_decode(
    ctx: &mut DecodeContext<'_>,
    input: &mut Cursor<&[u8]>,
    flags: &mut BitFlagStream,
) -> Result<Option<Structure>> {
    if !ctx.cache_enabled {
        return tight_nested_decode(ctx, input, flags);
    }
    if !flags.read()? {
        return Ok(None);
    }
    if flags.read()? {
        let code = input.read_u8()?;
        let registry = ctx.registry;
        let marshaller = registry.for_type_code(code)?;
        let structure = marshaller.tight_decode(ctx, input, flags)?;
        ctx.cache.register_at_next_slot(structure.clone());
        Ok(Some(structure))
    } else {
        let slot = input.read_u16::<BigEndian>()?;
        Ok(Some(ctx.cache.lookup(slot)?.clone()))
    }
}

/// Loose encode of a cache-eligible field: plain nested encoding, the loose
/// contract does not share cache state.
pub fn loose_cached_write(
    value: Option<&Structure>,
    ctx: &mut EncodeContext<'_>,
    out: &mut Vec<u8>,
) -> Result<()> {
    loose_nested_write(value, ctx, out)
}

/// Loose decode of a cache-eligible field.
pub fn loose_cached_read(
    ctx: &mut DecodeContext<'_>,
    input: &mut Cursor<&[u8]>,
) -> Result<Option<Structure>> {
    loose_nested_read(ctx, input)
}

// ----- broker-path arrays --------------------------------------------------
//
// Wire shape: [present:flag][u16 count][nested element]*

/// Tight flags pass for an optional broker-id array.
pub fn tight_broker_path_flags(
    value: Option<&[BrokerId]>,
    ctx: &mut EncodeContext<'_>,
    flags: &mut BitFlagStream,
) -> Result<usize> {
    match value {
        None => {
            flags.write(false);
            Ok(0)
        }
        Some(path) => {
            flags.write(true);
            let mut rc = 2;
            for broker in path {
                let element = Structure::BrokerId(broker.clone());
                rc += tight_nested_flags(Some(&element), ctx, flags)?;
            }
            Ok(rc)
        }
    }
}

/// Tight payload pass for an optional broker-id array.
pub fn tight_broker_path_payload(
    value: Option<&[BrokerId]>,
    ctx: &mut EncodeContext<'_>,
    out: &mut Vec<u8>,
    flags: &mut BitFlagStream,
) -> Result<()> {
    if flags.read()? {
        let path = value.ok_or_else(|| {
            ErrorKind::MalformedField("presence flag set for absent broker path".into())
        })?;
        out.write_u16::<BigEndian>(path.len() as u16)?;
        for broker in path {
            let element = Structure::BrokerId(broker.clone());
            tight_nested_payload(Some(&element), ctx, out, flags)?;
        }
    }
    Ok(())
}

/// Tight decode of an optional broker-id array.
pub fn tight_broker_path_decode(
    ctx: &mut DecodeContext<'_>,
    input: &mut Cursor<&[u8]>,
    flags: &mut BitFlagStream,
) -> Result<Option<Vec<BrokerId>>> {
    if flags.read()? {
        let count = input.read_u16::<BigEndian>()? as usize;
        let mut path = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            match tight_nested_decode(ctx, input, flags)? {
                Some(Structure::BrokerId(broker)) => path.push(broker),
                other => {
                    return Err(ErrorKind::MalformedField(format!(
                        "broker path element was {other:?}"
                    )))
                }
            }
        }
        Ok(Some(path))
    } else {
        Ok(None)
    }
}

/// Loose encode of an optional broker-id array.
pub fn loose_broker_path_write(
    value: Option<&[BrokerId]>,
    ctx: &mut EncodeContext<'_>,
    out: &mut Vec<u8>,
) -> Result<()> {
    match value {
        None => primitives::loose_write_bool(false, out),
        Some(path) => {
            primitives::loose_write_bool(true, out)?;
            out.write_u16::<BigEndian>(path.len() as u16)?;
            for broker in path {
                let element = Structure::BrokerId(broker.clone());
                loose_nested_write(Some(&element), ctx, out)?;
            }
            Ok(())
        }
    }
}

/// Loose decode of an optional broker-id array.
pub fn loose_broker_path_read(
    ctx: &mut DecodeContext<'_>,
    input: &mut Cursor<&[u8]>,
) -> Result<Option<Vec<BrokerId>>> {
    if primitives::loose_read_bool(input)? {
        let count = input.read_u16::<BigEndian>()? as usize;
        let mut path = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            match loose_nested_read(ctx, input)? {
                Some(Structure::BrokerId(broker)) => path.push(broker),
                other => {
                    return Err(ErrorKind::MalformedField(format!(
                        "broker path element was {other:?}"
                    )))
                }
            }
        }
        Ok(Some(path))
    } else {
        Ok(None)
    }
}

// ----- remote errors (throwable kind) --------------------------------------
//
// Wire shape: [present][class][message][recursive cause]

/// Tight flags pass for an optional remote error.
pub fn tight_error_flags(
    value: Option<&RemoteError>,
    flags: &mut BitFlagStream,
) -> Result<usize> {
    match value {
        None => {
            flags.write(false);
            Ok(0)
        }
        Some(error) => {
            flags.write(true);
            let mut rc = primitives::tight_string_flags(Some(error.exception_class.as_str()), flags)?;
            rc += primitives::tight_string_flags(error.message.as_deref(), flags)?;
            rc += tight_error_flags(error.cause.as_deref(), flags)?;
            Ok(rc)
        }
    }
}

/// Tight payload pass for an optional remote error.
pub fn tight_error_payload(
    value: Option<&RemoteError>,
    out: &mut Vec<u8>,
    flags: &mut BitFlagStream,
) -> Result<()> {
    if flags.read()? {
        let error = value.ok_or_else(|| {
            ErrorKind::MalformedField("presence flag set for absent remote error".into())
        })?;
        primitives::tight_string_payload(Some(error.exception_class.as_str()), out, flags)?;
        primitives::tight_string_payload(error.message.as_deref(), out, flags)?;
        tight_error_payload(error.cause.as_deref(), out, flags)?;
    }
    Ok(())
}

/// Tight decode of an optional remote error.
pub fn tight_error_decode(
    input: &mut Cursor<&[u8]>,
    flags: &mut BitFlagStream,
) -> Result<Option<RemoteError>> {
    tight_error_decode_depth(input, flags, 0)
}

fn tight_error_decode_depth(
    input: &mut Cursor<&[u8]>,
    flags: &mut BitFlagStream,
    depth: usize,
) -> Result<Option<RemoteError>> {
    if !flags.read()? {
        return Ok(None);
    }
    if depth >= MAX_ERROR_CAUSE_DEPTH {
        return Err(ErrorKind::MalformedField("remote error cause chain too deep".into()));
    }
    let exception_class = primitives::tight_string_decode(input, flags)?.unwrap_or_default();
    let message = primitives::tight_string_decode(input, flags)?;
    let cause = tight_error_decode_depth(input, flags, depth + 1)?.map(Box::new);
    Ok(Some(RemoteError { exception_class, message, cause }))
}

/// Loose encode of an optional remote error.
pub fn loose_error_write(value: Option<&RemoteError>, out: &mut Vec<u8>) -> Result<()> {
    match value {
        None => primitives::loose_write_bool(false, out),
        Some(error) => {
            primitives::loose_write_bool(true, out)?;
            primitives::loose_write_string(Some(error.exception_class.as_str()), out)?;
            primitives::loose_write_string(error.message.as_deref(), out)?;
            loose_error_write(error.cause.as_deref(), out)
        }
    }
}

/// Loose decode of an optional remote error.
pub fn loose_error_read(input: &mut Cursor<&[u8]>) -> Result<Option<RemoteError>> {
    loose_error_read_depth(input, 0)
}

fn loose_error_read_depth(
    input: &mut Cursor<&[u8]>,
    depth: usize,
) -> Result<Option<RemoteError>> {
    if !primitives::loose_read_bool(input)? {
        return Ok(None);
    }
    if depth >= MAX_ERROR_CAUSE_DEPTH {
        return Err(ErrorKind::MalformedField("remote error cause chain too deep".into()));
    }
    let exception_class = primitives::loose_read_string(input)?.unwrap_or_default();
    let message = primitives::loose_read_string(input)?;
    let cause = loose_error_read_depth(input, depth + 1)?.map(Box::new);
    Ok(Some(RemoteError { exception_class, message, cause }))
}
