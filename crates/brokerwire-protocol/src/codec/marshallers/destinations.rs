//! Marshallers for the four destination kinds.
//!
//! All destinations share a single wire shape, a physical name string, so
//! one marshaller type is instantiated once per type code.

use std::io::Cursor;

use brokerwire_core::error::{ErrorKind, Result};

use super::super::bit_flags::BitFlagStream;
use super::super::marshaller::{wrong_structure, DecodeContext, EncodeContext, Marshaller};
use super::super::primitives::{
    loose_read_string, loose_write_string, tight_string_decode, tight_string_flags,
    tight_string_payload,
};
use crate::command::{type_codes, Structure};
use crate::destination::Destination;
use crate::schema::{self, SchemaDescriptor};

/// Marshaller for one destination kind, parameterised by type code.
pub struct DestinationMarshaller {
    code: u8,
}

impl DestinationMarshaller {
    /// Creates the marshaller for the destination kind with `code`.
    pub const fn new(code: u8) -> Self {
        Self { code }
    }

    fn check<'a>(&self, obj: &'a Structure) -> Result<&'a Destination> {
        match obj {
            Structure::Destination(destination) if destination.type_code() == self.code => {
                Ok(destination)
            }
            other => Err(wrong_structure("Destination", other)),
        }
    }
}

impl Marshaller for DestinationMarshaller {
    fn type_code(&self) -> u8 {
        self.code
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        match self.code {
            type_codes::QUEUE => &schema::QUEUE,
            type_codes::TOPIC => &schema::TOPIC,
            type_codes::TEMP_QUEUE => &schema::TEMP_QUEUE,
            _ => &schema::TEMP_TOPIC,
        }
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let destination = self.check(obj)?;
        tight_string_flags(Some(destination.physical_name()), flags)
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let destination = self.check(obj)?;
        tight_string_payload(Some(destination.physical_name()), out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let name = tight_string_decode(input, flags)?.unwrap_or_default();
        let destination = Destination::from_type_code(self.code, name)
            .ok_or(ErrorKind::UnknownTypeCode(self.code))?;
        Ok(Structure::Destination(destination))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let destination = self.check(obj)?;
        loose_write_string(Some(destination.physical_name()), out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let name = loose_read_string(input)?.unwrap_or_default();
        let destination = Destination::from_type_code(self.code, name)
            .ok_or(ErrorKind::UnknownTypeCode(self.code))?;
        Ok(Structure::Destination(destination))
    }
}
