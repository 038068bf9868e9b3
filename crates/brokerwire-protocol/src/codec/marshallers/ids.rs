//! Marshallers for the identifier structures.

use std::io::Cursor;

use brokerwire_core::error::Result;

use super::super::bit_flags::BitFlagStream;
use super::super::marshaller::{
    tight_cached_decode, tight_cached_flags, tight_cached_payload, wrong_structure,
    DecodeContext, EncodeContext, Marshaller,
};
use super::super::marshaller::{loose_cached_read, loose_cached_write};
use super::super::primitives::{
    loose_read_long, loose_read_string, loose_write_long, loose_write_string,
    tight_long_decode, tight_long_flags, tight_long_payload, tight_string_decode,
    tight_string_flags, tight_string_payload,
};
use crate::command::{
    type_codes, BrokerId, ConnectionId, ConsumerId, MessageId, ProducerId, SessionId, Structure,
};
use crate::schema::{self, SchemaDescriptor};

/// Marshaller for [`ConnectionId`].
pub struct ConnectionIdMarshaller;

impl Marshaller for ConnectionIdMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::CONNECTION_ID
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::CONNECTION_ID
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::ConnectionId(info) => info,
            other => return Err(wrong_structure("ConnectionId", other)),
        };
        tight_string_flags(Some(info.value.as_str()), flags)
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let info = match obj {
            Structure::ConnectionId(info) => info,
            other => return Err(wrong_structure("ConnectionId", other)),
        };
        tight_string_payload(Some(info.value.as_str()), out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let value = tight_string_decode(input, flags)?.unwrap_or_default();
        Ok(Structure::ConnectionId(ConnectionId { value }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::ConnectionId(info) => info,
            other => return Err(wrong_structure("ConnectionId", other)),
        };
        loose_write_string(Some(info.value.as_str()), out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let value = loose_read_string(input)?.unwrap_or_default();
        Ok(Structure::ConnectionId(ConnectionId { value }))
    }
}

/// Marshaller for [`BrokerId`].
pub struct BrokerIdMarshaller;

impl Marshaller for BrokerIdMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::BROKER_ID
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::BROKER_ID
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::BrokerId(info) => info,
            other => return Err(wrong_structure("BrokerId", other)),
        };
        tight_string_flags(Some(info.value.as_str()), flags)
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let info = match obj {
            Structure::BrokerId(info) => info,
            other => return Err(wrong_structure("BrokerId", other)),
        };
        tight_string_payload(Some(info.value.as_str()), out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let value = tight_string_decode(input, flags)?.unwrap_or_default();
        Ok(Structure::BrokerId(BrokerId { value }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::BrokerId(info) => info,
            other => return Err(wrong_structure("BrokerId", other)),
        };
        loose_write_string(Some(info.value.as_str()), out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let value = loose_read_string(input)?.unwrap_or_default();
        Ok(Structure::BrokerId(BrokerId { value }))
    }
}

/// Marshaller for [`SessionId`].
pub struct SessionIdMarshaller;

impl Marshaller for SessionIdMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::SESSION_ID
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::SESSION_ID
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::SessionId(info) => info,
            other => return Err(wrong_structure("SessionId", other)),
        };
        let mut rc = tight_string_flags(Some(info.connection_id.as_str()), flags)?;
        rc += tight_long_flags(info.value, flags);
        Ok(rc)
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let info = match obj {
            Structure::SessionId(info) => info,
            other => return Err(wrong_structure("SessionId", other)),
        };
        tight_string_payload(Some(info.connection_id.as_str()), out, flags)?;
        tight_long_payload(info.value, out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let connection_id = tight_string_decode(input, flags)?.unwrap_or_default();
        let value = tight_long_decode(input, flags)?;
        Ok(Structure::SessionId(SessionId { connection_id, value }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::SessionId(info) => info,
            other => return Err(wrong_structure("SessionId", other)),
        };
        loose_write_string(Some(info.connection_id.as_str()), out)?;
        loose_write_long(info.value, out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let connection_id = loose_read_string(input)?.unwrap_or_default();
        let value = loose_read_long(input)?;
        Ok(Structure::SessionId(SessionId { connection_id, value }))
    }
}

/// Marshaller for [`ConsumerId`].
pub struct ConsumerIdMarshaller;

impl Marshaller for ConsumerIdMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::CONSUMER_ID
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::CONSUMER_ID
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::ConsumerId(info) => info,
            other => return Err(wrong_structure("ConsumerId", other)),
        };
        let mut rc = tight_string_flags(Some(info.connection_id.as_str()), flags)?;
        rc += tight_long_flags(info.session_id, flags);
        rc += tight_long_flags(info.value, flags);
        Ok(rc)
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let info = match obj {
            Structure::ConsumerId(info) => info,
            other => return Err(wrong_structure("ConsumerId", other)),
        };
        tight_string_payload(Some(info.connection_id.as_str()), out, flags)?;
        tight_long_payload(info.session_id, out, flags)?;
        tight_long_payload(info.value, out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let connection_id = tight_string_decode(input, flags)?.unwrap_or_default();
        let session_id = tight_long_decode(input, flags)?;
        let value = tight_long_decode(input, flags)?;
        Ok(Structure::ConsumerId(ConsumerId { connection_id, session_id, value }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::ConsumerId(info) => info,
            other => return Err(wrong_structure("ConsumerId", other)),
        };
        loose_write_string(Some(info.connection_id.as_str()), out)?;
        loose_write_long(info.session_id, out)?;
        loose_write_long(info.value, out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let connection_id = loose_read_string(input)?.unwrap_or_default();
        let session_id = loose_read_long(input)?;
        let value = loose_read_long(input)?;
        Ok(Structure::ConsumerId(ConsumerId { connection_id, session_id, value }))
    }
}

/// Marshaller for [`ProducerId`]. Wire order is connection id, value,
/// session id (see the schema note).
pub struct ProducerIdMarshaller;

impl Marshaller for ProducerIdMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::PRODUCER_ID
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::PRODUCER_ID
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::ProducerId(info) => info,
            other => return Err(wrong_structure("ProducerId", other)),
        };
        let mut rc = tight_string_flags(Some(info.connection_id.as_str()), flags)?;
        rc += tight_long_flags(info.value, flags);
        rc += tight_long_flags(info.session_id, flags);
        Ok(rc)
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let info = match obj {
            Structure::ProducerId(info) => info,
            other => return Err(wrong_structure("ProducerId", other)),
        };
        tight_string_payload(Some(info.connection_id.as_str()), out, flags)?;
        tight_long_payload(info.value, out, flags)?;
        tight_long_payload(info.session_id, out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let connection_id = tight_string_decode(input, flags)?.unwrap_or_default();
        let value = tight_long_decode(input, flags)?;
        let session_id = tight_long_decode(input, flags)?;
        Ok(Structure::ProducerId(ProducerId { connection_id, value, session_id }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::ProducerId(info) => info,
            other => return Err(wrong_structure("ProducerId", other)),
        };
        loose_write_string(Some(info.connection_id.as_str()), out)?;
        loose_write_long(info.value, out)?;
        loose_write_long(info.session_id, out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let connection_id = loose_read_string(input)?.unwrap_or_default();
        let value = loose_read_long(input)?;
        let session_id = loose_read_long(input)?;
        Ok(Structure::ProducerId(ProducerId { connection_id, value, session_id }))
    }
}

/// Marshaller for [`MessageId`]. The producer id is a cache-eligible field.
pub struct MessageIdMarshaller;

impl Marshaller for MessageIdMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::MESSAGE_ID
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::MESSAGE_ID
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::MessageId(info) => info,
            other => return Err(wrong_structure("MessageId", other)),
        };
        let producer = info.producer_id.clone().map(Structure::ProducerId);
        let mut rc = tight_cached_flags(producer.as_ref(), ctx, flags)?;
        rc += tight_long_flags(info.producer_sequence_id, flags);
        rc += tight_long_flags(info.broker_sequence_id, flags);
        Ok(rc)
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let info = match obj {
            Structure::MessageId(info) => info,
            other => return Err(wrong_structure("MessageId", other)),
        };
        let producer = info.producer_id.clone().map(Structure::ProducerId);
        tight_cached_payload(producer.as_ref(), ctx, out, flags)?;
        tight_long_payload(info.producer_sequence_id, out, flags)?;
        tight_long_payload(info.broker_sequence_id, out, flags)
    }

    fn tight_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let producer_id = super::as_producer_id(tight_cached_decode(ctx, input, flags)?)?;
        let producer_sequence_id = tight_long_decode(input, flags)?;
        let broker_sequence_id = tight_long_decode(input, flags)?;
        Ok(Structure::MessageId(MessageId {
            producer_id,
            producer_sequence_id,
            broker_sequence_id,
        }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::MessageId(info) => info,
            other => return Err(wrong_structure("MessageId", other)),
        };
        let producer = info.producer_id.clone().map(Structure::ProducerId);
        loose_cached_write(producer.as_ref(), ctx, out)?;
        loose_write_long(info.producer_sequence_id, out)?;
        loose_write_long(info.broker_sequence_id, out)
    }

    fn loose_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let producer_id = super::as_producer_id(loose_cached_read(ctx, input)?)?;
        let producer_sequence_id = loose_read_long(input)?;
        let broker_sequence_id = loose_read_long(input)?;
        Ok(Structure::MessageId(MessageId {
            producer_id,
            producer_sequence_id,
            broker_sequence_id,
        }))
    }
}
