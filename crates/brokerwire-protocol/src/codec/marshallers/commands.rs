//! Marshallers for the command structures and the negotiation frame.
//!
//! Each marshaller walks its schema's field list in declared order, base
//! fields first, consulting the static field table for version gates. A
//! field outside the negotiated version is skipped on both sides and its
//! decoded value falls back to the structure's default.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use brokerwire_core::error::Result;

use super::super::bit_flags::BitFlagStream;
use super::super::marshaller::{
    loose_broker_path_read, loose_broker_path_write, loose_cached_read, loose_cached_write,
    loose_error_read, loose_error_write, loose_nested_read, loose_nested_write,
    tight_broker_path_decode, tight_broker_path_flags, tight_broker_path_payload,
    tight_cached_decode, tight_cached_flags, tight_cached_payload, tight_error_decode,
    tight_error_flags, tight_error_payload, tight_nested_decode, tight_nested_flags,
    tight_nested_payload, wrong_structure, DecodeContext, EncodeContext, Marshaller,
};
use super::super::primitives::{
    loose_read_bool, loose_read_bytes, loose_read_long, loose_read_string, loose_write_bool,
    loose_write_bytes, loose_write_long, loose_write_string, read_fixed_bytes, tight_bytes_decode,
    tight_bytes_flags, tight_bytes_payload, tight_long_decode, tight_long_flags,
    tight_long_payload, tight_string_decode, tight_string_flags, tight_string_payload,
    write_fixed_bytes,
};
use super::{as_connection_id, as_consumer_id, as_destination, as_message_id, as_producer_id,
    as_session_id, base};
use crate::command::{
    type_codes, ConnectionInfo, ConsumerInfo, ExceptionResponse, KeepAliveInfo,
    MessageDispatchNotification, ProducerInfo, RemoveInfo, Response, SessionInfo, ShutdownInfo,
    Structure, WireFormatInfo,
};
use crate::schema::{self, connection_info, producer_info, remove_info, SchemaDescriptor};

// ----- WireFormatInfo ------------------------------------------------------

/// Marshaller for the negotiation frame.
pub struct WireFormatInfoMarshaller;

impl Marshaller for WireFormatInfoMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::WIREFORMAT_INFO
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::WIREFORMAT_INFO
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::WireFormatInfo(info) => info,
            other => return Err(wrong_structure("WireFormatInfo", other)),
        };
        let mut rc = info.magic.len() + 4;
        flags.write(info.tight_encoding_enabled);
        flags.write(info.cache_enabled);
        rc += 8;
        rc += tight_bytes_flags(info.marshalled_properties.as_deref(), flags);
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
            Structure::WireFormatInfo(info) => info,
            other => return Err(wrong_structure("WireFormatInfo", other)),
        };
        write_fixed_bytes(&info.magic, out);
        out.write_i32::<BigEndian>(info.version as i32)?;
        flags.read()?;
        flags.read()?;
        out.write_i32::<BigEndian>(info.max_frame_size)?;
        out.write_i32::<BigEndian>(info.max_inactivity_duration)?;
        tight_bytes_payload(info.marshalled_properties.as_deref(), out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let mut magic = [0u8; 8];
        read_fixed_bytes(input, &mut magic)?;
        let version = input.read_i32::<BigEndian>()? as u32;
        let tight_encoding_enabled = flags.read()?;
        let cache_enabled = flags.read()?;
        let max_frame_size = input.read_i32::<BigEndian>()?;
        let max_inactivity_duration = input.read_i32::<BigEndian>()?;
        let marshalled_properties = tight_bytes_decode(input, flags)?;
        Ok(Structure::WireFormatInfo(WireFormatInfo {
            magic,
            version,
            tight_encoding_enabled,
            cache_enabled,
            max_frame_size,
            max_inactivity_duration,
            marshalled_properties,
        }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::WireFormatInfo(info) => info,
            other => return Err(wrong_structure("WireFormatInfo", other)),
        };
        write_fixed_bytes(&info.magic, out);
        out.write_i32::<BigEndian>(info.version as i32)?;
        loose_write_bool(info.tight_encoding_enabled, out)?;
        loose_write_bool(info.cache_enabled, out)?;
        out.write_i32::<BigEndian>(info.max_frame_size)?;
        out.write_i32::<BigEndian>(info.max_inactivity_duration)?;
        loose_write_bytes(info.marshalled_properties.as_deref(), out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let mut magic = [0u8; 8];
        read_fixed_bytes(input, &mut magic)?;
        let version = input.read_i32::<BigEndian>()? as u32;
        let tight_encoding_enabled = loose_read_bool(input)?;
        let cache_enabled = loose_read_bool(input)?;
        let max_frame_size = input.read_i32::<BigEndian>()?;
        let max_inactivity_duration = input.read_i32::<BigEndian>()?;
        let marshalled_properties = loose_read_bytes(input)?;
        Ok(Structure::WireFormatInfo(WireFormatInfo {
            magic,
            version,
            tight_encoding_enabled,
            cache_enabled,
            max_frame_size,
            max_inactivity_duration,
            marshalled_properties,
        }))
    }
}

// ----- ConnectionInfo ------------------------------------------------------

/// Marshaller for [`ConnectionInfo`].
pub struct ConnectionInfoMarshaller;

impl ConnectionInfoMarshaller {
    fn gate(index: usize, version: u32) -> bool {
        schema::CONNECTION_INFO.fields[index].in_scope(version)
    }
}

impl Marshaller for ConnectionInfoMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::CONNECTION_INFO
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::CONNECTION_INFO
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::ConnectionInfo(info) => info,
            other => return Err(wrong_structure("ConnectionInfo", other)),
        };
        let mut rc = base::tight_flags(&info.header, flags);
        let connection = info.connection_id.clone().map(Structure::ConnectionId);
        rc += tight_cached_flags(connection.as_ref(), ctx, flags)?;
        rc += tight_string_flags(info.client_id.as_deref(), flags)?;
        rc += tight_string_flags(info.password.as_deref(), flags)?;
        rc += tight_string_flags(info.user_name.as_deref(), flags)?;
        rc += tight_broker_path_flags(info.broker_path.as_deref(), ctx, flags)?;
        flags.write(info.broker_master_connector);
        flags.write(info.manageable);
        if Self::gate(connection_info::CLIENT_MASTER, ctx.version) {
            flags.write(info.client_master);
        }
        if Self::gate(connection_info::FAULT_TOLERANT, ctx.version) {
            flags.write(info.fault_tolerant);
        }
        if Self::gate(connection_info::FAILOVER_RECONNECT, ctx.version) {
            flags.write(info.failover_reconnect);
        }
        if Self::gate(connection_info::CLIENT_IP, ctx.version) {
            rc += tight_string_flags(info.client_ip.as_deref(), flags)?;
        }
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
            Structure::ConnectionInfo(info) => info,
            other => return Err(wrong_structure("ConnectionInfo", other)),
        };
        base::tight_payload(&info.header, out, flags)?;
        let connection = info.connection_id.clone().map(Structure::ConnectionId);
        tight_cached_payload(connection.as_ref(), ctx, out, flags)?;
        tight_string_payload(info.client_id.as_deref(), out, flags)?;
        tight_string_payload(info.password.as_deref(), out, flags)?;
        tight_string_payload(info.user_name.as_deref(), out, flags)?;
        tight_broker_path_payload(info.broker_path.as_deref(), ctx, out, flags)?;
        flags.read()?;
        flags.read()?;
        if Self::gate(connection_info::CLIENT_MASTER, ctx.version) {
            flags.read()?;
        }
        if Self::gate(connection_info::FAULT_TOLERANT, ctx.version) {
            flags.read()?;
        }
        if Self::gate(connection_info::FAILOVER_RECONNECT, ctx.version) {
            flags.read()?;
        }
        if Self::gate(connection_info::CLIENT_IP, ctx.version) {
            tight_string_payload(info.client_ip.as_deref(), out, flags)?;
        }
        Ok(())
    }

    fn tight_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        let connection_id = as_connection_id(tight_cached_decode(ctx, input, flags)?)?;
        let client_id = tight_string_decode(input, flags)?;
        let password = tight_string_decode(input, flags)?;
        let user_name = tight_string_decode(input, flags)?;
        let broker_path = tight_broker_path_decode(ctx, input, flags)?;
        let broker_master_connector = flags.read()?;
        let manageable = flags.read()?;
        let client_master = if Self::gate(connection_info::CLIENT_MASTER, ctx.version) {
            flags.read()?
        } else {
            true
        };
        let fault_tolerant = if Self::gate(connection_info::FAULT_TOLERANT, ctx.version) {
            flags.read()?
        } else {
            false
        };
        let failover_reconnect = if Self::gate(connection_info::FAILOVER_RECONNECT, ctx.version) {
            flags.read()?
        } else {
            false
        };
        let client_ip = if Self::gate(connection_info::CLIENT_IP, ctx.version) {
            tight_string_decode(input, flags)?
        } else {
            None
        };
        Ok(Structure::ConnectionInfo(ConnectionInfo {
            header,
            connection_id,
            client_id,
            password,
            user_name,
            broker_path,
            broker_master_connector,
            manageable,
            client_master,
            fault_tolerant,
            failover_reconnect,
            client_ip,
        }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::ConnectionInfo(info) => info,
            other => return Err(wrong_structure("ConnectionInfo", other)),
        };
        base::loose_write(&info.header, out)?;
        let connection = info.connection_id.clone().map(Structure::ConnectionId);
        loose_cached_write(connection.as_ref(), ctx, out)?;
        loose_write_string(info.client_id.as_deref(), out)?;
        loose_write_string(info.password.as_deref(), out)?;
        loose_write_string(info.user_name.as_deref(), out)?;
        loose_broker_path_write(info.broker_path.as_deref(), ctx, out)?;
        loose_write_bool(info.broker_master_connector, out)?;
        loose_write_bool(info.manageable, out)?;
        if Self::gate(connection_info::CLIENT_MASTER, ctx.version) {
            loose_write_bool(info.client_master, out)?;
        }
        if Self::gate(connection_info::FAULT_TOLERANT, ctx.version) {
            loose_write_bool(info.fault_tolerant, out)?;
        }
        if Self::gate(connection_info::FAILOVER_RECONNECT, ctx.version) {
            loose_write_bool(info.failover_reconnect, out)?;
        }
        if Self::gate(connection_info::CLIENT_IP, ctx.version) {
            loose_write_string(info.client_ip.as_deref(), out)?;
        }
        Ok(())
    }

    fn loose_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        let connection_id = as_connection_id(loose_cached_read(ctx, input)?)?;
        let client_id = loose_read_string(input)?;
        let password = loose_read_string(input)?;
        let user_name = loose_read_string(input)?;
        let broker_path = loose_broker_path_read(ctx, input)?;
        let broker_master_connector = loose_read_bool(input)?;
        let manageable = loose_read_bool(input)?;
        let client_master = if Self::gate(connection_info::CLIENT_MASTER, ctx.version) {
            loose_read_bool(input)?
        } else {
            true
        };
        let fault_tolerant = if Self::gate(connection_info::FAULT_TOLERANT, ctx.version) {
            loose_read_bool(input)?
        } else {
            false
        };
        let failover_reconnect = if Self::gate(connection_info::FAILOVER_RECONNECT, ctx.version) {
            loose_read_bool(input)?
        } else {
            false
        };
        let client_ip = if Self::gate(connection_info::CLIENT_IP, ctx.version) {
            loose_read_string(input)?
        } else {
            None
        };
        Ok(Structure::ConnectionInfo(ConnectionInfo {
            header,
            connection_id,
            client_id,
            password,
            user_name,
            broker_path,
            broker_master_connector,
            manageable,
            client_master,
            fault_tolerant,
            failover_reconnect,
            client_ip,
        }))
    }
}

// ----- SessionInfo ---------------------------------------------------------

/// Marshaller for [`SessionInfo`].
pub struct SessionInfoMarshaller;

impl Marshaller for SessionInfoMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::SESSION_INFO
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::SESSION_INFO
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::SessionInfo(info) => info,
            other => return Err(wrong_structure("SessionInfo", other)),
        };
        let mut rc = base::tight_flags(&info.header, flags);
        let session = info.session_id.clone().map(Structure::SessionId);
        rc += tight_cached_flags(session.as_ref(), ctx, flags)?;
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
            Structure::SessionInfo(info) => info,
            other => return Err(wrong_structure("SessionInfo", other)),
        };
        base::tight_payload(&info.header, out, flags)?;
        let session = info.session_id.clone().map(Structure::SessionId);
        tight_cached_payload(session.as_ref(), ctx, out, flags)
    }

    fn tight_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        let session_id = as_session_id(tight_cached_decode(ctx, input, flags)?)?;
        Ok(Structure::SessionInfo(SessionInfo { header, session_id }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::SessionInfo(info) => info,
            other => return Err(wrong_structure("SessionInfo", other)),
        };
        base::loose_write(&info.header, out)?;
        let session = info.session_id.clone().map(Structure::SessionId);
        loose_cached_write(session.as_ref(), ctx, out)
    }

    fn loose_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        let session_id = as_session_id(loose_cached_read(ctx, input)?)?;
        Ok(Structure::SessionInfo(SessionInfo { header, session_id }))
    }
}

// ----- ConsumerInfo --------------------------------------------------------

/// Marshaller for [`ConsumerInfo`].
pub struct ConsumerInfoMarshaller;

impl Marshaller for ConsumerInfoMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::CONSUMER_INFO
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::CONSUMER_INFO
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::ConsumerInfo(info) => info,
            other => return Err(wrong_structure("ConsumerInfo", other)),
        };
        let mut rc = base::tight_flags(&info.header, flags);
        let consumer = info.consumer_id.clone().map(Structure::ConsumerId);
        rc += tight_cached_flags(consumer.as_ref(), ctx, flags)?;
        flags.write(info.browser);
        let destination = info.destination.clone().map(Structure::Destination);
        rc += tight_cached_flags(destination.as_ref(), ctx, flags)?;
        rc += 8;
        flags.write(info.dispatch_async);
        rc += tight_string_flags(info.selector.as_deref(), flags)?;
        rc += tight_string_flags(info.subscription_name.as_deref(), flags)?;
        flags.write(info.no_local);
        flags.write(info.exclusive);
        flags.write(info.retroactive);
        rc += 1;
        rc += tight_broker_path_flags(info.broker_path.as_deref(), ctx, flags)?;
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
            Structure::ConsumerInfo(info) => info,
            other => return Err(wrong_structure("ConsumerInfo", other)),
        };
        base::tight_payload(&info.header, out, flags)?;
        let consumer = info.consumer_id.clone().map(Structure::ConsumerId);
        tight_cached_payload(consumer.as_ref(), ctx, out, flags)?;
        flags.read()?;
        let destination = info.destination.clone().map(Structure::Destination);
        tight_cached_payload(destination.as_ref(), ctx, out, flags)?;
        out.write_i32::<BigEndian>(info.prefetch_size)?;
        out.write_i32::<BigEndian>(info.maximum_pending_message_limit)?;
        flags.read()?;
        tight_string_payload(info.selector.as_deref(), out, flags)?;
        tight_string_payload(info.subscription_name.as_deref(), out, flags)?;
        flags.read()?;
        flags.read()?;
        flags.read()?;
        out.write_u8(info.priority)?;
        tight_broker_path_payload(info.broker_path.as_deref(), ctx, out, flags)
    }

    fn tight_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        let consumer_id = as_consumer_id(tight_cached_decode(ctx, input, flags)?)?;
        let browser = flags.read()?;
        let destination = as_destination(tight_cached_decode(ctx, input, flags)?)?;
        let prefetch_size = input.read_i32::<BigEndian>()?;
        let maximum_pending_message_limit = input.read_i32::<BigEndian>()?;
        let dispatch_async = flags.read()?;
        let selector = tight_string_decode(input, flags)?;
        let subscription_name = tight_string_decode(input, flags)?;
        let no_local = flags.read()?;
        let exclusive = flags.read()?;
        let retroactive = flags.read()?;
        let priority = input.read_u8()?;
        let broker_path = tight_broker_path_decode(ctx, input, flags)?;
        Ok(Structure::ConsumerInfo(ConsumerInfo {
            header,
            consumer_id,
            browser,
            destination,
            prefetch_size,
            maximum_pending_message_limit,
            dispatch_async,
            selector,
            subscription_name,
            no_local,
            exclusive,
            retroactive,
            priority,
            broker_path,
        }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::ConsumerInfo(info) => info,
            other => return Err(wrong_structure("ConsumerInfo", other)),
        };
        base::loose_write(&info.header, out)?;
        let consumer = info.consumer_id.clone().map(Structure::ConsumerId);
        loose_cached_write(consumer.as_ref(), ctx, out)?;
        loose_write_bool(info.browser, out)?;
        let destination = info.destination.clone().map(Structure::Destination);
        loose_cached_write(destination.as_ref(), ctx, out)?;
        out.write_i32::<BigEndian>(info.prefetch_size)?;
        out.write_i32::<BigEndian>(info.maximum_pending_message_limit)?;
        loose_write_bool(info.dispatch_async, out)?;
        loose_write_string(info.selector.as_deref(), out)?;
        loose_write_string(info.subscription_name.as_deref(), out)?;
        loose_write_bool(info.no_local, out)?;
        loose_write_bool(info.exclusive, out)?;
        loose_write_bool(info.retroactive, out)?;
        out.write_u8(info.priority)?;
        loose_broker_path_write(info.broker_path.as_deref(), ctx, out)
    }

    fn loose_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        let consumer_id = as_consumer_id(loose_cached_read(ctx, input)?)?;
        let browser = loose_read_bool(input)?;
        let destination = as_destination(loose_cached_read(ctx, input)?)?;
        let prefetch_size = input.read_i32::<BigEndian>()?;
        let maximum_pending_message_limit = input.read_i32::<BigEndian>()?;
        let dispatch_async = loose_read_bool(input)?;
        let selector = loose_read_string(input)?;
        let subscription_name = loose_read_string(input)?;
        let no_local = loose_read_bool(input)?;
        let exclusive = loose_read_bool(input)?;
        let retroactive = loose_read_bool(input)?;
        let priority = input.read_u8()?;
        let broker_path = loose_broker_path_read(ctx, input)?;
        Ok(Structure::ConsumerInfo(ConsumerInfo {
            header,
            consumer_id,
            browser,
            destination,
            prefetch_size,
            maximum_pending_message_limit,
            dispatch_async,
            selector,
            subscription_name,
            no_local,
            exclusive,
            retroactive,
            priority,
            broker_path,
        }))
    }
}

// ----- ProducerInfo --------------------------------------------------------

/// Marshaller for [`ProducerInfo`].
pub struct ProducerInfoMarshaller;

impl ProducerInfoMarshaller {
    fn gate(index: usize, version: u32) -> bool {
        schema::PRODUCER_INFO.fields[index].in_scope(version)
    }
}

impl Marshaller for ProducerInfoMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::PRODUCER_INFO
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::PRODUCER_INFO
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::ProducerInfo(info) => info,
            other => return Err(wrong_structure("ProducerInfo", other)),
        };
        let mut rc = base::tight_flags(&info.header, flags);
        let producer = info.producer_id.clone().map(Structure::ProducerId);
        rc += tight_cached_flags(producer.as_ref(), ctx, flags)?;
        let destination = info.destination.clone().map(Structure::Destination);
        rc += tight_cached_flags(destination.as_ref(), ctx, flags)?;
        rc += tight_broker_path_flags(info.broker_path.as_deref(), ctx, flags)?;
        if Self::gate(producer_info::DISPATCH_ASYNC, ctx.version) {
            flags.write(info.dispatch_async);
        }
        if Self::gate(producer_info::WINDOW_SIZE, ctx.version) {
            rc += 4;
        }
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
            Structure::ProducerInfo(info) => info,
            other => return Err(wrong_structure("ProducerInfo", other)),
        };
        base::tight_payload(&info.header, out, flags)?;
        let producer = info.producer_id.clone().map(Structure::ProducerId);
        tight_cached_payload(producer.as_ref(), ctx, out, flags)?;
        let destination = info.destination.clone().map(Structure::Destination);
        tight_cached_payload(destination.as_ref(), ctx, out, flags)?;
        tight_broker_path_payload(info.broker_path.as_deref(), ctx, out, flags)?;
        if Self::gate(producer_info::DISPATCH_ASYNC, ctx.version) {
            flags.read()?;
        }
        if Self::gate(producer_info::WINDOW_SIZE, ctx.version) {
            out.write_i32::<BigEndian>(info.window_size)?;
        }
        Ok(())
    }

    fn tight_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        let producer_id = as_producer_id(tight_cached_decode(ctx, input, flags)?)?;
        let destination = as_destination(tight_cached_decode(ctx, input, flags)?)?;
        let broker_path = tight_broker_path_decode(ctx, input, flags)?;
        let dispatch_async = if Self::gate(producer_info::DISPATCH_ASYNC, ctx.version) {
            flags.read()?
        } else {
            false
        };
        let window_size = if Self::gate(producer_info::WINDOW_SIZE, ctx.version) {
            input.read_i32::<BigEndian>()?
        } else {
            0
        };
        Ok(Structure::ProducerInfo(ProducerInfo {
            header,
            producer_id,
            destination,
            broker_path,
            dispatch_async,
            window_size,
        }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::ProducerInfo(info) => info,
            other => return Err(wrong_structure("ProducerInfo", other)),
        };
        base::loose_write(&info.header, out)?;
        let producer = info.producer_id.clone().map(Structure::ProducerId);
        loose_cached_write(producer.as_ref(), ctx, out)?;
        let destination = info.destination.clone().map(Structure::Destination);
        loose_cached_write(destination.as_ref(), ctx, out)?;
        loose_broker_path_write(info.broker_path.as_deref(), ctx, out)?;
        if Self::gate(producer_info::DISPATCH_ASYNC, ctx.version) {
            loose_write_bool(info.dispatch_async, out)?;
        }
        if Self::gate(producer_info::WINDOW_SIZE, ctx.version) {
            out.write_i32::<BigEndian>(info.window_size)?;
        }
        Ok(())
    }

    fn loose_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        let producer_id = as_producer_id(loose_cached_read(ctx, input)?)?;
        let destination = as_destination(loose_cached_read(ctx, input)?)?;
        let broker_path = loose_broker_path_read(ctx, input)?;
        let dispatch_async = if Self::gate(producer_info::DISPATCH_ASYNC, ctx.version) {
            loose_read_bool(input)?
        } else {
            false
        };
        let window_size = if Self::gate(producer_info::WINDOW_SIZE, ctx.version) {
            input.read_i32::<BigEndian>()?
        } else {
            0
        };
        Ok(Structure::ProducerInfo(ProducerInfo {
            header,
            producer_id,
            destination,
            broker_path,
            dispatch_async,
            window_size,
        }))
    }
}

// ----- KeepAliveInfo and ShutdownInfo --------------------------------------

/// Marshaller for [`KeepAliveInfo`]: base fields only.
pub struct KeepAliveInfoMarshaller;

impl Marshaller for KeepAliveInfoMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::KEEP_ALIVE_INFO
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::KEEP_ALIVE_INFO
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::KeepAliveInfo(info) => info,
            other => return Err(wrong_structure("KeepAliveInfo", other)),
        };
        Ok(base::tight_flags(&info.header, flags))
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let info = match obj {
            Structure::KeepAliveInfo(info) => info,
            other => return Err(wrong_structure("KeepAliveInfo", other)),
        };
        base::tight_payload(&info.header, out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        Ok(Structure::KeepAliveInfo(KeepAliveInfo { header }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::KeepAliveInfo(info) => info,
            other => return Err(wrong_structure("KeepAliveInfo", other)),
        };
        base::loose_write(&info.header, out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        Ok(Structure::KeepAliveInfo(KeepAliveInfo { header }))
    }
}

/// Marshaller for [`ShutdownInfo`]: base fields only.
pub struct ShutdownInfoMarshaller;

impl Marshaller for ShutdownInfoMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::SHUTDOWN_INFO
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::SHUTDOWN_INFO
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::ShutdownInfo(info) => info,
            other => return Err(wrong_structure("ShutdownInfo", other)),
        };
        Ok(base::tight_flags(&info.header, flags))
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let info = match obj {
            Structure::ShutdownInfo(info) => info,
            other => return Err(wrong_structure("ShutdownInfo", other)),
        };
        base::tight_payload(&info.header, out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        Ok(Structure::ShutdownInfo(ShutdownInfo { header }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::ShutdownInfo(info) => info,
            other => return Err(wrong_structure("ShutdownInfo", other)),
        };
        base::loose_write(&info.header, out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        Ok(Structure::ShutdownInfo(ShutdownInfo { header }))
    }
}

// ----- RemoveInfo ----------------------------------------------------------

/// Marshaller for [`RemoveInfo`]. The object id may be any cache-eligible
/// identifier, so it stays a boxed [`Structure`].
pub struct RemoveInfoMarshaller;

impl RemoveInfoMarshaller {
    fn gate(index: usize, version: u32) -> bool {
        schema::REMOVE_INFO.fields[index].in_scope(version)
    }
}

impl Marshaller for RemoveInfoMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::REMOVE_INFO
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::REMOVE_INFO
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::RemoveInfo(info) => info,
            other => return Err(wrong_structure("RemoveInfo", other)),
        };
        let mut rc = base::tight_flags(&info.header, flags);
        rc += tight_cached_flags(info.object_id.as_deref(), ctx, flags)?;
        if Self::gate(remove_info::LAST_DELIVERED_SEQUENCE_ID, ctx.version) {
            rc += tight_long_flags(info.last_delivered_sequence_id, flags);
        }
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
            Structure::RemoveInfo(info) => info,
            other => return Err(wrong_structure("RemoveInfo", other)),
        };
        base::tight_payload(&info.header, out, flags)?;
        tight_cached_payload(info.object_id.as_deref(), ctx, out, flags)?;
        if Self::gate(remove_info::LAST_DELIVERED_SEQUENCE_ID, ctx.version) {
            tight_long_payload(info.last_delivered_sequence_id, out, flags)?;
        }
        Ok(())
    }

    fn tight_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        let object_id = tight_cached_decode(ctx, input, flags)?.map(Box::new);
        let last_delivered_sequence_id =
            if Self::gate(remove_info::LAST_DELIVERED_SEQUENCE_ID, ctx.version) {
                tight_long_decode(input, flags)?
            } else {
                0
            };
        Ok(Structure::RemoveInfo(RemoveInfo {
            header,
            object_id,
            last_delivered_sequence_id,
        }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::RemoveInfo(info) => info,
            other => return Err(wrong_structure("RemoveInfo", other)),
        };
        base::loose_write(&info.header, out)?;
        loose_cached_write(info.object_id.as_deref(), ctx, out)?;
        if Self::gate(remove_info::LAST_DELIVERED_SEQUENCE_ID, ctx.version) {
            loose_write_long(info.last_delivered_sequence_id, out)?;
        }
        Ok(())
    }

    fn loose_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        let object_id = loose_cached_read(ctx, input)?.map(Box::new);
        let last_delivered_sequence_id =
            if Self::gate(remove_info::LAST_DELIVERED_SEQUENCE_ID, ctx.version) {
                loose_read_long(input)?
            } else {
                0
            };
        Ok(Structure::RemoveInfo(RemoveInfo {
            header,
            object_id,
            last_delivered_sequence_id,
        }))
    }
}

// ----- MessageDispatchNotification -----------------------------------------

/// Marshaller for [`MessageDispatchNotification`].
pub struct MessageDispatchNotificationMarshaller;

impl Marshaller for MessageDispatchNotificationMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::MESSAGE_DISPATCH_NOTIFICATION
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::MESSAGE_DISPATCH_NOTIFICATION
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::MessageDispatchNotification(info) => info,
            other => return Err(wrong_structure("MessageDispatchNotification", other)),
        };
        let mut rc = base::tight_flags(&info.header, flags);
        let consumer = info.consumer_id.clone().map(Structure::ConsumerId);
        rc += tight_cached_flags(consumer.as_ref(), ctx, flags)?;
        let destination = info.destination.clone().map(Structure::Destination);
        rc += tight_cached_flags(destination.as_ref(), ctx, flags)?;
        rc += tight_long_flags(info.delivery_sequence_id, flags);
        let message = info.message_id.clone().map(Structure::MessageId);
        rc += tight_nested_flags(message.as_ref(), ctx, flags)?;
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
            Structure::MessageDispatchNotification(info) => info,
            other => return Err(wrong_structure("MessageDispatchNotification", other)),
        };
        base::tight_payload(&info.header, out, flags)?;
        let consumer = info.consumer_id.clone().map(Structure::ConsumerId);
        tight_cached_payload(consumer.as_ref(), ctx, out, flags)?;
        let destination = info.destination.clone().map(Structure::Destination);
        tight_cached_payload(destination.as_ref(), ctx, out, flags)?;
        tight_long_payload(info.delivery_sequence_id, out, flags)?;
        let message = info.message_id.clone().map(Structure::MessageId);
        tight_nested_payload(message.as_ref(), ctx, out, flags)
    }

    fn tight_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        let consumer_id = as_consumer_id(tight_cached_decode(ctx, input, flags)?)?;
        let destination = as_destination(tight_cached_decode(ctx, input, flags)?)?;
        let delivery_sequence_id = tight_long_decode(input, flags)?;
        let message_id = as_message_id(tight_nested_decode(ctx, input, flags)?)?;
        Ok(Structure::MessageDispatchNotification(MessageDispatchNotification {
            header,
            consumer_id,
            destination,
            delivery_sequence_id,
            message_id,
        }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::MessageDispatchNotification(info) => info,
            other => return Err(wrong_structure("MessageDispatchNotification", other)),
        };
        base::loose_write(&info.header, out)?;
        let consumer = info.consumer_id.clone().map(Structure::ConsumerId);
        loose_cached_write(consumer.as_ref(), ctx, out)?;
        let destination = info.destination.clone().map(Structure::Destination);
        loose_cached_write(destination.as_ref(), ctx, out)?;
        loose_write_long(info.delivery_sequence_id, out)?;
        let message = info.message_id.clone().map(Structure::MessageId);
        loose_nested_write(message.as_ref(), ctx, out)
    }

    fn loose_decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        let consumer_id = as_consumer_id(loose_cached_read(ctx, input)?)?;
        let destination = as_destination(loose_cached_read(ctx, input)?)?;
        let delivery_sequence_id = loose_read_long(input)?;
        let message_id = as_message_id(loose_nested_read(ctx, input)?)?;
        Ok(Structure::MessageDispatchNotification(MessageDispatchNotification {
            header,
            consumer_id,
            destination,
            delivery_sequence_id,
            message_id,
        }))
    }
}

// ----- Response and ExceptionResponse --------------------------------------

/// Marshaller for [`Response`].
pub struct ResponseMarshaller;

impl Marshaller for ResponseMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::RESPONSE
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::RESPONSE
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::Response(info) => info,
            other => return Err(wrong_structure("Response", other)),
        };
        Ok(base::tight_flags(&info.header, flags) + 4)
    }

    fn tight_encode_payload(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
        flags: &mut BitFlagStream,
    ) -> Result<()> {
        let info = match obj {
            Structure::Response(info) => info,
            other => return Err(wrong_structure("Response", other)),
        };
        base::tight_payload(&info.header, out, flags)?;
        out.write_i32::<BigEndian>(info.correlation_id)?;
        Ok(())
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        let correlation_id = input.read_i32::<BigEndian>()?;
        Ok(Structure::Response(Response { header, correlation_id }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::Response(info) => info,
            other => return Err(wrong_structure("Response", other)),
        };
        base::loose_write(&info.header, out)?;
        out.write_i32::<BigEndian>(info.correlation_id)?;
        Ok(())
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        let correlation_id = input.read_i32::<BigEndian>()?;
        Ok(Structure::Response(Response { header, correlation_id }))
    }
}

/// Marshaller for [`ExceptionResponse`]: response fields plus the remote
/// error chain.
pub struct ExceptionResponseMarshaller;

impl Marshaller for ExceptionResponseMarshaller {
    fn type_code(&self) -> u8 {
        type_codes::EXCEPTION_RESPONSE
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &schema::EXCEPTION_RESPONSE
    }

    fn tight_encode_flags(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        flags: &mut BitFlagStream,
    ) -> Result<usize> {
        let info = match obj {
            Structure::ExceptionResponse(info) => info,
            other => return Err(wrong_structure("ExceptionResponse", other)),
        };
        let mut rc = base::tight_flags(&info.header, flags) + 4;
        rc += tight_error_flags(info.exception.as_ref(), flags)?;
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
            Structure::ExceptionResponse(info) => info,
            other => return Err(wrong_structure("ExceptionResponse", other)),
        };
        base::tight_payload(&info.header, out, flags)?;
        out.write_i32::<BigEndian>(info.correlation_id)?;
        tight_error_payload(info.exception.as_ref(), out, flags)
    }

    fn tight_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
        flags: &mut BitFlagStream,
    ) -> Result<Structure> {
        let header = base::tight_decode(input, flags)?;
        let correlation_id = input.read_i32::<BigEndian>()?;
        let exception = tight_error_decode(input, flags)?;
        Ok(Structure::ExceptionResponse(ExceptionResponse {
            header,
            correlation_id,
            exception,
        }))
    }

    fn loose_encode(
        &self,
        obj: &Structure,
        _ctx: &mut EncodeContext<'_>,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let info = match obj {
            Structure::ExceptionResponse(info) => info,
            other => return Err(wrong_structure("ExceptionResponse", other)),
        };
        base::loose_write(&info.header, out)?;
        out.write_i32::<BigEndian>(info.correlation_id)?;
        loose_error_write(info.exception.as_ref(), out)
    }

    fn loose_decode(
        &self,
        _ctx: &mut DecodeContext<'_>,
        input: &mut Cursor<&[u8]>,
    ) -> Result<Structure> {
        let header = base::loose_read(input)?;
        let correlation_id = input.read_i32::<BigEndian>()?;
        let exception = loose_error_read(input)?;
        Ok(Structure::ExceptionResponse(ExceptionResponse {
            header,
            correlation_id,
            exception,
        }))
    }
}
