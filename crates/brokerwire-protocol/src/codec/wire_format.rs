//! Per-connection codec state and the top-level marshal entry points.

use std::io::Cursor;

use byteorder::ReadBytesExt;
use tracing::{debug, warn};

use brokerwire_core::config::CodecConfig;
use brokerwire_core::constants::{BASE_VERSION, MAGIC, MINIMUM_VERSION};
use brokerwire_core::error::{ErrorKind, Result};

use super::bit_flags::BitFlagStream;
use super::cache::ObjectCacheTable;
use super::marshaller::{DecodeContext, EncodeContext};
use super::registry::MarshallerRegistry;
use crate::command::{type_codes, Structure, WireFormatInfo};

/// Encoding strategy fixed by negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingMode {
    /// Flag-block encoding with optional object caching.
    Tight,
    /// Single-pass encoding with explicit presence markers.
    Loose,
}

/// Handshake progress for one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ContextState {
    /// No negotiation frame sent yet.
    Connecting,
    /// Our preferences are on the wire, awaiting the peer's.
    Negotiating,
    /// Settings frozen, structure traffic permitted.
    Active,
    /// Terminal; every operation fails.
    Closed,
}

/// One connection's codec: the frozen negotiation outcome, the dispatch
/// table, and the two directional cache tables.
///
/// Until negotiation completes only [`WireFormatInfo`] frames may cross,
/// and those are always loose-encoded at the base version so a peer of any
/// version can read them.
pub struct WireFormatContext {
    config: CodecConfig,
    state: ContextState,
    version: u32,
    mode: EncodingMode,
    cache_enabled: bool,
    max_frame_size: i32,
    max_inactivity_duration: i32,
    registry: MarshallerRegistry,
    encode_cache: ObjectCacheTable,
    decode_cache: ObjectCacheTable,
}

impl WireFormatContext {
    /// Creates a codec in the connecting state with the given preferences.
    pub fn new(config: CodecConfig) -> Self {
        let cache_size = config.cache_size;
        Self {
            config,
            state: ContextState::Connecting,
            version: BASE_VERSION,
            mode: EncodingMode::Loose,
            cache_enabled: false,
            max_frame_size: 0,
            max_inactivity_duration: 0,
            registry: MarshallerRegistry::new(),
            encode_cache: ObjectCacheTable::with_capacity(cache_size),
            decode_cache: ObjectCacheTable::with_capacity(cache_size),
        }
    }

    /// The negotiation frame advertising this peer's preferences.
    pub fn local_wire_format_info(&self) -> WireFormatInfo {
        WireFormatInfo {
            magic: MAGIC,
            version: self.config.preferred_version,
            tight_encoding_enabled: self.config.tight_encoding,
            cache_enabled: self.config.cache_enabled,
            max_frame_size: self.config.max_frame_size,
            max_inactivity_duration: self.config.max_inactivity_duration,
            marshalled_properties: None,
        }
    }

    /// Reconciles the peer's advertised preferences with ours and freezes
    /// the connection settings. Both cache tables restart empty.
    ///
    /// Once the context is active the settings are immutable for the
    /// connection's lifetime: a further negotiation frame is ignored, since
    /// accepting it would reset the cache tables out from under a peer
    /// whose encoder state is unchanged.
    pub fn negotiate(&mut self, remote: &WireFormatInfo) -> Result<()> {
        if self.state == ContextState::Closed {
            return Err(ErrorKind::ContextClosed);
        }
        if self.state == ContextState::Active {
            warn!("ignoring renegotiation attempt on an active connection");
            return Ok(());
        }
        if remote.magic != MAGIC {
            warn!(magic = ?remote.magic, "rejecting peer with wrong magic");
            return Err(ErrorKind::MalformedField("bad magic in negotiation frame".into()));
        }
        if remote.version < MINIMUM_VERSION {
            return Err(ErrorKind::VersionUnsupported {
                proposed: remote.version,
                minimum: MINIMUM_VERSION,
            });
        }
        self.version = self.config.preferred_version.min(remote.version);
        let tight = self.config.tight_encoding && remote.tight_encoding_enabled;
        self.mode = if tight { EncodingMode::Tight } else { EncodingMode::Loose };
        self.cache_enabled = tight && self.config.cache_enabled && remote.cache_enabled;
        self.max_frame_size = self.config.max_frame_size.min(remote.max_frame_size);
        self.max_inactivity_duration =
            self.config.max_inactivity_duration.min(remote.max_inactivity_duration);
        self.encode_cache = ObjectCacheTable::with_capacity(self.config.cache_size);
        self.decode_cache = ObjectCacheTable::with_capacity(self.config.cache_size);
        self.state = ContextState::Active;
        debug!(
            version = self.version,
            mode = ?self.mode,
            cache = self.cache_enabled,
            "negotiation complete"
        );
        Ok(())
    }

    /// Encodes one structure into a frame: type code, then (in tight mode)
    /// the flag block, then the payload.
    pub fn marshal(&mut self, structure: &Structure) -> Result<Vec<u8>> {
        match self.state {
            ContextState::Closed => return Err(ErrorKind::ContextClosed),
            ContextState::Active => {}
            ContextState::Connecting | ContextState::Negotiating => {
                let Structure::WireFormatInfo(_) = structure else {
                    return Err(ErrorKind::HandshakeIncomplete);
                };
                let frame = self.encode_loose(structure, BASE_VERSION)?;
                if self.state == ContextState::Connecting {
                    self.state = ContextState::Negotiating;
                }
                return Ok(frame);
            }
        }
        if let Structure::WireFormatInfo(_) = structure {
            // Negotiation frames stay base-version loose even on an
            // active connection.
            return self.encode_loose(structure, BASE_VERSION);
        }
        match self.mode {
            EncodingMode::Tight => self.encode_tight(structure),
            EncodingMode::Loose => self.encode_loose(structure, self.version),
        }
    }

    /// Decodes one frame back into a structure.
    pub fn unmarshal(&mut self, frame: &[u8]) -> Result<Structure> {
        if self.state == ContextState::Closed {
            return Err(ErrorKind::ContextClosed);
        }
        let mut input = Cursor::new(frame);
        let code = input.read_u8()?;
        if self.state != ContextState::Active {
            if code != type_codes::WIREFORMAT_INFO {
                return Err(ErrorKind::HandshakeIncomplete);
            }
            return self.decode_loose(code, &mut input, BASE_VERSION);
        }
        if code == type_codes::WIREFORMAT_INFO {
            return self.decode_loose(code, &mut input, BASE_VERSION);
        }
        match self.mode {
            EncodingMode::Tight => self.decode_tight(code, &mut input),
            EncodingMode::Loose => self.decode_loose(code, &mut input, self.version),
        }
    }

    /// Marks the connection closed. Terminal.
    pub fn close(&mut self) {
        self.state = ContextState::Closed;
    }

    /// The negotiated protocol version, or the base version before the
    /// handshake completes.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The negotiated encoding strategy.
    pub fn encoding_mode(&self) -> EncodingMode {
        self.mode
    }

    /// True once negotiation has completed.
    pub fn is_active(&self) -> bool {
        self.state == ContextState::Active
    }

    /// True if the cached-object dictionary is in use.
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    fn encode_tight(&mut self, structure: &Structure) -> Result<Vec<u8>> {
        let registry = &self.registry;
        let marshaller = registry.for_structure(structure)?;
        let mut flags = BitFlagStream::new();
        let mut ctx = EncodeContext {
            version: self.version,
            cache_enabled: self.cache_enabled,
            registry,
            cache: &mut self.encode_cache,
        };
        let rc = marshaller.tight_encode_flags(structure, &mut ctx, &mut flags)?;
        let mut out = Vec::with_capacity(1 + flags.serialized_size() + 1 + rc);
        out.push(structure.type_code());
        flags.write_to(&mut out)?;
        marshaller.tight_encode_payload(structure, &mut ctx, &mut out, &mut flags)?;
        Ok(out)
    }

    fn encode_loose(&mut self, structure: &Structure, version: u32) -> Result<Vec<u8>> {
        let registry = &self.registry;
        let marshaller = registry.for_structure(structure)?;
        let mut ctx = EncodeContext {
            version,
            cache_enabled: false,
            registry,
            cache: &mut self.encode_cache,
        };
        let mut out = vec![structure.type_code()];
        marshaller.loose_encode(structure, &mut ctx, &mut out)?;
        Ok(out)
    }

    fn decode_tight(&mut self, code: u8, input: &mut Cursor<&[u8]>) -> Result<Structure> {
        let registry = &self.registry;
        let marshaller = registry.for_type_code(code)?;
        let mut flags = BitFlagStream::read_from(input)?;
        let mut ctx = DecodeContext {
            version: self.version,
            cache_enabled: self.cache_enabled,
            registry,
            cache: &mut self.decode_cache,
        };
        marshaller.tight_decode(&mut ctx, input, &mut flags)
    }

    fn decode_loose(
        &mut self,
        code: u8,
        input: &mut Cursor<&[u8]>,
        version: u32,
    ) -> Result<Structure> {
        let registry = &self.registry;
        let marshaller = registry.for_type_code(code)?;
        let mut ctx = DecodeContext {
            version,
            cache_enabled: false,
            registry,
            cache: &mut self.decode_cache,
        };
        marshaller.loose_decode(&mut ctx, input)
    }
}
