use std::default::Default;

use crate::constants::{
    DEFAULT_CACHE_SIZE, DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_INACTIVITY_DURATION, PROTOCOL_VERSION,
};

/// Configuration options for one codec instance.
///
/// These are the *local preferences* a peer carries into negotiation; the
/// effective settings for a connection are the reconciliation of both sides'
/// preferences and are frozen once the context becomes active.
#[derive(Clone, Debug)]
pub struct CodecConfig {
    /// Highest protocol version this peer is willing to speak. The
    /// negotiated version is the minimum of both peers' proposals.
    pub preferred_version: u32,
    /// Offer tight (size-optimized) encoding. Tight mode is used only if
    /// both peers enable it.
    pub tight_encoding: bool,
    /// Offer the cached-object dictionary. Caching is used only if both
    /// peers enable it.
    pub cache_enabled: bool,
    /// Max number of encode-side cache slots before new structures stop
    /// being cached.
    pub cache_size: usize,
    /// Max frame size in bytes advertised to the peer. The effective limit
    /// is the minimum of both proposals; enforcement is the transport's job.
    pub max_frame_size: i32,
    /// Max read-inactivity duration in milliseconds advertised to the peer.
    pub max_inactivity_duration: i32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            preferred_version: PROTOCOL_VERSION,
            tight_encoding: true,
            cache_enabled: true,
            cache_size: DEFAULT_CACHE_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_inactivity_duration: DEFAULT_MAX_INACTIVITY_DURATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_offers_everything() {
        let config = CodecConfig::default();
        assert_eq!(config.preferred_version, PROTOCOL_VERSION);
        assert!(config.tight_encoding);
        assert!(config.cache_enabled);
        assert!(config.cache_size > 0);
    }
}
