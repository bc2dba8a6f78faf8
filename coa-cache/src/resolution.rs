//! The two typed stores the resolver consults.

use coa_core::types::CertificateMetadata;

use crate::cache::{CacheConfig, CacheStats, TtlCache};

/// Paired caches for the two lookup shapes in a resolution:
/// token id → token URI, and URI → metadata document.
///
/// Each store is independently bounded; a URI entry surviving while its
/// metadata entry was evicted (or vice versa) is fine, the resolver
/// re-fetches whatever is missing.
pub struct ResolutionCache {
    token_uris: TtlCache<String>,
    metadata: TtlCache<CertificateMetadata>,
}

impl ResolutionCache {
    /// Creates both stores with default configuration.
    pub fn new() -> Self {
        Self {
            token_uris: TtlCache::new(),
            metadata: TtlCache::new(),
        }
    }

    /// Creates both stores with the same custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            token_uris: TtlCache::with_config(config.clone()),
            metadata: TtlCache::with_config(config),
        }
    }

    fn uri_key(chain_id: u64, token_id: u64) -> String {
        format!("{chain_id}-{token_id}")
    }

    /// Cached token URI for a token on a chain.
    pub fn token_uri(&self, chain_id: u64, token_id: u64) -> Option<String> {
        self.token_uris.get(&Self::uri_key(chain_id, token_id))
    }

    /// Stores a resolved token URI.
    pub fn set_token_uri(&self, chain_id: u64, token_id: u64, uri: impl Into<String>) {
        self.token_uris
            .set(Self::uri_key(chain_id, token_id), uri.into());
    }

    /// Cached metadata document for a URI.
    pub fn metadata(&self, uri: &str) -> Option<CertificateMetadata> {
        self.metadata.get(uri)
    }

    /// Stores a fetched metadata document.
    pub fn set_metadata(&self, uri: impl Into<String>, doc: CertificateMetadata) {
        self.metadata.set(uri, doc);
    }

    /// Clears both stores.
    pub fn clear(&self) {
        self.token_uris.clear();
        self.metadata.clear();
    }

    /// Statistics for (token-URI store, metadata store).
    pub fn stats(&self) -> (CacheStats, CacheStats) {
        (self.token_uris.stats(), self.metadata.stats())
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_uri_keyed_by_chain_and_token() {
        let cache = ResolutionCache::new();
        cache.set_token_uri(28530, 42, "ipfs://QmMain");
        cache.set_token_uri(75234, 42, "ipfs://QmTest");

        assert_eq!(cache.token_uri(28530, 42).as_deref(), Some("ipfs://QmMain"));
        assert_eq!(cache.token_uri(75234, 42).as_deref(), Some("ipfs://QmTest"));
        assert!(cache.token_uri(28530, 43).is_none());
    }

    #[test]
    fn test_metadata_store_round_trip() {
        let cache = ResolutionCache::new();
        let doc: CertificateMetadata = serde_json::from_str(r#"{"name":"COA #42"}"#).unwrap();

        cache.set_metadata("ipfs://QmMeta", doc);

        let hit = cache.metadata("ipfs://QmMeta").expect("cached");
        assert_eq!(hit.name.as_deref(), Some("COA #42"));
    }

    #[test]
    fn test_clear_empties_both_stores() {
        let cache = ResolutionCache::new();
        cache.set_token_uri(28530, 1, "u");
        cache.set_metadata("u", CertificateMetadata::default());

        cache.clear();

        let (uris, meta) = cache.stats();
        assert_eq!(uris.total_entries, 0);
        assert_eq!(meta.total_entries, 0);
    }
}
