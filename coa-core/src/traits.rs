//! Common traits for the COA pipeline.
//!
//! These traits define the interfaces at the crate seams, enabling
//! modularity and testing with in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MetadataPayload, Provenance};

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN READ TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of on-chain token URIs.
///
/// Implementations might use:
/// - A failover-managed JSON-RPC endpoint pool (production)
/// - An in-memory map (tests)
#[async_trait]
pub trait TokenUriSource: Send + Sync {
    /// Resolves a token id to its content-address pointer or URL.
    async fn token_uri(&self, token_id: u64) -> Result<String>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYLOAD FETCH TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Fetcher for metadata documents referenced by token URIs.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Retrieves and classifies the payload behind a URI or content-address
    /// reference. Encrypted payloads are returned as a sentinel, not an
    /// error.
    async fn fetch_metadata(&self, uri: &str) -> Result<MetadataPayload>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIER LOOKUP TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A successful identifier lookup: the token id plus which path found it.
#[derive(Clone, Copy, Debug)]
pub struct LookupHit {
    /// The resolved token id.
    pub token_id: u64,
    /// The path that produced the hit.
    pub provenance: Provenance,
}

/// One strategy for mapping a certificate identifier to a token id.
///
/// Strategies form an explicit ordered list folded by the orchestrator:
/// each returns `Ok(None)` to pass to the next strategy, `Ok(Some(hit))` to
/// stop the fold, or an error when the strategy itself failed (errors are
/// accumulated, not individually surfaced).
#[async_trait]
pub trait IdentifierLookup: Send + Sync {
    /// Strategy name for logs and accumulated diagnostics.
    fn name(&self) -> &'static str;

    /// Attempts to map the (normalized) identifier to a token id.
    async fn attempt(&self, identifier: &str) -> Result<Option<LookupHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_hit_carries_provenance() {
        let hit = LookupHit {
            token_id: 687_764,
            provenance: Provenance::SeriesMapping,
        };
        assert_eq!(hit.token_id, 687_764);
        assert_eq!(hit.provenance, Provenance::SeriesMapping);
    }
}
