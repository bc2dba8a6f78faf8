//! Identifier lookup strategies.
//!
//! The orchestrator folds these in a fixed order: static mapping, then the
//! arithmetic series mapping, then the brute-force range scan. Each
//! strategy answers `Ok(None)` to pass, so adding a lookup path means
//! adding a strategy, not another layer of nested fallback handling.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use coa_cache::ResolutionCache;
use coa_core::error::Result;
use coa_core::traits::{IdentifierLookup, LookupHit, MetadataFetcher, TokenUriSource};
use coa_core::types::{Provenance, ScanRange, SeriesMapping};

// ═══════════════════════════════════════════════════════════════════════════════
// STATIC MAPPING
// ═══════════════════════════════════════════════════════════════════════════════

/// O(1) lookup in the configured identifier→token-id table.
pub struct StaticMappingLookup {
    mapping: HashMap<String, u64>,
}

impl StaticMappingLookup {
    /// Builds the strategy from a configured mapping table. Keys are
    /// normalized to lowercase once, here.
    pub fn new(mapping: &HashMap<String, u64>) -> Self {
        Self {
            mapping: mapping
                .iter()
                .map(|(k, v)| (k.to_lowercase(), *v))
                .collect(),
        }
    }
}

#[async_trait]
impl IdentifierLookup for StaticMappingLookup {
    fn name(&self) -> &'static str {
        "static-mapping"
    }

    async fn attempt(&self, identifier: &str) -> Result<Option<LookupHit>> {
        Ok(self.mapping.get(identifier).map(|&token_id| LookupHit {
            token_id,
            provenance: Provenance::DirectMapping,
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIES MAPPING
// ═══════════════════════════════════════════════════════════════════════════════

/// O(1) arithmetic mapping for bulk-issued series. No network call.
pub struct SeriesLookup {
    series: Vec<SeriesMapping>,
}

impl SeriesLookup {
    /// Builds the strategy from the configured series list.
    pub fn new(series: &[SeriesMapping]) -> Self {
        Self {
            series: series.to_vec(),
        }
    }
}

#[async_trait]
impl IdentifierLookup for SeriesLookup {
    fn name(&self) -> &'static str {
        "series-mapping"
    }

    async fn attempt(&self, identifier: &str) -> Result<Option<LookupHit>> {
        for series in &self.series {
            if let Some(token_id) = series.token_for(identifier) {
                debug!(series = %series.label, token_id, "series mapping hit");
                return Ok(Some(LookupHit {
                    token_id,
                    provenance: Provenance::SeriesMapping,
                }));
            }
        }
        Ok(None)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RANGE SCAN
// ═══════════════════════════════════════════════════════════════════════════════

/// Brute-force scan over the declared token-id ranges.
///
/// Candidates form a lazy sequence consumed first-match-wins: each token's
/// metadata is fetched and inspected for a case-insensitive identifier
/// match. Early exit means the lowest-token-id match is not guaranteed if
/// duplicates exist; that ambiguity is inherited from the issuing process
/// and deliberately not papered over here. Tokens that fail to load are
/// skipped.
pub struct RangeScanLookup {
    ranges: Vec<ScanRange>,
    chain: Arc<dyn TokenUriSource>,
    fetcher: Arc<dyn MetadataFetcher>,
    cache: Arc<ResolutionCache>,
    chain_id: u64,
}

impl RangeScanLookup {
    /// Builds the scan over the configured ranges.
    pub fn new(
        ranges: &[ScanRange],
        chain_id: u64,
        chain: Arc<dyn TokenUriSource>,
        fetcher: Arc<dyn MetadataFetcher>,
        cache: Arc<ResolutionCache>,
    ) -> Self {
        Self {
            ranges: ranges.to_vec(),
            chain,
            fetcher,
            cache,
            chain_id,
        }
    }

    /// Loads one candidate and checks it against the identifier. A hit
    /// populates the cache so the orchestrator does not refetch what the
    /// scan just retrieved.
    async fn inspect(&self, token_id: u64, identifier: &str) -> Result<bool> {
        let uri = self.chain.token_uri(token_id).await?;
        let payload = self.fetcher.fetch_metadata(&uri).await?;

        let matched = payload
            .document()
            .map(|doc| doc.matches_identifier(identifier))
            .unwrap_or(false);

        if matched {
            self.cache.set_token_uri(self.chain_id, token_id, &uri);
            if let Some(doc) = payload.document() {
                self.cache.set_metadata(&uri, doc.clone());
            }
        }
        Ok(matched)
    }
}

#[async_trait]
impl IdentifierLookup for RangeScanLookup {
    fn name(&self) -> &'static str {
        "range-scan"
    }

    async fn attempt(&self, identifier: &str) -> Result<Option<LookupHit>> {
        for range in &self.ranges {
            debug!(range = %range.label, start = range.start, end = range.end, "scanning token range");

            for token_id in range.ids() {
                match self.inspect(token_id, identifier).await {
                    Ok(true) => {
                        info!(token_id, identifier, "range scan found matching token");
                        return Ok(Some(LookupHit {
                            token_id,
                            provenance: Provenance::RangeScan,
                        }));
                    }
                    Ok(false) => {}
                    Err(e) => {
                        // Candidate may not exist or carry unreadable metadata
                        debug!(token_id, error = %e, "skipping candidate");
                    }
                }
            }
        }
        Ok(None)
    }
}
