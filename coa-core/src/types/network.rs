//! Network configuration: chains, contracts, endpoints, and lookup data.
//!
//! Configuration is supplied by the embedding application and treated as
//! read-only shared state by every pipeline component. The presets for the
//! two known chains carry their endpoint lists, bulk-issue series, and scan
//! ranges; contract address and metadata base URL always come from the
//! caller.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{CHAIN_ID_MAINNET, CHAIN_ID_TESTNET};

/// A single JSON-RPC endpoint with its selection priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcEndpoint {
    /// Endpoint URL.
    pub url: String,
    /// Selection priority; lower is preferred.
    pub priority: u32,
    /// Human-readable label used in logs and stats.
    pub label: String,
    /// Per-call timeout in seconds.
    pub timeout_seconds: u64,
}

impl RpcEndpoint {
    /// Creates an endpoint descriptor.
    pub fn new(url: impl Into<String>, priority: u32, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            priority,
            label: label.into(),
            timeout_seconds: 10,
        }
    }

    /// Overrides the per-call timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// An inclusive token-id range scanned when no mapping matches.
///
/// Ranges are ordered data: adding a newly issued batch means appending a
/// range, not touching scan logic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanRange {
    /// First token id in the range.
    pub start: u64,
    /// Last token id in the range (inclusive).
    pub end: u64,
    /// What this range covers, for logs.
    pub label: String,
}

impl ScanRange {
    /// Creates a range descriptor.
    pub fn new(start: u64, end: u64, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Lazy iterator over the candidate token ids in this range.
    pub fn ids(&self) -> impl Iterator<Item = u64> {
        self.start..=self.end
    }

    /// Number of token ids covered.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start) + 1
    }

    /// Returns true when the range covers no ids.
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Arithmetic identifier→token mapping for a bulk-issued series.
///
/// Certificates issued in one batch carry sequential order numbers under a
/// shared prefix, so the token id is recoverable without any network call:
/// `token = first_token + (order - first_order)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeriesMapping {
    /// Identifier prefix, compared case-insensitively (e.g. `"b0"`).
    pub prefix: String,
    /// First order number in the series.
    pub first_order: u64,
    /// Last order number in the series (inclusive).
    pub last_order: u64,
    /// Token id assigned to `first_order`.
    pub first_token: u64,
    /// Series label, for logs.
    pub label: String,
}

impl SeriesMapping {
    /// Maps an identifier to its token id, if it belongs to this series.
    ///
    /// The identifier is expected pre-normalized (trimmed, lowercase).
    pub fn token_for(&self, identifier: &str) -> Option<u64> {
        let digits = identifier.strip_prefix(&self.prefix)?;
        let order: u64 = digits.parse().ok()?;
        if order < self.first_order || order > self.last_order {
            return None;
        }
        Some(self.first_token + (order - self.first_order))
    }
}

/// Immutable per-network descriptor consumed by the pipeline.
///
/// The core never mutates or persists this; it is read-only input from the
/// embedding application.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// EVM chain id.
    pub chain_id: u64,
    /// Network display name.
    pub name: String,
    /// ERC-721 contract address holding the certificates.
    pub contract_address: String,
    /// RPC endpoints, ordered by priority.
    pub endpoints: Vec<RpcEndpoint>,
    /// Base URL for the static per-token metadata fallback.
    pub metadata_base_url: String,
    /// Static identifier→token-id mapping for known certificates.
    #[serde(default)]
    pub identifier_mapping: HashMap<String, u64>,
    /// Bulk-issued series with arithmetic identifier mapping.
    #[serde(default)]
    pub series: Vec<SeriesMapping>,
    /// Token-id ranges scanned as a last resort.
    #[serde(default)]
    pub scan_ranges: Vec<ScanRange>,
}

impl NetworkConfig {
    /// Preset for the certificate L1 mainnet (chain id 28530).
    pub fn mainnet(contract_address: impl Into<String>) -> Self {
        Self {
            chain_id: CHAIN_ID_MAINNET,
            name: "Certificate L1 Mainnet".into(),
            contract_address: contract_address.into(),
            endpoints: vec![RpcEndpoint::new(
                "https://subnets.avax.network/btic/mainnet/rpc",
                1,
                "Subnets Public (Primary)",
            )
            .with_timeout(8)],
            metadata_base_url: String::new(),
            identifier_mapping: HashMap::new(),
            series: vec![SeriesMapping {
                prefix: "b0".into(),
                first_order: 229_059,
                last_order: 229_355,
                first_token: 687_723,
                label: "Earl Campbell mainnet COAs".into(),
            }],
            scan_ranges: vec![
                ScanRange::new(687_723, 688_019, "Earl Campbell mainnet COAs"),
                ScanRange::new(1, 100, "Early tokens"),
            ],
        }
    }

    /// Preset for the certificate L1 testnet (chain id 75234).
    pub fn testnet(contract_address: impl Into<String>) -> Self {
        Self {
            chain_id: CHAIN_ID_TESTNET,
            name: "Certificate L1 Testnet".into(),
            contract_address: contract_address.into(),
            endpoints: vec![
                RpcEndpoint::new(
                    "https://subnets.avax.network/btest/testnet/rpc",
                    1,
                    "Testnet Public",
                )
                .with_timeout(8),
                RpcEndpoint::new(
                    "https://testnet-btest.avax-test.network/ext/bc/rpc",
                    2,
                    "Testnet Secondary",
                )
                .with_timeout(10),
            ],
            metadata_base_url: String::new(),
            identifier_mapping: HashMap::new(),
            series: Vec::new(),
            scan_ranges: vec![
                ScanRange::new(1, 100, "Early tokens"),
                ScanRange::new(1400, 1500, "Testnet range"),
            ],
        }
    }

    /// Overrides the static metadata fallback base URL.
    pub fn with_metadata_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.metadata_base_url = base_url.into();
        self
    }

    /// Adds static identifier→token-id mappings.
    pub fn with_identifier_mapping(mut self, mapping: HashMap<String, u64>) -> Self {
        self.identifier_mapping = mapping;
        self
    }

    /// Replaces the endpoint list.
    pub fn with_endpoints(mut self, endpoints: Vec<RpcEndpoint>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Endpoints sorted by ascending priority.
    pub fn endpoints_by_priority(&self) -> Vec<RpcEndpoint> {
        let mut sorted = self.endpoints.clone();
        sorted.sort_by_key(|e| e.priority);
        sorted
    }

    /// URL of the static metadata document for a token id.
    pub fn fallback_metadata_url(&self, token_id: u64) -> String {
        format!(
            "{}/{}.json",
            self.metadata_base_url.trim_end_matches('/'),
            token_id
        )
    }

    /// Basic sanity checks on caller-supplied configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.endpoints.is_empty() {
            return Err(crate::error::CoaError::Config(format!(
                "network '{}' has no RPC endpoints",
                self.name
            )));
        }
        if self.contract_address.is_empty() {
            return Err(crate::error::CoaError::Config(format!(
                "network '{}' has no contract address",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn bulk_series() -> SeriesMapping {
        SeriesMapping {
            prefix: "b0".into(),
            first_order: 229_059,
            last_order: 229_355,
            first_token: 687_723,
            label: "test".into(),
        }
    }

    // 687723 + (229100 - 229059) = 687764
    #[test_case("b0229100", Some(687_764); "mid series")]
    #[test_case("b0229059", Some(687_723); "first order")]
    #[test_case("b0229355", Some(688_019); "last order")]
    #[test_case("b0229058", None; "below range")]
    #[test_case("b0229356", None; "above range")]
    #[test_case("a0229100", None; "wrong prefix")]
    #[test_case("b0notanumber", None; "non numeric suffix")]
    fn test_series_arithmetic_mapping(identifier: &str, expected: Option<u64>) {
        assert_eq!(bulk_series().token_for(identifier), expected);
    }

    #[test]
    fn test_scan_range_iteration() {
        let range = ScanRange::new(5, 8, "test");
        let ids: Vec<u64> = range.ids().collect();
        assert_eq!(ids, vec![5, 6, 7, 8]);
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn test_mainnet_preset() {
        let config = NetworkConfig::mainnet("0xabc");
        assert_eq!(config.chain_id, 28530);
        assert!(!config.endpoints.is_empty());
        assert!(!config.series.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testnet_preset_has_two_endpoints() {
        let config = NetworkConfig::testnet("0xabc");
        assert_eq!(config.chain_id, 75234);
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints_by_priority()[0].label, "Testnet Public");
    }

    #[test]
    fn test_fallback_metadata_url() {
        let config =
            NetworkConfig::mainnet("0xabc").with_metadata_base_url("https://meta.example.com/");
        assert_eq!(
            config.fallback_metadata_url(42),
            "https://meta.example.com/42.json"
        );
    }

    #[test]
    fn test_validate_rejects_empty_contract() {
        let config = NetworkConfig::mainnet("");
        assert!(config.validate().is_err());
    }
}
