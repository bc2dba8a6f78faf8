//! Resolution results and observability tags.

use serde::{Deserialize, Serialize};

use super::metadata::CertificateMetadata;

/// Which path produced a resolution result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Served from the cache without touching the network.
    CacheHit,
    /// Static identifier→token mapping.
    DirectMapping,
    /// Arithmetic bulk-issue series mapping.
    SeriesMapping,
    /// Brute-force scan over declared token-id ranges.
    RangeScan,
    /// Live chain call plus gateway fetch.
    ChainFetch,
    /// Static per-network metadata URL after the primary path failed.
    Fallback,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Provenance::CacheHit => "cache-hit",
            Provenance::DirectMapping => "direct-mapping",
            Provenance::SeriesMapping => "series-mapping",
            Provenance::RangeScan => "range-scan",
            Provenance::ChainFetch => "chain-fetch",
            Provenance::Fallback => "fallback",
        };
        f.write_str(tag)
    }
}

/// Phases a single resolution request moves through.
///
/// `Authenticating` only applies when the returned metadata declares a
/// password requirement; the authentication UI is an external collaborator
/// and the pipeline only exposes the flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionPhase {
    /// No request in flight.
    Idle,
    /// Lookup paths and network fetches running.
    Searching,
    /// A token was located and its metadata retrieved.
    Found,
    /// Every lookup path was exhausted.
    NotFound,
    /// Metadata retrieved but gated behind a password.
    Authenticating,
    /// Final state; the certificate is viewable.
    Ready,
}

impl std::fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResolutionPhase::Idle => "idle",
            ResolutionPhase::Searching => "searching",
            ResolutionPhase::Found => "found",
            ResolutionPhase::NotFound => "not-found",
            ResolutionPhase::Authenticating => "authenticating",
            ResolutionPhase::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// The final product of a resolution. Ephemeral; persisted only through the
/// cache stores, and callers receive copies, never references.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedCertificate {
    /// On-chain token id.
    pub token_id: u64,
    /// Token URI as returned by the contract (or the fallback URL).
    pub token_uri: String,
    /// The metadata document.
    pub metadata: CertificateMetadata,
    /// Which path produced this result.
    pub provenance: Provenance,
    /// Whether the caller must collect a password before display.
    pub requires_password: bool,
}

impl ResolvedCertificate {
    /// Builds a result, deriving the password flag from the document.
    pub fn new(
        token_id: u64,
        token_uri: impl Into<String>,
        metadata: CertificateMetadata,
        provenance: Provenance,
    ) -> Self {
        let requires_password = metadata.needs_password();
        Self {
            token_id,
            token_uri: token_uri.into(),
            metadata,
            provenance,
            requires_password,
        }
    }

    /// Terminal phase for this result as seen by the pipeline.
    pub fn phase(&self) -> ResolutionPhase {
        if self.requires_password {
            ResolutionPhase::Authenticating
        } else {
            ResolutionPhase::Ready
        }
    }
}
