//! Error types for the COA resolution pipeline.
//!
//! This module provides a comprehensive error hierarchy using `thiserror`.
//! Transient network failures are retried or failed-over locally and never
//! surface individually; only exhaustion errors reach the caller.

use thiserror::Error;

/// Result type alias using `CoaError`.
pub type Result<T> = std::result::Result<T, CoaError>;

/// A single failed gateway attempt, kept for diagnostics when every gateway
/// has been exhausted.
#[derive(Clone, Debug)]
pub struct GatewayFailure {
    /// Gateway base URL that was attempted.
    pub gateway: String,
    /// Why the attempt failed (status, timeout, parse error).
    pub reason: String,
}

impl std::fmt::Display for GatewayFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.gateway, self.reason)
    }
}

/// Main error type for all COA operations.
#[derive(Debug, Error)]
pub enum CoaError {
    // ═══════════════════════════════════════════════════════════════════════════
    // RPC ENDPOINT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// A single call exceeded its per-call deadline.
    #[error("RPC endpoint '{label}' timed out after {seconds}s")]
    NetworkTimeout {
        /// Display label of the endpoint.
        label: String,
        /// Deadline that was exceeded.
        seconds: u64,
    },

    /// An endpoint failed and entered its cool-down window. Not user-visible
    /// directly; recorded so failover can skip the endpoint.
    #[error("RPC endpoint '{label}' is unhealthy")]
    EndpointUnhealthy {
        /// Display label of the endpoint.
        label: String,
    },

    /// Every configured endpoint for a chain failed. Terminal for the call.
    #[error("all RPC endpoints failed for chain {chain_id}")]
    AllEndpointsFailed {
        /// Chain whose endpoints were exhausted.
        chain_id: u64,
        /// Last underlying failure.
        #[source]
        source: Box<CoaError>,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // GATEWAY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// One gateway attempt failed. Accumulated, never surfaced individually.
    #[error("gateway {gateway} failed: {reason}")]
    GatewayFetch {
        /// Gateway base URL.
        gateway: String,
        /// Failure detail.
        reason: String,
    },

    /// Every gateway was tried without success. Carries the per-gateway
    /// failure list for diagnostics.
    #[error("all gateways exhausted for '{reference}': {}", format_failures(.failures))]
    AllGatewaysExhausted {
        /// The content-address reference that could not be fetched.
        reference: String,
        /// One entry per failed gateway attempt.
        failures: Vec<GatewayFailure>,
    },

    /// A direct (non-content-addressed) fetch failed. No fallback applies.
    #[error("fetch failed for {url}: {reason}")]
    Fetch {
        /// URL that was fetched.
        url: String,
        /// Failure detail.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // DECRYPTION & FORMAT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// Authenticated decryption failed. Wrong password and corrupted data are
    /// indistinguishable by design; never retried.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Payload is neither valid JSON nor recognized as encrypted.
    #[error("metadata format error: {0}")]
    MetadataFormat(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // RESOLUTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// The identifier never resolved to a token after exhausting every lookup
    /// path. User-facing "not found", not a system fault.
    #[error("certificate '{identifier}' not found")]
    NotFound {
        /// The identifier as requested.
        identifier: String,
    },

    /// The primary resolution path failed and so did the single static-URL
    /// fallback. The originating error chain is preserved.
    #[error("resolution failed (fallback also failed: {fallback})")]
    ResolutionFailed {
        /// Error from the primary path.
        #[source]
        source: Box<CoaError>,
        /// Why the fallback fetch failed as well.
        fallback: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // AMBIENT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════
    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// JSON-RPC level failure (error object in the response).
    #[error("RPC call failed: {0}")]
    Rpc(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Input validation failed.
    #[error("validation error: {0}")]
    Validation(String),
}

fn format_failures(failures: &[GatewayFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl CoaError {
    /// Returns true if this error is transient and a retry could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoaError::Http(_)
                | CoaError::Rpc(_)
                | CoaError::NetworkTimeout { .. }
                | CoaError::GatewayFetch { .. }
        )
    }

    /// Returns true if retrying with the same inputs can never succeed.
    /// Decryption and format errors surface immediately.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            CoaError::Decryption(_) | CoaError::MetadataFormat(_) | CoaError::NotFound { .. }
        )
    }

    /// Returns true if this is the user-facing "not found" outcome rather
    /// than a system fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoaError::NotFound { .. })
    }

    /// Convenience constructor for the invariant decryption failure message.
    /// Wrong password and corrupted data are deliberately indistinguishable.
    pub fn invalid_password_or_corrupted() -> Self {
        CoaError::Decryption("invalid password or corrupted data".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoaError::NetworkTimeout {
            label: "Primary".into(),
            seconds: 8,
        };
        assert!(err.to_string().contains("Primary"));
        assert!(err.to_string().contains("8s"));
    }

    #[test]
    fn test_exhausted_gateways_lists_failures() {
        let err = CoaError::AllGatewaysExhausted {
            reference: "QmTest".into(),
            failures: vec![
                GatewayFailure {
                    gateway: "https://ipfs.io/ipfs/".into(),
                    reason: "HTTP 504".into(),
                },
                GatewayFailure {
                    gateway: "https://w3s.link/ipfs/".into(),
                    reason: "timeout".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("QmTest"));
        assert!(text.contains("HTTP 504"));
        assert!(text.contains("timeout"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CoaError::Http("boom".into()).is_recoverable());
        assert!(CoaError::Rpc("boom".into()).is_recoverable());
        assert!(!CoaError::invalid_password_or_corrupted().is_recoverable());
        assert!(CoaError::invalid_password_or_corrupted().is_permanent());
        assert!(CoaError::NotFound {
            identifier: "b0".into()
        }
        .is_not_found());
    }

    #[test]
    fn test_endpoints_failed_preserves_source() {
        let err = CoaError::AllEndpointsFailed {
            chain_id: 28530,
            source: Box::new(CoaError::Http("connection refused".into())),
        };
        let source = std::error::Error::source(&err).expect("source preserved");
        assert!(source.to_string().contains("connection refused"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parsed: std::result::Result<serde_json::Value, _> = serde_json::from_str("nope");
        let converted: Result<serde_json::Value> = parsed.map_err(CoaError::from);
        assert!(matches!(converted, Err(CoaError::Json(_))));
    }
}
