//! Pipeline constants for the COA resolver.
//!
//! Wire-format sizes match the issuer's envelope packaging; timing values
//! match the documented failover and caching policy.

// ═══════════════════════════════════════════════════════════════════════════════
// ENCRYPTED ENVELOPE WIRE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of the salt section in a packed envelope, in bytes.
///
/// A leading big-endian u32 equal to this value is the sole signal used to
/// classify a byte blob as encrypted. There is no version byte.
pub const ENVELOPE_SALT_LEN: usize = 64;

/// Length of the initialization vector the issuer packs, in bytes.
pub const ENVELOPE_IV_LEN: usize = 16;

/// Length of the GCM authentication tag, in bytes (128-bit tag).
pub const ENVELOPE_TAG_LEN: usize = 16;

/// Minimum byte length for a blob to be considered possibly encrypted.
/// Anything shorter cannot hold the declared sections.
pub const ENVELOPE_MIN_LEN: usize = 100;

/// PBKDF2 iteration count for password key derivation.
pub const KDF_ITERATIONS: u32 = 100_000;

/// Derived symmetric key length in bytes (AES-256).
pub const KDF_KEY_LEN: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Time-to-live for cached lookups (1 hour).
pub const CACHE_TTL_SECONDS: u64 = 3600;

/// Maximum entries per cache store before the oldest-inserted is evicted.
pub const CACHE_MAX_ENTRIES: usize = 500;

// ═══════════════════════════════════════════════════════════════════════════════
// GATEWAY FETCH
// ═══════════════════════════════════════════════════════════════════════════════

/// Known content-address gateways, tried strictly in this order.
pub const IPFS_GATEWAYS: [&str; 4] = [
    "https://ipfs.io/ipfs/",
    "https://gateway.pinata.cloud/ipfs/",
    "https://nftstorage.link/ipfs/",
    "https://w3s.link/ipfs/",
];

/// Per-gateway fetch deadline in seconds. A gateway is never retried.
pub const GATEWAY_TIMEOUT_SECONDS: u64 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// RPC FAILOVER
// ═══════════════════════════════════════════════════════════════════════════════

/// Seconds a failed endpoint is excluded from selection.
pub const ENDPOINT_COOLDOWN_SECONDS: u64 = 60;

/// Maximum age of a health snapshot before best-endpoint selection re-probes.
pub const HEALTH_SNAPSHOT_MAX_AGE_SECONDS: u64 = 30;

/// Period of the background health monitor sweep.
pub const HEALTH_CHECK_INTERVAL_SECONDS: u64 = 30;

/// Attempts made by the single-endpoint retry path.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Base per-attempt timeout for the retry path; scales linearly per attempt.
pub const RETRY_BASE_TIMEOUT_SECONDS: u64 = 10;

/// Base inter-attempt delay for the retry path; scales linearly per attempt.
pub const RETRY_BASE_DELAY_SECONDS: u64 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN CALLS
// ═══════════════════════════════════════════════════════════════════════════════

/// 4-byte selector for the ERC-721 `tokenURI(uint256)` read call.
pub const TOKEN_URI_SELECTOR: [u8; 4] = [0xc8, 0x7b, 0x56, 0xdd];

/// Chain id of the certificate L1 mainnet.
pub const CHAIN_ID_MAINNET: u64 = 28530;

/// Chain id of the certificate L1 testnet.
pub const CHAIN_ID_TESTNET: u64 = 75234;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_sections_fit_minimum() {
        // Four 4-byte prefixes plus salt, IV, and tag must fit under the
        // classification minimum, leaving room for ciphertext.
        let fixed = 4 * 4 + ENVELOPE_SALT_LEN + ENVELOPE_IV_LEN + ENVELOPE_TAG_LEN;
        assert!(fixed <= ENVELOPE_MIN_LEN + 16);
        assert_eq!(ENVELOPE_SALT_LEN, 64);
    }

    #[test]
    fn test_gateway_list_has_minimum_entries() {
        assert!(IPFS_GATEWAYS.len() >= 4);
        for gw in IPFS_GATEWAYS {
            assert!(gw.starts_with("https://"));
            assert!(gw.ends_with("/ipfs/"));
        }
    }

    #[test]
    fn test_token_uri_selector() {
        // keccak256("tokenURI(uint256)")[..4]
        assert_eq!(hex::encode(TOKEN_URI_SELECTOR), "c87b56dd");
    }
}
