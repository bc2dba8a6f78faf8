//! Content-address reference recognition.
//!
//! Token URIs arrive in several shapes: a raw `ipfs://` reference, a URL
//! with the hash embedded in an `/ipfs/` path, or a URL on one of the known
//! gateway hosts. The matchers below are tried in priority order; the first
//! match wins. A URI no matcher recognizes is not content-addressed and is
//! fetched directly.

/// One way a reference can embed a content hash.
enum Matcher {
    /// `ipfs://<hash>`
    Scheme(&'static str),
    /// Any URL with the hash after this path marker.
    PathMarker(&'static str),
    /// A known gateway host carrying the hash after its `/ipfs/` path.
    GatewayHost(&'static str),
}

/// Priority-ordered matchers. The generic path marker precedes the
/// per-host entries, which are kept so a host remains recognized even if
/// its path shape ever diverges from the generic marker.
const MATCHERS: &[Matcher] = &[
    Matcher::Scheme("ipfs://"),
    Matcher::PathMarker("/ipfs/"),
    Matcher::GatewayHost("ipfs.io"),
    Matcher::GatewayHost("gateway.pinata.cloud"),
    Matcher::GatewayHost("nftstorage.link"),
    Matcher::GatewayHost("w3s.link"),
];

/// Extracts the bare content hash from a reference, if any matcher
/// recognizes it.
pub fn extract_hash(uri: &str) -> Option<&str> {
    for matcher in MATCHERS {
        let hit = match matcher {
            Matcher::Scheme(prefix) => uri.strip_prefix(prefix),
            Matcher::PathMarker(marker) => uri
                .find(marker)
                .map(|pos| &uri[pos + marker.len()..]),
            Matcher::GatewayHost(host) => uri
                .find(host)
                .and_then(|pos| uri[pos..].find("/ipfs/").map(|rel| &uri[pos + rel + 6..])),
        };
        match hit {
            Some(hash) if !hash.is_empty() => return Some(hash),
            _ => continue,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_raw_scheme() {
        assert_eq!(extract_hash("ipfs://QmHash123"), Some("QmHash123"));
    }

    #[test]
    fn test_extract_from_embedded_path() {
        assert_eq!(
            extract_hash("https://ipfs.io/ipfs/QmHash123"),
            Some("QmHash123")
        );
        assert_eq!(
            extract_hash("https://gateway.pinata.cloud/ipfs/QmHash123"),
            Some("QmHash123")
        );
    }

    #[test]
    fn test_extract_preserves_subpath() {
        // Directory CIDs keep their inner path attached to the hash
        assert_eq!(
            extract_hash("ipfs://QmDir/metadata.json"),
            Some("QmDir/metadata.json")
        );
    }

    #[test]
    fn test_plain_urls_are_not_content_addressed() {
        assert_eq!(extract_hash("https://example.com/meta/42.json"), None);
        assert_eq!(extract_hash("QmBareHashWithoutScheme"), None);
        assert_eq!(extract_hash(""), None);
    }

    #[test]
    fn test_scheme_matcher_wins_over_path_marker() {
        // An ipfs:// URI whose hash itself contains /ipfs/ still resolves
        // through the scheme matcher first.
        assert_eq!(
            extract_hash("ipfs://QmOuter/ipfs/inner"),
            Some("QmOuter/ipfs/inner")
        );
    }

    #[test]
    fn test_empty_hash_is_no_match() {
        assert_eq!(extract_hash("ipfs://"), None);
        assert_eq!(extract_hash("https://ipfs.io/ipfs/"), None);
    }
}
