//! The certificate metadata document.
//!
//! Consumed, never produced: the issuer writes these documents; the
//! pipeline fetches, optionally decrypts, and reads them. Unknown fields
//! are preserved so re-serialization is lossless.

use serde::{Deserialize, Serialize};

/// A single `{trait_type, value}` attribute. Order within the document is
/// preserved.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetadataAttribute {
    /// Attribute name.
    #[serde(default)]
    pub trait_type: String,
    /// Attribute value; issuers emit strings but numbers occur in the wild.
    #[serde(default)]
    pub value: serde_json::Value,
}

impl MetadataAttribute {
    /// The value as text, if it is a JSON string.
    pub fn value_text(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Metadata document a token URI points at.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CertificateMetadata {
    /// Certificate title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Certificate media: a content-address reference or plain URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Ordered attribute list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<MetadataAttribute>,
    /// Issuer-set password for gated certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Whether viewing requires authentication. The gate itself is an
    /// external collaborator; the pipeline only surfaces the flag.
    #[serde(
        default,
        rename = "requiresPassword",
        skip_serializing_if = "Option::is_none"
    )]
    pub requires_password: Option<bool>,
    /// Issue date, as the issuer formatted it.
    #[serde(default, rename = "mintDate", skip_serializing_if = "Option::is_none")]
    pub mint_date: Option<String>,
    /// Contract address the issuer stamped into the document.
    #[serde(
        default,
        rename = "contractAddress",
        skip_serializing_if = "Option::is_none"
    )]
    pub contract_address: Option<String>,
    /// External verification link.
    #[serde(
        default,
        rename = "verificationUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub verification_url: Option<String>,
    /// Fields this pipeline does not consume, preserved round-trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CertificateMetadata {
    /// Parses a metadata document from raw JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            crate::error::CoaError::MetadataFormat(format!("invalid metadata document: {e}"))
        })
    }

    /// Whether this certificate declares a password requirement.
    pub fn needs_password(&self) -> bool {
        self.requires_password.unwrap_or(false)
    }

    /// Case-insensitive match of an order identifier against this document.
    ///
    /// A document matches when any attribute whose `trait_type` mentions
    /// "order" carries the identifier as its value, or when the name
    /// contains the identifier. Two certificates could in principle both
    /// match a short identifier substring; the scan keeps its documented
    /// first-match-wins behavior rather than guessing at a stronger rule.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        let wanted = identifier.to_lowercase();

        let attribute_hit = self.attributes.iter().any(|attr| {
            attr.trait_type.to_lowercase().contains("order")
                && attr
                    .value_text()
                    .map(|v| v.to_lowercase() == wanted)
                    .unwrap_or(false)
        });

        let name_hit = self
            .name
            .as_deref()
            .map(|n| n.to_lowercase().contains(&wanted))
            .unwrap_or(false);

        attribute_hit || name_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> CertificateMetadata {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_full_document() {
        let meta = doc(r#"{
            "name": "COA b0229100",
            "description": "Certificate of authenticity",
            "image": "ipfs://QmImageHash",
            "attributes": [
                {"trait_type": "Order ID", "value": "b0229100"},
                {"trait_type": "Blockchain", "value": "Certificate L1"}
            ],
            "requiresPassword": true,
            "mintDate": "2024-11-02",
            "verificationUrl": "https://verify.example.com/42"
        }"#);

        assert_eq!(meta.name.as_deref(), Some("COA b0229100"));
        assert_eq!(meta.attributes.len(), 2);
        assert!(meta.needs_password());
        assert_eq!(meta.mint_date.as_deref(), Some("2024-11-02"));
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let meta = doc(r#"{"name": "x", "issuerNote": "keep me"}"#);
        assert_eq!(
            meta.extra.get("issuerNote").and_then(|v| v.as_str()),
            Some("keep me")
        );

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["issuerNote"], "keep me");
    }

    #[test]
    fn test_matches_identifier_by_order_attribute() {
        let meta = doc(r#"{
            "name": "Certificate",
            "attributes": [{"trait_type": "Order Identifier", "value": "B0229100"}]
        }"#);
        assert!(meta.matches_identifier("b0229100"));
        assert!(!meta.matches_identifier("b0229101"));
    }

    #[test]
    fn test_matches_identifier_by_name_substring() {
        let meta = doc(r#"{"name": "COA b0229100 (signed)"}"#);
        assert!(meta.matches_identifier("B0229100"));
    }

    #[test]
    fn test_non_order_attribute_does_not_match() {
        let meta = doc(r#"{
            "attributes": [{"trait_type": "Batch", "value": "b0229100"}]
        }"#);
        assert!(!meta.matches_identifier("b0229100"));
    }

    #[test]
    fn test_needs_password_defaults_false() {
        assert!(!doc(r#"{"name": "open"}"#).needs_password());
    }
}
