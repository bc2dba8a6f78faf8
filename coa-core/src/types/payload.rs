//! Classified gateway payloads.
//!
//! A successful gateway fetch yields either a readable document or an
//! encrypted envelope. The encrypted case is a sentinel, not a failure:
//! the caller may supply credentials out-of-band and decrypt later.

use super::metadata::CertificateMetadata;

/// Result of fetching a metadata URI.
#[derive(Clone, Debug)]
pub enum MetadataPayload {
    /// A parsed, cleartext metadata document.
    Document(CertificateMetadata),
    /// The raw bytes of an encrypted envelope; a password is required.
    Encrypted(Vec<u8>),
}

impl MetadataPayload {
    /// Returns the document, if this payload is cleartext.
    pub fn document(&self) -> Option<&CertificateMetadata> {
        match self {
            MetadataPayload::Document(doc) => Some(doc),
            MetadataPayload::Encrypted(_) => None,
        }
    }

    /// Returns true when credentials are needed to read this payload.
    pub fn needs_password(&self) -> bool {
        matches!(self, MetadataPayload::Encrypted(_))
    }
}

/// Result of fetching a media URI (certificate image).
#[derive(Clone, Debug)]
pub enum MediaPayload {
    /// Raw media bytes, displayable as-is.
    Bytes(Vec<u8>),
    /// The raw bytes of an encrypted envelope; a password is required.
    Encrypted(Vec<u8>),
}

impl MediaPayload {
    /// Returns true when credentials are needed to display this payload.
    pub fn needs_password(&self) -> bool {
        matches!(self, MediaPayload::Encrypted(_))
    }
}
