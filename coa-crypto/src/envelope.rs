//! The encrypted envelope wire format.
//!
//! ```text
//! [u32 saltLen][salt][u32 ivLen][iv][u32 tagLen][tag][ciphertext]
//! ```
//!
//! All length prefixes are big-endian. The ciphertext runs to the end of
//! the buffer without its own prefix.

use coa_core::constants::{ENVELOPE_MIN_LEN, ENVELOPE_SALT_LEN};
use coa_core::error::{CoaError, Result};

/// Returns true iff the blob classifies as an encrypted envelope.
///
/// The heuristic: length is at least 100 bytes AND the first four bytes,
/// read as a big-endian u32, equal 64 (the salt length the issuer always
/// packs). There is no version byte, so adversarial input can produce
/// false positives and unusual-but-valid input false negatives; this is a
/// known limitation, kept behind this function so an explicit format tag
/// can replace it without touching callers.
pub fn is_encrypted(bytes: &[u8]) -> bool {
    if bytes.len() < ENVELOPE_MIN_LEN {
        return false;
    }
    let salt_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    salt_len as usize == ENVELOPE_SALT_LEN
}

/// Unpacked sections of an encrypted envelope.
#[derive(Clone, Debug)]
pub struct EncryptedEnvelope {
    /// Key-derivation salt.
    pub salt: Vec<u8>,
    /// GCM initialization vector.
    pub iv: Vec<u8>,
    /// GCM authentication tag.
    pub tag: Vec<u8>,
    /// The ciphertext (without the tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Unpacks the four sections from a packed buffer.
    ///
    /// Fails when any declared section runs past the end of the buffer.
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut offset = 0usize;

        let salt = read_section(bytes, &mut offset, "salt")?;
        let iv = read_section(bytes, &mut offset, "iv")?;
        let tag = read_section(bytes, &mut offset, "tag")?;
        let ciphertext = bytes[offset..].to_vec();

        Ok(Self {
            salt,
            iv,
            tag,
            ciphertext,
        })
    }

    /// Packs the sections back into the wire format.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            12 + self.salt.len() + self.iv.len() + self.tag.len() + self.ciphertext.len(),
        );
        for section in [&self.salt, &self.iv, &self.tag] {
            out.extend_from_slice(&(section.len() as u32).to_be_bytes());
            out.extend_from_slice(section);
        }
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

fn read_section(bytes: &[u8], offset: &mut usize, name: &str) -> Result<Vec<u8>> {
    let end = offset
        .checked_add(4)
        .ok_or_else(|| truncated(name))?;
    if bytes.len() < end {
        return Err(truncated(name));
    }
    let len = u32::from_be_bytes([
        bytes[*offset],
        bytes[*offset + 1],
        bytes[*offset + 2],
        bytes[*offset + 3],
    ]) as usize;
    *offset = end;

    let section_end = offset.checked_add(len).ok_or_else(|| truncated(name))?;
    if bytes.len() < section_end {
        return Err(truncated(name));
    }
    let section = bytes[*offset..section_end].to_vec();
    *offset = section_end;
    Ok(section)
}

fn truncated(section: &str) -> CoaError {
    CoaError::Decryption(format!("buffer too short for declared {section} section"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn packed(salt: &[u8], iv: &[u8], tag: &[u8], ciphertext: &[u8]) -> Vec<u8> {
        EncryptedEnvelope {
            salt: salt.to_vec(),
            iv: iv.to_vec(),
            tag: tag.to_vec(),
            ciphertext: ciphertext.to_vec(),
        }
        .pack()
    }

    #[test]
    fn test_is_encrypted_true_for_packed_envelope() {
        let bytes = packed(&[1u8; 64], &[2u8; 16], &[3u8; 16], &[4u8; 32]);
        assert!(bytes.len() >= 100);
        assert!(is_encrypted(&bytes));
    }

    #[test]
    fn test_is_encrypted_false_below_minimum_length() {
        // Even a correct prefix does not classify when the blob is short
        let mut short = vec![0, 0, 0, 64];
        short.extend_from_slice(&[0u8; 64]);
        assert!(short.len() < 100);
        assert!(!is_encrypted(&short));
    }

    #[test]
    fn test_is_encrypted_false_for_other_prefix() {
        let mut blob = vec![0, 0, 0, 32];
        blob.extend_from_slice(&[0u8; 200]);
        assert!(!is_encrypted(&blob));
    }

    #[test]
    fn test_is_encrypted_false_positive_documented() {
        // 100+ bytes of non-envelope data that happen to start with 64:
        // the heuristic accepts it. This is the documented limitation.
        let mut blob = vec![0, 0, 0, 64];
        blob.extend_from_slice(&[0xFF; 150]);
        assert!(is_encrypted(&blob));
    }

    #[test]
    fn test_unpack_round_trip() {
        let envelope = EncryptedEnvelope {
            salt: vec![1u8; 64],
            iv: vec![2u8; 16],
            tag: vec![3u8; 16],
            ciphertext: b"payload".to_vec(),
        };

        let unpacked = EncryptedEnvelope::unpack(&envelope.pack()).unwrap();

        assert_eq!(unpacked.salt, envelope.salt);
        assert_eq!(unpacked.iv, envelope.iv);
        assert_eq!(unpacked.tag, envelope.tag);
        assert_eq!(unpacked.ciphertext, envelope.ciphertext);
    }

    #[test]
    fn test_unpack_rejects_truncated_sections() {
        // Declares a 64-byte salt but carries only 10 bytes
        let mut bytes = vec![0, 0, 0, 64];
        bytes.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            EncryptedEnvelope::unpack(&bytes),
            Err(CoaError::Decryption(_))
        ));
    }

    #[test]
    fn test_unpack_rejects_oversized_declared_length() {
        // A length prefix near u32::MAX must not panic or wrap
        let mut bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        bytes.extend_from_slice(&[0u8; 200]);
        assert!(EncryptedEnvelope::unpack(&bytes).is_err());
    }

    #[test]
    fn test_empty_ciphertext_allowed_by_format() {
        let bytes = packed(&[1u8; 64], &[2u8; 16], &[3u8; 16], &[]);
        let unpacked = EncryptedEnvelope::unpack(&bytes).unwrap();
        assert!(unpacked.ciphertext.is_empty());
    }

    proptest! {
        #[test]
        fn prop_short_buffers_never_classify(data in proptest::collection::vec(any::<u8>(), 0..100)) {
            prop_assert!(!is_encrypted(&data));
        }

        #[test]
        fn prop_classification_follows_prefix(
            prefix in any::<u32>(),
            tail in proptest::collection::vec(any::<u8>(), 96..300),
        ) {
            let mut blob = prefix.to_be_bytes().to_vec();
            blob.extend_from_slice(&tail);
            prop_assert_eq!(is_encrypted(&blob), prefix == 64);
        }
    }
}
