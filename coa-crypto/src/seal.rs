//! Issuer-side companion to [`crate::decrypt`].
//!
//! Produces the exact envelope wire format the viewer-side pipeline
//! consumes: 64-byte salt, 16-byte IV, 16-byte tag, all length-prefixed.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use rand::RngCore;
use zeroize::Zeroize;

use coa_core::constants::{ENVELOPE_IV_LEN, ENVELOPE_SALT_LEN, ENVELOPE_TAG_LEN};
use coa_core::error::{CoaError, Result};

use crate::decrypt::derive_key;
use crate::envelope::EncryptedEnvelope;

type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Encrypts plaintext under a password, packing the result in the envelope
/// wire format.
///
/// # Errors
///
/// Fails with [`CoaError::Decryption`] on an empty password; the format has
/// no way to mark "no password" and an empty one would silently produce an
/// envelope nobody can open intentionally.
pub fn seal(plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(CoaError::Decryption("password is required".into()));
    }

    let mut salt = vec![0u8; ENVELOPE_SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let mut iv = vec![0u8; ENVELOPE_IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let mut key = derive_key(password, &salt);
    let cipher = Aes256Gcm16::new_from_slice(&key)
        .map_err(|_| CoaError::Decryption("key setup failed".into()))?;

    // AEAD output is ciphertext with the tag appended; the wire format
    // stores the tag as its own section.
    let mut sealed = cipher
        .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
        .map_err(|_| CoaError::Decryption("encryption failed".into()))?;
    key.zeroize();

    let tag = sealed.split_off(sealed.len() - ENVELOPE_TAG_LEN);

    Ok(EncryptedEnvelope {
        salt,
        iv,
        tag,
        ciphertext: sealed,
    }
    .pack())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::is_encrypted;

    #[test]
    fn test_seal_produces_classifiable_envelope() {
        let sealed = seal(b"body", "pw").unwrap();
        assert!(is_encrypted(&sealed));
    }

    #[test]
    fn test_seal_sections_have_documented_sizes() {
        let sealed = seal(b"body", "pw").unwrap();
        let envelope = EncryptedEnvelope::unpack(&sealed).unwrap();
        assert_eq!(envelope.salt.len(), 64);
        assert_eq!(envelope.iv.len(), 16);
        assert_eq!(envelope.tag.len(), 16);
        assert_eq!(envelope.ciphertext.len(), 4);
    }

    #[test]
    fn test_seal_rejects_empty_password() {
        assert!(seal(b"body", "").is_err());
    }

    #[test]
    fn test_seal_uses_fresh_salt_and_iv() {
        let a = EncryptedEnvelope::unpack(&seal(b"x", "pw").unwrap()).unwrap();
        let b = EncryptedEnvelope::unpack(&seal(b"x", "pw").unwrap()).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.iv, b.iv);
    }
}
