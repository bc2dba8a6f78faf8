//! Password-based authenticated decryption.
//!
//! ## Flow
//!
//! ```text
//! envelope = unpack(bytes)
//! key = PBKDF2-HMAC-SHA512(password, envelope.salt, 100_000) → 32 bytes
//! plaintext = AES-256-GCM-decrypt(key, envelope.iv, ciphertext ‖ tag)
//! ```
//!
//! Tag verification failure means a wrong password or corrupted data; the
//! two are indistinguishable and reported with one message.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, AesGcm, Nonce};
use sha2::Sha512;
use tracing::debug;
use zeroize::Zeroize;

use coa_core::constants::{KDF_ITERATIONS, KDF_KEY_LEN};
use coa_core::error::{CoaError, Result};
use coa_core::types::CertificateMetadata;

use crate::envelope::EncryptedEnvelope;

/// AES-256-GCM with the 16-byte IV the issuer's packaging writes.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Derives the 32-byte symmetric key from a password and salt.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; KDF_KEY_LEN] {
    let mut key = [0u8; KDF_KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, KDF_ITERATIONS, &mut key);
    key
}

/// Decrypts a packed envelope with the given password.
///
/// # Errors
///
/// Fails with [`CoaError::Decryption`] when:
/// - the password is empty
/// - the buffer is too short for its declared sections
/// - tag verification fails (wrong password or corrupted data)
pub fn decrypt(bytes: &[u8], password: &str) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(CoaError::Decryption("password is required".into()));
    }

    let envelope = EncryptedEnvelope::unpack(bytes)?;
    debug!(
        salt_len = envelope.salt.len(),
        iv_len = envelope.iv.len(),
        tag_len = envelope.tag.len(),
        ciphertext_len = envelope.ciphertext.len(),
        "unpacked encrypted envelope"
    );

    let mut key = derive_key(password, &envelope.salt);

    // GCM verifies over ciphertext ‖ tag
    let mut sealed = Vec::with_capacity(envelope.ciphertext.len() + envelope.tag.len());
    sealed.extend_from_slice(&envelope.ciphertext);
    sealed.extend_from_slice(&envelope.tag);

    let outcome = match envelope.iv.len() {
        12 => Aes256Gcm::new_from_slice(&key)
            .map_err(|_| CoaError::invalid_password_or_corrupted())
            .and_then(|cipher| {
                cipher
                    .decrypt(Nonce::from_slice(&envelope.iv), sealed.as_slice())
                    .map_err(|_| CoaError::invalid_password_or_corrupted())
            }),
        16 => Aes256Gcm16::new_from_slice(&key)
            .map_err(|_| CoaError::invalid_password_or_corrupted())
            .and_then(|cipher| {
                cipher
                    .decrypt(Nonce::<U16>::from_slice(&envelope.iv), sealed.as_slice())
                    .map_err(|_| CoaError::invalid_password_or_corrupted())
            }),
        n => Err(CoaError::Decryption(format!(
            "unsupported IV length {n}"
        ))),
    };

    key.zeroize();
    outcome
}

/// Decrypts an envelope and parses the plaintext as a metadata document.
///
/// # Errors
///
/// [`CoaError::Decryption`] on decryption failure, [`CoaError::MetadataFormat`]
/// when the recovered plaintext is not a valid document.
pub fn decrypt_metadata(bytes: &[u8], password: &str) -> Result<CertificateMetadata> {
    let plaintext = decrypt(bytes, password)?;
    CertificateMetadata::from_json_bytes(&plaintext)
}

/// A decrypted certificate image, ready for display.
#[derive(Clone, Debug)]
pub struct DecryptedImage {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// MIME type; the issuer packages JPEG images.
    pub content_type: &'static str,
}

/// Decrypts an envelope and wraps the plaintext as a displayable image.
pub fn decrypt_image(bytes: &[u8], password: &str) -> Result<DecryptedImage> {
    let bytes = decrypt(bytes, password)?;
    Ok(DecryptedImage {
        bytes,
        content_type: "image/jpeg",
    })
}
