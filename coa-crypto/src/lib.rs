//! # COA Crypto
//!
//! Detection and reversal of the issuer's authenticated-encryption
//! packaging for protected certificate payloads.
//!
//! This crate provides:
//!
//! - **Envelope**: the length-prefixed wire format (salt, IV, tag,
//!   ciphertext) and the `is_encrypted` classification heuristic
//! - **Decrypt**: PBKDF2-HMAC-SHA512 key derivation plus AES-256-GCM
//!   authenticated decryption, with JSON and image convenience wrappers
//! - **Seal**: the issuer-side companion that produces the same format
//!
//! ## Security Properties
//!
//! - Wrong password and corrupted data are indistinguishable by design;
//!   both surface the same error
//! - Derived keys are zeroized after use
//!
//! ## Example
//!
//! ```rust
//! use coa_crypto::{decrypt, is_encrypted, seal};
//!
//! let sealed = seal(b"certificate body", "hunter2").unwrap();
//! assert!(is_encrypted(&sealed));
//! assert_eq!(decrypt(&sealed, "hunter2").unwrap(), b"certificate body");
//! assert!(decrypt(&sealed, "wrong").is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod decrypt;
pub mod envelope;
pub mod seal;

// Re-export main functions at crate root
pub use decrypt::{decrypt, decrypt_image, decrypt_metadata, derive_key, DecryptedImage};
pub use envelope::{is_encrypted, EncryptedEnvelope};
pub use seal::seal;
