//! # COA Core
//!
//! Core types, errors, and traits for the COA resolution pipeline.
//!
//! This crate provides the foundational building blocks used by all other
//! COA crates:
//!
//! - **Types**: Domain models for networks, endpoints, metadata documents,
//!   and resolved certificates
//! - **Errors**: Comprehensive error types with context
//! - **Constants**: Pipeline constants (cache bounds, timeouts, wire sizes)
//! - **Traits**: Common interfaces for extensibility
//!
//! ## Example
//!
//! ```rust
//! use coa_core::CertificateMetadata;
//!
//! // Types are serializable and well-documented
//! let meta: CertificateMetadata = serde_json::from_str(r#"{"name":"COA #1"}"#).unwrap();
//! assert_eq!(meta.name.as_deref(), Some("COA #1"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{CoaError, Result};
pub use traits::*;
pub use types::*;
