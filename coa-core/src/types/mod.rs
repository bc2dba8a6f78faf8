//! Domain types for the COA resolution pipeline.
//!
//! This module provides all the core data structures used throughout the
//! pipeline:
//!
//! - [`NetworkConfig`]: Per-network descriptor (chain, contract, endpoints)
//! - [`RpcEndpoint`]: A prioritized JSON-RPC endpoint
//! - [`CertificateMetadata`]: The metadata document a token URI points at
//! - [`ResolvedCertificate`]: The final result of a resolution

mod certificate;
mod metadata;
mod network;
mod payload;

pub use certificate::*;
pub use metadata::*;
pub use network::*;
pub use payload::*;
