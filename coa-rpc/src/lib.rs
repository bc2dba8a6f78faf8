//! # COA RPC
//!
//! Chain-scoped JSON-RPC endpoint management: prioritized endpoints,
//! health probing, failover with cool-down, best-endpoint selection, a
//! single-endpoint retry path, and a background health monitor.
//!
//! One [`RpcManager`] exists per chain for the lifetime of the process,
//! obtained through the [`ManagerRegistry`] so background monitors can be
//! torn down explicitly at shutdown.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod abi;
mod health;
mod manager;
mod registry;
mod transport;

pub use abi::{decode_abi_string, encode_token_uri_call};
pub use health::{EndpointHealth, EndpointStats, ProbeResult};
pub use manager::RpcManager;
pub use registry::ManagerRegistry;
