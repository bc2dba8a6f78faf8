//! # COA Gateway
//!
//! Converts content-address references into fetchable URLs and retrieves
//! their payloads with ordered gateway fallback. Plain HTTP(S) URLs are
//! fetched directly, once, with no fallback.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod client;
mod reference;

pub use client::{GatewayClient, GatewayConfig};
pub use reference::extract_hash;
