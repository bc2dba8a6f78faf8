//! Gateway fetch with ordered fallback.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use coa_core::constants::{GATEWAY_TIMEOUT_SECONDS, IPFS_GATEWAYS};
use coa_core::error::{CoaError, GatewayFailure, Result};
use coa_core::traits::MetadataFetcher;
use coa_core::types::{CertificateMetadata, MediaPayload, MetadataPayload};
use coa_crypto::is_encrypted;

use crate::reference::extract_hash;

/// Gateway client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URLs, tried strictly in declaration order. Past
    /// performance never reorders them; predictable fetch behavior is
    /// preferred over adaptive latency here.
    pub gateways: Vec<String>,
    /// Per-attempt deadline in seconds. A timed-out gateway is skipped,
    /// never retried.
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateways: IPFS_GATEWAYS.iter().map(|g| (*g).to_string()).collect(),
            timeout_seconds: GATEWAY_TIMEOUT_SECONDS,
        }
    }
}

/// Fetches certificate payloads by URI or content-address reference.
pub struct GatewayClient {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl GatewayClient {
    /// Creates a client with the default gateway list.
    pub fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    /// Creates a client with custom configuration.
    pub fn with_config(config: GatewayConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    /// Retrieves and classifies the metadata payload behind a URI.
    ///
    /// Content-addressed references go through the gateway list; anything
    /// else is fetched directly, once. An encrypted payload is a valid
    /// outcome, returned as [`MetadataPayload::Encrypted`] so the caller
    /// can collect credentials out-of-band.
    #[instrument(skip(self))]
    pub async fn fetch_metadata(&self, uri: &str) -> Result<MetadataPayload> {
        match extract_hash(uri) {
            Some(hash) => {
                debug!(hash, "content-address reference, using gateway fallback");
                self.through_gateways(hash, Self::classify_metadata).await
            }
            None => {
                debug!(uri, "plain URL, fetching directly");
                let bytes = self.direct_fetch(uri).await?;
                Self::classify_metadata(bytes)
            }
        }
    }

    /// Retrieves the media payload (certificate image) behind a URI.
    #[instrument(skip(self))]
    pub async fn fetch_media(&self, uri: &str) -> Result<MediaPayload> {
        match extract_hash(uri) {
            Some(hash) => self.through_gateways(hash, Self::classify_media).await,
            None => {
                let bytes = self.direct_fetch(uri).await?;
                Self::classify_media(bytes)
            }
        }
    }

    /// Iterates the gateway list in declaration order, classifying the
    /// first successful body. Every failure (non-2xx, timeout, body or
    /// classification error) is recorded and the next gateway is tried.
    async fn through_gateways<T>(
        &self,
        hash: &str,
        classify: fn(Vec<u8>) -> Result<T>,
    ) -> Result<T> {
        let mut failures = Vec::new();

        for gateway in &self.config.gateways {
            let url = format!("{gateway}{hash}");
            debug!(gateway, "trying gateway");

            match self.gateway_attempt(&url, classify).await {
                Ok(payload) => {
                    debug!(gateway, "gateway fetch succeeded");
                    return Ok(payload);
                }
                Err(e) => {
                    warn!(gateway, error = %e, "gateway failed");
                    failures.push(GatewayFailure {
                        gateway: gateway.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(CoaError::AllGatewaysExhausted {
            reference: hash.to_string(),
            failures,
        })
    }

    async fn gateway_attempt<T>(
        &self,
        url: &str,
        classify: fn(Vec<u8>) -> Result<T>,
    ) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .send()
            .await
            .map_err(|e| self.attempt_error(e))?;

        if !response.status().is_success() {
            return Err(CoaError::Http(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.attempt_error(e))?
            .to_vec();

        classify(bytes)
    }

    fn attempt_error(&self, e: reqwest::Error) -> CoaError {
        if e.is_timeout() {
            CoaError::Http(format!("timeout after {}s", self.config.timeout_seconds))
        } else {
            CoaError::Http(e.to_string())
        }
    }

    /// Fetches a plain URL once. No gateway fallback applies.
    async fn direct_fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .get(url)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .send()
            .await
            .map_err(|e| CoaError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CoaError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| CoaError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn classify_metadata(bytes: Vec<u8>) -> Result<MetadataPayload> {
        if is_encrypted(&bytes) {
            return Ok(MetadataPayload::Encrypted(bytes));
        }
        let doc = CertificateMetadata::from_json_bytes(&bytes)?;
        Ok(MetadataPayload::Document(doc))
    }

    fn classify_media(bytes: Vec<u8>) -> Result<MediaPayload> {
        if is_encrypted(&bytes) {
            return Ok(MediaPayload::Encrypted(bytes));
        }
        Ok(MediaPayload::Bytes(bytes))
    }
}

impl Default for GatewayClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for GatewayClient {
    async fn fetch_metadata(&self, uri: &str) -> Result<MetadataPayload> {
        GatewayClient::fetch_metadata(self, uri).await
    }
}
