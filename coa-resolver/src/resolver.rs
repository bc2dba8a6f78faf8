//! The resolution orchestrator.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use coa_cache::{CacheStats, ResolutionCache};
use coa_core::error::{CoaError, Result};
use coa_core::traits::{IdentifierLookup, LookupHit, MetadataFetcher, TokenUriSource};
use coa_core::types::{
    CertificateMetadata, MetadataPayload, NetworkConfig, Provenance, ResolutionPhase,
    ResolvedCertificate,
};
use coa_crypto::decrypt_metadata;
use coa_gateway::GatewayClient;
use coa_rpc::ManagerRegistry;

use crate::lookup::{RangeScanLookup, SeriesLookup, StaticMappingLookup};

/// Resolves certificate identifiers to authenticated metadata.
///
/// A resolution moves through the phases
/// `Idle → Searching → {Found, NotFound} → (Found) Authenticating? → Ready`;
/// `Authenticating` only applies when the metadata declares a password
/// requirement, and the authentication UI itself is an external
/// collaborator — this type only exposes the requirement flag.
pub struct CertificateResolver {
    network: NetworkConfig,
    chain: Arc<dyn TokenUriSource>,
    fetcher: Arc<dyn MetadataFetcher>,
    cache: Arc<ResolutionCache>,
    strategies: Vec<Box<dyn IdentifierLookup>>,
}

impl CertificateResolver {
    /// Creates a resolver for a network, sourcing the chain manager from
    /// the process-wide registry and using the default gateway list.
    pub fn new(network: NetworkConfig, registry: &ManagerRegistry) -> Result<Self> {
        let manager = registry.manager_for(&network)?;
        Ok(Self::with_parts(
            network,
            manager,
            Arc::new(GatewayClient::new()),
        ))
    }

    /// Creates a resolver from explicit collaborators. This is the seam
    /// tests use to substitute in-memory fakes.
    pub fn with_parts(
        network: NetworkConfig,
        chain: Arc<dyn TokenUriSource>,
        fetcher: Arc<dyn MetadataFetcher>,
    ) -> Self {
        let cache = Arc::new(ResolutionCache::new());

        let strategies: Vec<Box<dyn IdentifierLookup>> = vec![
            Box::new(StaticMappingLookup::new(&network.identifier_mapping)),
            Box::new(SeriesLookup::new(&network.series)),
            Box::new(RangeScanLookup::new(
                &network.scan_ranges,
                network.chain_id,
                Arc::clone(&chain),
                Arc::clone(&fetcher),
                Arc::clone(&cache),
            )),
        ];

        Self {
            network,
            chain,
            fetcher,
            cache,
            strategies,
        }
    }

    /// Resolves an identifier without credentials. A password-protected
    /// payload yields a locked result with `requires_password` set.
    pub async fn resolve(&self, raw: &str) -> Result<ResolvedCertificate> {
        self.resolve_with_password(raw, None).await
    }

    /// Resolves an identifier, decrypting protected payloads with the
    /// supplied password.
    ///
    /// A purely numeric identifier is treated as a direct token id and
    /// skips every lookup path. Anything else goes through the ordered
    /// strategies: static mapping, series mapping, range scan.
    #[instrument(skip(self, password), fields(identifier = raw))]
    pub async fn resolve_with_password(
        &self,
        raw: &str,
        password: Option<&str>,
    ) -> Result<ResolvedCertificate> {
        let identifier = raw.trim();
        if identifier.is_empty() {
            return Err(CoaError::Validation(
                "certificate identifier cannot be empty".into(),
            ));
        }

        debug!(phase = %ResolutionPhase::Searching, "resolution started");

        let outcome = if identifier.chars().all(|c| c.is_ascii_digit()) {
            let token_id: u64 = identifier.parse().map_err(|_| {
                CoaError::Validation(format!("token id '{identifier}' is out of range"))
            })?;
            debug!(token_id, "numeric identifier, skipping lookup paths");
            self.retrieve(token_id, None, password).await
        } else {
            let normalized = identifier.to_lowercase();
            match self.locate(&normalized).await? {
                Some(hit) => {
                    debug!(phase = %ResolutionPhase::Found, token_id = hit.token_id, "token located");
                    self.retrieve(hit.token_id, Some(hit.provenance), password)
                        .await
                }
                None => {
                    debug!(phase = %ResolutionPhase::NotFound, "every lookup path exhausted");
                    Err(CoaError::NotFound {
                        identifier: identifier.to_string(),
                    })
                }
            }
        };

        match &outcome {
            Ok(cert) => {
                info!(
                    token_id = cert.token_id,
                    provenance = %cert.provenance,
                    phase = %cert.phase(),
                    "resolution complete"
                );
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(error = %e, "resolution failed"),
        }

        outcome
    }

    /// Folds the lookup strategies in order. Strategy failures are logged
    /// and skipped; only a unanimous miss returns `None`.
    async fn locate(&self, identifier: &str) -> Result<Option<LookupHit>> {
        for strategy in &self.strategies {
            match strategy.attempt(identifier).await {
                Ok(Some(hit)) => {
                    debug!(strategy = strategy.name(), token_id = hit.token_id, "lookup hit");
                    return Ok(Some(hit));
                }
                Ok(None) => {
                    debug!(strategy = strategy.name(), "no match, trying next strategy");
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "lookup strategy failed");
                }
            }
        }
        Ok(None)
    }

    /// Retrieves a certificate by token id, trying the primary
    /// chain+gateway path first and the static metadata URL second.
    async fn retrieve(
        &self,
        token_id: u64,
        hint: Option<Provenance>,
        password: Option<&str>,
    ) -> Result<ResolvedCertificate> {
        match self.primary(token_id, hint, password).await {
            Ok(cert) => Ok(cert),
            // Decryption and format failures cannot be fixed by refetching
            Err(e) if e.is_permanent() => Err(e),
            Err(primary_err) => {
                if self.network.metadata_base_url.is_empty() {
                    return Err(primary_err);
                }

                let url = self.network.fallback_metadata_url(token_id);
                warn!(error = %primary_err, url, "primary path failed, trying static fallback");

                match self.from_fallback(&url, token_id, password).await {
                    Ok(cert) => Ok(cert),
                    Err(fallback_err) => Err(CoaError::ResolutionFailed {
                        source: Box::new(primary_err),
                        fallback: fallback_err.to_string(),
                    }),
                }
            }
        }
    }

    /// Primary path: cache → chain tokenURI → gateway fetch → decrypt.
    async fn primary(
        &self,
        token_id: u64,
        hint: Option<Provenance>,
        password: Option<&str>,
    ) -> Result<ResolvedCertificate> {
        let chain_id = self.network.chain_id;

        let token_uri = match self.cache.token_uri(chain_id, token_id) {
            Some(uri) => {
                debug!(token_id, "token URI served from cache");
                uri
            }
            None => {
                let uri = self.chain.token_uri(token_id).await?;
                self.cache.set_token_uri(chain_id, token_id, &uri);
                uri
            }
        };

        if let Some(doc) = self.cache.metadata(&token_uri) {
            debug!(token_id, "metadata served from cache");
            return Ok(ResolvedCertificate::new(
                token_id,
                token_uri,
                doc,
                hint.unwrap_or(Provenance::CacheHit),
            ));
        }

        let payload = self.fetcher.fetch_metadata(&token_uri).await?;
        let doc = match payload {
            MetadataPayload::Document(doc) => doc,
            MetadataPayload::Encrypted(bytes) => match password {
                Some(pw) => decrypt_metadata(&bytes, pw)?,
                None => {
                    debug!(
                        phase = %ResolutionPhase::Authenticating,
                        token_id,
                        "payload is encrypted and no password was supplied"
                    );
                    return Ok(locked(
                        token_id,
                        token_uri,
                        hint.unwrap_or(Provenance::ChainFetch),
                    ));
                }
            },
        };

        self.cache.set_metadata(&token_uri, doc.clone());

        Ok(ResolvedCertificate::new(
            token_id,
            token_uri,
            doc,
            hint.unwrap_or(Provenance::ChainFetch),
        ))
    }

    /// Static per-network fallback document. Not cached; the primary path
    /// should recover on its own once the network does.
    async fn from_fallback(
        &self,
        url: &str,
        token_id: u64,
        password: Option<&str>,
    ) -> Result<ResolvedCertificate> {
        let payload = self.fetcher.fetch_metadata(url).await?;
        let doc = match payload {
            MetadataPayload::Document(doc) => doc,
            MetadataPayload::Encrypted(bytes) => match password {
                Some(pw) => decrypt_metadata(&bytes, pw)?,
                None => return Ok(locked(token_id, url.to_string(), Provenance::Fallback)),
            },
        };

        Ok(ResolvedCertificate::new(
            token_id,
            url.to_string(),
            doc,
            Provenance::Fallback,
        ))
    }

    /// Clears the resolution caches.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Statistics for (token-URI store, metadata store).
    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        self.cache.stats()
    }
}

/// A located but unreadable certificate: the payload is encrypted and no
/// password was supplied. The caller collects credentials and resolves
/// again.
fn locked(token_id: u64, token_uri: String, provenance: Provenance) -> ResolvedCertificate {
    ResolvedCertificate {
        token_id,
        token_uri,
        metadata: CertificateMetadata::default(),
        provenance,
        requires_password: true,
    }
}
