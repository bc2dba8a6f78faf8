//! Per-chain endpoint manager with failover and health monitoring.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use coa_core::constants::{
    HEALTH_CHECK_INTERVAL_SECONDS, HEALTH_SNAPSHOT_MAX_AGE_SECONDS, RETRY_BASE_DELAY_SECONDS,
    RETRY_BASE_TIMEOUT_SECONDS, RETRY_MAX_ATTEMPTS,
};
use coa_core::error::{CoaError, Result};
use coa_core::traits::TokenUriSource;
use coa_core::types::{NetworkConfig, RpcEndpoint};

use crate::abi::{decode_abi_string, decode_quantity, encode_token_uri_call};
use crate::health::{EndpointHealth, EndpointStats, ProbeResult};
use crate::transport;

struct ManagedEndpoint {
    endpoint: RpcEndpoint,
    health: RwLock<EndpointHealth>,
}

/// Manages the RPC endpoints of one chain for the lifetime of the process.
///
/// Endpoints are attempted in ascending priority order; a failed endpoint
/// is excluded from selection for a cool-down window unless every endpoint
/// is cooling down, in which case all are retried. Health records are owned
/// exclusively by this manager.
pub struct RpcManager {
    chain_id: u64,
    contract_address: String,
    endpoints: Vec<ManagedEndpoint>,
    http_client: reqwest::Client,
    last_sweep: RwLock<Option<Instant>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RpcManager {
    /// Builds a manager from a network descriptor. Endpoints are sorted by
    /// priority once, here; selection order never changes afterwards.
    pub fn new(network: &NetworkConfig) -> Result<Self> {
        network.validate()?;

        let http_client = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        let endpoints = network
            .endpoints_by_priority()
            .into_iter()
            .map(|endpoint| ManagedEndpoint {
                endpoint,
                health: RwLock::new(EndpointHealth::default()),
            })
            .collect();

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            chain_id: network.chain_id,
            contract_address: network.contract_address.clone(),
            endpoints,
            http_client,
            last_sweep: RwLock::new(None),
            shutdown_tx,
        })
    }

    /// Chain id this manager serves.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FAILOVER EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Executes a JSON-RPC call with endpoint failover.
    ///
    /// Success records the response time and marks the endpoint healthy;
    /// failure records the failure timestamp, marks it unhealthy, and moves
    /// on. Exhausting every endpoint fails with
    /// [`CoaError::AllEndpointsFailed`] carrying the last underlying error.
    #[instrument(skip(self, params))]
    pub async fn execute_with_failover(&self, method: &str, params: Value) -> Result<Value> {
        let eligible: Vec<&ManagedEndpoint> = {
            let open: Vec<&ManagedEndpoint> = self
                .endpoints
                .iter()
                .filter(|me| !me.health.read().in_cooldown())
                .collect();
            if open.is_empty() {
                // Everything is cooling down; retry all rather than fail fast
                self.endpoints.iter().collect()
            } else {
                open
            }
        };

        let mut last_error: Option<CoaError> = None;

        for me in eligible {
            debug!(endpoint = %me.endpoint.label, "trying RPC endpoint");
            let started = Instant::now();

            match transport::request(&self.http_client, &me.endpoint, method, &params).await {
                Ok(value) => {
                    let elapsed = started.elapsed().as_millis() as u64;
                    me.health.write().record_success(elapsed);
                    debug!(endpoint = %me.endpoint.label, elapsed_ms = elapsed, "RPC call succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(endpoint = %me.endpoint.label, error = %e, "RPC endpoint failed");
                    me.health.write().record_failure();
                    last_error = Some(e);
                }
            }
        }

        Err(CoaError::AllEndpointsFailed {
            chain_id: self.chain_id,
            source: Box::new(
                last_error.unwrap_or_else(|| CoaError::Rpc("no endpoints attempted".into())),
            ),
        })
    }

    /// Reads the token's content-address pointer from the contract.
    pub async fn query_token_uri(&self, token_id: u64) -> Result<String> {
        let params = json!([
            {
                "to": self.contract_address,
                "data": encode_token_uri_call(token_id),
            },
            "latest",
        ]);

        let result = self.execute_with_failover("eth_call", params).await?;
        let encoded = result
            .as_str()
            .ok_or_else(|| CoaError::Rpc("eth_call result is not a string".into()))?;
        decode_abi_string(encoded)
    }

    /// Single-endpoint retry path: up to 3 attempts against the primary
    /// endpoint with linearly growing timeout and inter-attempt delay.
    ///
    /// Deliberately simpler than failover and layered beneath it; it does
    /// not touch the health records.
    #[instrument(skip(self))]
    pub async fn token_uri_with_retry(&self, token_id: u64) -> Result<String> {
        let primary = &self.endpoints[0].endpoint;
        let params = json!([
            {
                "to": self.contract_address,
                "data": encode_token_uri_call(token_id),
            },
            "latest",
        ]);

        let mut last_error: Option<CoaError> = None;

        for attempt in 1..=RETRY_MAX_ATTEMPTS {
            debug!(attempt, max = RETRY_MAX_ATTEMPTS, "RPC retry attempt");
            let deadline = Duration::from_secs(RETRY_BASE_TIMEOUT_SECONDS * u64::from(attempt));

            match transport::request_with_timeout(
                &self.http_client,
                primary,
                "eth_call",
                &params,
                deadline,
            )
            .await
            {
                Ok(result) => {
                    let encoded = result
                        .as_str()
                        .ok_or_else(|| CoaError::Rpc("eth_call result is not a string".into()))?;
                    return decode_abi_string(encoded);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "RPC retry attempt failed");
                    last_error = Some(e);
                }
            }

            if attempt < RETRY_MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(
                    RETRY_BASE_DELAY_SECONDS * u64::from(attempt),
                ))
                .await;
            }
        }

        Err(last_error.unwrap_or_else(|| CoaError::Rpc("retry attempts exhausted".into())))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HEALTH PROBING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Probes one endpoint with a cheap read-only call (current block
    /// height) bounded by the endpoint's configured timeout.
    async fn probe_endpoint(&self, me: &ManagedEndpoint) -> ProbeResult {
        let started = Instant::now();
        let outcome =
            transport::request(&self.http_client, &me.endpoint, "eth_blockNumber", &json!([]))
                .await
                .and_then(|v| decode_quantity(&v));

        match outcome {
            Ok(_block) => {
                let elapsed = started.elapsed().as_millis() as u64;
                me.health.write().record_success(elapsed);
                ProbeResult {
                    healthy: true,
                    response_time_ms: Some(elapsed),
                }
            }
            Err(e) => {
                warn!(endpoint = %me.endpoint.label, error = %e, "health probe failed");
                me.health.write().record_failure();
                ProbeResult {
                    healthy: false,
                    response_time_ms: None,
                }
            }
        }
    }

    /// Probes all endpoints in parallel and refreshes the sweep snapshot.
    /// Probes are idempotent, read-only, and latency-sensitive; racing them
    /// is deliberate. Returns the healthy endpoint count.
    pub async fn probe_all(&self) -> usize {
        let probes = self.endpoints.iter().map(|me| self.probe_endpoint(me));
        let results = futures::future::join_all(probes).await;

        *self.last_sweep.write() = Some(Instant::now());

        let healthy = results.iter().filter(|r| r.healthy).count();
        debug!(
            healthy,
            total = results.len(),
            chain_id = self.chain_id,
            "health sweep complete"
        );
        healthy
    }

    /// Best endpoint for read-heavy paths.
    ///
    /// Reuses a health snapshot younger than 30 seconds; otherwise runs a
    /// fresh parallel sweep. Healthy endpoints rank by ascending response
    /// time, ties broken by declared priority. When nothing is healthy the
    /// primary endpoint is returned as a last resort.
    pub async fn best_endpoint(&self) -> RpcEndpoint {
        let fresh = self
            .last_sweep
            .read()
            .map(|at| at.elapsed() < Duration::from_secs(HEALTH_SNAPSHOT_MAX_AGE_SECONDS))
            .unwrap_or(false);

        if !fresh {
            self.probe_all().await;
        }

        let mut ranked: Vec<(u64, u32, &RpcEndpoint)> = self
            .endpoints
            .iter()
            .filter(|me| me.health.read().healthy)
            .map(|me| {
                let rt = me.health.read().response_time_ms.unwrap_or(u64::MAX);
                (rt, me.endpoint.priority, &me.endpoint)
            })
            .collect();
        ranked.sort_by_key(|(rt, priority, _)| (*rt, *priority));

        match ranked.first() {
            Some((rt, _, endpoint)) => {
                debug!(endpoint = %endpoint.label, response_time_ms = rt, "selected best endpoint");
                (*endpoint).clone()
            }
            None => {
                warn!(chain_id = self.chain_id, "no healthy endpoints, using primary");
                self.endpoints[0].endpoint.clone()
            }
        }
    }

    /// Point-in-time stats for every endpoint, in priority order.
    pub fn stats(&self) -> Vec<EndpointStats> {
        self.endpoints
            .iter()
            .map(|me| {
                let health = me.health.read();
                EndpointStats {
                    label: me.endpoint.label.clone(),
                    url: me.endpoint.url.clone(),
                    priority: me.endpoint.priority,
                    healthy: health.healthy,
                    response_time_ms: health.response_time_ms,
                    seconds_since_check: health.last_checked.map(|at| at.elapsed().as_secs()),
                }
            })
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BACKGROUND MONITOR
    // ═══════════════════════════════════════════════════════════════════════════

    /// Spawns the background health monitor: one sweep immediately, then
    /// one every 30 seconds until [`RpcManager::shutdown`] is called.
    pub fn start_monitor(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(HEALTH_CHECK_INTERVAL_SECONDS));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        manager.probe_all().await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!(chain_id = manager.chain_id, "health monitor shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Signals the background monitor to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[async_trait]
impl TokenUriSource for RpcManager {
    async fn token_uri(&self, token_id: u64) -> Result<String> {
        self.query_token_uri(token_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn encode_abi_string(s: &str) -> String {
        let bytes = s.as_bytes();
        let padded_len = ((bytes.len() + 31) / 32) * 32;
        let mut out = vec![0u8; 64 + padded_len];
        out[31] = 0x20;
        out[56..64].copy_from_slice(&(bytes.len() as u64).to_be_bytes());
        out[64..64 + bytes.len()].copy_from_slice(bytes);
        format!("0x{}", hex::encode(out))
    }

    fn rpc_result(value: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": value
        }))
    }

    fn network_for(servers: &[&MockServer]) -> NetworkConfig {
        NetworkConfig {
            chain_id: 99,
            name: "Test".into(),
            contract_address: "0x00000000000000000000000000000000000000aa".into(),
            endpoints: servers
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    RpcEndpoint::new(s.uri(), (i + 1) as u32, format!("ep{}", i + 1))
                        .with_timeout(2)
                })
                .collect(),
            metadata_base_url: String::new(),
            identifier_mapping: Default::default(),
            series: Vec::new(),
            scan_ranges: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_failover_reaches_third_endpoint() {
        let (a, b, c) = (
            MockServer::start().await,
            MockServer::start().await,
            MockServer::start().await,
        );

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&a)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&b)
            .await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(&encode_abi_string("ipfs://QmHash")))
            .expect(1)
            .mount(&c)
            .await;

        let manager = RpcManager::new(&network_for(&[&a, &b, &c])).unwrap();
        let uri = manager.query_token_uri(42).await.unwrap();

        assert_eq!(uri, "ipfs://QmHash");

        // Failed endpoints are unhealthy with a recorded failure timestamp
        let stats = manager.stats();
        assert!(!stats[0].healthy);
        assert!(!stats[1].healthy);
        assert!(stats[2].healthy);
        assert!(manager.endpoints[0].health.read().last_failure.is_some());
        assert!(manager.endpoints[1].health.read().last_failure.is_some());
    }

    #[tokio::test]
    async fn test_cooldown_skips_recently_failed_endpoint() {
        let (a, b) = (MockServer::start().await, MockServer::start().await);

        // ep1 fails the one time it is contacted; after that it must be
        // skipped while cooling down
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&a)
            .await;
        Mock::given(method("POST"))
            .respond_with(rpc_result("0x10"))
            .expect(2)
            .mount(&b)
            .await;

        let manager = RpcManager::new(&network_for(&[&a, &b])).unwrap();

        manager
            .execute_with_failover("eth_blockNumber", serde_json::json!([]))
            .await
            .unwrap();
        manager
            .execute_with_failover("eth_blockNumber", serde_json::json!([]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_all_cooling_down_are_retried() {
        let a = MockServer::start().await;

        // First contact fails, every later one succeeds
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&a)
            .await;
        Mock::given(method("POST"))
            .respond_with(rpc_result("0x10"))
            .mount(&a)
            .await;

        let manager = RpcManager::new(&network_for(&[&a])).unwrap();

        let first = manager
            .execute_with_failover("eth_blockNumber", serde_json::json!([]))
            .await;
        assert!(matches!(first, Err(CoaError::AllEndpointsFailed { .. })));

        // The only endpoint is in cool-down, but with everything cooling
        // down it must still be retried
        let second = manager
            .execute_with_failover("eth_blockNumber", serde_json::json!([]))
            .await
            .unwrap();
        assert_eq!(second, serde_json::json!("0x10"));
    }

    #[tokio::test]
    async fn test_exhaustion_carries_last_error() {
        let (a, b) = (MockServer::start().await, MockServer::start().await);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&a)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&b)
            .await;

        let manager = RpcManager::new(&network_for(&[&a, &b])).unwrap();
        let err = manager
            .execute_with_failover("eth_blockNumber", serde_json::json!([]))
            .await
            .unwrap_err();

        match err {
            CoaError::AllEndpointsFailed { chain_id, source } => {
                assert_eq!(chain_id, 99);
                assert!(source.to_string().contains("503"));
            }
            other => panic!("expected AllEndpointsFailed, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_token_uri_call_shape() {
        let a = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"method": "eth_call"})))
            .respond_with(rpc_result(&encode_abi_string("ipfs://QmMeta")))
            .expect(1)
            .mount(&a)
            .await;

        let manager = RpcManager::new(&network_for(&[&a])).unwrap();
        assert_eq!(manager.query_token_uri(7).await.unwrap(), "ipfs://QmMeta");
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let a = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&a)
            .await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(&encode_abi_string("ipfs://QmRetry")))
            .mount(&a)
            .await;

        let manager = RpcManager::new(&network_for(&[&a])).unwrap();
        let uri = manager.token_uri_with_retry(42).await.unwrap();
        assert_eq!(uri, "ipfs://QmRetry");
    }

    #[tokio::test]
    async fn test_best_endpoint_prefers_healthy() {
        let (a, b) = (MockServer::start().await, MockServer::start().await);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&a)
            .await;
        Mock::given(method("POST"))
            .respond_with(rpc_result("0x10"))
            .mount(&b)
            .await;

        let manager = RpcManager::new(&network_for(&[&a, &b])).unwrap();
        let best = manager.best_endpoint().await;
        assert_eq!(best.label, "ep2");
    }

    #[tokio::test]
    async fn test_best_endpoint_reuses_fresh_snapshot() {
        let a = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result("0x10"))
            .expect(1)
            .mount(&a)
            .await;

        let manager = RpcManager::new(&network_for(&[&a])).unwrap();

        // First selection sweeps; the second reuses the snapshot, so the
        // endpoint sees exactly one probe
        manager.best_endpoint().await;
        manager.best_endpoint().await;
    }

    #[tokio::test]
    async fn test_monitor_shutdown_stops_task() {
        let a = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result("0x10"))
            .mount(&a)
            .await;

        let manager = Arc::new(RpcManager::new(&network_for(&[&a])).unwrap());
        let handle = manager.start_monitor();

        manager.shutdown();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("monitor exits after shutdown")
            .unwrap();
    }

    #[test]
    fn test_rejects_network_without_endpoints() {
        let mut network = NetworkConfig::mainnet("0xaa");
        network.endpoints.clear();
        assert!(RpcManager::new(&network).is_err());
    }
}
