//! Process-wide registry of per-chain managers.
//!
//! Managers are long-lived shared state. Rather than lazy module-level
//! singletons, the registry is constructed once by process initialization
//! and torn down explicitly so background monitors never outlive it.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use coa_core::error::Result;
use coa_core::types::NetworkConfig;

use crate::manager::RpcManager;

/// Registry of [`RpcManager`] instances keyed by chain id.
pub struct ManagerRegistry {
    managers: DashMap<u64, Arc<RpcManager>>,
    monitors: Mutex<Vec<JoinHandle<()>>>,
}

impl ManagerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            managers: DashMap::new(),
            monitors: Mutex::new(Vec::new()),
        }
    }

    /// Returns the manager for a network, constructing it (and starting its
    /// background health monitor) on first use.
    ///
    /// Must be called within a tokio runtime; the monitor task is spawned
    /// here.
    pub fn manager_for(&self, network: &NetworkConfig) -> Result<Arc<RpcManager>> {
        if let Some(existing) = self.managers.get(&network.chain_id) {
            return Ok(Arc::clone(&*existing));
        }

        let manager = Arc::new(RpcManager::new(network)?);
        let entry = self
            .managers
            .entry(network.chain_id)
            .or_insert_with(|| Arc::clone(&manager));

        if Arc::ptr_eq(&*entry, &manager) {
            // This call won the insert; it owns starting the monitor
            debug!(chain_id = network.chain_id, "starting RPC manager");
            let handle = manager.start_monitor();
            self.monitors.lock().push(handle);
        }

        Ok(Arc::clone(&*entry))
    }

    /// Number of registered chains.
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Returns true when no manager has been constructed yet.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Signals every monitor to stop and waits for the tasks to finish.
    pub async fn shutdown(&self) {
        for entry in self.managers.iter() {
            entry.value().shutdown();
        }

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.monitors.lock());
        for handle in handles {
            let _ = handle.await;
        }
        debug!("all RPC managers shut down");
    }
}

impl Default for ManagerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use coa_core::types::RpcEndpoint;

    async fn test_network(chain_id: u64) -> (MockServer, NetworkConfig) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x10"
            })))
            .mount(&server)
            .await;

        let network = NetworkConfig {
            chain_id,
            name: format!("chain-{chain_id}"),
            contract_address: "0xaa".into(),
            endpoints: vec![RpcEndpoint::new(server.uri(), 1, "primary").with_timeout(2)],
            metadata_base_url: String::new(),
            identifier_mapping: Default::default(),
            series: Vec::new(),
            scan_ranges: Vec::new(),
        };
        (server, network)
    }

    #[tokio::test]
    async fn test_same_chain_returns_same_manager() {
        let (_server, network) = test_network(1).await;
        let registry = ManagerRegistry::new();

        let a = registry.manager_for(&network).unwrap();
        let b = registry.manager_for(&network).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_distinct_chains_get_distinct_managers() {
        let (_s1, n1) = test_network(1).await;
        let (_s2, n2) = test_network(2).await;
        let registry = ManagerRegistry::new();

        let a = registry.manager_for(&n1).unwrap();
        let b = registry.manager_for(&n2).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_completes() {
        let (_server, network) = test_network(3).await;
        let registry = ManagerRegistry::new();
        registry.manager_for(&network).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(2), registry.shutdown())
            .await
            .expect("shutdown finishes promptly");
    }
}
