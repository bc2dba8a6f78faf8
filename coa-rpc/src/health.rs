//! Runtime endpoint health bookkeeping.
//!
//! Health records are owned exclusively by the [`crate::RpcManager`]; no
//! other component writes them. `last_checked` only ever moves forward.

use std::time::{Duration, Instant};

use coa_core::constants::ENDPOINT_COOLDOWN_SECONDS;

/// Mutable health fields computed at runtime, one per endpoint.
#[derive(Clone, Debug)]
pub struct EndpointHealth {
    /// Whether the last contact with the endpoint succeeded.
    pub healthy: bool,
    /// Response time of the last successful contact.
    pub response_time_ms: Option<u64>,
    /// When the endpoint was last probed or called.
    pub last_checked: Option<Instant>,
    /// When the endpoint last failed; drives the cool-down window.
    pub last_failure: Option<Instant>,
}

impl Default for EndpointHealth {
    fn default() -> Self {
        // Endpoints start optimistic so the first call is attempted
        Self {
            healthy: true,
            response_time_ms: None,
            last_checked: None,
            last_failure: None,
        }
    }
}

impl EndpointHealth {
    /// True while the endpoint is excluded from selection: it is unhealthy
    /// and failed within the cool-down window.
    pub fn in_cooldown(&self) -> bool {
        if self.healthy {
            return false;
        }
        match self.last_failure {
            Some(at) => at.elapsed() < Duration::from_secs(ENDPOINT_COOLDOWN_SECONDS),
            None => false,
        }
    }

    /// Records a successful contact.
    pub fn record_success(&mut self, response_time_ms: u64) {
        self.healthy = true;
        self.response_time_ms = Some(response_time_ms);
        self.last_checked = Some(Instant::now());
    }

    /// Records a failed contact, starting the cool-down window.
    pub fn record_failure(&mut self) {
        self.healthy = false;
        let now = Instant::now();
        self.last_checked = Some(now);
        self.last_failure = Some(now);
    }
}

/// Outcome of a single health probe.
#[derive(Clone, Copy, Debug)]
pub struct ProbeResult {
    /// Whether the probe call succeeded within the endpoint timeout.
    pub healthy: bool,
    /// Probe round-trip time when successful.
    pub response_time_ms: Option<u64>,
}

/// Point-in-time endpoint status exposed for observability.
#[derive(Clone, Debug)]
pub struct EndpointStats {
    /// Endpoint display label.
    pub label: String,
    /// Endpoint URL.
    pub url: String,
    /// Declared selection priority.
    pub priority: u32,
    /// Whether the endpoint is currently considered healthy.
    pub healthy: bool,
    /// Last successful response time.
    pub response_time_ms: Option<u64>,
    /// Seconds since the endpoint was last checked, if ever.
    pub seconds_since_check: Option<u64>,
}
