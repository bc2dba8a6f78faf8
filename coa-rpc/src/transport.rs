//! JSON-RPC transport over reqwest.

use std::time::Duration;

use serde_json::{json, Value};

use coa_core::error::{CoaError, Result};
use coa_core::types::RpcEndpoint;

/// Issues a JSON-RPC request against one endpoint, bounded by the
/// endpoint's configured timeout.
pub async fn request(
    client: &reqwest::Client,
    endpoint: &RpcEndpoint,
    method: &str,
    params: &Value,
) -> Result<Value> {
    request_with_timeout(client, endpoint, method, params, endpoint.timeout()).await
}

/// Issues a JSON-RPC request with an explicit deadline, used by the retry
/// path whose per-attempt timeout grows past the endpoint default.
pub async fn request_with_timeout(
    client: &reqwest::Client,
    endpoint: &RpcEndpoint,
    method: &str,
    params: &Value,
    deadline: Duration,
) -> Result<Value> {
    let body = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });

    let response = client
        .post(&endpoint.url)
        .json(&body)
        .timeout(deadline)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                CoaError::NetworkTimeout {
                    label: endpoint.label.clone(),
                    seconds: deadline.as_secs(),
                }
            } else {
                CoaError::Http(e.to_string())
            }
        })?;

    if !response.status().is_success() {
        return Err(CoaError::Http(format!("HTTP {}", response.status())));
    }

    let json: Value = response
        .json()
        .await
        .map_err(|e| CoaError::Http(e.to_string()))?;

    if let Some(error) = json.get("error") {
        if !error.is_null() {
            return Err(CoaError::Rpc(error.to_string()));
        }
    }

    json.get("result")
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| CoaError::Rpc("response carries no result".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint_for(server: &MockServer) -> RpcEndpoint {
        RpcEndpoint::new(server.uri(), 1, "test").with_timeout(2)
    }

    #[tokio::test]
    async fn test_request_returns_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({"method": "eth_blockNumber"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x10"
            })))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let result = request(&client, &endpoint_for(&server), "eth_blockNumber", &json!([]))
            .await
            .unwrap();
        assert_eq!(result, json!("0x10"));
    }

    #[tokio::test]
    async fn test_rpc_error_object_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": 3, "message": "execution reverted"}
            })))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = request(&client, &endpoint_for(&server), "eth_call", &json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoaError::Rpc(_)));
        assert!(err.to_string().contains("execution reverted"));
    }

    #[tokio::test]
    async fn test_http_failure_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = request(&client, &endpoint_for(&server), "eth_call", &json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoaError::Http(_)));
    }

    #[tokio::test]
    async fn test_deadline_produces_timeout_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"})),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let err = request_with_timeout(
            &client,
            &endpoint_for(&server),
            "eth_blockNumber",
            &json!([]),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoaError::NetworkTimeout { .. }));
    }
}
