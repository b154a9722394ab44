//! JSON-RPC gateway over HTTP.
//!
//! Speaks plain JSON-RPC 2.0 to the node fronting the ledgers: `ledger_call`
//! for reads and `ledger_invoke` for signed writes. Network-level failures
//! map to [`GatewayError::Transport`] so the read path can retry them; an
//! error object in the RPC envelope is a rejection by the remote contract.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{CallRequest, ContractGateway, InvokeRequest};
use crate::config::LedgerConfig;
use crate::error::GatewayError;
use crate::signer::Signer;

pub struct JsonRpcGateway {
    client: Client,
    rpc_url: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<serde_json::Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl JsonRpcGateway {
    pub fn new(config: &LedgerConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            rpc_url: config.rpc_url.clone(),
        })
    }

    async fn post(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, GatewayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        debug!(method = %method, url = %self.rpc_url, "sending ledger RPC");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Transport(format!("HTTP {status}")));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(GatewayError::Rejected(format!("{} (code {})", err.message, err.code)));
        }

        envelope
            .result
            .ok_or_else(|| GatewayError::InvalidResponse("missing result".to_string()))
    }

    fn felts_from(value: serde_json::Value) -> Result<Vec<String>, GatewayError> {
        let array = value
            .as_array()
            .ok_or_else(|| GatewayError::InvalidResponse("result is not an array".to_string()))?;
        array
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| GatewayError::InvalidResponse(format!("non-string felt: {v}")))
            })
            .collect()
    }
}

#[async_trait]
impl ContractGateway for JsonRpcGateway {
    async fn call(&self, request: CallRequest) -> Result<Vec<String>, GatewayError> {
        let params = json!({
            "contract_address": request.contract,
            "entry_point": request.entrypoint,
            "calldata": request.calldata,
        });
        let result = self.post("ledger_call", params).await?;
        Self::felts_from(result)
    }

    async fn invoke(&self, request: InvokeRequest, signer: &Signer) -> Result<String, GatewayError> {
        let signature = signer.sign(&request.signing_payload());
        let params = json!({
            "contract_address": request.contract,
            "entry_point": request.entrypoint,
            "calldata": request.calldata,
            "sender_address": request.sender,
            "signature": signature,
        });

        let result = self.post("ledger_invoke", params).await?;
        result
            .get("transaction_hash")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::InvalidResponse("missing transaction_hash".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_builds_from_config() {
        let gateway = JsonRpcGateway::new(&LedgerConfig::default()).unwrap();
        assert_eq!(gateway.rpc_url, "http://localhost:5050");
    }

    #[test]
    fn felts_require_an_array_of_strings() {
        let ok = JsonRpcGateway::felts_from(json!(["0x1", "0x2"])).unwrap();
        assert_eq!(ok, vec!["0x1".to_string(), "0x2".to_string()]);

        assert!(JsonRpcGateway::felts_from(json!("0x1")).is_err());
        assert!(JsonRpcGateway::felts_from(json!([1, 2])).is_err());
    }
}
