//! Remote contract boundary.
//!
//! The three ledgers are consumed as black boxes through a single trait:
//! a read-only `call` and a signed, state-changing `invoke`, both addressed
//! by contract address and entrypoint name with felt calldata. The trait
//! keeps the client layer testable against the in-memory implementation.

mod http;
mod memory;

pub use http::JsonRpcGateway;
pub use memory::InMemoryGateway;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::signer::Signer;

/// A read against a deployed contract.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub contract: String,
    pub entrypoint: String,
    pub calldata: Vec<String>,
}

impl CallRequest {
    pub fn new(contract: &str, entrypoint: &str, calldata: Vec<String>) -> Self {
        Self {
            contract: contract.to_string(),
            entrypoint: entrypoint.to_string(),
            calldata,
        }
    }
}

/// A signed write against a deployed contract.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub contract: String,
    pub entrypoint: String,
    pub calldata: Vec<String>,
    /// Account submitting the transaction.
    pub sender: String,
}

impl InvokeRequest {
    pub fn new(contract: &str, entrypoint: &str, calldata: Vec<String>, sender: &str) -> Self {
        Self {
            contract: contract.to_string(),
            entrypoint: entrypoint.to_string(),
            calldata,
            sender: sender.to_string(),
        }
    }

    /// Canonical byte payload covered by the invoke signature.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = format!("{}:{}:{}", self.sender, self.contract, self.entrypoint);
        for felt in &self.calldata {
            payload.push(':');
            payload.push_str(felt);
        }
        payload.into_bytes()
    }
}

#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Execute a read. Returns the raw felt values of the contract view.
    async fn call(&self, request: CallRequest) -> Result<Vec<String>, GatewayError>;

    /// Submit a signed write. Returns the transaction hash.
    async fn invoke(&self, request: InvokeRequest, signer: &Signer) -> Result<String, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_payload_covers_sender_and_calldata() {
        let request = InvokeRequest::new(
            "0xcontract",
            "log_bake",
            vec!["0xabc".into(), "0x65537".into()],
            "0xabc",
        );
        let payload = String::from_utf8(request.signing_payload()).unwrap();
        assert_eq!(payload, "0xabc:0xcontract:log_bake:0xabc:0x65537");
    }
}
