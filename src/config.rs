//! Static configuration for the ledger clients.
//!
//! Contract addresses are produced by the deployment tooling and consumed
//! here as plain configuration input.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the three ledgers live and how to reach them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint shared by all three contracts.
    pub rpc_url: String,
    /// Experience (XP/streak) tracker contract address.
    pub experience_address: String,
    /// Pod ledger contract address.
    pub pod_address: String,
    /// Milestone NFT contract address.
    pub milestone_address: String,
    /// Timeout for individual RPC requests, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:5050".to_string(),
            experience_address: "0x734352fe863098a0813160c9cf255e0b6312a8417c3a68003c05b30ff687e73"
                .to_string(),
            pod_address: "0x26ee488bb00fec5bda085b15d4a1c483052f74a09b1b80b5f6f6cc61da376b8"
                .to_string(),
            milestone_address: "0x77ac394d657bcb17662b38e2e4864d026483babf9ad7e75e902afacd8215e4c"
                .to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl LedgerConfig {
    /// Build a config from `BAKEXP_*` environment variables, falling back
    /// to defaults for anything unset. Reads a `.env` file first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            rpc_url: std::env::var("BAKEXP_RPC_URL").unwrap_or(defaults.rpc_url),
            experience_address: std::env::var("BAKEXP_EXPERIENCE_ADDRESS")
                .unwrap_or(defaults.experience_address),
            pod_address: std::env::var("BAKEXP_POD_ADDRESS").unwrap_or(defaults.pod_address),
            milestone_address: std::env::var("BAKEXP_MILESTONE_ADDRESS")
                .unwrap_or(defaults.milestone_address),
            request_timeout_secs: std::env::var("BAKEXP_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_local_rpc() {
        let config = LedgerConfig::default();
        assert_eq!(config.rpc_url, "http://localhost:5050");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.experience_address.starts_with("0x"));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = LedgerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: LedgerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rpc_url, config.rpc_url);
        assert_eq!(back.pod_address, config.pod_address);
    }
}
