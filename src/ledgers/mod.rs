//! Ledger client layer.
//!
//! One client per ledger, each exposing retried reads and single-shot
//! writes. Reads absorb transient failures and surface `None` after
//! exhausting retries; writes fail fast on a missing signer and carry the
//! raw rejection message otherwise, with one exception: "already …" style
//! rejections are idempotent at the contract level and are reinterpreted
//! as success with the pre-existing identifier pulled from the payload.

mod experience;
mod milestones;
mod pods;

pub use experience::ExperienceLedger;
pub use milestones::MilestoneLedger;
pub use pods::PodLedger;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::error::{GatewayError, LedgerError};
use crate::gateway::{ContractGateway, InvokeRequest};
use crate::signer::Signer;

/// Result of a ledger write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The transaction was accepted for execution.
    Submitted { tx_hash: String },
    /// The contract reported the state already exists; the write is a
    /// no-op and `existing` is the identifier it reported.
    AlreadyRecorded { existing: String },
}

impl WriteOutcome {
    pub fn is_already_recorded(&self) -> bool {
        matches!(self, WriteOutcome::AlreadyRecorded { .. })
    }
}

/// Rejection phrases the contracts use for idempotent duplicates.
const ALREADY_PHRASES: &[&str] = &["already declared", "already exists", "already minted"];

/// Match an idempotent-duplicate rejection and extract the pre-existing
/// `0x…` identifier from its payload. Anything else stays a rejection.
pub(crate) fn extract_already_recorded(message: &str) -> Option<String> {
    if !ALREADY_PHRASES.iter().any(|p| message.contains(p)) {
        return None;
    }
    let start = message.find("0x")?;
    let rest = &message[start + 2..];
    let len = rest.chars().take_while(|c| c.is_ascii_hexdigit()).count();
    if len == 0 {
        return None;
    }
    Some(format!("0x{}", &rest[..len]))
}

/// Slot for the signer bound to one client.
pub(crate) type SignerSlot = RwLock<Option<Arc<Signer>>>;

/// Submit a single-shot write through a client's gateway.
pub(crate) async fn submit_write(
    gateway: &Arc<dyn ContractGateway>,
    signer_slot: &SignerSlot,
    contract: &str,
    entrypoint: &str,
    calldata: Vec<String>,
) -> Result<WriteOutcome, LedgerError> {
    let signer = signer_slot
        .read()
        .await
        .clone()
        .ok_or(LedgerError::SignerMissing)?;

    let request = InvokeRequest::new(contract, entrypoint, calldata, signer.account().as_str());
    match gateway.invoke(request, &signer).await {
        Ok(tx_hash) => Ok(WriteOutcome::Submitted { tx_hash }),
        Err(GatewayError::Rejected(message)) => match extract_already_recorded(&message) {
            Some(existing) => {
                info!(entrypoint = %entrypoint, existing = %existing, "write already recorded on ledger");
                Ok(WriteOutcome::AlreadyRecorded { existing })
            }
            None => Err(LedgerError::Rejected(message)),
        },
        Err(GatewayError::Transport(message)) | Err(GatewayError::InvalidResponse(message)) => {
            Err(LedgerError::Transport(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_declared_yields_the_class_hash() {
        let message = "Class with hash 0x44bcdf is already declared";
        assert_eq!(extract_already_recorded(message), Some("0x44bcdf".to_string()));
    }

    #[test]
    fn already_minted_yields_the_token() {
        let message = "milestone 3 already exists for holder: token 0x2a";
        assert_eq!(extract_already_recorded(message), Some("0x2a".to_string()));
    }

    #[test]
    fn other_rejections_are_not_reinterpreted() {
        assert_eq!(extract_already_recorded("pod 3 is full"), None);
        assert_eq!(extract_already_recorded("caller is already a member of pod 3"), None);
        // The phrase alone is not enough without an identifier.
        assert_eq!(extract_already_recorded("already exists"), None);
    }
}
