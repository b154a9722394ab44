//! Milestone ledger client.
//!
//! Achievement NFTs, one per (identity, definition) pair. The contract
//! enforces the uniqueness itself; re-minting an owned milestone comes back
//! as an "already exists" rejection that the write path reinterprets into
//! the existing token.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::codec;
use crate::error::{GatewayError, LedgerError};
use crate::gateway::{CallRequest, ContractGateway};
use crate::retry::{retry_read, RetryPolicy};
use crate::signer::Signer;
use crate::types::{Identity, UserMilestone};

use super::{submit_write, SignerSlot, WriteOutcome};

pub struct MilestoneLedger {
    gateway: Arc<dyn ContractGateway>,
    address: String,
    signer: SignerSlot,
    retry: RetryPolicy,
}

impl MilestoneLedger {
    pub fn new(gateway: Arc<dyn ContractGateway>, address: &str) -> Self {
        Self {
            gateway,
            address: address.to_string(),
            signer: RwLock::new(None),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn bind_signer(&self, signer: Option<Arc<Signer>>) {
        *self.signer.write().await = signer;
    }

    pub async fn has_signer(&self) -> bool {
        self.signer.read().await.is_some()
    }

    /// All milestones minted for an identity.
    pub async fn user_milestones(&self, id: &Identity) -> Option<Vec<UserMilestone>> {
        let values = retry_read(&self.retry, "get_user_milestones", || async move {
            let felts = self
                .gateway
                .call(CallRequest::new(
                    &self.address,
                    "get_user_milestones",
                    vec![id.as_str().to_string()],
                ))
                .await?;
            decode_milestones(&felts)
        })
        .await?;
        Some(values)
    }

    pub async fn has_milestone(&self, id: &Identity, definition_id: u32) -> Option<bool> {
        retry_read(&self.retry, "has_milestone", || async move {
            let values = self
                .gateway
                .call(CallRequest::new(
                    &self.address,
                    "has_milestone",
                    vec![
                        id.as_str().to_string(),
                        codec::encode_u64(definition_id as u64),
                    ],
                ))
                .await?;
            codec::decode_bool(codec::expect_single(&values)?)
        })
        .await
    }

    pub async fn milestone_metadata(&self, definition_id: u32) -> Option<String> {
        retry_read(&self.retry, "get_milestone_metadata", || async move {
            let values = self
                .gateway
                .call(CallRequest::new(
                    &self.address,
                    "get_milestone_metadata",
                    vec![codec::encode_u64(definition_id as u64)],
                ))
                .await?;
            codec::decode_short_string(codec::expect_single(&values)?)
        })
        .await
    }

    /// Mint one specific milestone. Re-minting an owned definition comes
    /// back as [`WriteOutcome::AlreadyRecorded`] with the existing token.
    pub async fn mint_milestone(
        &self,
        id: &Identity,
        definition_id: u32,
    ) -> Result<WriteOutcome, LedgerError> {
        submit_write(
            &self.gateway,
            &self.signer,
            &self.address,
            "mint_milestone",
            vec![
                id.as_str().to_string(),
                codec::encode_u64(definition_id as u64),
            ],
        )
        .await
    }

    /// Ask the ledger to evaluate and mint anything the identity qualifies
    /// for. Idempotent contract-side; safe to call repeatedly.
    pub async fn check_and_mint_eligible(&self, id: &Identity) -> Result<WriteOutcome, LedgerError> {
        submit_write(
            &self.gateway,
            &self.signer,
            &self.address,
            "check_and_mint_eligible",
            vec![id.as_str().to_string()],
        )
        .await
    }
}

fn decode_milestones(felts: &[String]) -> Result<Vec<UserMilestone>, GatewayError> {
    if felts.len() % 3 != 0 {
        return Err(GatewayError::InvalidResponse(format!(
            "milestone list length {} is not a multiple of 3",
            felts.len()
        )));
    }
    felts
        .chunks_exact(3)
        .map(|chunk| {
            Ok(UserMilestone {
                definition_id: codec::decode_u32(&chunk[0])?,
                token_id: chunk[1].clone(),
                minted_at: codec::decode_i64(&chunk[2])?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::gateway::InMemoryGateway;

    async fn fixture() -> (Arc<InMemoryGateway>, MilestoneLedger, Identity) {
        let config = LedgerConfig::default();
        let gateway = Arc::new(InMemoryGateway::new(&config));
        let ledger = MilestoneLedger::new(gateway.clone(), &config.milestone_address);
        let id = Identity::parse("0xabc").unwrap();
        ledger
            .bind_signer(Some(Arc::new(Signer::from_secret_bytes(
                id.clone(),
                &[5u8; 32],
            ))))
            .await;
        (gateway, ledger, id)
    }

    #[tokio::test]
    async fn minting_then_listing_round_trips() {
        let (gateway, ledger, id) = fixture().await;
        gateway.set_now(1_700_000_000).await;

        let outcome = ledger.mint_milestone(&id, 1).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Submitted { .. }));

        let milestones = ledger.user_milestones(&id).await.unwrap();
        assert_eq!(milestones.len(), 1);
        assert_eq!(milestones[0].definition_id, 1);
        assert_eq!(milestones[0].minted_at, 1_700_000_000);

        assert_eq!(ledger.has_milestone(&id, 1).await, Some(true));
        assert_eq!(ledger.has_milestone(&id, 2).await, Some(false));
    }

    #[tokio::test]
    async fn duplicate_mint_returns_the_existing_token() {
        let (_, ledger, id) = fixture().await;

        ledger.mint_milestone(&id, 2).await.unwrap();
        let again = ledger.mint_milestone(&id, 2).await.unwrap();

        match again {
            WriteOutcome::AlreadyRecorded { existing } => assert_eq!(existing, "0x1"),
            other => panic!("expected AlreadyRecorded, got {other:?}"),
        }

        let milestones = ledger.user_milestones(&id).await.unwrap();
        assert_eq!(milestones.len(), 1);
    }

    #[tokio::test]
    async fn metadata_reads_the_definition_name() {
        let (_, ledger, _) = fixture().await;
        assert_eq!(ledger.milestone_metadata(2).await.unwrap(), "Week Warrior");
    }
}
