//! Experience ledger client.
//!
//! Owns the XP/streak counters for every baker. Reads are retried and
//! fanned out; `log_bake` and `add_xp` are the only writes and go through
//! the shared single-shot path.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::codec;
use crate::error::LedgerError;
use crate::gateway::{CallRequest, ContractGateway};
use crate::retry::{retry_read, RetryPolicy};
use crate::signer::Signer;
use crate::types::{ExperienceRecord, Identity};

use super::{submit_write, SignerSlot, WriteOutcome};

pub struct ExperienceLedger {
    gateway: Arc<dyn ContractGateway>,
    address: String,
    signer: SignerSlot,
    retry: RetryPolicy,
}

impl ExperienceLedger {
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

    /// Bind or clear the session signer for this client.
    pub async fn bind_signer(&self, signer: Option<Arc<Signer>>) {
        *self.signer.write().await = signer;
    }

    pub async fn has_signer(&self) -> bool {
        self.signer.read().await.is_some()
    }

    async fn read_u64(&self, entrypoint: &str, id: &Identity) -> Option<u64> {
        retry_read(&self.retry, entrypoint, || async move {
            let values = self
                .gateway
                .call(CallRequest::new(
                    &self.address,
                    entrypoint,
                    vec![id.as_str().to_string()],
                ))
                .await?;
            codec::decode_u64(codec::expect_single(&values)?)
        })
        .await
    }

    pub async fn xp(&self, id: &Identity) -> Option<u64> {
        self.read_u64("get_xp", id).await
    }

    /// Level as the contract reports it; the derivation engine computes the
    /// same value locally from XP.
    pub async fn level(&self, id: &Identity) -> Option<u32> {
        self.read_u64("get_level", id).await.map(|v| v as u32)
    }

    pub async fn streak(&self, id: &Identity) -> Option<u32> {
        self.read_u64("get_streak", id).await.map(|v| v as u32)
    }

    pub async fn total_bakes(&self, id: &Identity) -> Option<u64> {
        self.read_u64("get_total_bakes", id).await
    }

    /// Last bake timestamp; the contract encodes "never baked" as zero.
    pub async fn last_bake_timestamp(&self, id: &Identity) -> Option<Option<i64>> {
        self.read_u64("get_last_bake_timestamp", id)
            .await
            .map(|ts| if ts == 0 { None } else { Some(ts as i64) })
    }

    /// Fan out all counter reads concurrently and join them into a record.
    ///
    /// `None` if any individual read exhausted its retries.
    pub async fn snapshot(&self, id: &Identity) -> Option<ExperienceRecord> {
        let (xp, streak, total_bakes, last_bake_timestamp) = tokio::join!(
            self.xp(id),
            self.streak(id),
            self.total_bakes(id),
            self.last_bake_timestamp(id),
        );

        Some(ExperienceRecord {
            xp: xp?,
            streak: streak?,
            total_bakes: total_bakes?,
            last_bake_timestamp: last_bake_timestamp?,
        })
    }

    /// Record a bake at `timestamp` (unix seconds). Single-shot.
    pub async fn log_bake(&self, id: &Identity, timestamp: i64) -> Result<WriteOutcome, LedgerError> {
        submit_write(
            &self.gateway,
            &self.signer,
            &self.address,
            "log_bake",
            vec![id.as_str().to_string(), codec::encode_i64(timestamp)],
        )
        .await
    }

    /// Grant XP. Single-shot.
    pub async fn add_xp(&self, id: &Identity, amount: u64) -> Result<WriteOutcome, LedgerError> {
        submit_write(
            &self.gateway,
            &self.signer,
            &self.address,
            "add_xp",
            vec![id.as_str().to_string(), codec::encode_u64(amount)],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::gateway::InMemoryGateway;

    fn fixture() -> (Arc<InMemoryGateway>, ExperienceLedger, Identity) {
        let config = LedgerConfig::default();
        let gateway = Arc::new(InMemoryGateway::new(&config));
        let ledger = ExperienceLedger::new(gateway.clone(), &config.experience_address);
        let id = Identity::parse("0xabc").unwrap();
        (gateway, ledger, id)
    }

    #[tokio::test]
    async fn write_without_signer_fails_fast() {
        let (_, ledger, id) = fixture();
        let err = ledger.add_xp(&id, 25).await.unwrap_err();
        assert!(matches!(err, LedgerError::SignerMissing));
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_joins_all_counters() {
        let (gateway, ledger, id) = fixture();
        gateway.seed_baker(id.as_str(), 450, 8, Some(1_700_000_000), 18).await;

        let record = ledger.snapshot(&id).await.unwrap();
        assert_eq!(record.xp, 450);
        assert_eq!(record.streak, 8);
        assert_eq!(record.total_bakes, 18);
        assert_eq!(record.last_bake_timestamp, Some(1_700_000_000));
    }

    #[tokio::test(start_paused = true)]
    async fn read_recovers_after_two_transient_failures() {
        let (gateway, ledger, id) = fixture();
        gateway.seed_baker(id.as_str(), 75, 2, None, 3).await;
        gateway.fail_next("get_xp", 2).await;

        assert_eq!(ledger.xp(&id).await, Some(75));
    }

    #[tokio::test(start_paused = true)]
    async fn read_surfaces_absence_after_exhaustion() {
        let (gateway, ledger, id) = fixture();
        gateway.fail_next("get_streak", 3).await;

        assert_eq!(ledger.streak(&id).await, None);
    }

    #[tokio::test]
    async fn fresh_identity_reads_as_zeroed_record() {
        let (_, ledger, id) = fixture();
        let record = ledger.snapshot(&id).await.unwrap();
        assert_eq!(record, ExperienceRecord::default());
    }
}
