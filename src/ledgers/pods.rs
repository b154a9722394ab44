//! Pod ledger client.
//!
//! Group-challenge pods: creation, membership and the per-pod bake log.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::codec;
use crate::error::{GatewayError, LedgerError};
use crate::gateway::{CallRequest, ContractGateway};
use crate::retry::{retry_read, RetryPolicy};
use crate::signer::Signer;
use crate::types::{Identity, Pod, PodStats};

use super::{submit_write, SignerSlot, WriteOutcome};

pub struct PodLedger {
    gateway: Arc<dyn ContractGateway>,
    address: String,
    signer: SignerSlot,
    retry: RetryPolicy,
}

impl PodLedger {
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

    async fn read(&self, entrypoint: &str, calldata: Vec<String>) -> Option<Vec<String>> {
        retry_read(&self.retry, entrypoint, || {
            let calldata = calldata.clone();
            async move {
                self.gateway
                    .call(CallRequest::new(&self.address, entrypoint, calldata))
                    .await
            }
        })
        .await
    }

    pub async fn pod(&self, pod_id: u64) -> Option<Pod> {
        let values = self.read("get_pod", vec![codec::encode_u64(pod_id)]).await?;
        decode_pod(&values).ok()
    }

    pub async fn pod_members(&self, pod_id: u64) -> Option<Vec<Identity>> {
        let values = self
            .read("get_pod_members", vec![codec::encode_u64(pod_id)])
            .await?;
        values
            .iter()
            .map(|felt| Identity::parse(felt).ok())
            .collect()
    }

    pub async fn user_pods(&self, id: &Identity) -> Option<Vec<u64>> {
        let values = self
            .read("get_user_pods", vec![id.as_str().to_string()])
            .await?;
        values.iter().map(|felt| codec::decode_u64(felt).ok()).collect()
    }

    pub async fn pod_stats(&self, pod_id: u64) -> Option<PodStats> {
        let values = self
            .read("get_pod_stats", vec![codec::encode_u64(pod_id)])
            .await?;
        decode_pod_stats(&values).ok()
    }

    pub async fn has_user_baked_today_in_pod(&self, pod_id: u64, id: &Identity) -> Option<bool> {
        let values = self
            .read(
                "has_user_baked_today_in_pod",
                vec![codec::encode_u64(pod_id), id.as_str().to_string()],
            )
            .await?;
        codec::expect_single(&values)
            .and_then(codec::decode_bool)
            .ok()
    }

    /// Pod milestone labels reached so far (e.g. "pod-10-bakes").
    pub async fn check_pod_milestone(&self, pod_id: u64) -> Option<Vec<String>> {
        let values = self
            .read("check_pod_milestone", vec![codec::encode_u64(pod_id)])
            .await?;
        values
            .iter()
            .map(|felt| codec::decode_short_string(felt).ok())
            .collect()
    }

    pub async fn create_pod(
        &self,
        name: &str,
        target_streak: u32,
        max_members: u32,
    ) -> Result<WriteOutcome, LedgerError> {
        submit_write(
            &self.gateway,
            &self.signer,
            &self.address,
            "create_pod",
            vec![
                codec::encode_short_string(name),
                codec::encode_u64(target_streak as u64),
                codec::encode_u64(max_members as u64),
            ],
        )
        .await
    }

    pub async fn join_pod(&self, pod_id: u64) -> Result<WriteOutcome, LedgerError> {
        submit_write(
            &self.gateway,
            &self.signer,
            &self.address,
            "join_pod",
            vec![codec::encode_u64(pod_id)],
        )
        .await
    }

    pub async fn leave_pod(&self, pod_id: u64) -> Result<WriteOutcome, LedgerError> {
        submit_write(
            &self.gateway,
            &self.signer,
            &self.address,
            "leave_pod",
            vec![codec::encode_u64(pod_id)],
        )
        .await
    }

    pub async fn log_pod_bake(&self, pod_id: u64) -> Result<WriteOutcome, LedgerError> {
        submit_write(
            &self.gateway,
            &self.signer,
            &self.address,
            "log_pod_bake",
            vec![codec::encode_u64(pod_id)],
        )
        .await
    }
}

fn decode_pod(values: &[String]) -> Result<Pod, GatewayError> {
    if values.len() != 8 {
        return Err(GatewayError::InvalidResponse(format!(
            "expected 8 pod felts, got {}",
            values.len()
        )));
    }
    Ok(Pod {
        id: codec::decode_u64(&values[0])?,
        name: codec::decode_short_string(&values[1])?,
        creator: Identity::parse(&values[2])
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?,
        member_limit: codec::decode_u32(&values[3])?,
        target_streak: codec::decode_u32(&values[4])?,
        current_streak: codec::decode_u32(&values[5])?,
        created_at: codec::decode_i64(&values[6])?,
        is_active: codec::decode_bool(&values[7])?,
    })
}

fn decode_pod_stats(values: &[String]) -> Result<PodStats, GatewayError> {
    if values.len() != 6 {
        return Err(GatewayError::InvalidResponse(format!(
            "expected 6 pod stat felts, got {}",
            values.len()
        )));
    }
    Ok(PodStats {
        total_bakes: codec::decode_u64(&values[0])?,
        member_count: codec::decode_u32(&values[1])?,
        daily_bakes_today: codec::decode_u32(&values[2])?,
        current_streak: codec::decode_u32(&values[3])?,
        target_streak: codec::decode_u32(&values[4])?,
        is_active: codec::decode_bool(&values[5])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::gateway::InMemoryGateway;

    async fn fixture() -> (Arc<InMemoryGateway>, PodLedger, Identity) {
        let config = LedgerConfig::default();
        let gateway = Arc::new(InMemoryGateway::new(&config));
        let ledger = PodLedger::new(gateway.clone(), &config.pod_address);
        let id = Identity::parse("0xabc").unwrap();
        ledger
            .bind_signer(Some(Arc::new(Signer::from_secret_bytes(
                id.clone(),
                &[3u8; 32],
            ))))
            .await;
        (gateway, ledger, id)
    }

    #[tokio::test]
    async fn create_then_read_back_a_pod() {
        let (gateway, ledger, id) = fixture().await;
        gateway.set_now(1_700_000_000).await;

        let outcome = ledger.create_pod("Sourdough Club", 14, 5).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Submitted { .. }));

        let pods = ledger.user_pods(&id).await.unwrap();
        assert_eq!(pods, vec![1]);

        let pod = ledger.pod(1).await.unwrap();
        assert_eq!(pod.name, "Sourdough Club");
        assert_eq!(pod.creator, id);
        assert_eq!(pod.member_limit, 5);
        assert!(pod.is_active);

        let members = ledger.pod_members(1).await.unwrap();
        assert_eq!(members, vec![id]);
    }

    #[tokio::test]
    async fn pod_bake_updates_stats_and_daily_flag() {
        let (gateway, ledger, id) = fixture().await;
        gateway.set_now(1_700_000_000).await;
        ledger.create_pod("Rye Circle", 7, 3).await.unwrap();

        assert_eq!(ledger.has_user_baked_today_in_pod(1, &id).await, Some(false));
        ledger.log_pod_bake(1).await.unwrap();
        assert_eq!(ledger.has_user_baked_today_in_pod(1, &id).await, Some(true));

        let stats = ledger.pod_stats(1).await.unwrap();
        assert_eq!(stats.total_bakes, 1);
        assert_eq!(stats.member_count, 1);
        assert_eq!(stats.daily_bakes_today, 1);
    }

    #[tokio::test]
    async fn joining_a_full_pod_is_rejected() {
        let (gateway, ledger, _) = fixture().await;
        gateway.set_now(1_700_000_000).await;
        ledger.create_pod("Tiny Pod", 7, 1).await.unwrap();

        let other = PodLedger::new(gateway.clone(), &LedgerConfig::default().pod_address);
        other
            .bind_signer(Some(Arc::new(Signer::from_secret_bytes(
                Identity::parse("0xdef").unwrap(),
                &[4u8; 32],
            ))))
            .await;

        let err = other.join_pod(1).await.unwrap_err();
        match err {
            LedgerError::Rejected(msg) => assert!(msg.contains("full")),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
