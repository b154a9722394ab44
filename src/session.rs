//! Session/signer binder.
//!
//! One wallet session at a time. On connect the signer is pushed into
//! every ledger client before the session reads as connected; on
//! disconnect it is cleared from every client (and the countdown torn
//! down) before the session reads as disconnected, so no write can ever
//! pick up a stale signer across a logical disconnect.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::countdown::NextBakeCountdown;
use crate::ledgers::{ExperienceLedger, MilestoneLedger, PodLedger};
use crate::signer::Signer;
use crate::types::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct SessionBinder {
    experience: Arc<ExperienceLedger>,
    pods: Arc<PodLedger>,
    milestones: Arc<MilestoneLedger>,
    state: RwLock<SessionState>,
    active: RwLock<Option<Identity>>,
    countdown: Mutex<Option<NextBakeCountdown>>,
}

impl SessionBinder {
    pub fn new(
        experience: Arc<ExperienceLedger>,
        pods: Arc<PodLedger>,
        milestones: Arc<MilestoneLedger>,
    ) -> Self {
        Self {
            experience,
            pods,
            milestones,
            state: RwLock::new(SessionState::Disconnected),
            active: RwLock::new(None),
            countdown: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn active_identity(&self) -> Option<Identity> {
        self.active.read().await.clone()
    }

    /// Connect a signer, binding it to every ledger client.
    ///
    /// A connect while already connected rebinds, replacing the previous
    /// session's signer everywhere; no client is left holding the old one.
    pub async fn connect(&self, signer: Signer) {
        let identity = signer.account().clone();
        *self.state.write().await = SessionState::Connecting;

        let signer = Arc::new(signer);
        self.bind_all(Some(signer)).await;
        *self.active.write().await = Some(identity.clone());

        *self.state.write().await = SessionState::Connected;
        info!(identity = %identity, "session connected");
    }

    /// Disconnect, explicit or provider-initiated.
    ///
    /// Signers are cleared and the countdown aborted *before* the state
    /// transitions, so nothing observing `Disconnected` can race a write
    /// that still holds the old signer.
    pub async fn disconnect(&self) {
        self.bind_all(None).await;

        if let Some(countdown) = self.countdown.lock().await.take() {
            countdown.abort();
        }

        let previous = self.active.write().await.take();
        *self.state.write().await = SessionState::Disconnected;
        match previous {
            Some(identity) => info!(identity = %identity, "session disconnected"),
            None => warn!("disconnect with no active session"),
        }
    }

    /// Attach the session's countdown, replacing (and aborting) any prior one.
    pub async fn attach_countdown(&self, countdown: NextBakeCountdown) {
        if let Some(previous) = self.countdown.lock().await.replace(countdown) {
            previous.abort();
        }
    }

    async fn bind_all(&self, signer: Option<Arc<Signer>>) {
        // All three clients flip within this call; callers only observe
        // the state change after every slot is updated.
        self.experience.bind_signer(signer.clone()).await;
        self.pods.bind_signer(signer.clone()).await;
        self.milestones.bind_signer(signer).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::gateway::InMemoryGateway;

    fn binder() -> SessionBinder {
        let config = LedgerConfig::default();
        let gateway = Arc::new(InMemoryGateway::new(&config));
        SessionBinder::new(
            Arc::new(ExperienceLedger::new(gateway.clone(), &config.experience_address)),
            Arc::new(PodLedger::new(gateway.clone(), &config.pod_address)),
            Arc::new(MilestoneLedger::new(gateway, &config.milestone_address)),
        )
    }

    fn signer(addr: &str) -> Signer {
        Signer::from_secret_bytes(Identity::parse(addr).unwrap(), &[8u8; 32])
    }

    #[tokio::test]
    async fn connect_binds_every_client() {
        let binder = binder();
        assert_eq!(binder.state().await, SessionState::Disconnected);

        binder.connect(signer("0xabc")).await;

        assert_eq!(binder.state().await, SessionState::Connected);
        assert_eq!(binder.active_identity().await, Some(Identity::parse("0xabc").unwrap()));
        assert!(binder.experience.has_signer().await);
        assert!(binder.pods.has_signer().await);
        assert!(binder.milestones.has_signer().await);
    }

    #[tokio::test]
    async fn disconnect_clears_every_client() {
        let binder = binder();
        binder.connect(signer("0xabc")).await;
        binder.attach_countdown(NextBakeCountdown::start(None)).await;

        binder.disconnect().await;

        assert_eq!(binder.state().await, SessionState::Disconnected);
        assert_eq!(binder.active_identity().await, None);
        assert!(!binder.experience.has_signer().await);
        assert!(!binder.pods.has_signer().await);
        assert!(!binder.milestones.has_signer().await);
        assert!(binder.countdown.lock().await.is_none());
    }

    #[tokio::test]
    async fn reconnect_replaces_the_previous_signer() {
        let binder = binder();
        binder.connect(signer("0xabc")).await;
        binder.connect(signer("0xdef")).await;

        assert_eq!(binder.active_identity().await, Some(Identity::parse("0xdef").unwrap()));
        assert!(binder.experience.has_signer().await);
    }
}
