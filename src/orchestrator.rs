//! Bake orchestrator.
//!
//! Coordinates the multi-ledger "log a bake" operation: one mandatory
//! experience-ledger write followed by two best-effort writes, a journal
//! append, and a derived-state refresh. There is no cross-ledger atomicity
//! and no compensating transaction for the best-effort steps: both are
//! additive and independently re-checkable, so a failed reward step is
//! simply picked up by a later operation. Do not add rollback here.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::BakeJournal;
use crate::catalog::{self, StatSnapshot};
use crate::error::OrchestratorError;
use crate::ledgers::{ExperienceLedger, MilestoneLedger, PodLedger};
use crate::progression::{self, DerivedProgression, XP_PER_BAKE};
use crate::types::{BakeLogEntry, ExperienceRecord, Identity, UserMilestone};

/// Input for one log-bake operation.
#[derive(Debug, Clone)]
pub struct LogBakeRequest {
    pub identity: Identity,
    pub description: String,
    pub media_ref: Option<String>,
    pub tags: Vec<String>,
    /// Pod to credit with this bake, if the baker is in one.
    pub pod_id: Option<u64>,
    /// Unix seconds; defaults to the current time when absent.
    pub timestamp: Option<i64>,
}

impl LogBakeRequest {
    pub fn new(identity: Identity, description: &str) -> Self {
        Self {
            identity,
            description: description.to_string(),
            media_ref: None,
            tags: Vec::new(),
            pod_id: None,
            timestamp: None,
        }
    }

    pub fn with_pod(mut self, pod_id: u64) -> Self {
        self.pod_id = Some(pod_id);
        self
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Combined view of one identity's progress, re-read after a change.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub record: ExperienceRecord,
    pub progression: DerivedProgression,
    pub milestones: Vec<UserMilestone>,
    pub pod_ids: Vec<u64>,
}

impl ProgressSnapshot {
    /// Stats view for catalog previews. Pod creation counts need per-pod
    /// reads and are filled in by [`BakeOrchestrator::combined_stats`].
    pub fn stats(&self) -> StatSnapshot {
        StatSnapshot {
            xp: self.record.xp,
            streak: self.record.streak,
            total_bakes: self.record.total_bakes,
            level: self.progression.level,
            pods_created: None,
            pods_joined: Some(self.pod_ids.len() as u32),
        }
    }
}

/// A successfully logged bake.
#[derive(Debug, Clone)]
pub struct LoggedBake {
    pub entry: BakeLogEntry,
    /// Refreshed progress, when the post-write re-read succeeded.
    pub snapshot: Option<ProgressSnapshot>,
    /// Best-effort steps that failed; rewards may land later.
    pub reward_warnings: Vec<String>,
}

/// Outcome of a log-bake operation. `AlreadyBakedToday` is an expected
/// business outcome, deliberately not an error.
#[derive(Debug)]
pub enum LogBakeOutcome {
    Logged(Box<LoggedBake>),
    AlreadyBakedToday,
}

pub struct BakeOrchestrator {
    experience: Arc<ExperienceLedger>,
    pods: Arc<PodLedger>,
    milestones: Arc<MilestoneLedger>,
    journal: Arc<BakeJournal>,
    /// Identities with a log-bake currently pending.
    in_flight: DashMap<String, ()>,
}

impl BakeOrchestrator {
    pub fn new(
        experience: Arc<ExperienceLedger>,
        pods: Arc<PodLedger>,
        milestones: Arc<MilestoneLedger>,
        journal: Arc<BakeJournal>,
    ) -> Self {
        Self {
            experience,
            pods,
            milestones,
            journal,
            in_flight: DashMap::new(),
        }
    }

    /// Log a bake for an identity.
    ///
    /// The mandatory experience write is serialized per identity: a second
    /// call while one is pending fails with `BakeInFlight` instead of
    /// submitting a duplicate during the latency window.
    pub async fn log_bake(&self, request: LogBakeRequest) -> Result<LogBakeOutcome, OrchestratorError> {
        let identity = request.identity.clone();
        let _guard = self.claim(&identity)?;

        let now_ts = request.timestamp.unwrap_or_else(|| Utc::now().timestamp());
        let now = Utc
            .timestamp_opt(now_ts, 0)
            .single()
            .unwrap_or_else(Utc::now);

        // Precondition: one counted bake per calendar day.
        let record = self
            .experience
            .snapshot(&identity)
            .await
            .ok_or(OrchestratorError::LedgerUnavailable)?;
        if progression::has_baked_today(record.last_bake_timestamp, now) {
            debug!(identity = %identity, "bake already logged today");
            return Ok(LogBakeOutcome::AlreadyBakedToday);
        }

        // Mandatory write. Failure aborts the whole operation; nothing
        // below runs and the journal is untouched.
        self.experience
            .log_bake(&identity, now_ts)
            .await
            .map_err(OrchestratorError::MandatoryWrite)?;
        self.experience
            .add_xp(&identity, XP_PER_BAKE)
            .await
            .map_err(OrchestratorError::MandatoryWrite)?;
        info!(identity = %identity, xp = XP_PER_BAKE, "bake recorded on experience ledger");

        let mut reward_warnings = Vec::new();

        // Best-effort pod credit.
        if let Some(pod_id) = request.pod_id {
            if let Err(e) = self.pods.log_pod_bake(pod_id).await {
                warn!(identity = %identity, pod_id = pod_id, error = %e, "pod bake credit failed");
                reward_warnings.push(format!("pod {pod_id} credit failed: {e}"));
            }
        }

        // Best-effort milestone check; the ledger's own idempotency guard
        // makes re-running this later safe.
        if let Err(e) = self.milestones.check_and_mint_eligible(&identity).await {
            warn!(identity = %identity, error = %e, "milestone check failed");
            reward_warnings.push(format!("milestone check failed: {e}"));
        }

        let entry = BakeLogEntry {
            id: format!("bake-{}", Uuid::new_v4()),
            timestamp: now_ts,
            description: request.description,
            media_ref: request.media_ref,
            xp_earned: XP_PER_BAKE,
            tags: request.tags,
        };
        self.journal.append(&identity, entry.clone()).await?;

        let snapshot = self.refresh(&identity).await;
        if snapshot.is_none() {
            reward_warnings.push("progress refresh unavailable; showing cached state".to_string());
        }

        Ok(LogBakeOutcome::Logged(Box::new(LoggedBake {
            entry,
            snapshot,
            reward_warnings,
        })))
    }

    /// Re-read all three ledgers concurrently and derive display metrics.
    ///
    /// Also reconciles the journal's minted-milestone flags against what
    /// the milestone ledger reports.
    pub async fn refresh(&self, identity: &Identity) -> Option<ProgressSnapshot> {
        let (record, milestones, pod_ids) = tokio::join!(
            self.experience.snapshot(identity),
            self.milestones.user_milestones(identity),
            self.pods.user_pods(identity),
        );

        let record = record?;
        let milestones = milestones.unwrap_or_default();
        let pod_ids = pod_ids.unwrap_or_default();

        let minted_ids: Vec<u32> = milestones.iter().map(|m| m.definition_id).collect();
        if let Err(e) = self.journal.record_milestones(identity, &minted_ids).await {
            warn!(identity = %identity, error = %e, "milestone flag reconciliation failed");
        }

        Some(ProgressSnapshot {
            progression: progression::derive(&record),
            record,
            milestones,
            pod_ids,
        })
    }

    /// Combined stats across both ledgers, including pod creation counts,
    /// for previewing pod-dependent milestone rules.
    pub async fn combined_stats(&self, identity: &Identity) -> Option<StatSnapshot> {
        let snapshot = self.refresh(identity).await?;
        let mut stats = snapshot.stats();

        let mut created = 0u32;
        for pod_id in &snapshot.pod_ids {
            match self.pods.pod(*pod_id).await {
                Some(pod) if &pod.creator == identity => created += 1,
                Some(_) => {}
                // An unreadable pod leaves the creation count unknown
                // rather than undercounted.
                None => return Some(stats),
            }
        }
        stats.pods_created = Some(created);
        Some(stats)
    }

    /// Definition ids the identity would currently qualify for, as a
    /// client-side preview. The ledger remains the minting authority.
    pub async fn preview_qualifying(&self, identity: &Identity) -> Option<Vec<u32>> {
        let stats = self.combined_stats(identity).await?;
        Some(catalog::qualifying_ids(&stats))
    }

    fn claim(&self, identity: &Identity) -> Result<InFlightGuard<'_>, OrchestratorError> {
        use dashmap::mapref::entry::Entry;
        match self.in_flight.entry(identity.as_str().to_string()) {
            Entry::Occupied(_) => Err(OrchestratorError::BakeInFlight(identity.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(InFlightGuard {
                    map: &self.in_flight,
                    key: identity.as_str().to_string(),
                })
            }
        }
    }
}

/// Releases the per-identity claim when the operation ends, however it ends.
struct InFlightGuard<'a> {
    map: &'a DashMap<String, ()>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}
