//! Local reconciliation cache.
//!
//! Per-identity record of bake history and locally-known minted-milestone
//! ids. A fast, offline-capable supplement to ledger truth; never the
//! source of truth for ledger-owned counters. Backed by an injected
//! [`ActivityStore`] so the journal never reaches for ambient storage.

mod memory;
mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreError;
use crate::types::{BakeLogEntry, Identity};

/// Raw key-value persistence, namespaced by identity at the journal layer.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Append-only per-identity bake journal plus minted-milestone flags.
///
/// Writers for one identity must be serialized by the caller; the
/// orchestrator's in-flight guard provides that.
pub struct BakeJournal {
    store: Arc<dyn ActivityStore>,
}

impl BakeJournal {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    fn history_key(id: &Identity) -> String {
        format!("history/{id}")
    }

    fn milestones_key(id: &Identity) -> String {
        format!("milestones/{id}")
    }

    /// Prepend a new entry to the identity's history.
    pub async fn append(&self, id: &Identity, entry: BakeLogEntry) -> Result<(), StoreError> {
        let key = Self::history_key(id);
        let mut entries = self.load_history(&key).await?;
        entries.insert(0, entry);
        self.store.put(&key, &serde_json::to_string(&entries)?).await?;
        debug!(identity = %id, entries = entries.len(), "journal entry appended");
        Ok(())
    }

    /// Newest-first history, optionally bounded for display.
    pub async fn history(
        &self,
        id: &Identity,
        limit: Option<usize>,
    ) -> Result<Vec<BakeLogEntry>, StoreError> {
        let mut entries = self.load_history(&Self::history_key(id)).await?;
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    async fn load_history(&self, key: &str) -> Result<Vec<BakeLogEntry>, StoreError> {
        match self.store.get(key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Milestone definition ids this client has seen minted for the identity.
    pub async fn known_milestones(&self, id: &Identity) -> Result<Vec<u32>, StoreError> {
        match self.store.get(&Self::milestones_key(id)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Merge freshly observed minted ids into the local flags.
    ///
    /// Reconciliation is additive: ids only ever accumulate, matching the
    /// append-only ledger they mirror.
    pub async fn record_milestones(&self, id: &Identity, minted: &[u32]) -> Result<(), StoreError> {
        let mut known = self.known_milestones(id).await?;
        let mut changed = false;
        for definition_id in minted {
            if !known.contains(definition_id) {
                known.push(*definition_id);
                changed = true;
            }
        }
        if changed {
            known.sort_unstable();
            self.store
                .put(&Self::milestones_key(id), &serde_json::to_string(&known)?)
                .await?;
            debug!(identity = %id, known = known.len(), "milestone flags reconciled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, timestamp: i64) -> BakeLogEntry {
        BakeLogEntry {
            id: id.to_string(),
            timestamp,
            description: "country loaf".to_string(),
            media_ref: None,
            xp_earned: 25,
            tags: vec!["sourdough".to_string()],
        }
    }

    #[tokio::test]
    async fn history_is_newest_first_and_bounded() {
        let journal = BakeJournal::new(Arc::new(MemoryStore::new()));
        let id = Identity::parse("0xabc").unwrap();

        for (n, ts) in [(1, 100), (2, 200), (3, 300)] {
            journal.append(&id, entry(&format!("bake-{n}"), ts)).await.unwrap();
        }

        let all = journal.history(&id, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "bake-3");
        assert_eq!(all[2].id, "bake-1");

        let bounded = journal.history(&id, Some(2)).await.unwrap();
        assert_eq!(bounded.len(), 2);
        assert_eq!(bounded[0].id, "bake-3");
    }

    #[tokio::test]
    async fn histories_are_isolated_per_identity() {
        let journal = BakeJournal::new(Arc::new(MemoryStore::new()));
        let alice = Identity::parse("0xa11ce").unwrap();
        let bob = Identity::parse("0xb0b").unwrap();

        journal.append(&alice, entry("bake-a", 100)).await.unwrap();

        assert_eq!(journal.history(&alice, None).await.unwrap().len(), 1);
        assert!(journal.history(&bob, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn milestone_flags_accumulate_without_duplicates() {
        let journal = BakeJournal::new(Arc::new(MemoryStore::new()));
        let id = Identity::parse("0xabc").unwrap();

        journal.record_milestones(&id, &[2, 1]).await.unwrap();
        journal.record_milestones(&id, &[1, 3]).await.unwrap();

        assert_eq!(journal.known_milestones(&id).await.unwrap(), vec![1, 2, 3]);
    }
}
