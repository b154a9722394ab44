//! Sled-backed activity store.
//!
//! Durable local persistence for the journal, one database per profile
//! directory. Values are the journal's JSON strings, keys its namespaced
//! paths.

use std::path::Path;

use async_trait::async_trait;
use sled::Db;
use tracing::info;

use super::ActivityStore;
use crate::error::StoreError;

pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened activity store");
        Ok(Self { db })
    }
}

#[async_trait]
impl ActivityStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.db.get(key.as_bytes())? {
            Some(value) => Ok(Some(String::from_utf8_lossy(&value).into_owned())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }
}
