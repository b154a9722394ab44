//! Domain records shared across the ledger clients, cache and orchestrator.
//!
//! Field sets mirror the on-chain contract views; everything here is data,
//! behavior lives in the owning modules.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Address-like opaque key identifying a user.
///
/// Validated once at construction; a malformed address is a programmer
/// error, not a transient fault, so it surfaces immediately instead of
/// being retried downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Parse and validate an address string.
    pub fn parse(addr: &str) -> Result<Self, LedgerError> {
        let body = addr
            .strip_prefix("0x")
            .ok_or_else(|| LedgerError::MalformedAddress(addr.to_string()))?;
        if body.is_empty() || body.len() > 64 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LedgerError::MalformedAddress(addr.to_string()));
        }
        Ok(Self(addr.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate counters owned by the experience ledger.
///
/// `level`, `title` and garden stage are never stored; they are derived on
/// demand by [`crate::progression`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub xp: u64,
    pub streak: u32,
    /// Unix seconds of the most recent bake, if any.
    pub last_bake_timestamp: Option<i64>,
    pub total_bakes: u64,
}

impl ExperienceRecord {
    /// Timestamp of the most recent bake as a UTC datetime.
    pub fn last_bake(&self) -> Option<DateTime<Utc>> {
        self.last_bake_timestamp
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }
}

/// A group challenge pod as stored by the pod ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub id: u64,
    pub name: String,
    pub creator: Identity,
    pub member_limit: u32,
    pub target_streak: u32,
    pub current_streak: u32,
    pub created_at: i64,
    pub is_active: bool,
}

/// Aggregate pod statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodStats {
    pub total_bakes: u64,
    pub member_count: u32,
    pub daily_bakes_today: u32,
    pub current_streak: u32,
    pub target_streak: u32,
    pub is_active: bool,
}

/// A minted milestone NFT for one (identity, definition) pair.
///
/// The milestone ledger guarantees at most one of these per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMilestone {
    pub definition_id: u32,
    pub token_id: String,
    /// Unix seconds at mint time.
    pub minted_at: i64,
}

/// A locally cached bake log entry.
///
/// The ledger stores only aggregate counters; the detailed log is a client
/// convenience kept in the journal, never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BakeLogEntry {
    pub id: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub description: String,
    pub media_ref: Option<String>,
    pub xp_earned: u64,
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_accepts_hex_addresses() {
        let id = Identity::parse("0x734352FE863098a0813160c9cf255e0b6312a8417c3a68003c05b30ff687e73")
            .unwrap();
        assert!(id.as_str().starts_with("0x734352fe"));
    }

    #[test]
    fn identity_rejects_malformed_addresses() {
        assert!(Identity::parse("734352fe").is_err());
        assert!(Identity::parse("0x").is_err());
        assert!(Identity::parse("0xnot-hex").is_err());
    }

    #[test]
    fn last_bake_converts_unix_seconds() {
        let record = ExperienceRecord {
            last_bake_timestamp: Some(1_700_000_000),
            ..Default::default()
        };
        assert_eq!(record.last_bake().unwrap().timestamp(), 1_700_000_000);

        let empty = ExperienceRecord::default();
        assert!(empty.last_bake().is_none());
    }
}
