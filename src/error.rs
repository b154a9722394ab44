//! Error types for the progression engine.

use thiserror::Error;

pub type Result<T, E = OrchestratorError> = std::result::Result<T, E>;

/// Failures at the raw contract boundary.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Network/RPC-level failure. Treated as transient by the read path.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote contract rejected the call; carries the raw message.
    #[error("contract rejected: {0}")]
    Rejected(String),

    /// The endpoint answered with something the codec cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Failures surfaced by the ledger client layer.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Write attempted with no bound signer. Fatal to the call; resolved
    /// only by reconnecting.
    #[error("no signer bound to ledger client")]
    SignerMissing,

    /// Remote write rejection that is not a recognized idempotent case.
    #[error("contract rejected write: {0}")]
    Rejected(String),

    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Failures in the local reconciliation cache.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the log-bake operation as seen by its caller.
///
/// `AlreadyBakedToday` is deliberately *not* here: it is a normal business
/// outcome and lives on [`crate::orchestrator::LogBakeOutcome`].
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// A log-bake for this identity is already pending; the mandatory write
    /// path is serialized per identity on the client side.
    #[error("a bake log is already in flight for {0}")]
    BakeInFlight(String),

    /// The mandatory experience-ledger write failed. Nothing downstream ran.
    #[error("mandatory ledger write failed: {0}")]
    MandatoryWrite(#[source] LedgerError),

    /// The experience snapshot needed for the precondition check could not
    /// be read even after retries.
    #[error("experience ledger unreachable")]
    LedgerUnavailable,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
