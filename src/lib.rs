//! BakeXP progression engine
//!
//! Synchronizes a baker's gamified progress (XP, daily streak, milestone
//! NFTs, group pods) across three independent on-chain ledgers and derives
//! the display metrics the rest of the app renders.
//!
//! ## Services
//!
//! - **Ledger clients**: retrying reads and single-shot writes against the
//!   experience, pod and milestone contracts
//! - **Session**: binds or clears the active signer across all clients
//! - **Progression**: pure derivation of level, title and garden stage
//! - **Catalog**: declarative milestone definitions and qualifying rules
//! - **Orchestrator**: the multi-ledger log-bake operation
//! - **Journal**: per-identity local cache of bake history and minted flags

pub mod cache;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod countdown;
pub mod error;
pub mod gateway;
pub mod ledgers;
pub mod orchestrator;
pub mod progression;
pub mod retry;
pub mod session;
pub mod signer;
pub mod types;

pub use config::LedgerConfig;
pub use error::{GatewayError, LedgerError, OrchestratorError, Result, StoreError};
pub use orchestrator::{BakeOrchestrator, LogBakeOutcome};
pub use session::SessionBinder;
pub use types::Identity;
