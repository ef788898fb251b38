//! # Aegis Sentinel
//!
//! Global risk circuit breaker.
//!
//! ## Transitions
//!
//! ```text
//!            proposeState(proof)
//! NORMAL <-----------------------> ELEVATED <-----> CRITICAL
//!    ^                                                 |
//!    +-------------------------------------------------+
//! ```
//!
//! Any state is reachable from any state, but only through the registered
//! sentinel and a proof accepted by the injected [`ProofVerifier`]. There
//! are no timeouts and no automatic transitions. The state record is
//! written through a [`StateStore`] before it becomes visible, so it
//! survives restarts.
//!
//! Borrowing in the lending market is only allowed while the state is
//! NORMAL.

pub mod machine;
pub mod store;
pub mod verifier;

pub use machine::RiskStateMachine;
pub use store::{JsonFileStateStore, MemoryStateStore, StateStore};
pub use verifier::{AcceptAllVerifier, CommitmentVerifier, ProofVerifier};

use aegis_common::AccountId;

/// Sentinel configuration
#[derive(Debug, Clone)]
pub struct SentinelConfig {
    /// Only account allowed to propose transitions
    pub sentinel: AccountId,
    /// Account allowed to rotate the sentinel
    pub governor: AccountId,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            sentinel: AccountId::from("sentinel"),
            governor: AccountId::from("governor"),
        }
    }
}
