//! # Aegis Node
//!
//! Coordinator and service binary for the Aegis risk engine.
//!
//! ## Architecture
//!
//! ```text
//!   risk signal ──> RiskStateMachine ──(NORMAL gate)──> LendingMarket
//!                                                          │
//!                         IdentityRegistry ◄───────────────┤
//!                         ProbationLedger  ◄───────────────┤
//!                                                          │
//!                AegisCore ── rescue_position ──> BackstopPool
//!                                                   │
//!                                    reserve ◄──────┴──────> dark-pool venue
//! ```
//!
//! [`AegisCore`] owns the only cross-component flows (state proposals and
//! rescues) and serializes them. The HTTP surface in [`api`] is read-only.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod snapshot;

pub use config::AegisConfig;
pub use coordinator::{AegisCore, CoreDeps, RescueOutcome};
pub use snapshot::EngineSnapshot;

/// Node version
pub const NODE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8090;
