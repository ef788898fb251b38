//! # Aegis Identity
//!
//! Reputation lookups and the probation timers they gate.
//!
//! ## Risk-Parameter Table
//!
//! ```text
//! account -> badge -> { ltv %, liquidation bonus %, grace period }
//! ```
//!
//! Unknown accounts resolve to the DEFAULT badge. Lookups never fail.
//!
//! ## Probation
//!
//! Accounts whose badge carries a grace period cannot be liquidated or
//! absorbed the first time they fail a health check. A probation record is
//! opened instead, and the position becomes eligible once the grace period
//! has elapsed. One [`ProbationLedger`] is shared by the lending market and
//! the backstop so both paths see the same timers.

pub mod probation;
pub mod registry;

pub use probation::{GraceStatus, ProbationLedger, ProbationRecord};
pub use registry::{IdentityOracle, IdentityRegistry};

/// Identity configuration
#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    /// Badge assignments known at start-up
    pub assignments: Vec<(aegis_common::AccountId, aegis_common::Badge)>,
    /// Per-badge parameter overrides (e.g. a different CLEAN_SHEET bonus)
    pub overrides: Vec<(aegis_common::Badge, aegis_common::RiskParameters)>,
}
