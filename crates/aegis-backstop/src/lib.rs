//! # Aegis Backstop
//!
//! Liquidity buffer that takes over insolvent positions without dumping
//! collateral on the open market.
//!
//! ## Lifecycle
//!
//! ```text
//! HEALTHY -> PROBATION_PENDING -> ABSORBED | ROUTED_EXTERNAL
//! ```
//!
//! Badges without a grace period skip `PROBATION_PENDING`. When the reserve
//! covers the debt the position is absorbed (buffered rescue); otherwise
//! one order is placed on the external dark-pool venue and the reserve is
//! left untouched.
//!
//! Amounts are in debt-asset units. A processed position stays terminal until
//! the coordinator reopens the account for a new one.

pub mod pool;
pub mod routing;
pub mod venue;

pub use pool::{AbsorptionOutcome, BackstopPool, BackstopSnapshot, BackstopStats, ProcessedPosition};
pub use routing::{select_branch, Branch};
pub use venue::{DarkPoolVenue, RecordingVenue, VenueOrder};

use aegis_common::{AccountId, AssetId};

/// Backstop configuration
#[derive(Debug, Clone)]
pub struct BackstopConfig {
    /// May replace the coordinator
    pub admin: AccountId,
    /// Only caller allowed to absorb positions
    pub coordinator: AccountId,
    /// Asset sold on the dark pool
    pub collateral_asset: AssetId,
}

impl Default for BackstopConfig {
    fn default() -> Self {
        Self {
            admin: AccountId::from("admin"),
            coordinator: AccountId::from("aegis-core"),
            collateral_asset: AssetId::from("WETH"),
        }
    }
}
