//! # Aegis Lending
//!
//! Single-pool lending market with a circuit-breaker gated borrow path and
//! reputation-gated liquidation.
//!
//! ## Health Factor
//!
//! ```text
//! HF = collateral * price * liquidationThreshold / (debt * 100)
//! ```
//!
//! A position with HF < 1 may be liquidated. Liquidators repay debt and
//! receive collateral worth the repaid amount plus the badge's bonus.
//!
//! ## Borrowing
//!
//! Borrowing requires the global risk state to be NORMAL and keeps
//! `debt <= collateral value * ltv / 100`.

pub mod health;
pub mod market;
pub mod oracle;

pub use market::{LendingMarket, LiquidationReceipt, MarketSnapshot, PoolStats, PositionSummary};
pub use oracle::{PriceOracle, StaticPriceOracle};

use aegis_common::AssetId;
use rust_decimal::Decimal;

/// Lending market configuration
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Asset deposited as collateral
    pub collateral_asset: AssetId,
    /// Asset lent out and repaid
    pub debt_asset: AssetId,
    /// Maximum `totalBorrowed / totalLiquidity` an LP withdrawal may leave
    pub utilization_ceiling: Decimal,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            collateral_asset: AssetId::from("WETH"),
            debt_asset: AssetId::from("USDC"),
            utilization_ceiling: Decimal::new(90, 2),
        }
    }
}
