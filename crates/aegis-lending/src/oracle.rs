//! Price source for collateral valuation

use std::collections::HashMap;
use std::sync::Arc;

use aegis_common::{AegisError, AssetId, Result};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::info;

/// Price of an asset in debt-asset units
#[cfg_attr(test, mockall::automock)]
pub trait PriceOracle: Send + Sync {
    fn price_of(&self, asset: &AssetId) -> Result<Decimal>;
}

impl<T: PriceOracle + ?Sized> PriceOracle for Arc<T> {
    fn price_of(&self, asset: &AssetId) -> Result<Decimal> {
        (**self).price_of(asset)
    }
}

/// Manually fed prices
#[derive(Debug, Default)]
pub struct StaticPriceOracle {
    prices: RwLock<HashMap<AssetId, Decimal>>,
}

impl StaticPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(asset: AssetId, price: Decimal) -> Result<Self> {
        let oracle = Self::new();
        oracle.set_price(asset, price)?;
        Ok(oracle)
    }

    /// Publish a new price; it must be positive
    pub fn set_price(&self, asset: AssetId, price: Decimal) -> Result<()> {
        if price <= Decimal::ZERO {
            return Err(AegisError::Oracle(format!("price for {} must be positive, got {}", asset, price)));
        }
        info!(asset = %asset, price = %price, "Price updated");
        self.prices.write().insert(asset, price);
        Ok(())
    }
}

impl PriceOracle for StaticPriceOracle {
    fn price_of(&self, asset: &AssetId) -> Result<Decimal> {
        self.prices
            .read()
            .get(asset)
            .copied()
            .ok_or_else(|| AegisError::Oracle(format!("no price for {}", asset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_set_and_read_price() {
        let oracle = StaticPriceOracle::with_price(AssetId::from("WETH"), dec!(2500)).unwrap();
        assert_eq!(oracle.price_of(&AssetId::from("WETH")).unwrap(), dec!(2500));

        oracle.set_price(AssetId::from("WETH"), dec!(2000)).unwrap();
        assert_eq!(oracle.price_of(&AssetId::from("WETH")).unwrap(), dec!(2000));
    }

    #[test]
    fn test_rejects_bad_prices() {
        let oracle = StaticPriceOracle::new();
        assert!(oracle.set_price(AssetId::from("WETH"), Decimal::ZERO).is_err());
        assert!(matches!(
            oracle.price_of(&AssetId::from("WBTC")),
            Err(AegisError::Oracle(_))
        ));
    }
}
