//! Health-factor and liquidation arithmetic
//!
//! ```text
//! collateral value = collateral * price
//! max borrow       = value * ltv / 100
//! health factor    = value * threshold / (debt * 100)     (debt 0 -> MAX)
//! seized           = repay * (100 + bonus) / 100 / price   (capped at collateral)
//! ```
//!
//! All functions are pure and use checked arithmetic.

use aegis_common::{AegisError, Result};
use rust_decimal::Decimal;

#[inline]
fn overflow() -> AegisError {
    AegisError::Overflow
}

/// Value of `collateral` in debt units
pub fn collateral_value(collateral: Decimal, price: Decimal) -> Result<Decimal> {
    collateral.checked_mul(price).ok_or_else(overflow)
}

/// Largest debt the collateral value supports at `ltv_percent`
pub fn max_borrow(value: Decimal, ltv_percent: u8) -> Result<Decimal> {
    value
        .checked_mul(Decimal::from(ltv_percent))
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(overflow)
}

/// Health factor of a position; `Decimal::MAX` when there is no debt
pub fn health_factor(value: Decimal, threshold_percent: u8, debt: Decimal) -> Result<Decimal> {
    if debt <= Decimal::ZERO {
        return Ok(Decimal::MAX);
    }
    let weighted = value
        .checked_mul(Decimal::from(threshold_percent))
        .ok_or_else(overflow)?;
    let scaled_debt = debt.checked_mul(Decimal::ONE_HUNDRED).ok_or_else(overflow)?;
    weighted.checked_div(scaled_debt).ok_or_else(overflow)
}

/// `value * threshold < debt * 100`, i.e. health factor below 1, evaluated
/// without division
pub fn is_underwater(value: Decimal, threshold_percent: u8, debt: Decimal) -> Result<bool> {
    let weighted = value
        .checked_mul(Decimal::from(threshold_percent))
        .ok_or_else(overflow)?;
    let scaled_debt = debt.checked_mul(Decimal::ONE_HUNDRED).ok_or_else(overflow)?;
    Ok(weighted < scaled_debt)
}

/// Collateral owed to a liquidator repaying `repay`, before capping
pub fn seize_amount(repay: Decimal, bonus_percent: u8, price: Decimal) -> Result<Decimal> {
    if price <= Decimal::ZERO {
        return Err(AegisError::Oracle(format!("non-positive price {}", price)));
    }
    repay
        .checked_mul(Decimal::ONE_HUNDRED + Decimal::from(bonus_percent))
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .and_then(|v| v.checked_div(price))
        .ok_or_else(overflow)
}

/// Price at which the health factor reaches exactly 1
pub fn liquidation_price(collateral: Decimal, threshold_percent: u8, debt: Decimal) -> Option<Decimal> {
    if debt <= Decimal::ZERO || collateral <= Decimal::ZERO || threshold_percent == 0 {
        return None;
    }
    debt.checked_mul(Decimal::ONE_HUNDRED)?
        .checked_div(collateral.checked_mul(Decimal::from(threshold_percent))?)
}

/// `borrowed / liquidity`; `None` once liquidity is exhausted while debt
/// is outstanding
pub fn utilization(borrowed: Decimal, liquidity: Decimal) -> Option<Decimal> {
    if borrowed <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    if liquidity <= Decimal::ZERO {
        return None;
    }
    borrowed.checked_div(liquidity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_max_borrow() {
        // 10 ETH at 2500 with 75% LTV
        let value = collateral_value(dec!(10), dec!(2500)).unwrap();
        assert_eq!(max_borrow(value, 75).unwrap(), dec!(18750));
    }

    #[test]
    fn test_health_factor() {
        assert_eq!(health_factor(dec!(1000), 80, dec!(800)).unwrap(), dec!(1));
        assert_eq!(health_factor(dec!(20000), 75, dec!(18000)).unwrap().round_dp(4), dec!(0.8333));
        assert_eq!(health_factor(dec!(1000), 75, Decimal::ZERO).unwrap(), Decimal::MAX);
    }

    #[test]
    fn test_underwater_matches_health_factor() {
        assert!(is_underwater(dec!(1000), 75, dec!(800)).unwrap());
        assert!(!is_underwater(dec!(1000), 80, dec!(750)).unwrap());
        assert!(is_underwater(dec!(1000), 80, dec!(850)).unwrap());
        // Exactly 1.0 is solvent
        assert!(!is_underwater(dec!(1000), 80, dec!(800)).unwrap());
    }

    #[test]
    fn test_seize_amount() {
        assert_eq!(seize_amount(dec!(18000), 10, dec!(2000)).unwrap(), dec!(9.9));
        assert!(seize_amount(dec!(1), 10, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_liquidation_price() {
        assert_eq!(liquidation_price(dec!(10), 75, dec!(18000)), Some(dec!(2400)));
        assert_eq!(liquidation_price(dec!(10), 75, Decimal::ZERO), None);
    }

    #[test]
    fn test_utilization() {
        assert_eq!(utilization(dec!(18000), dec!(10000)), Some(dec!(1.8)));
        assert_eq!(utilization(Decimal::ZERO, Decimal::ZERO), Some(Decimal::ZERO));
        assert_eq!(utilization(dec!(1), Decimal::ZERO), None);
    }
}
