//! Account position - collateral and debt held by one borrower
//!
//! Positions are created implicitly on first deposit and never destroyed;
//! a zeroed position is equivalent to absence. Both balances stay
//! non-negative: every mutator validates before touching state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AegisError, Result};

/// Collateral (in collateral-asset units) and debt (in debt-asset units)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPosition {
    pub collateral: Decimal,
    pub debt: Decimal,
}

impl AccountPosition {
    pub fn new(collateral: Decimal, debt: Decimal) -> Self {
        Self { collateral, debt }
    }

    /// True when the position carries nothing
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.collateral.is_zero() && self.debt.is_zero()
    }

    #[inline]
    pub fn has_debt(&self) -> bool {
        self.debt > Decimal::ZERO
    }

    /// Add collateral
    pub fn deposit(&mut self, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        self.collateral = self.collateral.checked_add(amount).ok_or(AegisError::Overflow)?;
        Ok(())
    }

    /// Remove collateral. Health checks are the caller's job.
    pub fn withdraw(&mut self, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        if amount > self.collateral {
            return Err(AegisError::InsufficientCollateral {
                requested: amount,
                max_borrow: self.collateral,
            });
        }
        self.collateral -= amount;
        Ok(())
    }

    /// Add debt
    pub fn borrow(&mut self, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        self.debt = self.debt.checked_add(amount).ok_or(AegisError::Overflow)?;
        Ok(())
    }

    /// Reduce debt by exactly `amount`; repaying more than owed is refused
    pub fn repay(&mut self, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        if amount > self.debt {
            return Err(AegisError::OverRepay {
                amount,
                debt: self.debt,
            });
        }
        self.debt -= amount;
        Ok(())
    }
}

impl std::fmt::Display for AccountPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Position(collateral={}, debt={})", self.collateral, self.debt)
    }
}

/// Liquidation lifecycle of a position as seen by the backstop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Healthy,
    ProbationPending,
    Absorbed,
    RoutedExternal,
}

impl PositionStatus {
    /// Absorbed and routed positions are never processed again
    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionStatus::Absorbed | PositionStatus::RoutedExternal)
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionStatus::Healthy => write!(f, "HEALTHY"),
            PositionStatus::ProbationPending => write!(f, "PROBATION_PENDING"),
            PositionStatus::Absorbed => write!(f, "ABSORBED"),
            PositionStatus::RoutedExternal => write!(f, "ROUTED_EXTERNAL"),
        }
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(AegisError::InvalidAmount);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_position_is_empty() {
        let position = AccountPosition::default();
        assert!(position.is_empty());
        assert!(!position.has_debt());
    }

    #[test]
    fn test_deposit_withdraw() {
        let mut position = AccountPosition::default();
        position.deposit(dec!(10)).unwrap();
        position.withdraw(dec!(4)).unwrap();
        assert_eq!(position.collateral, dec!(6));

        let result = position.withdraw(dec!(7));
        assert!(matches!(result, Err(AegisError::InsufficientCollateral { .. })));
        assert_eq!(position.collateral, dec!(6));
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let mut position = AccountPosition::default();
        assert_eq!(position.deposit(Decimal::ZERO), Err(AegisError::InvalidAmount));
        assert_eq!(position.borrow(dec!(-1)), Err(AegisError::InvalidAmount));
    }

    #[test]
    fn test_over_repay_refused() {
        let mut position = AccountPosition::new(dec!(10), dec!(100));
        let result = position.repay(dec!(150));
        assert!(matches!(result, Err(AegisError::OverRepay { .. })));
        assert_eq!(position.debt, dec!(100));

        position.repay(dec!(100)).unwrap();
        assert!(!position.has_debt());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PositionStatus::Absorbed.is_terminal());
        assert!(PositionStatus::RoutedExternal.is_terminal());
        assert!(!PositionStatus::ProbationPending.is_terminal());
    }
}
