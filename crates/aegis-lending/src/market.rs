//! Lending market
//!
//! One collateral asset, one debt asset, one pool. Every mutating entry
//! point takes the market write lock once, validates, then applies; a
//! rejected call leaves the market untouched. The single exception is a
//! liquidation attempt that opens a probation record.

use std::collections::HashMap;
use std::sync::Arc;

use aegis_common::{
    AccountId, AccountPosition, AegisError, Badge, Clock, Result, RiskParameters, RiskStateSource,
};
use aegis_identity::{GraceStatus, IdentityOracle, ProbationLedger};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::health;
use crate::oracle::PriceOracle;
use crate::MarketConfig;

/// Result of a completed liquidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationReceipt {
    pub account: AccountId,
    pub liquidator: AccountId,
    /// Debt actually repaid (capped at the outstanding debt)
    pub repaid: Decimal,
    /// Collateral transferred to the liquidator
    pub seized: Decimal,
    /// Leftover collateral returned to the owner once debt is cleared
    pub refunded: Decimal,
    /// Position after liquidation
    pub remaining: AccountPosition,
}

/// Read-only view of a position for presentation layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub account: AccountId,
    pub badge: Badge,
    pub collateral: Decimal,
    pub collateral_value: Decimal,
    pub debt: Decimal,
    pub available_borrows: Decimal,
    pub ltv_percent: u8,
    pub liquidation_threshold_percent: u8,
    pub health_factor: Decimal,
    /// Collateral price at which the health factor reaches 1
    pub liquidation_price: Option<Decimal>,
}

/// Pool totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_liquidity: Decimal,
    pub total_borrowed: Decimal,
    pub available_liquidity: Decimal,
    /// `None` when liquidity is exhausted while debt is outstanding
    pub utilization: Option<Decimal>,
}

/// Persisted market state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub positions: HashMap<AccountId, AccountPosition>,
    pub lp_balances: HashMap<AccountId, Decimal>,
    pub total_liquidity: Decimal,
    pub total_borrowed: Decimal,
}

#[derive(Debug, Default)]
struct MarketState {
    positions: HashMap<AccountId, AccountPosition>,
    lp_balances: HashMap<AccountId, Decimal>,
    total_liquidity: Decimal,
    total_borrowed: Decimal,
}

impl MarketState {
    fn position(&self, account: &AccountId) -> AccountPosition {
        self.positions.get(account).copied().unwrap_or_default()
    }

    /// Zeroed positions are dropped
    fn put_position(&mut self, account: &AccountId, position: AccountPosition) {
        if position.is_empty() {
            self.positions.remove(account);
        } else {
            self.positions.insert(account.clone(), position);
        }
    }

    fn available_liquidity(&self) -> Decimal {
        (self.total_liquidity - self.total_borrowed).max(Decimal::ZERO)
    }
}

/// Lending market with reputation-gated liquidation
pub struct LendingMarket {
    config: MarketConfig,
    state: RwLock<MarketState>,
    identity: Arc<dyn IdentityOracle>,
    prices: Arc<dyn PriceOracle>,
    risk: Arc<dyn RiskStateSource>,
    probation: Arc<ProbationLedger>,
    clock: Arc<dyn Clock>,
}

impl LendingMarket {
    pub fn new(
        config: MarketConfig,
        identity: Arc<dyn IdentityOracle>,
        prices: Arc<dyn PriceOracle>,
        risk: Arc<dyn RiskStateSource>,
        probation: Arc<ProbationLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            state: RwLock::new(MarketState::default()),
            identity,
            prices,
            risk,
            probation,
            clock,
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    fn collateral_price(&self) -> Result<Decimal> {
        self.prices.price_of(&self.config.collateral_asset)
    }

    // ============ COLLATERAL ============

    /// Add collateral; creates the position on first deposit
    pub fn deposit_collateral(&self, account: &AccountId, amount: Decimal) -> Result<AccountPosition> {
        let mut state = self.state.write();
        let mut position = state.position(account);
        position.deposit(amount)?;
        state.put_position(account, position);

        info!(account = %account, amount = %amount, collateral = %position.collateral, "Collateral deposited");
        Ok(position)
    }

    /// Remove collateral without dropping the health factor below 1
    pub fn withdraw_collateral(&self, account: &AccountId, amount: Decimal) -> Result<AccountPosition> {
        let mut state = self.state.write();
        let mut position = state.position(account);
        position.withdraw(amount)?;

        if position.has_debt() {
            let params = self.identity.risk_parameters_of(account);
            let value = health::collateral_value(position.collateral, self.collateral_price()?)?;
            let hf = health::health_factor(value, params.liquidation_threshold_percent(), position.debt)?;
            if hf < aegis_common::MIN_HEALTH_FACTOR {
                debug!(account = %account, health_factor = %hf, "Withdrawal rejected");
                return Err(AegisError::HealthFactorViolation { health_factor: hf });
            }
        }

        state.put_position(account, position);
        info!(account = %account, amount = %amount, collateral = %position.collateral, "Collateral withdrawn");
        Ok(position)
    }

    // ============ DEBT ============

    /// Borrow the debt asset. Only allowed while the system is NORMAL.
    pub fn borrow(&self, account: &AccountId, amount: Decimal) -> Result<AccountPosition> {
        if amount <= Decimal::ZERO {
            return Err(AegisError::InvalidAmount);
        }
        let system = self.risk.current_state();
        if !system.is_normal() {
            warn!(account = %account, state = %system, "Borrow blocked by circuit breaker");
            return Err(AegisError::SystemNotNormal { state: system });
        }

        let mut state = self.state.write();
        let mut position = state.position(account);
        let params = self.identity.risk_parameters_of(account);
        let value = health::collateral_value(position.collateral, self.collateral_price()?)?;
        let max_borrow = health::max_borrow(value, params.ltv_percent)?;
        let requested = position.debt.checked_add(amount).ok_or(AegisError::Overflow)?;
        if requested > max_borrow {
            return Err(AegisError::InsufficientCollateral { requested, max_borrow });
        }

        let available = state.available_liquidity();
        if amount > available {
            return Err(AegisError::InsufficientLiquidity {
                required: amount,
                available,
            });
        }

        position.borrow(amount)?;
        state.total_borrowed += amount;
        state.put_position(account, position);

        info!(
            account = %account,
            amount = %amount,
            debt = %position.debt,
            max_borrow = %max_borrow,
            "Borrowed"
        );
        Ok(position)
    }

    /// Repay up to the outstanding debt
    pub fn repay(&self, account: &AccountId, amount: Decimal) -> Result<AccountPosition> {
        let mut state = self.state.write();
        let mut position = state.position(account);
        position.repay(amount)?;
        state.total_borrowed = (state.total_borrowed - amount).max(Decimal::ZERO);
        state.put_position(account, position);

        info!(account = %account, amount = %amount, debt = %position.debt, "Debt repaid");
        Ok(position)
    }

    // ============ LIQUIDITY ============

    pub fn provide_liquidity(&self, lp: &AccountId, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(AegisError::InvalidAmount);
        }
        let mut state = self.state.write();
        state.total_liquidity = state.total_liquidity.checked_add(amount).ok_or(AegisError::Overflow)?;
        let balance = state.lp_balances.entry(lp.clone()).or_insert(Decimal::ZERO);
        *balance += amount;
        let balance = *balance;

        info!(lp = %lp, amount = %amount, total_liquidity = %state.total_liquidity, "Liquidity provided");
        Ok(balance)
    }

    /// Withdraw liquidity unless it would push utilization past the ceiling
    pub fn withdraw_liquidity(&self, lp: &AccountId, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(AegisError::InvalidAmount);
        }
        let mut state = self.state.write();

        let balance = state.lp_balances.get(lp).copied().unwrap_or_default();
        if amount > balance {
            return Err(AegisError::InsufficientLiquidity {
                required: amount,
                available: balance,
            });
        }

        let remaining = state.total_liquidity - amount;
        let ceiling = self.config.utilization_ceiling;
        match health::utilization(state.total_borrowed, remaining) {
            Some(utilization) if utilization <= ceiling => {}
            utilization => {
                let utilization = utilization.unwrap_or(Decimal::MAX);
                debug!(lp = %lp, utilization = %utilization, ceiling = %ceiling, "Liquidity withdrawal rejected");
                return Err(AegisError::UtilizationTooHigh { utilization, ceiling });
            }
        }

        let available = state.available_liquidity();
        if amount > available {
            return Err(AegisError::InsufficientLiquidity {
                required: amount,
                available,
            });
        }

        state.total_liquidity = remaining;
        let balance = balance - amount;
        if balance.is_zero() {
            state.lp_balances.remove(lp);
        } else {
            state.lp_balances.insert(lp.clone(), balance);
        }

        info!(lp = %lp, amount = %amount, total_liquidity = %state.total_liquidity, "Liquidity withdrawn");
        Ok(balance)
    }

    // ============ LIQUIDATION ============

    /// Liquidate an unhealthy position
    ///
    /// Accounts whose badge carries a grace period are first put on
    /// probation: the call fails with `ProbationStarted` but the record is
    /// kept. Later calls fail with `InGracePeriod` until the grace period
    /// has elapsed.
    pub fn liquidate(
        &self,
        liquidator: &AccountId,
        account: &AccountId,
        repay_amount: Decimal,
    ) -> Result<LiquidationReceipt> {
        if repay_amount <= Decimal::ZERO {
            return Err(AegisError::InvalidAmount);
        }
        let mut state = self.state.write();
        let mut position = state.position(account);
        let params = self.identity.risk_parameters_of(account);
        let price = self.collateral_price()?;
        let value = health::collateral_value(position.collateral, price)?;

        if !health::is_underwater(value, params.liquidation_threshold_percent(), position.debt)? {
            return Err(AegisError::PositionSolvent {
                account: account.clone(),
            });
        }

        let now = self.clock.now();
        match self.probation.grace_status(account, &params, now) {
            GraceStatus::NotStarted => {
                let (started_at, _) = self.probation.start(account, now);
                let ends_at = params.grace_deadline(started_at);
                info!(account = %account, liquidator = %liquidator, ends_at, "Liquidation deferred: probation started");
                return Err(AegisError::ProbationStarted {
                    account: account.clone(),
                    ends_at,
                });
            }
            GraceStatus::Pending { ends_at } => {
                return Err(AegisError::InGracePeriod {
                    account: account.clone(),
                    ends_at,
                });
            }
            GraceStatus::NotRequired | GraceStatus::Elapsed { .. } => {}
        }

        let repaid = repay_amount.min(position.debt);
        let seized = health::seize_amount(repaid, params.liquidation_bonus_percent, price)?
            .min(position.collateral);

        position.debt -= repaid;
        position.collateral -= seized;
        let refunded = if position.has_debt() {
            Decimal::ZERO
        } else {
            std::mem::take(&mut position.collateral)
        };

        state.total_borrowed = (state.total_borrowed - repaid).max(Decimal::ZERO);
        state.put_position(account, position);
        self.probation.clear(account);

        info!(
            account = %account,
            liquidator = %liquidator,
            repaid = %repaid,
            seized = %seized,
            refunded = %refunded,
            "Position liquidated"
        );

        Ok(LiquidationReceipt {
            account: account.clone(),
            liquidator: liquidator.clone(),
            repaid,
            seized,
            refunded,
            remaining: position,
        })
    }

    /// Hand a position over to the backstop after absorption or routing.
    /// The position is zeroed and its debt leaves the pool's books.
    pub fn release_to_backstop(&self, account: &AccountId) -> Result<AccountPosition> {
        let mut state = self.state.write();
        let released = state.positions.remove(account).unwrap_or_default();
        state.total_borrowed = (state.total_borrowed - released.debt).max(Decimal::ZERO);

        info!(account = %account, collateral = %released.collateral, debt = %released.debt, "Position released to backstop");
        Ok(released)
    }

    // ============ QUERIES ============

    pub fn position(&self, account: &AccountId) -> AccountPosition {
        self.state.read().position(account)
    }

    /// Health factor at the current price; `Decimal::MAX` without debt
    pub fn health_factor(&self, account: &AccountId) -> Result<Decimal> {
        let position = self.position(account);
        let params = self.identity.risk_parameters_of(account);
        let value = health::collateral_value(position.collateral, self.collateral_price()?)?;
        health::health_factor(value, params.liquidation_threshold_percent(), position.debt)
    }

    pub fn position_summary(&self, account: &AccountId) -> Result<PositionSummary> {
        let position = self.position(account);
        let badge = self.identity.badge_of(account);
        let params: RiskParameters = self.identity.risk_parameters_of(account);
        let threshold = params.liquidation_threshold_percent();

        let collateral_value = health::collateral_value(position.collateral, self.collateral_price()?)?;
        let max_borrow = health::max_borrow(collateral_value, params.ltv_percent)?;

        Ok(PositionSummary {
            account: account.clone(),
            badge,
            collateral: position.collateral,
            collateral_value,
            debt: position.debt,
            available_borrows: (max_borrow - position.debt).max(Decimal::ZERO),
            ltv_percent: params.ltv_percent,
            liquidation_threshold_percent: threshold,
            health_factor: health::health_factor(collateral_value, threshold, position.debt)?,
            liquidation_price: health::liquidation_price(position.collateral, threshold, position.debt),
        })
    }

    pub fn pool_stats(&self) -> PoolStats {
        let state = self.state.read();
        PoolStats {
            total_liquidity: state.total_liquidity,
            total_borrowed: state.total_borrowed,
            available_liquidity: state.available_liquidity(),
            utilization: health::utilization(state.total_borrowed, state.total_liquidity),
        }
    }

    pub fn lp_balance(&self, lp: &AccountId) -> Decimal {
        self.state.read().lp_balances.get(lp).copied().unwrap_or_default()
    }

    // ============ PERSISTENCE ============

    pub fn snapshot(&self) -> MarketSnapshot {
        let state = self.state.read();
        MarketSnapshot {
            positions: state.positions.clone(),
            lp_balances: state.lp_balances.clone(),
            total_liquidity: state.total_liquidity,
            total_borrowed: state.total_borrowed,
        }
    }

    pub fn restore(&self, snapshot: MarketSnapshot) {
        let mut state = self.state.write();
        state.positions = snapshot.positions;
        state.lp_balances = snapshot.lp_balances;
        state.total_liquidity = snapshot.total_liquidity;
        state.total_borrowed = snapshot.total_borrowed;
        info!(positions = state.positions.len(), "Market state restored");
    }
}
