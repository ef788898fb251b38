//! Backstop pool - the "sponge"
//!
//! Absorption runs three gates in order, then one of two branches:
//!
//! 1. solvency: `collateral * ltv < debt * 100`, else `PositionSolvent`
//! 2. grace: graced badges need an elapsed probation
//! 3. routing: reserve covers the debt (buffered) or not (dark pool)
//!
//! Collateral and debt are both in debt-asset units. Both branches are
//! terminal for the position; once the market has released it, the
//! coordinator reopens the account with [`BackstopPool::reopen_account`] so
//! a later position can be rescued.

use std::collections::HashMap;
use std::sync::Arc;

use aegis_common::{AccountId, AegisError, Clock, PositionStatus, Result};
use aegis_identity::{GraceStatus, IdentityOracle, ProbationLedger};
use aegis_lending::{health, PriceOracle};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::routing::{select_branch, Branch};
use crate::venue::DarkPoolVenue;
use crate::BackstopConfig;

/// Result of a successful absorption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsorptionOutcome {
    /// Debt covered from the reserve
    Absorbed { debt_covered: Decimal, collateral: Decimal },
    /// Sent to the dark pool; reserve untouched
    RoutedExternal { order_id: String },
}

impl AbsorptionOutcome {
    pub fn status(&self) -> PositionStatus {
        match self {
            AbsorptionOutcome::Absorbed { .. } => PositionStatus::Absorbed,
            AbsorptionOutcome::RoutedExternal { .. } => PositionStatus::RoutedExternal,
        }
    }
}

/// Terminal record of a processed account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedPosition {
    pub status: PositionStatus,
    /// Collateral value in debt-asset units
    pub collateral: Decimal,
    pub debt: Decimal,
    pub order_id: Option<String>,
    pub processed_at: i64,
}

/// Reserve and holdings, for presentation layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackstopStats {
    pub reserve: Decimal,
    pub absorbed_collateral: Decimal,
    pub absorbed_positions: usize,
    pub routed_positions: usize,
    pub pending_probations: usize,
}

/// Persisted backstop state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackstopSnapshot {
    pub coordinator: Option<AccountId>,
    pub reserve: Decimal,
    pub absorbed_collateral: Decimal,
    pub processed: HashMap<AccountId, ProcessedPosition>,
    /// Terminal records of positions whose account was reopened
    #[serde(default)]
    pub history: Vec<(AccountId, ProcessedPosition)>,
}

#[derive(Debug)]
struct PoolState {
    coordinator: AccountId,
    reserve: Decimal,
    absorbed_collateral: Decimal,
    processed: HashMap<AccountId, ProcessedPosition>,
    history: Vec<(AccountId, ProcessedPosition)>,
}

impl PoolState {
    fn ensure_coordinator(&self, caller: &AccountId, action: &str) -> Result<()> {
        if *caller != self.coordinator {
            warn!(caller = %caller, action, "Rejected call from non-coordinator");
            return Err(AegisError::Unauthorized {
                caller: caller.clone(),
                action: action.to_string(),
            });
        }
        Ok(())
    }

    fn all_processed(&self) -> impl Iterator<Item = (&AccountId, &ProcessedPosition)> {
        self.processed
            .iter()
            .chain(self.history.iter().map(|(account, p)| (account, p)))
    }
}

/// Backstop absorption engine
pub struct BackstopPool {
    config: BackstopConfig,
    state: RwLock<PoolState>,
    identity: Arc<dyn IdentityOracle>,
    prices: Arc<dyn PriceOracle>,
    probation: Arc<ProbationLedger>,
    venue: Arc<dyn DarkPoolVenue>,
    clock: Arc<dyn Clock>,
}

impl BackstopPool {
    pub fn new(
        config: BackstopConfig,
        identity: Arc<dyn IdentityOracle>,
        prices: Arc<dyn PriceOracle>,
        probation: Arc<ProbationLedger>,
        venue: Arc<dyn DarkPoolVenue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = PoolState {
            coordinator: config.coordinator.clone(),
            reserve: Decimal::ZERO,
            absorbed_collateral: Decimal::ZERO,
            processed: HashMap::new(),
            history: Vec::new(),
        };
        Self {
            config,
            state: RwLock::new(state),
            identity,
            prices,
            probation,
            venue,
            clock,
        }
    }

    // ============ ADMIN ============

    /// Replace the coordinator. Admin only.
    pub fn set_coordinator(&self, caller: &AccountId, coordinator: AccountId) -> Result<()> {
        if *caller != self.config.admin {
            warn!(caller = %caller, "Rejected coordinator change from non-admin");
            return Err(AegisError::Unauthorized {
                caller: caller.clone(),
                action: "set coordinator".to_string(),
            });
        }
        let mut state = self.state.write();
        info!(old = %state.coordinator, new = %coordinator, "Coordinator updated");
        state.coordinator = coordinator;
        Ok(())
    }

    /// Add debt-asset funds to the reserve
    pub fn fund_reserve(&self, funder: &AccountId, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(AegisError::InvalidAmount);
        }
        let mut state = self.state.write();
        state.reserve = state.reserve.checked_add(amount).ok_or(AegisError::Overflow)?;
        info!(funder = %funder, amount = %amount, reserve = %state.reserve, "Reserve funded");
        Ok(state.reserve)
    }

    // ============ PROBATION ============

    /// Start the grace timer for `account` if it is not running. Returns
    /// the effective start time.
    pub fn trigger_probation(&self, account: &AccountId) -> i64 {
        let (started_at, _) = self.probation.start(account, self.clock.now());
        started_at
    }

    // ============ ABSORPTION ============

    /// Take over an insolvent position. Coordinator only.
    ///
    /// `collateral` is the collateral value and `debt` the outstanding debt,
    /// both in debt-asset units. The price source is only consulted to size
    /// a dark-pool sell order in collateral-asset units.
    pub fn absorb_position(
        &self,
        caller: &AccountId,
        account: &AccountId,
        collateral: Decimal,
        debt: Decimal,
    ) -> Result<AbsorptionOutcome> {
        let mut state = self.state.write();

        state.ensure_coordinator(caller, "absorb position")?;
        if state.processed.contains_key(account) {
            return Err(AegisError::AlreadyProcessed {
                account: account.clone(),
            });
        }
        if collateral < Decimal::ZERO || debt <= Decimal::ZERO {
            return Err(AegisError::InvalidAmount);
        }

        // 1. solvency
        let params = self.identity.risk_parameters_of(account);
        if !health::is_underwater(collateral, params.ltv_percent, debt)? {
            return Err(AegisError::PositionSolvent {
                account: account.clone(),
            });
        }

        // 2. grace
        let now = self.clock.now();
        match self.probation.grace_status(account, &params, now) {
            GraceStatus::NotStarted => {
                return Err(AegisError::ProbationNotStarted {
                    account: account.clone(),
                })
            }
            GraceStatus::Pending { ends_at } => {
                return Err(AegisError::InGracePeriod {
                    account: account.clone(),
                    ends_at,
                })
            }
            GraceStatus::NotRequired | GraceStatus::Elapsed { .. } => {}
        }

        // 3. routing
        let outcome = match select_branch(state.reserve, debt) {
            Branch::Buffered => {
                state.reserve -= debt;
                state.absorbed_collateral += collateral;
                info!(
                    account = %account,
                    debt = %debt,
                    collateral = %collateral,
                    reserve = %state.reserve,
                    "Position absorbed"
                );
                AbsorptionOutcome::Absorbed {
                    debt_covered: debt,
                    collateral,
                }
            }
            Branch::DarkPool => {
                debug!(account = %account, reserve = %state.reserve, debt = %debt, "Reserve short, routing to dark pool");
                let sell_amount = self.collateral_units(collateral)?;
                let order_id = self
                    .venue
                    .place_order(&self.config.collateral_asset, sell_amount, debt)?;
                info!(account = %account, order_id = %order_id, debt = %debt, "Position routed externally");
                AbsorptionOutcome::RoutedExternal { order_id }
            }
        };

        let order_id = match &outcome {
            AbsorptionOutcome::RoutedExternal { order_id } => Some(order_id.clone()),
            AbsorptionOutcome::Absorbed { .. } => None,
        };
        state.processed.insert(
            account.clone(),
            ProcessedPosition {
                status: outcome.status(),
                collateral,
                debt,
                order_id,
                processed_at: now,
            },
        );
        self.probation.clear(account);

        Ok(outcome)
    }

    /// Archive the terminal record of a released position so the account's
    /// next position can be absorbed. Coordinator only.
    pub fn reopen_account(&self, caller: &AccountId, account: &AccountId) -> Result<Option<ProcessedPosition>> {
        let mut state = self.state.write();
        state.ensure_coordinator(caller, "reopen account")?;

        let Some(record) = state.processed.remove(account) else {
            return Ok(None);
        };
        info!(account = %account, status = %record.status, "Account reopened for a new position");
        state.history.push((account.clone(), record.clone()));
        Ok(Some(record))
    }

    /// Collateral-asset amount worth `value` at the current price
    fn collateral_units(&self, value: Decimal) -> Result<Decimal> {
        let price = self.prices.price_of(&self.config.collateral_asset)?;
        if price <= Decimal::ZERO {
            return Err(AegisError::Oracle(format!("non-positive price {}", price)));
        }
        value.checked_div(price).ok_or(AegisError::Overflow)
    }

    // ============ QUERIES ============

    pub fn coordinator(&self) -> AccountId {
        self.state.read().coordinator.clone()
    }

    pub fn reserve_balance(&self) -> Decimal {
        self.state.read().reserve
    }

    pub fn absorbed_collateral(&self) -> Decimal {
        self.state.read().absorbed_collateral
    }

    pub fn position_status(&self, account: &AccountId) -> PositionStatus {
        if let Some(processed) = self.state.read().processed.get(account) {
            return processed.status;
        }
        if self.probation.get(account).is_some() {
            PositionStatus::ProbationPending
        } else {
            PositionStatus::Healthy
        }
    }

    pub fn processed(&self, account: &AccountId) -> Option<ProcessedPosition> {
        self.state.read().processed.get(account).cloned()
    }

    /// Venue order ids of routed positions, by account
    pub fn routed_orders(&self) -> Vec<(AccountId, String)> {
        let mut orders: Vec<_> = self
            .state
            .read()
            .all_processed()
            .filter_map(|(account, p)| p.order_id.clone().map(|id| (account.clone(), id)))
            .collect();
        orders.sort();
        orders
    }

    pub fn stats(&self) -> BackstopStats {
        let state = self.state.read();
        let count = |status: PositionStatus| state.all_processed().filter(|(_, p)| p.status == status).count();
        BackstopStats {
            reserve: state.reserve,
            absorbed_collateral: state.absorbed_collateral,
            absorbed_positions: count(PositionStatus::Absorbed),
            routed_positions: count(PositionStatus::RoutedExternal),
            pending_probations: self.probation.len(),
        }
    }

    // ============ PERSISTENCE ============

    pub fn snapshot(&self) -> BackstopSnapshot {
        let state = self.state.read();
        BackstopSnapshot {
            coordinator: Some(state.coordinator.clone()),
            reserve: state.reserve,
            absorbed_collateral: state.absorbed_collateral,
            processed: state.processed.clone(),
            history: state.history.clone(),
        }
    }

    /// Restore persisted state; a persisted coordinator replaces the
    /// configured one
    pub fn restore(&self, snapshot: BackstopSnapshot) {
        let mut state = self.state.write();
        if let Some(coordinator) = snapshot.coordinator {
            state.coordinator = coordinator;
        }
        state.reserve = snapshot.reserve;
        state.absorbed_collateral = snapshot.absorbed_collateral;
        state.processed = snapshot.processed;
        state.history = snapshot.history;
        info!(reserve = %state.reserve, processed = state.processed.len(), "Backstop state restored");
    }
}
