//! AegisCore - the coordinator
//!
//! Wires the components around one shared probation ledger and one price
//! source, and arbitrates between the market's own liquidation path and
//! backstop absorption: both run under the coordinator lock, and a rescued
//! position is released from the market, so whichever path completes first
//! leaves nothing for the other. Debt the market carries for an account the
//! backstop already processed therefore belongs to a new position, and the
//! account is reopened before that position is rescued.

use std::sync::Arc;

use aegis_backstop::{AbsorptionOutcome, BackstopPool, DarkPoolVenue, RecordingVenue};
use aegis_common::{
    AccountId, AegisError, AssetId, Clock, PublicInputHash, Result, RiskState, RiskStateRecord,
    RiskStateSource, SystemClock,
};
use aegis_identity::{IdentityOracle, IdentityRegistry, ProbationLedger};
use aegis_lending::{health, LendingMarket, LiquidationReceipt, PriceOracle, StaticPriceOracle};
use aegis_sentinel::{
    AcceptAllVerifier, CommitmentVerifier, JsonFileStateStore, MemoryStateStore, ProofVerifier,
    RiskStateMachine, StateStore,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::AegisConfig;
use crate::snapshot::EngineSnapshot;

/// Outcome of a rescue attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RescueOutcome {
    /// Absorbed or routed; the market no longer carries the position
    Completed { outcome: AbsorptionOutcome },
    /// Probation opened; retry once `ends_at` has passed
    ProbationStarted { ends_at: i64 },
}

/// Swappable collaborators
pub struct CoreDeps {
    pub clock: Arc<dyn Clock>,
    pub verifier: Arc<dyn ProofVerifier>,
    pub store: Arc<dyn StateStore>,
    pub venue: Arc<dyn DarkPoolVenue>,
}

impl CoreDeps {
    /// Production collaborators as described by the configuration
    pub fn from_config(config: &AegisConfig) -> Result<Self> {
        let verifier: Arc<dyn ProofVerifier> = if config.sentinel.accept_all_proofs {
            warn!("Accepting all risk proofs; do not run this way in production");
            Arc::new(AcceptAllVerifier)
        } else {
            let secret = config.sentinel.verifier_secret.as_deref().unwrap_or_default();
            Arc::new(CommitmentVerifier::from_secret(secret)?)
        };
        let store: Arc<dyn StateStore> = match &config.storage.risk_state_path {
            Some(path) => Arc::new(JsonFileStateStore::new(path.clone())),
            None => Arc::new(MemoryStateStore::new()),
        };
        Ok(Self {
            clock: Arc::new(SystemClock),
            verifier,
            store,
            venue: Arc::new(RecordingVenue::new()),
        })
    }
}

/// Coordinator of the risk engine
pub struct AegisCore {
    id: AccountId,
    identity: Arc<IdentityRegistry>,
    probation: Arc<ProbationLedger>,
    prices: Arc<StaticPriceOracle>,
    sentinel: Arc<RiskStateMachine>,
    market: Arc<LendingMarket>,
    backstop: Arc<BackstopPool>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl AegisCore {
    pub fn new(config: &AegisConfig, deps: CoreDeps) -> Result<Self> {
        config.validate()?;

        let identity = Arc::new(IdentityRegistry::from_config(&config.identity.to_identity_config()?)?);
        let probation = Arc::new(ProbationLedger::new());
        let prices = Arc::new(StaticPriceOracle::with_price(
            AssetId::new(config.market.collateral_asset.clone()),
            config.market.collateral_price,
        )?);
        let sentinel = Arc::new(RiskStateMachine::new(
            config.sentinel_config(),
            deps.verifier,
            deps.store,
            deps.clock.clone(),
        )?);
        let market = Arc::new(LendingMarket::new(
            config.market_config(),
            identity.clone(),
            prices.clone(),
            sentinel.clone(),
            probation.clone(),
            deps.clock.clone(),
        ));
        let backstop_config = config.backstop_config();
        let id = backstop_config.coordinator.clone();
        let backstop = Arc::new(BackstopPool::new(
            backstop_config,
            identity.clone(),
            prices.clone(),
            probation.clone(),
            deps.venue,
            deps.clock.clone(),
        ));
        if config.backstop.initial_reserve > Decimal::ZERO {
            backstop.fund_reserve(&AccountId::new(config.backstop.admin.clone()), config.backstop.initial_reserve)?;
        }

        info!(coordinator = %id, state = %sentinel.current_state(), "Aegis core initialized");

        Ok(Self {
            id,
            identity,
            probation,
            prices,
            sentinel,
            market,
            backstop,
            clock: deps.clock,
            lock: Mutex::new(()),
        })
    }

    /// Apply a sentinel proposal
    #[instrument(skip_all, fields(caller = %caller, state = %state))]
    pub fn propose_state(
        &self,
        caller: &AccountId,
        state: RiskState,
        proof: &[u8],
        public_input: PublicInputHash,
    ) -> Result<RiskStateRecord> {
        let _guard = self.lock.lock();
        self.sentinel.propose_state(caller, state, proof, public_input)
    }

    /// Hand an insolvent position to the backstop
    ///
    /// The collateral is valued at the current price before the backstop
    /// sees it. If the account's badge requires probation and none is
    /// running, the probation is started and reported instead of an error.
    #[instrument(skip_all, fields(account = %account))]
    pub fn rescue_position(&self, account: &AccountId) -> Result<RescueOutcome> {
        let _guard = self.lock.lock();
        let position = self.market.position(account);
        if !position.has_debt() {
            return Err(AegisError::PositionSolvent {
                account: account.clone(),
            });
        }

        let price = self.prices.price_of(&self.market.config().collateral_asset)?;
        let collateral_value = health::collateral_value(position.collateral, price)?;

        if let Some(previous) = self.backstop.reopen_account(&self.id, account)? {
            debug!(account = %account, previous = %previous.status, "New position after a completed rescue");
        }

        match self
            .backstop
            .absorb_position(&self.id, account, collateral_value, position.debt)
        {
            Ok(outcome) => {
                self.market.release_to_backstop(account)?;
                info!(account = %account, status = %outcome.status(), "Rescue completed");
                Ok(RescueOutcome::Completed { outcome })
            }
            Err(AegisError::ProbationNotStarted { .. }) => {
                let started_at = self.backstop.trigger_probation(account);
                let ends_at = self.identity.risk_parameters_of(account).grace_deadline(started_at);
                info!(account = %account, ends_at, "Rescue deferred: probation started");
                Ok(RescueOutcome::ProbationStarted { ends_at })
            }
            Err(err) => Err(err),
        }
    }

    /// Market liquidation, serialized with rescues
    #[instrument(skip_all, fields(liquidator = %liquidator, account = %account))]
    pub fn liquidate(
        &self,
        liquidator: &AccountId,
        account: &AccountId,
        repay_amount: Decimal,
    ) -> Result<LiquidationReceipt> {
        let _guard = self.lock.lock();
        self.market.liquidate(liquidator, account, repay_amount)
    }

    // ============ ACCESSORS ============

    pub fn coordinator_id(&self) -> &AccountId {
        &self.id
    }

    pub fn identity(&self) -> &Arc<IdentityRegistry> {
        &self.identity
    }

    pub fn probation(&self) -> &Arc<ProbationLedger> {
        &self.probation
    }

    pub fn prices(&self) -> &Arc<StaticPriceOracle> {
        &self.prices
    }

    pub fn sentinel(&self) -> &Arc<RiskStateMachine> {
        &self.sentinel
    }

    pub fn market(&self) -> &Arc<LendingMarket> {
        &self.market
    }

    pub fn backstop(&self) -> &Arc<BackstopPool> {
        &self.backstop
    }

    // ============ PERSISTENCE ============

    /// Consistent copy of market, backstop and probation state
    pub fn snapshot(&self) -> EngineSnapshot {
        let _guard = self.lock.lock();
        EngineSnapshot {
            taken_at: self.clock.now(),
            market: self.market.snapshot(),
            backstop: self.backstop.snapshot(),
            probation: self.probation.snapshot(),
        }
    }

    pub fn restore(&self, snapshot: EngineSnapshot) {
        let _guard = self.lock.lock();
        self.market.restore(snapshot.market);
        self.backstop.restore(snapshot.backstop);
        self.probation.restore(snapshot.probation);
        info!(taken_at = snapshot.taken_at, "Engine state restored");
    }
}
