//! Probation ledger: grace-period timers keyed by account
//!
//! A record stores only the start time. Expiry is decided at call time by
//! comparing `now` against `start + grace`; records are never cleared by
//! the passage of time, only by a completed liquidation or absorption.

use std::collections::HashMap;

use aegis_common::{AccountId, RiskParameters};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Probation start of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbationRecord {
    /// Unix seconds
    pub started_at: i64,
}

/// Outcome of a grace check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraceStatus {
    /// Badge has no grace period
    NotRequired,
    /// Badge has a grace period but no record exists yet
    NotStarted,
    /// Record exists and `now < ends_at`
    Pending { ends_at: i64 },
    /// Record exists and the grace period is over
    Elapsed { started_at: i64 },
}

impl GraceStatus {
    /// Whether a forced liquidation may proceed
    #[inline]
    pub fn is_eligible(&self) -> bool {
        matches!(self, GraceStatus::NotRequired | GraceStatus::Elapsed { .. })
    }
}

/// Shared owner of every probation record
#[derive(Debug, Default)]
pub struct ProbationLedger {
    records: RwLock<HashMap<AccountId, ProbationRecord>>,
}

impl ProbationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a probation if none exists. Returns the effective start time and
    /// whether this call created it.
    pub fn start(&self, account: &AccountId, now: i64) -> (i64, bool) {
        let mut records = self.records.write();
        if let Some(existing) = records.get(account) {
            debug!(account = %account, started_at = existing.started_at, "Probation already running");
            return (existing.started_at, false);
        }
        records.insert(account.clone(), ProbationRecord { started_at: now });
        info!(account = %account, started_at = now, "Probation started");
        (now, true)
    }

    pub fn get(&self, account: &AccountId) -> Option<ProbationRecord> {
        self.records.read().get(account).copied()
    }

    /// Remove the record after a completed liquidation or absorption
    pub fn clear(&self, account: &AccountId) -> Option<ProbationRecord> {
        let removed = self.records.write().remove(account);
        if removed.is_some() {
            debug!(account = %account, "Probation cleared");
        }
        removed
    }

    /// Evaluate the grace gate for `account` under `params`
    pub fn grace_status(&self, account: &AccountId, params: &RiskParameters, now: i64) -> GraceStatus {
        if !params.has_grace_period() {
            return GraceStatus::NotRequired;
        }
        match self.get(account) {
            None => GraceStatus::NotStarted,
            Some(record) => {
                let ends_at = params.grace_deadline(record.started_at);
                if now < ends_at {
                    GraceStatus::Pending { ends_at }
                } else {
                    GraceStatus::Elapsed {
                        started_at: record.started_at,
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of every record, for persistence
    pub fn snapshot(&self) -> HashMap<AccountId, ProbationRecord> {
        self.records.read().clone()
    }

    /// Replace all records with a persisted copy
    pub fn restore(&self, records: HashMap<AccountId, ProbationRecord>) {
        *self.records.write() = records;
    }
}
