//! Risk state machine

use std::sync::Arc;

use aegis_common::{
    AccountId, AegisError, Clock, ProofMetadata, PublicInputHash, Result, RiskScore, RiskState,
    RiskStateRecord, RiskStateSource,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::store::StateStore;
use crate::verifier::{proof_digest, ProofVerifier};
use crate::SentinelConfig;

#[derive(Debug, Clone)]
struct Roles {
    sentinel: AccountId,
    governor: AccountId,
}

/// Global risk-state singleton with a sentinel-only write path
pub struct RiskStateMachine {
    record: RwLock<RiskStateRecord>,
    roles: RwLock<Roles>,
    verifier: Arc<dyn ProofVerifier>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
}

impl RiskStateMachine {
    /// Build the machine, resuming from the store when it holds a record
    pub fn new(
        config: SentinelConfig,
        verifier: Arc<dyn ProofVerifier>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let record = store.load()?.unwrap_or_default();
        info!(
            state = %record.state,
            version = record.version,
            sentinel = %config.sentinel,
            "Risk state machine initialized"
        );
        Ok(Self {
            record: RwLock::new(record),
            roles: RwLock::new(Roles {
                sentinel: config.sentinel,
                governor: config.governor,
            }),
            verifier,
            store,
            clock,
        })
    }

    /// Replace the global state after proof verification
    ///
    /// The new record is persisted before it becomes visible; if the store
    /// fails, nothing changes.
    pub fn propose_state(
        &self,
        caller: &AccountId,
        new_state: RiskState,
        proof: &[u8],
        public_input: PublicInputHash,
    ) -> Result<RiskStateRecord> {
        let mut record = self.record.write();

        if *caller != self.roles.read().sentinel {
            warn!(caller = %caller, "Rejected risk state proposal from non-sentinel");
            return Err(AegisError::Unauthorized {
                caller: caller.clone(),
                action: "propose risk state".to_string(),
            });
        }

        if !self.verifier.verify(proof, &public_input) {
            warn!(caller = %caller, input = %public_input, "Risk proof failed verification");
            return Err(AegisError::InvalidProof);
        }

        let risk_score = RiskScore::from_public_input(&public_input);
        if let Some(score) = risk_score {
            let implied = RiskState::from_score(score);
            if implied != new_state {
                debug!(score = %score, implied = %implied, proposed = %new_state, "Proposed state differs from score band");
            }
        }

        let next = RiskStateRecord {
            state: new_state,
            last_update_proof: Some(ProofMetadata {
                public_input_hash: public_input,
                proof_digest: proof_digest(proof),
                risk_score,
                proposer: caller.clone(),
                applied_at: self.clock.now(),
            }),
            version: record.version + 1,
        };
        self.store.save(&next)?;

        let previous = record.state;
        *record = next.clone();

        info!(
            from = %previous,
            to = %new_state,
            score = ?risk_score.map(|s| s.bps()),
            version = next.version,
            "Risk state updated"
        );

        Ok(next)
    }

    /// Rotate the sentinel. Governor only.
    pub fn set_sentinel(&self, caller: &AccountId, sentinel: AccountId) -> Result<()> {
        let mut roles = self.roles.write();
        if *caller != roles.governor {
            warn!(caller = %caller, "Rejected sentinel rotation from non-governor");
            return Err(AegisError::Unauthorized {
                caller: caller.clone(),
                action: "set sentinel".to_string(),
            });
        }
        info!(old = %roles.sentinel, new = %sentinel, "Sentinel rotated");
        roles.sentinel = sentinel;
        Ok(())
    }

    pub fn sentinel(&self) -> AccountId {
        self.roles.read().sentinel.clone()
    }

    pub fn governor(&self) -> AccountId {
        self.roles.read().governor.clone()
    }

    /// Consistent copy of the state and its proof metadata
    pub fn record(&self) -> RiskStateRecord {
        self.record.read().clone()
    }
}

impl RiskStateSource for RiskStateMachine {
    fn current_state(&self) -> RiskState {
        self.record.read().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStateStore, MockStateStore};
    use crate::verifier::{CommitmentVerifier, MockProofVerifier};
    use aegis_common::ManualClock;

    fn score_input(bps: u16) -> PublicInputHash {
        PublicInputHash::from_score(RiskScore::new(bps).unwrap())
    }

    fn machine_with(verifier: Arc<dyn ProofVerifier>, store: Arc<dyn StateStore>) -> RiskStateMachine {
        RiskStateMachine::new(
            SentinelConfig::default(),
            verifier,
            store,
            Arc::new(ManualClock::new(1_700_000_000)),
        )
        .unwrap()
    }

    #[test]
    fn test_initial_state_is_normal() {
        let machine = machine_with(Arc::new(MockProofVerifier::new()), Arc::new(MemoryStateStore::new()));
        assert_eq!(machine.current_state(), RiskState::Normal);
        assert!(machine.record().last_update_proof.is_none());
    }

    #[test]
    fn test_sentinel_with_valid_proof_transitions() {
        let verifier = Arc::new(CommitmentVerifier::from_secret("k").unwrap());
        let machine = machine_with(verifier.clone(), Arc::new(MemoryStateStore::new()));
        let input = score_input(8_734);

        let record = machine
            .propose_state(&AccountId::from("sentinel"), RiskState::Critical, &verifier.prove(&input), input)
            .unwrap();

        assert_eq!(machine.current_state(), RiskState::Critical);
        assert_eq!(record.version, 1);
        let meta = record.last_update_proof.unwrap();
        assert_eq!(meta.risk_score.map(|s| s.bps()), Some(8_734));
        assert_eq!(meta.applied_at, 1_700_000_000);
        assert_eq!(meta.proposer, AccountId::from("sentinel"));
    }

    #[test]
    fn test_non_sentinel_rejected() {
        let mut verifier = MockProofVerifier::new();
        verifier.expect_verify().never();
        let machine = machine_with(Arc::new(verifier), Arc::new(MemoryStateStore::new()));

        let result = machine.propose_state(&AccountId::from("mallory"), RiskState::Critical, b"p", score_input(9_000));
        assert!(matches!(result, Err(AegisError::Unauthorized { .. })));
        assert_eq!(machine.current_state(), RiskState::Normal);
    }

    #[test]
    fn test_invalid_proof_leaves_state() {
        let mut verifier = MockProofVerifier::new();
        verifier.expect_verify().times(1).return_const(false);
        let machine = machine_with(Arc::new(verifier), Arc::new(MemoryStateStore::new()));

        let result = machine.propose_state(&AccountId::from("sentinel"), RiskState::Elevated, b"bad", score_input(6_000));
        assert_eq!(result, Err(AegisError::InvalidProof));
        assert_eq!(machine.record().version, 0);
    }

    #[test]
    fn test_any_state_reachable_from_any_state() {
        let mut verifier = MockProofVerifier::new();
        verifier.expect_verify().return_const(true);
        let machine = machine_with(Arc::new(verifier), Arc::new(MemoryStateStore::new()));
        let sentinel = AccountId::from("sentinel");

        for state in [RiskState::Critical, RiskState::Normal, RiskState::Elevated, RiskState::Critical, RiskState::Elevated] {
            machine.propose_state(&sentinel, state, b"p", score_input(1)).unwrap();
            assert_eq!(machine.current_state(), state);
        }
        assert_eq!(machine.record().version, 5);
    }

    #[test]
    fn test_store_failure_aborts_transition() {
        let mut verifier = MockProofVerifier::new();
        verifier.expect_verify().return_const(true);
        let mut store = MockStateStore::new();
        store.expect_load().returning(|| Ok(None));
        store
            .expect_save()
            .returning(|_| Err(AegisError::Storage("disk full".to_string())));
        let machine = machine_with(Arc::new(verifier), Arc::new(store));

        let result = machine.propose_state(&AccountId::from("sentinel"), RiskState::Critical, b"p", score_input(9_000));
        assert!(matches!(result, Err(AegisError::Storage(_))));
        assert_eq!(machine.current_state(), RiskState::Normal);
    }

    #[test]
    fn test_state_persists_across_restart() {
        let store = Arc::new(MemoryStateStore::new());
        let mut verifier = MockProofVerifier::new();
        verifier.expect_verify().return_const(true);
        let machine = machine_with(Arc::new(verifier), store.clone());
        machine
            .propose_state(&AccountId::from("sentinel"), RiskState::Elevated, b"p", score_input(5_500))
            .unwrap();
        drop(machine);

        let restarted = machine_with(Arc::new(MockProofVerifier::new()), store);
        assert_eq!(restarted.current_state(), RiskState::Elevated);
        assert_eq!(restarted.record().version, 1);
    }

    #[test]
    fn test_governor_rotates_sentinel() {
        let mut verifier = MockProofVerifier::new();
        verifier.expect_verify().return_const(true);
        let machine = machine_with(Arc::new(verifier), Arc::new(MemoryStateStore::new()));
        let replacement = AccountId::from("sentinel-2");

        assert!(machine.set_sentinel(&AccountId::from("sentinel"), replacement.clone()).is_err());
        machine.set_sentinel(&AccountId::from("governor"), replacement.clone()).unwrap();
        assert_eq!(machine.sentinel(), replacement);

        let old = machine.propose_state(&AccountId::from("sentinel"), RiskState::Critical, b"p", score_input(9_000));
        assert!(matches!(old, Err(AegisError::Unauthorized { .. })));
        machine.propose_state(&replacement, RiskState::Critical, b"p", score_input(9_000)).unwrap();
    }
}
