//! Proof verification capability
//!
//! The state machine only asks one question: does `proof` attest to
//! `public_input`? Implementations are swappable.

use aegis_common::{AegisError, PublicInputHash, Result};
use tracing::debug;

/// Context string for deriving commitment keys from configured secrets
const KEY_CONTEXT: &str = "aegis sentinel risk proof v1";

/// Verifies risk proofs
#[cfg_attr(test, mockall::automock)]
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &[u8], public_input: &PublicInputHash) -> bool;
}

/// Keyed blake3 commitment over the public input
///
/// A proof is valid iff the input is non-zero and the proof equals
/// `blake3::keyed_hash(key, input)`.
pub struct CommitmentVerifier {
    key: [u8; 32],
}

impl CommitmentVerifier {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Derive the key from a configured secret
    pub fn from_secret(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(AegisError::Config("verifier secret must not be empty".to_string()));
        }
        Ok(Self::new(blake3::derive_key(KEY_CONTEXT, secret.as_bytes())))
    }

    /// Produce the proof a sentinel holding the same key would submit
    pub fn prove(&self, public_input: &PublicInputHash) -> Vec<u8> {
        blake3::keyed_hash(&self.key, public_input.as_bytes())
            .as_bytes()
            .to_vec()
    }
}

impl ProofVerifier for CommitmentVerifier {
    fn verify(&self, proof: &[u8], public_input: &PublicInputHash) -> bool {
        if public_input.is_zero() {
            debug!("Rejecting proof over zero public input");
            return false;
        }
        let Ok(bytes) = <[u8; 32]>::try_from(proof) else {
            debug!(len = proof.len(), "Rejecting proof of wrong length");
            return false;
        };
        // blake3::Hash equality is constant time
        blake3::Hash::from(bytes) == blake3::keyed_hash(&self.key, public_input.as_bytes())
    }
}

/// Accepts every proof. Development setups only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllVerifier;

impl ProofVerifier for AcceptAllVerifier {
    fn verify(&self, _proof: &[u8], _public_input: &PublicInputHash) -> bool {
        true
    }
}

/// Hex digest of proof bytes, as stored in proof metadata
pub fn proof_digest(proof: &[u8]) -> String {
    hex::encode(blake3::hash(proof).as_bytes())
}
