//! Global risk state and the proof metadata attached to its last update
//!
//! The off-chain sentinel publishes a risk score in basis points inside the
//! public input of its proof. Scores map onto three states:
//!
//! ```text
//! score >  8000 bps  -> CRITICAL
//! score >  6000 bps  -> ELEVATED
//! otherwise          -> NORMAL
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AegisError, Result};
use crate::types::ids::AccountId;

/// Scores strictly above this are critical
pub const CRITICAL_THRESHOLD_BPS: u16 = 8_000;

/// Scores strictly above this are elevated
pub const ELEVATED_THRESHOLD_BPS: u16 = 6_000;

/// Upper bound of a risk score
pub const MAX_RISK_SCORE_BPS: u16 = 10_000;

/// System-wide risk state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskState {
    #[default]
    Normal,
    Elevated,
    Critical,
}

impl RiskState {
    /// Classify a sentinel score
    pub fn from_score(score: RiskScore) -> Self {
        match score.bps() {
            s if s > CRITICAL_THRESHOLD_BPS => RiskState::Critical,
            s if s > ELEVATED_THRESHOLD_BPS => RiskState::Elevated,
            _ => RiskState::Normal,
        }
    }

    /// Wire code used by the sentinel (0 = NORMAL, 1 = ELEVATED, 2 = CRITICAL)
    pub fn code(&self) -> u8 {
        match self {
            RiskState::Normal => 0,
            RiskState::Elevated => 1,
            RiskState::Critical => 2,
        }
    }

    #[inline]
    pub fn is_normal(&self) -> bool {
        *self == RiskState::Normal
    }
}

impl TryFrom<u8> for RiskState {
    type Error = AegisError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(RiskState::Normal),
            1 => Ok(RiskState::Elevated),
            2 => Ok(RiskState::Critical),
            other => Err(AegisError::Serialization(format!("unknown risk state code {}", other))),
        }
    }
}

impl std::fmt::Display for RiskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskState::Normal => write!(f, "NORMAL"),
            RiskState::Elevated => write!(f, "ELEVATED"),
            RiskState::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Risk score in basis points (0-10000)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(u16);

impl RiskScore {
    pub fn new(bps: u16) -> Option<Self> {
        (bps <= MAX_RISK_SCORE_BPS).then_some(Self(bps))
    }

    #[inline]
    pub fn bps(&self) -> u16 {
        self.0
    }

    /// Score as a 0.0-1.0 ratio
    #[inline]
    pub fn ratio(&self) -> f64 {
        self.0 as f64 / MAX_RISK_SCORE_BPS as f64
    }

    /// Decode a score left-padded to 32 bytes, big-endian. Anything that is
    /// not a valid score (e.g. a real hash) yields `None`.
    pub fn from_public_input(input: &PublicInputHash) -> Option<Self> {
        let bytes = input.as_bytes();
        if bytes[..30].iter().any(|b| *b != 0) {
            return None;
        }
        Self::new(u16::from_be_bytes([bytes[30], bytes[31]]))
    }
}

impl std::fmt::Display for RiskScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

/// 32-byte public input committed to by a risk proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicInputHash([u8; 32]);

impl PublicInputHash {
    pub const ZERO: PublicInputHash = PublicInputHash([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Encode a score the way the sentinel does (big-endian, left-padded)
    pub fn from_score(score: RiskScore) -> Self {
        let mut bytes = [0u8; 32];
        bytes[30..].copy_from_slice(&score.bps().to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw).map_err(|e| AegisError::Serialization(e.to_string()))?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|v: Vec<u8>| {
            AegisError::Serialization(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for PublicInputHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for PublicInputHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicInputHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Metadata of the proof behind the current risk state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofMetadata {
    /// Public input the proof committed to
    pub public_input_hash: PublicInputHash,

    /// blake3 digest of the proof bytes (hex)
    pub proof_digest: String,

    /// Score decoded from the public input, when it carries one
    pub risk_score: Option<RiskScore>,

    /// Sentinel that proposed the transition
    pub proposer: AccountId,

    /// Unix seconds when the transition was applied
    pub applied_at: i64,
}

/// Persisted risk-state singleton
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskStateRecord {
    pub state: RiskState,
    pub last_update_proof: Option<ProofMetadata>,
    /// Incremented on every applied transition
    pub version: u64,
}

/// Read access to the current global state
pub trait RiskStateSource: Send + Sync {
    fn current_state(&self) -> RiskState;
}
