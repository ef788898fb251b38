//! # Aegis Common
//!
//! Shared types, errors, and collaborator seams for the Aegis risk
//! circuit-breaker and liquidation backstop engine.
//!
//! ## Core Types
//!
//! - [`AccountId`]/[`AssetId`]: opaque identities
//! - [`Badge`]/[`RiskParameters`]: reputation badge and the LTV, bonus and
//!   grace period it grants
//! - [`AccountPosition`]: collateral and debt of one borrower
//! - [`RiskState`]: global NORMAL / ELEVATED / CRITICAL state
//! - [`ProofMetadata`]/[`RiskStateRecord`]: persisted state singleton
//!
//! ## Seams
//!
//! - [`Clock`]: time source for grace-period checks
//! - [`RiskStateSource`]: read-only view of the global state

pub mod clock;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AegisError, ErrorKind, Result};
pub use types::{
    ids::{AccountId, AssetId},
    position::{AccountPosition, PositionStatus},
    reputation::{Badge, RiskParameters, PERCENT},
    risk_state::{
        ProofMetadata, PublicInputHash, RiskScore, RiskState, RiskStateRecord, RiskStateSource,
        CRITICAL_THRESHOLD_BPS, ELEVATED_THRESHOLD_BPS, MAX_RISK_SCORE_BPS,
    },
};

/// Aegis version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health factor at or above which a position is solvent
pub const MIN_HEALTH_FACTOR: rust_decimal::Decimal = rust_decimal::Decimal::ONE;
