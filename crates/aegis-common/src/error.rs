//! Error types for the Aegis engine
//!
//! Every mutating operation surfaces one of these variants synchronously.
//! [`AegisError::kind`] groups them so callers can tell "retry later" from
//! "cannot be rescued this way" from "not allowed".

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{ids::AccountId, risk_state::RiskState};

/// Result type alias using AegisError
pub type Result<T> = std::result::Result<T, AegisError>;

/// Coarse classification of an [`AegisError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller lacks the role for this entry point
    Authorization,
    /// Proof did not verify
    Verification,
    /// Position or pool is not in a state that allows the operation
    Precondition,
    /// A grace timer gates the operation
    TemporalGate,
    /// Position already reached a terminal state
    State,
    /// Malformed amount
    Input,
    /// Storage, configuration or collaborator failure
    Infrastructure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Authorization => write!(f, "authorization"),
            ErrorKind::Verification => write!(f, "verification"),
            ErrorKind::Precondition => write!(f, "precondition"),
            ErrorKind::TemporalGate => write!(f, "temporal_gate"),
            ErrorKind::State => write!(f, "state"),
            ErrorKind::Input => write!(f, "input"),
            ErrorKind::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

/// Unified error type for Aegis operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AegisError {
    // Authorization
    #[error("{caller} is not authorized to {action}")]
    Unauthorized { caller: AccountId, action: String },

    // Verification
    #[error("Risk proof failed verification")]
    InvalidProof,

    // Preconditions
    #[error("Position of {account} is solvent")]
    PositionSolvent { account: AccountId },

    #[error("Insufficient collateral: requested debt {requested}, max borrow {max_borrow}")]
    InsufficientCollateral {
        requested: Decimal,
        max_borrow: Decimal,
    },

    #[error("Insufficient liquidity: required {required}, available {available}")]
    InsufficientLiquidity {
        required: Decimal,
        available: Decimal,
    },

    #[error("Pool utilization too high: {utilization} > ceiling {ceiling}")]
    UtilizationTooHigh {
        utilization: Decimal,
        ceiling: Decimal,
    },

    #[error("Borrowing disabled while system is {state}")]
    SystemNotNormal { state: RiskState },

    #[error("Withdrawal would drop health factor to {health_factor}")]
    HealthFactorViolation { health_factor: Decimal },

    // Temporal gates
    #[error("Probation not started for {account}")]
    ProbationNotStarted { account: AccountId },

    #[error("{account} is in grace period until {ends_at}")]
    InGracePeriod { account: AccountId, ends_at: i64 },

    #[error("Probation started for {account}, retry after {ends_at}")]
    ProbationStarted { account: AccountId, ends_at: i64 },

    // State
    #[error("Position of {account} was already processed")]
    AlreadyProcessed { account: AccountId },

    // Input
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Repay amount {amount} exceeds outstanding debt {debt}")]
    OverRepay { amount: Decimal, debt: Decimal },

    // Infrastructure
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Price oracle error: {0}")]
    Oracle(String),

    #[error("Dark-pool venue error: {0}")]
    Venue(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AegisError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AegisError::Unauthorized { .. } => ErrorKind::Authorization,
            AegisError::InvalidProof => ErrorKind::Verification,
            AegisError::PositionSolvent { .. }
            | AegisError::InsufficientCollateral { .. }
            | AegisError::InsufficientLiquidity { .. }
            | AegisError::UtilizationTooHigh { .. }
            | AegisError::SystemNotNormal { .. }
            | AegisError::HealthFactorViolation { .. } => ErrorKind::Precondition,
            AegisError::ProbationNotStarted { .. }
            | AegisError::InGracePeriod { .. }
            | AegisError::ProbationStarted { .. } => ErrorKind::TemporalGate,
            AegisError::AlreadyProcessed { .. } => ErrorKind::State,
            AegisError::InvalidAmount | AegisError::OverRepay { .. } => ErrorKind::Input,
            AegisError::Storage(_)
            | AegisError::Config(_)
            | AegisError::Serialization(_)
            | AegisError::Oracle(_)
            | AegisError::Venue(_)
            | AegisError::Overflow
            | AegisError::Internal(_) => ErrorKind::Infrastructure,
        }
    }

    /// True for temporal-gate errors: the position may become eligible once a
    /// grace timer starts or elapses.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TemporalGate
    }

    /// Stable machine-readable code for presentation layers
    pub fn code(&self) -> &'static str {
        match self {
            AegisError::Unauthorized { .. } => "UNAUTHORIZED",
            AegisError::InvalidProof => "INVALID_PROOF",
            AegisError::PositionSolvent { .. } => "POSITION_SOLVENT",
            AegisError::InsufficientCollateral { .. } => "INSUFFICIENT_COLLATERAL",
            AegisError::InsufficientLiquidity { .. } => "INSUFFICIENT_LIQUIDITY",
            AegisError::UtilizationTooHigh { .. } => "UTILIZATION_TOO_HIGH",
            AegisError::SystemNotNormal { .. } => "SYSTEM_NOT_NORMAL",
            AegisError::HealthFactorViolation { .. } => "HEALTH_FACTOR_VIOLATION",
            AegisError::ProbationNotStarted { .. } => "PROBATION_NOT_STARTED",
            AegisError::InGracePeriod { .. } => "IN_GRACE_PERIOD",
            AegisError::ProbationStarted { .. } => "PROBATION_STARTED",
            AegisError::AlreadyProcessed { .. } => "ALREADY_PROCESSED",
            AegisError::InvalidAmount => "INVALID_AMOUNT",
            AegisError::OverRepay { .. } => "OVER_REPAY",
            AegisError::Storage(_) => "STORAGE",
            AegisError::Config(_) => "CONFIG",
            AegisError::Serialization(_) => "SERIALIZATION",
            AegisError::Oracle(_) => "ORACLE",
            AegisError::Venue(_) => "VENUE",
            AegisError::Overflow => "OVERFLOW",
            AegisError::Internal(_) => "INTERNAL",
        }
    }
}

// Implement From for common external error types
impl From<serde_json::Error> for AegisError {
    fn from(err: serde_json::Error) -> Self {
        AegisError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AegisError {
    fn from(err: std::io::Error) -> Self {
        AegisError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for AegisError {
    fn from(err: anyhow::Error) -> Self {
        AegisError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AegisError::InGracePeriod {
            account: AccountId::from("0xancient"),
            ends_at: 1_900,
        };
        assert!(err.to_string().contains("0xancient"));
        assert!(err.to_string().contains("1900"));
    }

    #[test]
    fn test_temporal_gates_are_retryable() {
        let account = AccountId::from("0xwhale");
        assert!(AegisError::ProbationStarted { account: account.clone(), ends_at: 10 }.is_retryable());
        assert!(AegisError::InGracePeriod { account: account.clone(), ends_at: 10 }.is_retryable());
        assert!(AegisError::ProbationNotStarted { account: account.clone() }.is_retryable());
        assert!(!AegisError::PositionSolvent { account }.is_retryable());
        assert!(!AegisError::InvalidProof.is_retryable());
    }

    #[test]
    fn test_kinds_separate_user_outcomes() {
        let caller = AccountId::from("0xmallory");
        let unauthorized = AegisError::Unauthorized {
            caller: caller.clone(),
            action: "propose risk state".to_string(),
        };
        assert_eq!(unauthorized.kind(), ErrorKind::Authorization);
        assert_eq!(
            AegisError::PositionSolvent { account: caller.clone() }.kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            AegisError::AlreadyProcessed { account: caller }.kind(),
            ErrorKind::State
        );
        assert_eq!(AegisError::InvalidAmount.code(), "INVALID_AMOUNT");
    }
}
