//! Reputation badges and the risk parameters they unlock
//!
//! A badge is the reputation primitive of the engine. It affects:
//! - Borrowing power (LTV)
//! - Liquidator incentive (liquidation bonus)
//! - Protection against instant liquidation (grace period)
//!
//! | Badge       | LTV | Bonus | Grace  |
//! |-------------|-----|-------|--------|
//! | Default     | 75% | 10%   | 0s     |
//! | Ancient One | 80% | 8%    | 900s   |
//! | Whale       | 82% | 5%    | 1800s  |
//! | Clean Sheet | 77% | 10%   | 0s     |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AegisError, Result};

/// Percentage denominator used by every parameter
pub const PERCENT: u8 = 100;

/// Reputation badge assigned by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Badge {
    Default,
    AncientOne,
    Whale,
    CleanSheet,
}

impl Badge {
    /// Every badge, in table order
    pub const ALL: [Badge; 4] = [
        Badge::Default,
        Badge::AncientOne,
        Badge::Whale,
        Badge::CleanSheet,
    ];

    /// Human-readable label as shown on the identity side
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Default => "Default",
            Badge::AncientOne => "Ancient One",
            Badge::Whale => "Whale",
            Badge::CleanSheet => "Clean Sheet",
        }
    }

    /// Built-in parameters for this badge
    pub fn default_parameters(&self) -> RiskParameters {
        match self {
            Badge::Default => RiskParameters::DEFAULT,
            Badge::AncientOne => RiskParameters::ANCIENT_ONE,
            Badge::Whale => RiskParameters::WHALE,
            Badge::CleanSheet => RiskParameters::CLEAN_SHEET,
        }
    }
}

impl Default for Badge {
    fn default() -> Self {
        Badge::Default
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Badge {
    type Err = AegisError;

    /// Accepts both the label ("Ancient One") and the enum form ("ANCIENT_ONE")
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "default" => Ok(Badge::Default),
            "ancientone" => Ok(Badge::AncientOne),
            "whale" => Ok(Badge::Whale),
            "cleansheet" => Ok(Badge::CleanSheet),
            _ => Err(AegisError::Config(format!("unknown badge: {}", s))),
        }
    }
}

/// Risk parameters attached to a badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Maximum borrowable share of collateral value (0-99)
    pub ltv_percent: u8,

    /// Extra collateral a liquidator receives on top of the repaid value (0-100)
    pub liquidation_bonus_percent: u8,

    /// Delay between first failed health check and forced liquidation
    pub grace_period_secs: u64,
}

impl RiskParameters {
    pub const DEFAULT: RiskParameters = RiskParameters {
        ltv_percent: 75,
        liquidation_bonus_percent: 10,
        grace_period_secs: 0,
    };

    pub const ANCIENT_ONE: RiskParameters = RiskParameters {
        ltv_percent: 80,
        liquidation_bonus_percent: 8,
        grace_period_secs: 900,
    };

    pub const WHALE: RiskParameters = RiskParameters {
        ltv_percent: 82,
        liquidation_bonus_percent: 5,
        grace_period_secs: 1800,
    };

    pub const CLEAN_SHEET: RiskParameters = RiskParameters {
        ltv_percent: 77,
        liquidation_bonus_percent: 10,
        grace_period_secs: 0,
    };

    /// Build a validated parameter set
    pub fn new(ltv_percent: u8, liquidation_bonus_percent: u8, grace_period_secs: u64) -> Result<Self> {
        if ltv_percent >= PERCENT {
            return Err(AegisError::Config(format!(
                "ltv must be below 100%, got {}%",
                ltv_percent
            )));
        }
        if liquidation_bonus_percent > PERCENT {
            return Err(AegisError::Config(format!(
                "liquidation bonus must be at most 100%, got {}%",
                liquidation_bonus_percent
            )));
        }
        Ok(Self {
            ltv_percent,
            liquidation_bonus_percent,
            grace_period_secs,
        })
    }

    /// Whether an insolvent position must serve probation first
    #[inline]
    pub fn has_grace_period(&self) -> bool {
        self.grace_period_secs > 0
    }

    /// Threshold used by the health factor. Badges carry a single
    /// collateral factor, so this is the LTV.
    #[inline]
    pub fn liquidation_threshold_percent(&self) -> u8 {
        self.ltv_percent
    }

    #[inline]
    pub fn ltv(&self) -> Decimal {
        Decimal::from(self.ltv_percent)
    }

    #[inline]
    pub fn liquidation_bonus(&self) -> Decimal {
        Decimal::from(self.liquidation_bonus_percent)
    }

    /// Grace deadline for a probation that started at `started_at`
    #[inline]
    pub fn grace_deadline(&self, started_at: i64) -> i64 {
        started_at.saturating_add(self.grace_period_secs.min(i64::MAX as u64) as i64)
    }
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for RiskParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RiskParameters(ltv={}%, bonus={}%, grace={}s)",
            self.ltv_percent, self.liquidation_bonus_percent, self.grace_period_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_table() {
        assert_eq!(Badge::Default.default_parameters(), RiskParameters::new(75, 10, 0).unwrap());
        assert_eq!(Badge::AncientOne.default_parameters(), RiskParameters::new(80, 8, 900).unwrap());
        assert_eq!(Badge::Whale.default_parameters(), RiskParameters::new(82, 5, 1800).unwrap());
        assert_eq!(Badge::CleanSheet.default_parameters(), RiskParameters::new(77, 10, 0).unwrap());
    }

    #[test]
    fn test_grace_period_flag() {
        assert!(!RiskParameters::DEFAULT.has_grace_period());
        assert!(!RiskParameters::CLEAN_SHEET.has_grace_period());
        assert!(RiskParameters::ANCIENT_ONE.has_grace_period());
        assert!(RiskParameters::WHALE.has_grace_period());
    }

    #[test]
    fn test_rejects_full_ltv() {
        assert!(RiskParameters::new(100, 10, 0).is_err());
        assert!(RiskParameters::new(75, 101, 0).is_err());
    }

    #[test]
    fn test_badge_parsing() {
        assert_eq!("Ancient One".parse::<Badge>().unwrap(), Badge::AncientOne);
        assert_eq!("ANCIENT_ONE".parse::<Badge>().unwrap(), Badge::AncientOne);
        assert_eq!("clean sheet".parse::<Badge>().unwrap(), Badge::CleanSheet);
        assert!("Newbie".parse::<Badge>().is_err());
    }

    #[test]
    fn test_grace_deadline() {
        assert_eq!(RiskParameters::ANCIENT_ONE.grace_deadline(1_000), 1_900);
        assert_eq!(RiskParameters::DEFAULT.grace_deadline(1_000), 1_000);
    }
}
