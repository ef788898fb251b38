//! Identity & Risk-Parameter Table

use std::collections::HashMap;
use std::sync::Arc;

use aegis_common::{AccountId, Badge, Result, RiskParameters};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::IdentityConfig;

/// Read side of the identity collaborator
pub trait IdentityOracle: Send + Sync {
    fn badge_of(&self, account: &AccountId) -> Badge;

    fn risk_parameters_of(&self, account: &AccountId) -> RiskParameters;
}

impl<T: IdentityOracle + ?Sized> IdentityOracle for Arc<T> {
    fn badge_of(&self, account: &AccountId) -> Badge {
        (**self).badge_of(account)
    }

    fn risk_parameters_of(&self, account: &AccountId) -> RiskParameters {
        (**self).risk_parameters_of(account)
    }
}

/// In-process badge registry
///
/// Parameters are fixed once the registry is built; only badge assignments
/// change afterwards.
pub struct IdentityRegistry {
    badges: RwLock<HashMap<AccountId, Badge>>,
    parameters: HashMap<Badge, RiskParameters>,
}

impl IdentityRegistry {
    /// Registry with the built-in parameter table
    pub fn new() -> Self {
        Self {
            badges: RwLock::new(HashMap::new()),
            parameters: Badge::ALL
                .iter()
                .map(|badge| (*badge, badge.default_parameters()))
                .collect(),
        }
    }

    /// Registry with assignments and overrides applied
    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        let mut registry = Self::new();
        for (badge, params) in &config.overrides {
            // Re-validate: overrides come from user configuration
            let params = RiskParameters::new(
                params.ltv_percent,
                params.liquidation_bonus_percent,
                params.grace_period_secs,
            )?;
            info!(badge = %badge, params = %params, "Badge parameters overridden");
            registry.parameters.insert(*badge, params);
        }
        for (account, badge) in &config.assignments {
            registry.assign_badge(account.clone(), *badge);
        }
        Ok(registry)
    }

    /// Set the badge of an account
    pub fn assign_badge(&self, account: AccountId, badge: Badge) {
        debug!(account = %account, badge = %badge, "Badge assigned");
        self.badges.write().insert(account, badge);
    }

    /// Drop an assignment; the account falls back to DEFAULT
    pub fn revoke_badge(&self, account: &AccountId) -> Option<Badge> {
        self.badges.write().remove(account)
    }

    /// Parameters currently attached to a badge
    pub fn parameters_for(&self, badge: Badge) -> RiskParameters {
        self.parameters
            .get(&badge)
            .copied()
            .unwrap_or_else(|| badge.default_parameters())
    }

    /// All explicit assignments
    pub fn assignments(&self) -> Vec<(AccountId, Badge)> {
        let mut list: Vec<_> = self
            .badges
            .read()
            .iter()
            .map(|(account, badge)| (account.clone(), *badge))
            .collect();
        list.sort();
        list
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityOracle for IdentityRegistry {
    fn badge_of(&self, account: &AccountId) -> Badge {
        self.badges.read().get(account).copied().unwrap_or_default()
    }

    fn risk_parameters_of(&self, account: &AccountId) -> RiskParameters {
        self.parameters_for(self.badge_of(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_account_is_default() {
        let registry = IdentityRegistry::new();
        let stranger = AccountId::from("stranger");
        assert_eq!(registry.badge_of(&stranger), Badge::Default);
        assert_eq!(registry.risk_parameters_of(&stranger), RiskParameters::DEFAULT);
    }

    #[test]
    fn test_parameters_are_stable_for_every_badge() {
        let registry = IdentityRegistry::new();
        for badge in Badge::ALL {
            let account = AccountId::new(format!("holder-{}", badge.label()));
            registry.assign_badge(account.clone(), badge);
            for _ in 0..3 {
                assert_eq!(registry.badge_of(&account), badge);
                assert_eq!(registry.risk_parameters_of(&account), badge.default_parameters());
            }
        }
    }

    #[test]
    fn test_clean_sheet_override() {
        let config = IdentityConfig {
            assignments: vec![(AccountId::from("alice"), Badge::CleanSheet)],
            overrides: vec![(Badge::CleanSheet, RiskParameters::new(77, 6, 0).unwrap())],
        };
        let registry = IdentityRegistry::from_config(&config).unwrap();
        let params = registry.risk_parameters_of(&AccountId::from("alice"));
        assert_eq!(params.liquidation_bonus_percent, 6);
        assert_eq!(registry.parameters_for(Badge::Whale), RiskParameters::WHALE);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let config = IdentityConfig {
            assignments: vec![],
            overrides: vec![(
                Badge::Whale,
                RiskParameters {
                    ltv_percent: 100,
                    liquidation_bonus_percent: 5,
                    grace_period_secs: 1800,
                },
            )],
        };
        assert!(IdentityRegistry::from_config(&config).is_err());
    }

    #[test]
    fn test_revoke_falls_back_to_default() {
        let registry = IdentityRegistry::new();
        let whale = AccountId::from("whale");
        registry.assign_badge(whale.clone(), Badge::Whale);
        assert_eq!(registry.revoke_badge(&whale), Some(Badge::Whale));
        assert_eq!(registry.badge_of(&whale), Badge::Default);
        assert!(registry.assignments().is_empty());
    }
}
