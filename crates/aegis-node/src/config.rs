//! Aegis node configuration
//!
//! Layers, lowest priority first: built-in defaults, an optional TOML file
//! (`AEGIS_CONFIG`, default `aegis.toml`), then `AEGIS_`-prefixed
//! environment variables using `__` between sections
//! (e.g. `AEGIS_SERVER__PORT=9000`).

use std::path::PathBuf;

use aegis_backstop::BackstopConfig;
use aegis_common::{AccountId, AegisError, AssetId, Badge, Result, RiskParameters};
use aegis_identity::IdentityConfig;
use aegis_lending::MarketConfig;
use aegis_sentinel::SentinelConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aegis node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AegisConfig {
    pub server: ServerSettings,
    pub market: MarketSettings,
    pub backstop: BackstopSettings,
    pub sentinel: SentinelSettings,
    pub identity: IdentitySettings,
    pub storage: StorageSettings,
}

impl AegisConfig {
    /// Load configuration from `.env`, the config file and the environment
    pub fn load() -> anyhow::Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let path = std::env::var("AEGIS_CONFIG").unwrap_or_else(|_| "aegis.toml".to_string());
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("AEGIS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<AegisConfig>()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.market.utilization_ceiling <= Decimal::ZERO || self.market.utilization_ceiling > Decimal::ONE {
            return Err(AegisError::Config(format!(
                "utilization ceiling must be in (0, 1], got {}",
                self.market.utilization_ceiling
            )));
        }
        if self.market.collateral_price <= Decimal::ZERO {
            return Err(AegisError::Config("collateral price must be positive".to_string()));
        }
        if self.backstop.initial_reserve < Decimal::ZERO {
            return Err(AegisError::Config("initial reserve must not be negative".to_string()));
        }
        if !self.sentinel.accept_all_proofs && self.sentinel.verifier_secret.as_deref().unwrap_or("").is_empty() {
            return Err(AegisError::Config(
                "sentinel.verifier_secret is required unless sentinel.accept_all_proofs is set".to_string(),
            ));
        }
        self.identity.to_identity_config().map(|_| ())
    }

    pub fn market_config(&self) -> MarketConfig {
        MarketConfig {
            collateral_asset: AssetId::new(self.market.collateral_asset.clone()),
            debt_asset: AssetId::new(self.market.debt_asset.clone()),
            utilization_ceiling: self.market.utilization_ceiling,
        }
    }

    pub fn backstop_config(&self) -> BackstopConfig {
        BackstopConfig {
            admin: AccountId::new(self.backstop.admin.clone()),
            coordinator: AccountId::new(self.backstop.coordinator.clone()),
            collateral_asset: AssetId::new(self.market.collateral_asset.clone()),
        }
    }

    pub fn sentinel_config(&self) -> SentinelConfig {
        SentinelConfig {
            sentinel: AccountId::new(self.sentinel.sentinel.clone()),
            governor: AccountId::new(self.sentinel.governor.clone()),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_PORT,
        }
    }
}

/// Lending market settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    pub collateral_asset: String,
    pub debt_asset: String,
    /// Ceiling checked on LP withdrawals
    pub utilization_ceiling: Decimal,
    /// Initial collateral price in debt units
    pub collateral_price: Decimal,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            collateral_asset: "WETH".to_string(),
            debt_asset: "USDC".to_string(),
            utilization_ceiling: Decimal::new(90, 2),
            collateral_price: Decimal::new(2500, 0),
        }
    }
}

/// Backstop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackstopSettings {
    pub admin: String,
    /// Identity the coordinator uses when absorbing
    pub coordinator: String,
    /// Reserve funded at start-up when no snapshot exists
    pub initial_reserve: Decimal,
}

impl Default for BackstopSettings {
    fn default() -> Self {
        Self {
            admin: "admin".to_string(),
            coordinator: "aegis-core".to_string(),
            initial_reserve: Decimal::ZERO,
        }
    }
}

/// Sentinel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelSettings {
    pub sentinel: String,
    pub governor: String,
    /// Secret the commitment verifier derives its key from
    pub verifier_secret: Option<String>,
    /// Accept every proof (development only)
    pub accept_all_proofs: bool,
}

impl Default for SentinelSettings {
    fn default() -> Self {
        Self {
            sentinel: "sentinel".to_string(),
            governor: "governor".to_string(),
            verifier_secret: None,
            accept_all_proofs: false,
        }
    }
}

/// One account -> badge assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeAssignment {
    pub account: String,
    /// Label or enum form ("Ancient One", "ANCIENT_ONE")
    pub badge: String,
}

/// Replacement parameters for one badge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeOverride {
    pub badge: String,
    pub ltv_percent: u8,
    pub liquidation_bonus_percent: u8,
    pub grace_period_secs: u64,
}

/// Identity settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub assignments: Vec<BadgeAssignment>,
    pub overrides: Vec<BadgeOverride>,
}

impl IdentitySettings {
    pub fn to_identity_config(&self) -> Result<IdentityConfig> {
        let assignments = self
            .assignments
            .iter()
            .map(|a| Ok((AccountId::new(a.account.clone()), a.badge.parse::<Badge>()?)))
            .collect::<Result<Vec<_>>>()?;
        let overrides = self
            .overrides
            .iter()
            .map(|o| {
                Ok((
                    o.badge.parse::<Badge>()?,
                    RiskParameters::new(o.ltv_percent, o.liquidation_bonus_percent, o.grace_period_secs)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(IdentityConfig { assignments, overrides })
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Risk-state record file; in-memory when unset
    pub risk_state_path: Option<PathBuf>,
    /// Engine snapshot loaded at start-up and written at shutdown
    pub snapshot_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_config() -> AegisConfig {
        let mut cfg = AegisConfig::default();
        cfg.sentinel.verifier_secret = Some("dev".to_string());
        cfg
    }

    #[test]
    fn test_defaults_validate_with_secret() {
        assert!(dev_config().validate().is_ok());
        assert!(AegisConfig::default().validate().is_err());
    }

    #[test]
    fn test_ceiling_bounds() {
        let mut cfg = dev_config();
        cfg.market.utilization_ceiling = Decimal::new(11, 1);
        assert!(matches!(cfg.validate(), Err(AegisError::Config(_))));
    }

    #[test]
    fn test_identity_settings_parse() {
        let settings = IdentitySettings {
            assignments: vec![BadgeAssignment {
                account: "0xWhale".to_string(),
                badge: "Whale".to_string(),
            }],
            overrides: vec![BadgeOverride {
                badge: "CLEAN_SHEET".to_string(),
                ltv_percent: 77,
                liquidation_bonus_percent: 7,
                grace_period_secs: 0,
            }],
        };
        let identity = settings.to_identity_config().unwrap();
        assert_eq!(identity.assignments, vec![(AccountId::from("0xWhale"), Badge::Whale)]);
        assert_eq!(identity.overrides[0].1.liquidation_bonus_percent, 7);
    }

    #[test]
    fn test_unknown_badge_rejected() {
        let mut cfg = dev_config();
        cfg.identity.assignments.push(BadgeAssignment {
            account: "x".to_string(),
            badge: "Legend".to_string(),
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: AegisConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[server]\nport = 9100\n\n[market]\nutilization_ceiling = \"0.8\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.market.utilization_ceiling, Decimal::new(8, 1));
        assert_eq!(cfg.backstop.coordinator, "aegis-core");
    }
}
