//! Account and asset identifiers
//!
//! Accounts are opaque strings (an address, a DID, a role label). The engine
//! never parses them; it only compares them for equality and uses them as
//! map keys.

use serde::{Deserialize, Serialize};

/// Identity of a borrower, liquidity provider, or privileged role
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Ticker of an asset handled by the engine (collateral or debt side)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(symbol: &str) -> Self {
        Self(symbol.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_serializes_transparently() {
        let id = AccountId::from("0x90F79bf6EB2c4f870365E785982E1f101E93b906");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0x90F79bf6EB2c4f870365E785982E1f101E93b906\"");

        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_display_matches_input() {
        assert_eq!(AssetId::from("WETH").to_string(), "WETH");
        assert_eq!(AccountId::new("sentinel").as_str(), "sentinel");
    }
}
