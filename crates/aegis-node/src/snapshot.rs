//! Engine snapshot persisted between runs

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use aegis_backstop::BackstopSnapshot;
use aegis_common::{AccountId, Result};
use aegis_identity::ProbationRecord;
use aegis_lending::MarketSnapshot;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Market, backstop and probation state. The risk state is persisted by
/// its own store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Unix seconds
    pub taken_at: i64,
    pub market: MarketSnapshot,
    pub backstop: BackstopSnapshot,
    pub probation: HashMap<AccountId, ProbationRecord>,
}

impl EngineSnapshot {
    /// Read a snapshot; `None` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let snapshot: EngineSnapshot = serde_json::from_slice(&fs::read(path)?)?;
        info!(path = %path.display(), taken_at = snapshot.taken_at, "Snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Write through a temp file and rename
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        info!(path = %path.display(), "Snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_common::AccountPosition;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EngineSnapshot::load(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("engine.json");

        let mut snapshot = EngineSnapshot {
            taken_at: 42,
            ..Default::default()
        };
        snapshot
            .market
            .positions
            .insert(AccountId::from("0xuser"), AccountPosition::new(dec!(10), dec!(18000)));
        snapshot.probation.insert(AccountId::from("0xwhale"), ProbationRecord { started_at: 7 });
        snapshot.save(&path).unwrap();

        assert_eq!(EngineSnapshot::load(&path).unwrap(), Some(snapshot));
    }
}
