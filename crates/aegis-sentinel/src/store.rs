//! Persistence for the risk-state record

use std::fs;
use std::path::{Path, PathBuf};

use aegis_common::{Result, RiskStateRecord};
use parking_lot::RwLock;
use tracing::debug;

/// Durable home of the risk-state singleton
#[cfg_attr(test, mockall::automock)]
pub trait StateStore: Send + Sync {
    /// Last saved record, if any
    fn load(&self) -> Result<Option<RiskStateRecord>>;

    fn save(&self, record: &RiskStateRecord) -> Result<()>;
}

/// Store that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    record: RwLock<Option<RiskStateRecord>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<RiskStateRecord>> {
        Ok(self.record.read().clone())
    }

    fn save(&self, record: &RiskStateRecord) -> Result<()> {
        *self.record.write() = Some(record.clone());
        Ok(())
    }
}

/// JSON file store. Writes go to a sibling temp file that is renamed over
/// the target, so readers never see a half-written record.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> Result<Option<RiskStateRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let record: RiskStateRecord = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), version = record.version, "Risk state loaded");
        Ok(Some(record))
    }

    fn save(&self, record: &RiskStateRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_common::RiskState;

    #[test]
    fn test_memory_store() {
        let store = MemoryStateStore::new();
        assert!(store.load().unwrap().is_none());

        let record = RiskStateRecord {
            state: RiskState::Elevated,
            last_update_proof: None,
            version: 3,
        };
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap(), Some(record));
    }

    #[test]
    fn test_json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("risk.json");

        let store = JsonFileStateStore::new(&path);
        assert!(store.load().unwrap().is_none());

        let record = RiskStateRecord {
            state: RiskState::Critical,
            last_update_proof: None,
            version: 1,
        };
        store.save(&record).unwrap();
        assert!(!store.temp_path().exists());

        let reopened = JsonFileStateStore::new(&path);
        assert_eq!(reopened.load().unwrap(), Some(record));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk.json");
        fs::write(&path, "not json").unwrap();
        assert!(JsonFileStateStore::new(&path).load().is_err());
    }
}
