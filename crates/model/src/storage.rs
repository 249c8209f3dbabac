//! Persistence port for results and calibrations.
//!
//! The core never talks to a concrete backend: it goes through
//! [`StoragePort`], a key-value interface over JSON values. Two backends
//! ship with the crate, an in-memory map for tests and embedding, and a
//! directory of JSON files for the CLI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use athletrack_common::error::{AthleteError, AthleteResult};
use serde_json::Value;

use crate::calibration::StoredCalibration;
use crate::kind::TestKind;
use crate::result::TestResult;

/// Key-value storage over JSON-serializable values.
pub trait StoragePort {
    fn get(&self, key: &str) -> AthleteResult<Option<Value>>;

    fn set(&mut self, key: &str, value: Value) -> AthleteResult<()>;

    /// Remove a key. Returns whether it existed.
    fn delete(&mut self, key: &str) -> AthleteResult<bool>;
}

/// Volatile storage backed by a hash map.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, Value>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StoragePort for MemoryStorage {
    fn get(&self, key: &str) -> AthleteResult<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> AthleteResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> AthleteResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}

/// One pretty-printed JSON file per key under a root directory.
///
/// Keys may contain `/` to form subdirectories; `results/sprint` is stored
/// at `<root>/results/sprint.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
}

impl JsonFileStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> AthleteResult<PathBuf> {
        let valid = !key.is_empty()
            && key.split('/').all(|segment| {
                !segment.is_empty()
                    && segment != "."
                    && segment != ".."
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            });
        if !valid {
            return Err(AthleteError::storage(format!("invalid storage key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl StoragePort for JsonFileStorage {
    fn get(&self, key: &str) -> AthleteResult<Option<Value>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| {
            AthleteError::storage(format!("failed to read {}: {e}", path.display()))
        })?;
        let value = serde_json::from_str(&content).map_err(|e| {
            AthleteError::storage(format!("failed to parse {}: {e}", path.display()))
        })?;
        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: Value) -> AthleteResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&value)?;
        std::fs::write(&path, json).map_err(|e| {
            AthleteError::storage(format!("failed to write {}: {e}", path.display()))
        })
    }

    fn delete(&mut self, key: &str) -> AthleteResult<bool> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        Ok(true)
    }
}

fn results_key(kind: TestKind) -> String {
    format!("results/{kind}")
}

fn calibration_key(kind: TestKind) -> String {
    format!("calibration/{kind}")
}

/// Typed access to results and calibrations over a storage port.
#[derive(Debug)]
pub struct ResultStore<S: StoragePort> {
    storage: S,
}

impl<S: StoragePort> ResultStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Append a result to the kind's history and return its assigned id.
    pub fn save_result(&mut self, kind: TestKind, mut result: TestResult) -> AthleteResult<String> {
        if result.kind() != kind {
            return Err(AthleteError::storage(format!(
                "cannot store a {} result under {kind}",
                result.kind()
            )));
        }

        let mut results = self.list_results(kind)?;
        let id = format!("{kind}-{:04}", results.len() + 1);
        result.id = Some(id.clone());
        results.push(result);

        self.storage
            .set(&results_key(kind), serde_json::to_value(&results)?)?;
        tracing::info!(kind = %kind, id = %id, "Stored test result");
        Ok(id)
    }

    /// All stored results of a kind, oldest first.
    pub fn list_results(&self, kind: TestKind) -> AthleteResult<Vec<TestResult>> {
        match self.storage.get(&results_key(kind))? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(vec![]),
        }
    }

    pub fn save_calibration(
        &mut self,
        kind: TestKind,
        calibration: &StoredCalibration,
    ) -> AthleteResult<()> {
        if calibration.kind != kind {
            return Err(AthleteError::storage(format!(
                "cannot store a {} calibration under {kind}",
                calibration.kind
            )));
        }
        self.storage
            .set(&calibration_key(kind), serde_json::to_value(calibration)?)
    }

    pub fn load_calibration(&self, kind: TestKind) -> AthleteResult<Option<StoredCalibration>> {
        match self.storage.get(&calibration_key(kind))? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn delete_calibration(&mut self, kind: TestKind) -> AthleteResult<bool> {
        self.storage.delete(&calibration_key(kind))
    }
}
