//! JSON file-backed settings store
//!
//! Keeps the rig's settings in a small JSON object keyed by store address.
//! Every write is flushed to disk so a killed process loses nothing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pbitx_control::store::ERASED;
use pbitx_control::PersistentStore;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors reading or writing the store file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings store persisted to a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<u16, u32>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened store {} with {} keys", path.display(), values.len());
        Ok(Self { path, values })
    }

    /// Open the store, starting empty if the file cannot be read
    ///
    /// The rig then boots on defaults; the broken file is overwritten on
    /// the next write.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(path.clone()) {
            Ok(store) => store,
            Err(e) => {
                warn!("Ignoring unreadable store {}: {}", path.display(), e);
                Self {
                    path,
                    values: BTreeMap::new(),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write the whole store to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl PersistentStore for JsonFileStore {
    fn get(&self, key: u16) -> u32 {
        self.values.get(&key).copied().unwrap_or(ERASED)
    }

    fn put(&mut self, key: u16, value: u32) {
        if self.values.insert(key, value) == Some(value) {
            return;
        }
        if let Err(e) = self.flush() {
            warn!("Failed to save store {}: {}", self.path.display(), e);
        }
    }
}
