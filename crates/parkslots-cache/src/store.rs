//! File-backed key-value store
//!
//! All entries live in one JSON object on disk. The file is read once when
//! the store is opened and rewritten in full on every mutation:
//! - Parent directories are created on open
//! - Writes go to a temporary file in the same directory, which is then
//!   renamed over the target, so readers never see a partial file
//! - Access within the process is serialized by a mutex

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use parkslots_core::ports::{IKeyValueStore, StoreError};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

type Entries = BTreeMap<String, String>;

/// Key-value store persisted as a JSON file
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FileKeyValueStore {
    /// Opens the store at `path`, creating parent directories as needed
    ///
    /// A missing or empty file is an empty store.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` if the directory cannot be created or the file read
    /// - `StoreError::Corrupt` if the file is not a JSON object of strings
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(format!(
                    "Failed to create storage directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let entries = match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Entries::new(),
            Ok(content) => serde_json::from_str::<Entries>(&content).map_err(|e| {
                StoreError::Corrupt(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        info!(
            path = %path.display(),
            entries = entries.len(),
            "Key-value store opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    /// Like [`FileKeyValueStore::open`], but starts empty if the file is
    /// corrupt. The bad file is replaced on the next write.
    pub fn open_or_reset(path: &Path) -> Result<Self, StoreError> {
        match Self::open(path) {
            Err(StoreError::Corrupt(reason)) => {
                warn!(reason = %reason, "Discarding unreadable key-value store");
                Ok(Self {
                    path: path.to_path_buf(),
                    entries: Mutex::new(Entries::new()),
                })
            }
            other => other,
        }
    }

    /// Platform-appropriate default location of the store
    ///
    /// Typically `$XDG_DATA_HOME/parkslots/storage.json` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("parkslots")
            .join("storage.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All keys currently stored, sorted
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Io("store lock poisoned".to_string()))
    }

    fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StoreError::Io(format!("Failed to serialize store: {e}")))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create temp file: {e}")))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StoreError::Io(format!("Failed to write temp file: {e}")))?;
        tmp.persist(&self.path).map_err(|e| {
            StoreError::Io(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), "Key-value store written");
        Ok(())
    }
}

impl IKeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            // Keep memory consistent with disk
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}
