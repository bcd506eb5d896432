//! File-backed key-value store
//!
//! Persists the whole store as a single JSON object in an XDG-compliant
//! cache directory (`~/.cache/vilibrity/storage.json` on Linux), so cached
//! responses survive between runs of the CLI.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use directories::ProjectDirs;
use log::warn;

use super::{KeyValueStore, StoreError};

/// Name of the file holding the serialized store
const STORAGE_FILE: &str = "storage.json";

/// Durable store persisted to a JSON file on disk
///
/// Every operation reads the file, applies the change and writes it back
/// through a temporary file and a rename. A file that is not valid JSON is
/// read as empty and replaced on the next write. An optional byte quota mirrors
/// the capacity limit of browser storage: a `set` that would grow the file
/// beyond it fails with [`StoreError::QuotaExceeded`] and leaves the file
/// untouched.
#[derive(Debug)]
pub struct FileStore {
    /// Directory where the storage file lives
    dir: PathBuf,
    /// Maximum size of the serialized store in bytes
    quota: Option<usize>,
    /// Serializes read-modify-write cycles within this process
    guard: Mutex<()>,
}

impl FileStore {
    /// Creates a FileStore in the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "vilibrity")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a FileStore rooted at a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            quota: None,
            guard: Mutex::new(()),
        }
    }

    /// Limits the serialized store to `bytes`
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Directory holding the storage file
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn storage_path(&self) -> PathBuf {
        self.dir.join(STORAGE_FILE)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.guard
            .lock()
            .map_err(|_| StoreError::Unavailable("file store lock poisoned".to_string()))
    }

    /// Reads the storage file; the flag is set when its contents were unusable
    fn load(&self) -> Result<(BTreeMap<String, String>, bool), StoreError> {
        let path = self.storage_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((BTreeMap::new(), false)),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok((BTreeMap::new(), false));
        }
        match serde_json::from_str(&content) {
            Ok(entries) => Ok((entries, false)),
            Err(e) => {
                warn!("Storage file {} is corrupt, starting empty: {}", path.display(), e);
                Ok((BTreeMap::new(), true))
            }
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string(entries)?;
        if let Some(quota) = self.quota {
            if json.len() > quota {
                return Err(StoreError::QuotaExceeded {
                    needed: json.len(),
                    quota,
                });
            }
        }

        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{}.tmp", STORAGE_FILE));
        fs::write(&tmp, json)?;
        fs::rename(tmp, self.storage_path())?;
        Ok(())
    }

    fn with_entries<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> Option<R>,
    ) -> Result<Option<R>, StoreError> {
        let _held = self.lock()?;
        let (mut entries, corrupt) = self.load()?;
        let before = entries.len();
        let result = f(&mut entries);
        if result.is_some() || corrupt || entries.len() != before {
            self.persist(&entries)?;
        }
        Ok(result)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _held = self.lock()?;
        Ok(self.load()?.0.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
            Some(())
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.with_entries::<()>(|entries| {
            entries.remove(key);
            None
        })?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let _held = self.lock()?;
        Ok(self.load()?.0.into_keys().collect())
    }

    fn entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        let _held = self.lock()?;
        Ok(self.load()?.0.into_iter().collect())
    }

    fn remove_many(&self, keys: &[String]) -> Result<(), StoreError> {
        self.with_entries::<()>(|entries| {
            for key in keys {
                entries.remove(key);
            }
            None
        })?;
        Ok(())
    }
}
