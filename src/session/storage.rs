//! Durable key-value storage for the session pair
//!
//! The session is persisted as two keys, `token` and `currentUser` (a
//! JSON-encoded principal). Both are always written and cleared together.

use crate::error::{ClientError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Key holding the opaque session token
pub const TOKEN_KEY: &str = "token";
/// Key holding the JSON-encoded principal
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Process-wide durable storage.
///
/// `put_pair` and `remove_pair` must be all-or-nothing: a reader never
/// observes one key of the pair without the other.
pub trait SessionStorage: Send + Sync {
    /// Read a single key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write both entries in one step
    fn put_pair(&self, first: (&str, &str), second: (&str, &str)) -> Result<()>;

    /// Remove both keys in one step
    fn remove_pair(&self, first: &str, second: &str) -> Result<()>;
}

/// In-memory storage, lost at process exit
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put_pair(&self, first: (&str, &str), second: (&str, &str)) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(first.0.to_string(), first.1.to_string());
        entries.insert(second.0.to_string(), second.1.to_string());
        Ok(())
    }

    fn remove_pair(&self, first: &str, second: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(first);
        entries.remove(second);
        Ok(())
    }
}

/// JSON object file
///
/// Every write replaces the whole file through a sibling temp file and a
/// rename, so the pair changes in one filesystem operation.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            ClientError::Storage(format!("corrupt session file {}: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn put_pair(&self, first: (&str, &str), second: (&str, &str)) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A corrupt file is replaced rather than blocking a fresh login
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(first.0.to_string(), first.1.to_string());
        entries.insert(second.0.to_string(), second.1.to_string());
        self.write_all(&entries)
    }

    fn remove_pair(&self, first: &str, second: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all().unwrap_or_default();
        entries.remove(first);
        entries.remove(second);
        self.write_all(&entries)
    }
}
