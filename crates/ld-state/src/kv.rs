//! Key-value storage backends
//!
//! The store keeps its whole state as one JSON string under a single
//! namespaced key. Backends only need to map keys to strings:
//! - `FileKvStore`: one JSON object on disk, rewritten on every `set`
//! - `MemoryKvStore`: in-process map for tests and throwaway sessions

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use ld_core::LdResult;

/// Key the lottery state is stored under
pub const STORAGE_KEY: &str = "lottery-storage";

/// Minimal string key-value store
pub trait KvStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> LdResult<Option<String>>;

    /// Write a value
    fn set(&mut self, key: &str, value: String) -> LdResult<()>;

    /// Delete a value (missing keys are fine)
    fn remove(&mut self, key: &str) -> LdResult<()>;
}

/// JSON file backed store
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileKvStore {
    /// Open the store at the standard location
    pub fn open_default() -> LdResult<Self> {
        Self::open(Self::default_path())
    }

    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file is an empty store; a file that is not a JSON object
    /// of strings is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> LdResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        log::debug!("Opened storage {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get default storage file path
    pub fn default_path() -> PathBuf {
        let base = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .map(|h| h.join("Library/Application Support/LuckyDraw"))
                .unwrap_or_else(|| PathBuf::from("."))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("LuckyDraw"))
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            // Linux/other
            dirs::config_dir()
                .map(|d| d.join("luckydraw"))
                .unwrap_or_else(|| PathBuf::from("."))
        };
        base.join("storage.json")
    }

    fn flush(&self) -> LdResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> LdResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> LdResult<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> LdResult<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    writes: u64,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls so far
    pub fn writes(&self) -> u64 {
        self.inner.lock().writes
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> LdResult<Option<String>> {
        Ok(self.inner.lock().entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> LdResult<()> {
        let mut inner = self.inner.lock();
        inner.entries.insert(key.to_string(), value);
        inner.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> LdResult<()> {
        self.inner.lock().entries.remove(key);
        Ok(())
    }
}
