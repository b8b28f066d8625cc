use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::updater::types::{UpdaterError, UpdaterResult};

/// File name of the default on-disk store
const STORE_FILE: &str = "store.json";

/// Directory under the platform data dir
const STORE_DIR: &str = "license-updater";

/// Source of "now" for expiry checks and timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if let Ok(delta) = chrono::Duration::from_std(by) {
            *now += delta;
        }
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Persisted key-value settings and expiring cache entries.
///
/// Expired entries must read back as absent. Implementations are free to
/// evict lazily.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> UpdaterResult<Option<String>>;

    /// Store a value, optionally expiring after `ttl`
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> UpdaterResult<()>;

    fn delete(&self, key: &str) -> UpdaterResult<()>;
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct StoredEntry {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn new(value: &str, ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl));

        Self {
            value: value.to_string(),
            expires_at,
        }
    }

    fn live_value(&self, now: DateTime<Utc>) -> Option<&str> {
        match self.expires_at {
            Some(expires_at) if now >= expires_at => None,
            _ => Some(&self.value),
        }
    }
}

/// In-memory store, one per process
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> UpdaterResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| UpdaterError::Storage(e.to_string()))?;
        let now = self.clock.now();
        Ok(entries
            .get(key)
            .and_then(|entry| entry.live_value(now))
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> UpdaterResult<()> {
        let entry = StoredEntry::new(value, ttl, self.clock.now());
        self.entries
            .write()
            .map_err(|e| UpdaterError::Storage(e.to_string()))?
            .insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, key: &str) -> UpdaterResult<()> {
        self.entries
            .write()
            .map_err(|e| UpdaterError::Storage(e.to_string()))?
            .remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

/// JSON file store with an in-memory copy of its contents
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    /// Open (or create on first write) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> UpdaterResult<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> UpdaterResult<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| UpdaterError::Storage(format!("Failed to read store: {}", e)))?;
            serde_json::from_str(&contents)
                .map_err(|e| UpdaterError::Storage(format!("Failed to parse store: {}", e)))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            clock,
        })
    }

    /// `<data dir>/license-updater/store.json`, creating the directory
    pub fn default_path() -> UpdaterResult<PathBuf> {
        let dir = dirs::data_local_dir()
            .ok_or_else(|| UpdaterError::Storage("Failed to get local data dir".to_string()))?
            .join(STORE_DIR);

        std::fs::create_dir_all(&dir)
            .map_err(|e| UpdaterError::Storage(format!("Failed to create data dir: {}", e)))?;

        Ok(dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &HashMap<String, StoredEntry>) -> UpdaterResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    UpdaterError::Storage(format!("Failed to create store dir: {}", e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| UpdaterError::Storage(format!("Failed to serialize store: {}", e)))?;

        std::fs::write(&self.path, json)
            .map_err(|e| UpdaterError::Storage(format!("Failed to write store: {}", e)))
    }

    fn lock(&self) -> UpdaterResult<std::sync::MutexGuard<'_, HashMap<String, StoredEntry>>> {
        self.entries
            .lock()
            .map_err(|e| UpdaterError::Storage(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> UpdaterResult<Option<String>> {
        let entries = self.lock()?;
        let now = self.clock.now();
        Ok(entries
            .get(key)
            .and_then(|entry| entry.live_value(now))
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> UpdaterResult<()> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), StoredEntry::new(value, ttl, self.clock.now()));
        self.save(&entries)
    }

    fn delete(&self, key: &str) -> UpdaterResult<()> {
        let mut entries = self.lock()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .finish()
    }
}
