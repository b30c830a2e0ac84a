//! TTL-bound key/value storage shared between requests.
//!
//! Two things outlive a single request: the part catalog and the eviction
//! lock. Both live in a [`TransientStore`] and disappear purely by expiry;
//! nothing is mutated in place once written.
//!
//! - [`MemoryStore`] is process-local and suits tests and single-process use.
//! - [`FileStore`] keeps one JSON file per key in a directory and serializes
//!   every operation with an exclusive OS file lock, so independent worker
//!   processes observe each other's entries.

use crate::error::{AvatarError, AvatarResult};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// A keyed store whose entries expire after a time-to-live.
pub trait TransientStore: Send + Sync {
    /// Returns the value for `key` unless it is absent or expired.
    fn get(&self, key: &str) -> AvatarResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous entry.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> AvatarResult<()>;

    /// Stores `value` only if no live entry exists for `key`.
    ///
    /// Returns `true` if this call created the entry. Atomic with respect to
    /// every other caller sharing the store.
    fn add(&self, key: &str, value: &str, ttl: Duration) -> AvatarResult<bool>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> AvatarResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    /// Expiry as milliseconds since the Unix epoch.
    expires_at: i64,
}

impl StoredEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            value: value.to_string(),
            expires_at: now_millis().saturating_add(ttl_ms),
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at > now_millis()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Process-local store backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> AvatarResult<std::sync::MutexGuard<'_, HashMap<String, StoredEntry>>> {
        self.entries
            .lock()
            .map_err(|_| AvatarError::store("memory store mutex poisoned"))
    }
}

impl TransientStore for MemoryStore {
    fn get(&self, key: &str) -> AvatarResult<Option<String>> {
        let mut entries = self.entries()?;
        match entries.get(key) {
            Some(entry) if entry.is_live() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> AvatarResult<()> {
        self.entries()?
            .insert(key.to_string(), StoredEntry::new(value, ttl));
        Ok(())
    }

    fn add(&self, key: &str, value: &str, ttl: Duration) -> AvatarResult<bool> {
        let mut entries = self.entries()?;
        if entries.get(key).is_some_and(StoredEntry::is_live) {
            return Ok(false);
        }
        entries.insert(key.to_string(), StoredEntry::new(value, ttl));
        Ok(true)
    }

    fn delete(&self, key: &str) -> AvatarResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

// ============================================================================
// FileStore
// ============================================================================

/// Cross-process store keeping one JSON document per key.
///
/// Layout:
///
/// ```text
/// {dir}/.store.lock        exclusive lock held for every operation
/// {dir}/{key}.json         {"value": "...", "expires_at": 1700000000000}
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> AvatarResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| AvatarError::io(format!("creating store directory {}", dir.display()), e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let plain = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        let name = if plain {
            key.to_string()
        } else {
            hex::encode(key.as_bytes())
        };
        self.dir.join(format!("{name}.json"))
    }

    /// Runs `op` while holding the store-wide exclusive lock.
    fn locked<T>(&self, op: impl FnOnce() -> AvatarResult<T>) -> AvatarResult<T> {
        let lock_path = self.dir.join(".store.lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| AvatarError::io(format!("opening {}", lock_path.display()), e))?;
        file.lock_exclusive()
            .map_err(|e| AvatarError::io(format!("locking {}", lock_path.display()), e))?;

        let result = op();
        // Closing the handle releases the lock as well.
        let _ = FileExt::unlock(&file);
        result
    }

    fn read_entry(&self, key: &str) -> AvatarResult<Option<StoredEntry>> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AvatarError::io(format!("reading {}", path.display()), e)),
        };

        match serde_json::from_str::<StoredEntry>(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // A torn or foreign file counts as absent; it is overwritten on the next write.
                debug!(path = %path.display(), error = %e, "ignoring unreadable store entry");
                Ok(None)
            }
        }
    }

    fn write_entry(&self, key: &str, entry: &StoredEntry) -> AvatarResult<()> {
        let path = self.entry_path(key);
        let json = serde_json::to_string(entry).map_err(|e| AvatarError::store(e.to_string()))?;
        fs::write(&path, json).map_err(|e| AvatarError::io(format!("writing {}", path.display()), e))
    }

    fn remove_entry(&self, key: &str) -> AvatarResult<()> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AvatarError::io(format!("removing {}", path.display()), e)),
        }
    }
}

impl TransientStore for FileStore {
    fn get(&self, key: &str) -> AvatarResult<Option<String>> {
        self.locked(|| match self.read_entry(key)? {
            Some(entry) if entry.is_live() => Ok(Some(entry.value)),
            Some(_) => {
                self.remove_entry(key)?;
                Ok(None)
            }
            None => Ok(None),
        })
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> AvatarResult<()> {
        self.locked(|| self.write_entry(key, &StoredEntry::new(value, ttl)))
    }

    fn add(&self, key: &str, value: &str, ttl: Duration) -> AvatarResult<bool> {
        self.locked(|| {
            if self.read_entry(key)?.is_some_and(|e| e.is_live()) {
                return Ok(false);
            }
            self.write_entry(key, &StoredEntry::new(value, ttl))?;
            Ok(true)
        })
    }

    fn delete(&self, key: &str) -> AvatarResult<()> {
        self.locked(|| self.remove_entry(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn exercise(store: &dyn TransientStore) {
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("catalog", "{}", HOUR).unwrap();
        assert_eq!(store.get("catalog").unwrap().as_deref(), Some("{}"));

        assert!(store.add("lock", "1", HOUR).unwrap());
        assert!(!store.add("lock", "2", HOUR).unwrap());
        assert_eq!(store.get("lock").unwrap().as_deref(), Some("1"));

        store.delete("lock").unwrap();
        assert!(store.add("lock", "3", HOUR).unwrap());
        store.delete("never-written").unwrap();
    }

    fn expiry(store: &dyn TransientStore) {
        store.set("short", "v", Duration::ZERO).unwrap();
        assert_eq!(store.get("short").unwrap(), None);

        assert!(store.add("short-lock", "1", Duration::ZERO).unwrap());
        // The previous entry is already expired, so the flag can be taken again.
        assert!(store.add("short-lock", "1", HOUR).unwrap());
    }

    #[test]
    fn memory_store_semantics() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn memory_store_expiry() {
        expiry(&MemoryStore::new());
    }

    #[test]
    fn file_store_semantics() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileStore::open(dir.path().join("store")).unwrap());
    }

    #[test]
    fn file_store_expiry() {
        let dir = tempfile::tempdir().unwrap();
        expiry(&FileStore::open(dir.path()).unwrap());
    }

    #[test]
    fn file_store_is_shared_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let a = FileStore::open(dir.path()).unwrap();
        let b = FileStore::open(dir.path()).unwrap();

        assert!(a.add("avatar_forge_evict_generated", "1", HOUR).unwrap());
        assert!(!b.add("avatar_forge_evict_generated", "1", HOUR).unwrap());
    }

    #[test]
    fn file_store_encodes_unusual_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("parts/../monster", "x", HOUR).unwrap();
        assert_eq!(store.get("parts/../monster").unwrap().as_deref(), Some("x"));
        assert!(dir.path().join(format!("{}.json", hex::encode("parts/../monster"))).exists());
    }

    #[test]
    fn file_store_ignores_corrupt_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), "not json").unwrap();
        assert_eq!(store.get("broken").unwrap(), None);
        assert!(store.add("broken", "ok", HOUR).unwrap());
    }
}
