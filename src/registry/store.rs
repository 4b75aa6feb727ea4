//! Durable registry storage.
//!
//! [`RegistryFile`] performs the disk I/O; [`RegistryStore`] owns the
//! in-memory [`Registry`] and serializes every mutation through a single
//! critical section so concurrent per-tool operations cannot interleave
//! their writes.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Result, XeError};

use super::{Registry, ToolRecord};

/// The registry file on disk.
#[derive(Debug, Clone)]
pub struct RegistryFile {
    path: PathBuf,
}

impl RegistryFile {
    /// Create a handle for the registry at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temp file used during atomic writes.
    pub fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Load the registry from disk.
    ///
    /// A missing file is an empty registry. Anything that cannot be parsed
    /// into a consistent registry is [`XeError::CorruptRegistry`].
    pub fn load(&self) -> Result<Registry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Registry::new()),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(self.corrupt(format!("not valid UTF-8: {}", e)))
            }
            Err(e) => return Err(XeError::Io(e)),
        };

        let registry: Registry =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;

        if registry.version > Registry::CURRENT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported schema version {} (this build understands {})",
                registry.version,
                Registry::CURRENT_VERSION
            )));
        }

        if let Some((key, record)) = registry.tools.iter().find(|(k, r)| **k != r.name) {
            return Err(self.corrupt(format!(
                "entry '{}' holds a record for '{}'",
                key, record.name
            )));
        }

        tracing::debug!(path = %self.path.display(), tools = registry.len(), "Loaded registry");
        Ok(registry)
    }

    /// Save the registry using atomic write.
    ///
    /// Uses the write-to-temp-then-rename pattern so a crash mid-write
    /// never leaves a half-written registry.
    pub fn save(&self, registry: &Registry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.persistence(e))?;
        }

        let content = serde_json::to_string_pretty(registry).map_err(|e| XeError::Persistence {
            path: self.path.clone(),
            message: format!("Failed to serialize registry: {}", e),
        })?;

        let temp_path = self.temp_path();
        let written = write_synced(&temp_path, content.as_bytes())
            .and_then(|()| fs::rename(&temp_path, &self.path));

        if let Err(e) = written {
            if temp_path.is_file() {
                let _ = fs::remove_file(&temp_path);
            }
            return Err(self.persistence(e));
        }

        tracing::debug!(path = %self.path.display(), tools = registry.len(), "Saved registry");
        Ok(())
    }

    fn corrupt(&self, message: String) -> XeError {
        XeError::CorruptRegistry {
            path: self.path.clone(),
            message,
        }
    }

    fn persistence(&self, err: std::io::Error) -> XeError {
        XeError::Persistence {
            path: self.path.clone(),
            message: err.to_string(),
        }
    }
}

fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

/// Single-writer owner of the registry.
#[derive(Debug)]
pub struct RegistryStore {
    file: RegistryFile,
    registry: Mutex<Registry>,
}

impl RegistryStore {
    /// Load the registry at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let file = RegistryFile::new(path);
        let registry = file.load()?;
        Ok(Self {
            file,
            registry: Mutex::new(registry),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Copy of the current registry.
    pub fn snapshot(&self) -> Registry {
        self.lock().clone()
    }

    /// Copy of one record.
    pub fn get(&self, name: &str) -> Option<ToolRecord> {
        self.lock().get(name).cloned()
    }

    /// Registered tool names, in order.
    pub fn names(&self) -> Vec<String> {
        self.lock().names()
    }

    /// Apply a mutation and persist it.
    ///
    /// The closure runs against a copy; the in-memory registry is replaced
    /// only after the copy has been saved. A failed save leaves both the
    /// in-memory and on-disk registry as they were.
    pub fn transact<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> Result<T> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let value = f(&mut next);

        if next != *guard {
            self.file.save(&next)?;
            *guard = next;
        }

        Ok(value)
    }

    /// Write the current registry to disk, creating the file if needed.
    pub fn flush(&self) -> Result<()> {
        let guard = self.lock();
        self.file.save(&guard)
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::record::sample_record;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn registry_path(temp: &TempDir) -> PathBuf {
        temp.path().join("tools.json")
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let temp = TempDir::new().unwrap();
        let file = RegistryFile::new(registry_path(&temp));
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn round_trip_empty_registry() {
        let temp = TempDir::new().unwrap();
        let file = RegistryFile::new(registry_path(&temp));

        let registry = Registry::new();
        file.save(&registry).unwrap();
        assert_eq!(file.load().unwrap(), registry);
    }

    #[test]
    fn round_trip_one_record() {
        let temp = TempDir::new().unwrap();
        let file = RegistryFile::new(registry_path(&temp));

        let mut registry = Registry::new();
        let mut record = sample_record("fd", "v10.2.0");
        record.checksum = Some("sha256:00ff".to_string());
        registry.put(record);

        file.save(&registry).unwrap();
        assert_eq!(file.load().unwrap(), registry);
    }

    #[test]
    fn round_trip_many_records_with_unusual_characters() {
        let temp = TempDir::new().unwrap();
        let file = RegistryFile::new(registry_path(&temp));

        let mut registry = Registry::new();
        let names = [
            "plain",
            "with space",
            "quote\"d",
            "uni-☃-code",
            "back\\slash",
            "new\nline",
        ];
        for name in names {
            let mut record = sample_record(name, "1.0.0");
            record.branch = Some(format!("feature/{}-ü", name));
            registry.put(record);
        }

        file.save(&registry).unwrap();
        let loaded = file.load().unwrap();
        assert_eq!(loaded, registry);
        assert_eq!(loaded.len(), 6);
    }

    #[test]
    fn save_uses_atomic_write() {
        let temp = TempDir::new().unwrap();
        let file = RegistryFile::new(registry_path(&temp));

        file.save(&Registry::new()).unwrap();

        assert!(
            !file.temp_path().exists(),
            "Temp file should not exist after successful save"
        );
        assert!(file.path().exists());
    }

    #[test]
    fn garbage_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = registry_path(&temp);
        fs::write(&path, "{ not json").unwrap();

        let result = RegistryFile::new(&path).load();
        assert!(matches!(result, Err(XeError::CorruptRegistry { .. })));
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let file = RegistryFile::new(registry_path(&temp));

        let mut registry = Registry::new();
        registry.put(sample_record("fd", "1.0.0"));
        file.save(&registry).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        fs::write(file.path(), &content[..content.len() / 2]).unwrap();

        assert!(matches!(
            file.load(),
            Err(XeError::CorruptRegistry { .. })
        ));
    }

    #[test]
    fn mismatched_key_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let file = RegistryFile::new(registry_path(&temp));

        let mut registry = Registry::new();
        registry
            .tools
            .insert("alias".to_string(), sample_record("fd", "1.0.0"));
        file.save(&registry).unwrap();

        let err = file.load().unwrap_err();
        assert!(err.to_string().contains("alias"));
    }

    #[test]
    fn future_schema_version_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = registry_path(&temp);
        fs::write(&path, r#"{"version": 99, "tools": {}}"#).unwrap();

        assert!(matches!(
            RegistryFile::new(&path).load(),
            Err(XeError::CorruptRegistry { .. })
        ));
    }

    #[test]
    fn save_failure_is_persistence_error() {
        let temp = TempDir::new().unwrap();
        let file = RegistryFile::new(registry_path(&temp));

        // A non-empty directory where the temp file should go.
        fs::create_dir_all(file.temp_path().join("blocker")).unwrap();

        let result = file.save(&Registry::new());
        assert!(matches!(result, Err(XeError::Persistence { .. })));
        assert!(file.temp_path().is_dir());
    }

    #[test]
    fn store_open_propagates_corruption() {
        let temp = TempDir::new().unwrap();
        let path = registry_path(&temp);
        fs::write(&path, "[]").unwrap();

        assert!(matches!(
            RegistryStore::open(&path),
            Err(XeError::CorruptRegistry { .. })
        ));
    }

    #[test]
    fn transact_persists_changes() {
        let temp = TempDir::new().unwrap();
        let path = registry_path(&temp);
        let store = RegistryStore::open(&path).unwrap();

        store
            .transact(|r| r.put(sample_record("fd", "1.0.0")))
            .unwrap();

        assert!(store.get("fd").is_some());
        let reloaded = RegistryStore::open(&path).unwrap();
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[test]
    fn failed_transact_leaves_registry_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = registry_path(&temp);
        let store = RegistryStore::open(&path).unwrap();
        store
            .transact(|r| r.put(sample_record("fd", "1.0.0")))
            .unwrap();
        let before = store.snapshot();
        let on_disk_before = fs::read_to_string(&path).unwrap();

        fs::create_dir_all(RegistryFile::new(&path).temp_path().join("blocker")).unwrap();

        let result = store.transact(|r| r.put(sample_record("fd", "2.0.0")));
        assert!(matches!(result, Err(XeError::Persistence { .. })));
        assert_eq!(store.snapshot(), before);
        assert_eq!(fs::read_to_string(&path).unwrap(), on_disk_before);
    }

    #[test]
    fn transact_without_changes_skips_write() {
        let temp = TempDir::new().unwrap();
        let path = registry_path(&temp);
        let store = RegistryStore::open(&path).unwrap();

        let count = store.transact(|r| r.len()).unwrap();
        assert_eq!(count, 0);
        assert!(!path.exists());
    }

    #[test]
    fn concurrent_transactions_do_not_lose_writes() {
        let temp = TempDir::new().unwrap();
        let path = registry_path(&temp);
        let store = Arc::new(RegistryStore::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .transact(|r| r.put(sample_record(&format!("tool{}", i), "1.0.0")))
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let reloaded = RegistryStore::open(&path).unwrap();
        assert_eq!(reloaded.snapshot().len(), 8);
    }

    #[test]
    fn flush_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = registry_path(&temp);
        let store = RegistryStore::open(&path).unwrap();

        store.flush().unwrap();
        assert!(path.exists());
    }
}
