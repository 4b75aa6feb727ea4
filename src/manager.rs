//! Tool manager.
//!
//! The entry point used by the CLI. Opening a manager loads the registry
//! and cleans up after any interrupted run.
//!
//! # Example
//!
//! ```no_run
//! use xecli::config::{AppPaths, Config};
//! use xecli::manager::ToolManager;
//!
//! let config = Config::load(&AppPaths::discover()).unwrap();
//! let manager = ToolManager::open(&config).unwrap();
//!
//! for record in manager.list_tools() {
//!     println!("{} {}", record.name, record.version);
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::fetch::{AvailableTool, Fetcher, GithubFetcher};
use crate::install::{FsOps, InstallEngine, OperationResult, RecoveryReport};
use crate::registry::{RegistryStore, ToolRecord};
use crate::update::{CheckReport, UpdateCoordinator};

/// Installs, checks, updates and removes tools.
pub struct ToolManager {
    store: Arc<RegistryStore>,
    engine: Arc<InstallEngine>,
    coordinator: UpdateCoordinator,
    recovery: RecoveryReport,
}

impl ToolManager {
    /// Open a manager backed by the GitHub API.
    ///
    /// Fails with `CorruptRegistry` if the registry cannot be trusted.
    pub fn open(config: &Config) -> Result<Self> {
        let fetcher = GithubFetcher::from_config(config)?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Open a manager with a custom fetcher.
    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        Self::build(config, fetcher, FsOps::default())
    }

    /// Open a manager with custom fetcher and filesystem primitives.
    pub fn with_fs_ops(config: &Config, fetcher: Arc<dyn Fetcher>, fs: FsOps) -> Result<Self> {
        Self::build(config, fetcher, fs)
    }

    fn build(config: &Config, fetcher: Arc<dyn Fetcher>, fs: FsOps) -> Result<Self> {
        let jobs = config.jobs()?;
        let store = Arc::new(RegistryStore::open(config.paths().registry_file())?);
        let engine = Arc::new(
            InstallEngine::new(fetcher, Arc::clone(&store), config.download_dir()).with_fs_ops(fs),
        );
        let recovery = engine.recover();
        let coordinator = UpdateCoordinator::new(Arc::clone(&engine), jobs);

        Ok(Self {
            store,
            engine,
            coordinator,
            recovery,
        })
    }

    /// What was cleaned up when the manager was opened.
    pub fn recovery(&self) -> &RecoveryReport {
        &self.recovery
    }

    pub fn registry_path(&self) -> &Path {
        self.store.path()
    }

    pub fn download_dir(&self) -> PathBuf {
        self.engine.layout().root().to_path_buf()
    }

    pub fn install_tool(&self, name: &str, branch: Option<&str>) -> OperationResult {
        self.engine.install(name, branch)
    }

    pub fn check_tool(&self, name: &str) -> Result<CheckReport> {
        self.coordinator.check(name)
    }

    pub fn check_all_tools(&self) -> BTreeMap<String, CheckReport> {
        self.coordinator.check_all()
    }

    pub fn update_tool(&self, name: &str) -> OperationResult {
        self.coordinator.update(name)
    }

    pub fn update_all_tools(&self) -> Vec<OperationResult> {
        self.coordinator.update_all()
    }

    pub fn remove_tool(&self, name: &str) -> OperationResult {
        self.engine.remove(name)
    }

    /// Record of one installed tool.
    pub fn tool(&self, name: &str) -> Option<ToolRecord> {
        self.store.get(name)
    }

    /// Installed tools, in name order.
    pub fn list_tools(&self) -> Vec<ToolRecord> {
        self.store.snapshot().iter().cloned().collect()
    }

    /// Tools that can be installed.
    pub fn available_tools(&self) -> Result<Vec<AvailableTool>> {
        self.engine.fetcher().list_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppPaths;
    use crate::error::XeError;
    use crate::fetch::MockFetcher;
    use crate::install::Outcome;
    use std::fs;
    use tempfile::TempDir;

    fn manager(temp: &TempDir, fetcher: &Arc<MockFetcher>) -> Result<ToolManager> {
        let config = Config::empty(&AppPaths::new(temp.path()));
        ToolManager::with_fetcher(&config, fetcher.clone() as Arc<dyn Fetcher>)
    }

    #[test]
    fn lifecycle() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.publish("fd", None, "1.0.0", b"fd-1");
        let manager = manager(&temp, &fetcher).unwrap();

        assert_eq!(manager.install_tool("fd", None).outcome, Outcome::Installed);
        assert_eq!(manager.list_tools().len(), 1);
        assert_eq!(manager.download_dir(), temp.path().join("tools"));

        fetcher.publish("fd", None, "1.1.0", b"fd-1.1");
        assert_eq!(manager.update_tool("fd").outcome, Outcome::Updated);
        assert_eq!(manager.remove_tool("fd").outcome, Outcome::Removed);
        assert!(manager.list_tools().is_empty());
    }

    #[test]
    fn corrupt_registry_is_fatal() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("tools.json"), "{ not json").unwrap();

        let err = manager(&temp, &Arc::new(MockFetcher::new())).err().unwrap();
        assert!(matches!(err, XeError::CorruptRegistry { .. }));
    }

    #[test]
    fn open_recovers_interrupted_install() {
        let temp = TempDir::new().unwrap();
        let stale = temp.path().join("tools/.staging/fd-1-0");
        fs::create_dir_all(&stale).unwrap();

        let manager = manager(&temp, &Arc::new(MockFetcher::new())).unwrap();

        assert_eq!(manager.recovery().staging_removed, 1);
        assert!(!stale.exists());
    }

    #[test]
    fn available_tools_from_fetcher() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.publish("fd", None, "1.0.0", b"x");

        let tools = manager(&temp, &fetcher).unwrap().available_tools().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "fd");
    }
}
