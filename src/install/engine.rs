//! Install engine.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::locks::NameLocks;
use super::staging::{sanitize_artifact_name, validate_name, FsOps, Layout, RecoveryReport};
use super::verify::verify_artifact;
use super::OperationResult;
use crate::error::{Result, XeError};
use crate::fetch::{current_os, is_excluded, Fetcher, RemoteMeta};
use crate::registry::{RegistryStore, ToolRecord};
use crate::version::describe_change;

/// Installs, replaces and removes single tools.
///
/// Every operation holds the tool's name lock from the first registry read
/// until the registry has been written, so concurrent operations on the
/// same tool are serialised while distinct tools proceed in parallel.
pub struct InstallEngine {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<RegistryStore>,
    layout: Layout,
    locks: NameLocks,
    os: String,
}

impl InstallEngine {
    /// Create an engine that installs into `download_dir`.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<RegistryStore>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            store,
            layout: Layout::new(download_dir),
            locks: NameLocks::new(),
            os: current_os().to_string(),
        }
    }

    /// Replace the filesystem primitives used to move and delete installs.
    pub fn with_fs_ops(mut self, fs: FsOps) -> Self {
        self.layout = self.layout.with_fs_ops(fs);
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Clean up staging and backup directories left by an interrupted run.
    pub fn recover(&self) -> RecoveryReport {
        let report = self.layout.recover(&self.store.snapshot());
        if !report.is_empty() {
            info!(
                "Recovered download dir: {} staging dirs removed, {} restored, {} discarded",
                report.staging_removed,
                report.restored.len(),
                report.discarded.len()
            );
        }
        report
    }

    /// Install the latest version of `name` on `branch`.
    ///
    /// `None` is the default branch (latest release). Installing a tool
    /// recorded on another branch switches it.
    pub fn install(&self, name: &str, branch: Option<&str>) -> OperationResult {
        self.locks.with_lock(name, || self.install_locked(name, branch))
    }

    /// Re-resolve an installed tool on its recorded branch and reinstall it
    /// when `stale` says the installed copy should be replaced.
    ///
    /// The record is read, compared and replaced under the tool's lock, so
    /// the decision always sees the last completed operation on the tool.
    /// Returns `None` if the tool is not installed.
    pub fn refresh(
        &self,
        name: &str,
        stale: impl FnOnce(&ToolRecord, &RemoteMeta) -> bool,
    ) -> Option<OperationResult> {
        self.locks.with_lock(name, || {
            let existing = self.store.get(name)?;
            Some(self.refresh_locked(existing, stale))
        })
    }

    /// Like [`refresh`](Self::refresh), but installs a missing tool from the
    /// default branch.
    pub fn refresh_or_install(
        &self,
        name: &str,
        stale: impl FnOnce(&ToolRecord, &RemoteMeta) -> bool,
    ) -> OperationResult {
        self.locks.with_lock(name, || match self.store.get(name) {
            Some(existing) => self.refresh_locked(existing, stale),
            None => {
                info!("{} is not installed; installing", name);
                self.install_locked(name, None)
            }
        })
    }

    /// Delete a tool's artifacts, then its record.
    ///
    /// If the artifacts cannot be deleted the record is kept.
    pub fn remove(&self, name: &str) -> OperationResult {
        self.locks.with_lock(name, || {
            let Some(record) = self.store.get(name) else {
                return OperationResult::failed(
                    name,
                    &XeError::NotInstalled {
                        name: name.to_string(),
                    },
                );
            };

            let path = &record.install_path;
            if path.exists() {
                if let Err(e) = self.layout.remove_install(path) {
                    let err = XeError::disk(path, e);
                    warn!("Failed to remove {}: {}", name, err);
                    return OperationResult::failed(name, &err);
                }
            } else {
                warn!("{} not found, skipping deletion", path.display());
            }

            match self.store.transact(|registry| {
                registry.remove(name);
            }) {
                Ok(()) => {
                    info!("Removed {} {}", name, record.version);
                    OperationResult::removed(name, &record.version)
                }
                Err(e) => {
                    warn!("Failed to remove {} from registry: {}", name, e);
                    OperationResult::failed(name, &e)
                }
            }
        })
    }

    fn install_locked(&self, name: &str, branch: Option<&str>) -> OperationResult {
        let existing = self.store.get(name);
        let result = self
            .resolve(name, branch)
            .and_then(|meta| self.apply(meta, existing.as_ref()));
        finish(name, existing.as_ref(), result)
    }

    fn refresh_locked(
        &self,
        existing: ToolRecord,
        stale: impl FnOnce(&ToolRecord, &RemoteMeta) -> bool,
    ) -> OperationResult {
        let name = existing.name.as_str();
        let meta = match self.resolve(name, existing.branch.as_deref()) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Failed to check {}: {}", name, e);
                return OperationResult::failed(name, &e);
            }
        };

        if !stale(&existing, &meta) {
            debug!("{} {} is up to date", name, existing.version);
            return OperationResult::up_to_date(name, &existing.version);
        }
        let result = self.apply(meta, Some(&existing));
        finish(name, Some(&existing), result)
    }

    fn resolve(&self, name: &str, branch: Option<&str>) -> Result<RemoteMeta> {
        check_name(name)?;
        debug!("Resolving {} on branch {}", name, branch.unwrap_or("default"));
        self.fetcher.get_meta(name, branch)
    }

    /// Stage, verify, promote and record one tool.
    fn apply(&self, meta: RemoteMeta, existing: Option<&ToolRecord>) -> Result<ToolRecord> {
        if let Some(previous) = existing {
            if !previous.is_on_branch(meta.branch.as_deref()) {
                info!(
                    "Switching {} from branch {} to {}",
                    meta.name,
                    previous.branch_label(),
                    meta.branch.as_deref().unwrap_or("default")
                );
            }
        }

        let staging = self.layout.create_staging(&meta.name)?;
        let artifact = sanitize_artifact_name(&meta.artifact_name, &format!("{}.bin", meta.name));
        let staged = staging.path().join(&artifact);

        let bytes = self.fetcher.download(&meta.download_ref, &staged)?;
        debug!("Fetched {} bytes for {}", bytes, meta.name);
        let checksum = verify_artifact(&meta.name, &staged, meta.checksum.as_deref())?;

        let promotion = self.layout.promote(staging, &meta.name)?;
        let record = ToolRecord {
            name: meta.name.clone(),
            branch: meta.branch.clone(),
            version: meta.latest_version.clone(),
            install_path: promotion.install_path().to_path_buf(),
            artifact,
            os: self.os.clone(),
            checksum: Some(checksum),
            installed_at: Utc::now(),
        };

        if let Err(e) = self.store.transact(|registry| {
            registry.put(record.clone());
        }) {
            if let Err(rollback) = promotion.rollback() {
                warn!("Failed to roll back {}: {}", meta.name, rollback);
            }
            return Err(e);
        }
        promotion.commit();

        if let Some(previous) = existing {
            if previous.install_path != record.install_path && previous.install_path.exists() {
                if let Err(e) = self.layout.remove_install(&previous.install_path) {
                    warn!(
                        "Failed to remove old install at {}: {}",
                        previous.install_path.display(),
                        e
                    );
                }
            }
        }

        Ok(record)
    }
}

fn check_name(name: &str) -> Result<()> {
    if is_excluded(name) {
        return Err(XeError::Excluded {
            name: name.to_string(),
        });
    }
    validate_name(name)
}

fn finish(
    name: &str,
    existing: Option<&ToolRecord>,
    result: Result<ToolRecord>,
) -> OperationResult {
    match (result, existing) {
        (Ok(record), Some(previous)) => {
            info!(
                "Updated {} {} -> {} ({})",
                name,
                previous.version,
                record.version,
                describe_change(&previous.version, &record.version)
            );
            OperationResult::updated(name, &previous.version, &record.version)
        }
        (Ok(record), None) => {
            info!("Installed {} {}", name, record.version);
            OperationResult::installed(name, &record.version)
        }
        (Err(e), _) => {
            warn!("Failed to install {}: {}", name, e);
            OperationResult::failed(name, &e)
        }
    }
}
