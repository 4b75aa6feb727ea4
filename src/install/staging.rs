//! On-disk layout for staged, installed and backed-up artifacts.
//!
//! ```text
//! <download_dir>/
//!   <name>/                 installed artifacts
//!   .staging/<name>-<id>/   downloads in progress
//!   .backup/<name>/         previous install while a new one is promoted
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::verify::digest_file;
use crate::error::{Result, XeError};
use crate::registry::{Registry, ToolRecord};

pub const STAGING_DIR: &str = ".staging";
pub const BACKUP_DIR: &str = ".backup";

static NEXT_STAGING_ID: AtomicU64 = AtomicU64::new(0);

/// Filesystem primitives used to move and delete install directories.
///
/// Tests swap these out to force failures.
#[derive(Debug, Clone, Copy)]
pub struct FsOps {
    pub rename: fn(&Path, &Path) -> io::Result<()>,
    pub remove_dir_all: fn(&Path) -> io::Result<()>,
}

fn rename(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

fn remove_dir_all(path: &Path) -> io::Result<()> {
    fs::remove_dir_all(path)
}

impl Default for FsOps {
    fn default() -> Self {
        Self {
            rename,
            remove_dir_all,
        }
    }
}

/// Reject names that cannot safely be used as a directory name.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && name.trim() == name;
    if valid {
        Ok(())
    } else {
        Err(XeError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Reduce an upstream artifact name to a plain file name.
pub fn sanitize_artifact_name(name: &str, fallback: &str) -> String {
    let file = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if file.is_empty() || file == "." || file == ".." {
        fallback.to_string()
    } else {
        file.to_string()
    }
}

/// A staging directory, removed on drop unless promoted.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    armed: bool,
}

impl StagingDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn into_path(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to clean staging dir {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

/// A promoted install that is not yet recorded in the registry.
#[must_use = "a promotion must be committed or rolled back"]
#[derive(Debug)]
pub struct Promotion {
    install_path: PathBuf,
    backup: Option<PathBuf>,
    fs: FsOps,
}

impl Promotion {
    pub fn install_path(&self) -> &Path {
        &self.install_path
    }

    /// Discard the previous install.
    pub fn commit(self) {
        if let Some(backup) = &self.backup {
            if let Err(e) = (self.fs.remove_dir_all)(backup) {
                warn!("Failed to remove backup {}: {}", backup.display(), e);
            }
        }
    }

    /// Remove the new install and put the previous one back.
    pub fn rollback(self) -> Result<()> {
        if self.install_path.exists() {
            (self.fs.remove_dir_all)(&self.install_path)
                .map_err(|e| XeError::disk(&self.install_path, e))?;
        }
        if let Some(backup) = &self.backup {
            (self.fs.rename)(backup, &self.install_path).map_err(|e| XeError::disk(backup, e))?;
        }
        Ok(())
    }
}

/// What [`Layout::recover`] cleaned up.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub staging_removed: usize,
    pub restored: Vec<String>,
    pub discarded: Vec<String>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.staging_removed == 0 && self.restored.is_empty() && self.discarded.is_empty()
    }
}

/// Directory layout rooted at the download directory.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    fs: FsOps,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fs: FsOps::default(),
        }
    }

    pub fn with_fs_ops(mut self, fs: FsOps) -> Self {
        self.fs = fs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn install_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn staging_root(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn backup_dir(&self, name: &str) -> PathBuf {
        self.root.join(BACKUP_DIR).join(name)
    }

    /// Create a fresh, empty staging directory for `name`.
    pub fn create_staging(&self, name: &str) -> Result<StagingDir> {
        let id = NEXT_STAGING_ID.fetch_add(1, Ordering::Relaxed);
        let path = self
            .staging_root()
            .join(format!("{}-{}-{}", name, std::process::id(), id));
        fs::create_dir_all(&path).map_err(|e| XeError::disk(&path, e))?;
        debug!("Staging {} in {}", name, path.display());
        Ok(StagingDir { path, armed: true })
    }

    /// Move a verified staging directory into place.
    ///
    /// Any existing install is moved to the backup location first. If the
    /// final rename fails the backup is restored.
    pub fn promote(&self, staging: StagingDir, name: &str) -> Result<Promotion> {
        let install_path = self.install_dir(name);
        fs::create_dir_all(&self.root).map_err(|e| XeError::disk(&self.root, e))?;

        let backup = if install_path.exists() {
            let backup = self.backup_dir(name);
            if backup.exists() {
                (self.fs.remove_dir_all)(&backup).map_err(|e| XeError::disk(&backup, e))?;
            }
            let backup_root = self.root.join(BACKUP_DIR);
            fs::create_dir_all(&backup_root).map_err(|e| XeError::disk(&backup_root, e))?;
            (self.fs.rename)(&install_path, &backup).map_err(|e| XeError::disk(&install_path, e))?;
            Some(backup)
        } else {
            None
        };

        if let Err(e) = (self.fs.rename)(staging.path(), &install_path) {
            if let Some(backup) = &backup {
                if let Err(restore) = (self.fs.rename)(backup, &install_path) {
                    warn!(
                        "Failed to restore {} from {}: {}",
                        install_path.display(),
                        backup.display(),
                        restore
                    );
                }
            }
            return Err(XeError::disk(&install_path, e));
        }

        staging.into_path();
        Ok(Promotion {
            install_path,
            backup,
            fs: self.fs,
        })
    }

    /// Delete an install directory.
    pub fn remove_install(&self, path: &Path) -> io::Result<()> {
        (self.fs.remove_dir_all)(path)
    }

    /// Clean up after an interrupted run.
    ///
    /// Staging directories are deleted. A backup is restored when its
    /// install directory is missing, or when the registry record matches
    /// the backup but not the install directory; otherwise it is deleted.
    pub fn recover(&self, registry: &Registry) -> RecoveryReport {
        let mut report = RecoveryReport::default();

        let staging_root = self.staging_root();
        for entry in read_dir_paths(&staging_root) {
            match (self.fs.remove_dir_all)(&entry) {
                Ok(()) => report.staging_removed += 1,
                Err(e) => warn!("Failed to remove stale staging dir {}: {}", entry.display(), e),
            }
        }

        for backup in read_dir_paths(&self.root.join(BACKUP_DIR)) {
            let Some(name) = backup.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let install = self.install_dir(&name);

            let restore = if !install.exists() {
                true
            } else {
                registry.get(&name).is_some_and(|record| {
                    !matches_record(&install, record) && matches_record(&backup, record)
                })
            };

            if restore {
                let moved = if install.exists() {
                    (self.fs.remove_dir_all)(&install)
                        .and_then(|()| (self.fs.rename)(&backup, &install))
                } else {
                    (self.fs.rename)(&backup, &install)
                };
                match moved {
                    Ok(()) => {
                        info!("Restored {} from interrupted install", name);
                        report.restored.push(name);
                    }
                    Err(e) => warn!("Failed to restore {}: {}", name, e),
                }
            } else {
                match (self.fs.remove_dir_all)(&backup) {
                    Ok(()) => {
                        debug!("Discarded stale backup of {}", name);
                        report.discarded.push(name);
                    }
                    Err(e) => warn!("Failed to remove stale backup {}: {}", backup.display(), e),
                }
            }
        }

        report
    }
}

fn read_dir_paths(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

fn matches_record(dir: &Path, record: &ToolRecord) -> bool {
    let artifact = dir.join(&record.artifact);
    if !artifact.is_file() {
        return false;
    }
    match &record.checksum {
        Some(expected) => {
            digest_file(&artifact).is_ok_and(|actual| actual.eq_ignore_ascii_case(expected))
        }
        None => true,
    }
}
