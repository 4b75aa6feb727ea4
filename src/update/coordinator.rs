//! Update coordinator.
//!
//! Drives the [`InstallEngine`] across one or many tools. Batch operations
//! run on a bounded worker pool; a failure for one tool never prevents the
//! others from being attempted.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, XeError};
use crate::fetch::RemoteMeta;
use crate::install::{InstallEngine, OperationResult};
use crate::registry::ToolRecord;
use crate::version::{compare_on_branch, VersionStatus};

/// Result of comparing one installed tool with upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub status: VersionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckReport {
    /// Report for a tool whose check failed.
    pub fn unknown(name: &str, record: Option<&ToolRecord>, error: &XeError) -> Self {
        Self {
            name: name.to_string(),
            status: VersionStatus::Unknown,
            branch: record.and_then(|r| r.branch.clone()),
            installed: record.map(|r| r.version.clone()),
            latest: None,
            error: Some(error.to_string()),
        }
    }
}

/// Checks and updates installed tools.
pub struct UpdateCoordinator {
    engine: Arc<InstallEngine>,
    jobs: usize,
}

impl UpdateCoordinator {
    /// Create a coordinator running at most `jobs` tools at once.
    pub fn new(engine: Arc<InstallEngine>, jobs: usize) -> Self {
        Self {
            engine,
            jobs: jobs.max(1),
        }
    }

    pub fn engine(&self) -> &InstallEngine {
        &self.engine
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Compare an installed tool with the latest version on its branch.
    pub fn check(&self, name: &str) -> Result<CheckReport> {
        let record = self.installed(name)?;
        self.resolve(&record)
    }

    /// Check every installed tool.
    ///
    /// Tools whose check fails are reported as [`VersionStatus::Unknown`]
    /// with the error attached.
    pub fn check_all(&self) -> BTreeMap<String, CheckReport> {
        let records: Vec<ToolRecord> = self.engine.store().snapshot().iter().cloned().collect();

        self.run_parallel(&records, |record| match self.resolve(record) {
            Ok(report) => report,
            Err(e) => {
                warn!("Failed to check {}: {}", record.name, e);
                CheckReport::unknown(&record.name, Some(record), &e)
            }
        })
        .into_iter()
        .map(|report| (report.name.clone(), report))
        .collect()
    }

    /// Bring one tool up to date.
    ///
    /// A tool that is not installed yet is installed. When the installed and
    /// latest versions cannot be compared the tool is fetched again.
    pub fn update(&self, name: &str) -> OperationResult {
        self.engine.refresh_or_install(name, needs_update)
    }

    /// Update every installed tool, returning results in name order.
    ///
    /// Tools removed while the batch runs are left out.
    pub fn update_all(&self) -> Vec<OperationResult> {
        let records: Vec<ToolRecord> = self.engine.store().snapshot().iter().cloned().collect();
        if records.is_empty() {
            debug!("No tools installed; nothing to update");
            return Vec::new();
        }

        self.run_parallel(&records, |record| {
            let result = self.engine.refresh(&record.name, needs_update);
            if result.is_none() {
                info!("{} was removed; skipping", record.name);
            }
            result
        })
        .into_iter()
        .flatten()
        .collect()
    }

    fn installed(&self, name: &str) -> Result<ToolRecord> {
        self.engine
            .store()
            .get(name)
            .ok_or_else(|| XeError::NotInstalled {
                name: name.to_string(),
            })
    }

    fn resolve(&self, record: &ToolRecord) -> Result<CheckReport> {
        let meta = self
            .engine
            .fetcher()
            .get_meta(&record.name, record.branch.as_deref())?;

        Ok(CheckReport {
            name: record.name.clone(),
            status: status_of(record, &meta),
            branch: record.branch.clone(),
            installed: Some(record.version.clone()),
            latest: Some(meta.latest_version),
            error: None,
        })
    }

    fn run_parallel<T, F>(&self, records: &[ToolRecord], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&ToolRecord) -> T + Sync + Send,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.jobs.min(records.len()).max(1))
            .thread_name(|i| format!("xe-worker-{}", i))
            .build();

        match pool {
            Ok(pool) => pool.install(|| records.par_iter().map(&f).collect()),
            Err(e) => {
                warn!("Failed to start worker pool, running sequentially: {}", e);
                records.iter().map(f).collect()
            }
        }
    }
}

fn status_of(record: &ToolRecord, meta: &RemoteMeta) -> VersionStatus {
    let status = compare_on_branch(
        record.branch.as_deref(),
        meta.branch.as_deref(),
        &record.version,
        &meta.latest_version,
    );
    if status == VersionStatus::Unknown {
        warn!(
            "Version of {} is not comparable ({} vs {})",
            record.name, record.version, meta.latest_version
        );
    }
    status
}

fn needs_update(record: &ToolRecord, meta: &RemoteMeta) -> bool {
    let status = status_of(record, meta);
    if status == VersionStatus::Unknown {
        info!("Fetching {} again", record.name);
    }
    status.needs_fetch()
}
