//! Installation records and the in-memory registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One fully installed tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Tool name (registry key).
    pub name: String,

    /// Branch the tool was installed from; `None` means latest release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Installed version identifier.
    pub version: String,

    /// Directory holding the installed artifacts.
    pub install_path: PathBuf,

    /// File name of the artifact inside `install_path`.
    pub artifact: String,

    /// Platform the artifact was selected for.
    pub os: String,

    /// `sha256:<hex>` digest of the artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// When the tool was installed.
    pub installed_at: DateTime<Utc>,
}

impl ToolRecord {
    /// Full path of the installed artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.install_path.join(&self.artifact)
    }

    /// Branch name for display.
    pub fn branch_label(&self) -> &str {
        self.branch.as_deref().unwrap_or("default")
    }

    /// Whether this record was installed from `branch`.
    pub fn is_on_branch(&self, branch: Option<&str>) -> bool {
        self.branch.as_deref() == branch
    }
}

/// Ordered mapping from tool name to its installation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    /// Schema version for migration.
    #[serde(default = "Registry::current_version")]
    pub version: u32,

    /// Installed tools by name.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolRecord>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Current schema version.
    pub const CURRENT_VERSION: u32 = 1;

    fn current_version() -> u32 {
        Self::CURRENT_VERSION
    }

    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            tools: BTreeMap::new(),
        }
    }

    /// Get the record for a tool.
    pub fn get(&self, name: &str) -> Option<&ToolRecord> {
        self.tools.get(name)
    }

    /// Insert or replace a record, returning the previous one.
    pub fn put(&mut self, record: ToolRecord) -> Option<ToolRecord> {
        self.tools.insert(record.name.clone(), record)
    }

    /// Remove a record.
    pub fn remove(&mut self, name: &str) -> Option<ToolRecord> {
        self.tools.remove(name)
    }

    /// Check whether a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, in order.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Iterate records in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolRecord> {
        self.tools.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample_record(name: &str, version: &str) -> ToolRecord {
    ToolRecord {
        name: name.to_string(),
        branch: None,
        version: version.to_string(),
        install_path: PathBuf::from("/opt/xecli/tools").join(name),
        artifact: format!("{}-{}.tar.gz", name, version),
        os: "linux".to_string(),
        checksum: None,
        installed_at: Utc::now(),
    }
}
