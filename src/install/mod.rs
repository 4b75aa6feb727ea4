//! Single-tool install and removal.
//!
//! The [`InstallEngine`] moves one tool between states with all-or-nothing
//! semantics: a tool is either fully installed and recorded, or left as it
//! was before the operation started.

pub mod engine;
pub mod locks;
pub mod staging;
pub mod verify;

pub use engine::InstallEngine;
pub use locks::NameLocks;
pub use staging::{FsOps, Layout, RecoveryReport};

use serde::Serialize;
use std::fmt;

use crate::error::XeError;

/// What happened to a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Installed,
    Updated,
    UpToDate,
    Removed,
    Failed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Installed => "installed",
            Outcome::Updated => "updated",
            Outcome::UpToDate => "up-to-date",
            Outcome::Removed => "removed",
            Outcome::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-tool result of an install, update or removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub name: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl OperationResult {
    fn new(name: &str, outcome: Outcome) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            version: None,
            previous_version: None,
            error_detail: None,
        }
    }

    pub fn installed(name: &str, version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            ..Self::new(name, Outcome::Installed)
        }
    }

    pub fn updated(name: &str, previous: &str, version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            previous_version: Some(previous.to_string()),
            ..Self::new(name, Outcome::Updated)
        }
    }

    pub fn up_to_date(name: &str, version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            ..Self::new(name, Outcome::UpToDate)
        }
    }

    pub fn removed(name: &str, version: &str) -> Self {
        Self {
            previous_version: Some(version.to_string()),
            ..Self::new(name, Outcome::Removed)
        }
    }

    pub fn failed(name: &str, error: &XeError) -> Self {
        Self {
            error_detail: Some(error.to_string()),
            ..Self::new(name, Outcome::Failed)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}
