//! Error types for xecli operations.
//!
//! This module defines [`XeError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Fetcher and disk errors are converted into a failed
//!   [`OperationResult`](crate::install::OperationResult) at the install
//!   engine boundary; they never abort a batch
//! - [`XeError::CorruptRegistry`] is fatal and surfaces at startup
//! - Use `anyhow::Error` (via `XeError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for xecli operations.
#[derive(Debug, Error)]
pub enum XeError {
    /// Tool or branch is unknown upstream.
    #[error("Tool '{name}' not found upstream{}", branch_suffix(.branch))]
    NotFound {
        name: String,
        branch: Option<String>,
    },

    /// Remote request failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Remote request did not complete within the configured timeout.
    #[error("Timed out: {message}")]
    Timeout { message: String },

    /// Local file operation failed while staging or promoting artifacts.
    #[error("Disk error at {path}: {message}")]
    Disk { path: PathBuf, message: String },

    /// The registry could not be written.
    #[error("Failed to persist registry at {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    /// The registry on disk cannot be trusted.
    #[error("Registry at {path} is corrupt: {message}. Fix or remove the file to continue")]
    CorruptRegistry { path: PathBuf, message: String },

    /// Operation needs an installed tool.
    #[error("{name} is not installed")]
    NotInstalled { name: String },

    /// Name cannot be used as a directory name.
    #[error("Invalid tool name '{name}'")]
    InvalidName { name: String },

    /// Repository is on the exclusion list.
    #[error("Cannot install {name}: excluded repository")]
    Excluded { name: String },

    /// Downloaded artifact does not match the published digest.
    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration key or value.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn branch_suffix(branch: &Option<String>) -> String {
    branch
        .as_ref()
        .map(|b| format!(" (branch '{}')", b))
        .unwrap_or_default()
}

impl XeError {
    /// Remote-side failures that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, XeError::Network { .. } | XeError::Timeout { .. })
    }

    /// Convert a filesystem error into [`XeError::Disk`].
    pub fn disk(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        XeError::Disk {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for xecli operations.
pub type Result<T> = std::result::Result<T, XeError>;
