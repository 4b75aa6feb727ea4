//! Remote metadata and archive fetching.
//!
//! The install engine only depends on the [`Fetcher`] trait. Two
//! implementations are provided:
//! - [`GithubFetcher`] talks to the GitHub REST API
//! - [`MockFetcher`] serves in-memory releases for tests

pub mod github;
pub mod mock;

pub use github::GithubFetcher;
pub use mock::{MockFailure, MockFetcher};

use serde::Serialize;
use std::path::Path;

use crate::error::Result;

/// Repositories that are never treated as tools.
pub const EXCLUDED_REPOS: &[&str] = &[".github"];

/// Check whether a repository name is excluded.
pub fn is_excluded(name: &str) -> bool {
    EXCLUDED_REPOS.contains(&name)
}

/// Latest upstream state of a tool on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMeta {
    /// Tool name.
    pub name: String,
    /// Branch the metadata was resolved for; `None` is the latest release.
    pub branch: Option<String>,
    /// Latest version identifier on that branch.
    pub latest_version: String,
    /// Opaque reference passed back to [`Fetcher::download`].
    pub download_ref: String,
    /// File name for the downloaded artifact.
    pub artifact_name: String,
    /// `sha256:<hex>` digest published upstream, if any.
    pub checksum: Option<String>,
}

/// A tool that can be installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableTool {
    pub name: String,
    pub description: Option<String>,
}

/// Source of tool metadata and archives.
///
/// Implementations must be shareable across worker threads.
pub trait Fetcher: Send + Sync {
    /// Resolve the latest version of `name` on `branch`.
    ///
    /// Fails with `NotFound`, `Network` or `Timeout`.
    fn get_meta(&self, name: &str, branch: Option<&str>) -> Result<RemoteMeta>;

    /// Stream an artifact to `dest`, returning the number of bytes written.
    ///
    /// Fails with `Network`, `Timeout` or `Disk`. `dest` may hold partial
    /// content after a failure.
    fn download(&self, download_ref: &str, dest: &Path) -> Result<u64>;

    /// List tools that can be installed.
    fn list_available(&self) -> Result<Vec<AvailableTool>>;
}

/// Name of the running platform, as recorded in tool records.
pub fn current_os() -> &'static str {
    std::env::consts::OS
}
