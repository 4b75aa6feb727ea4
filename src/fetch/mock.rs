//! In-memory fetcher for tests.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{is_excluded, AvailableTool, Fetcher, RemoteMeta};
use crate::error::{Result, XeError};
use crate::install::verify::digest_bytes;

/// Failure to inject into [`MockFetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Network,
    Timeout,
    NotFound,
}

impl MockFailure {
    fn into_error(self, name: &str, branch: Option<&str>) -> XeError {
        match self {
            MockFailure::Network => XeError::Network {
                message: format!("connection reset fetching {}", name),
            },
            MockFailure::Timeout => XeError::Timeout {
                message: format!("{} after 0s", name),
            },
            MockFailure::NotFound => XeError::NotFound {
                name: name.to_string(),
                branch: branch.map(String::from),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Artifact {
    name: String,
    content: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    metas: BTreeMap<(String, Option<String>), RemoteMeta>,
    artifacts: HashMap<String, Artifact>,
    descriptions: BTreeMap<String, Option<String>>,
    meta_failures: HashMap<String, MockFailure>,
    download_failures: HashMap<String, usize>,
    meta_calls: usize,
    downloads: Vec<String>,
}

/// Serves published releases from memory.
///
/// Each [`publish`](Self::publish) replaces the latest version of a tool on
/// a branch. Calls are counted so tests can assert how much network work an
/// operation did.
#[derive(Debug, Default)]
pub struct MockFetcher {
    state: Mutex<MockState>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `content` as the latest version of `name` on `branch`.
    ///
    /// The published metadata carries the content's sha256 digest.
    pub fn publish(&self, name: &str, branch: Option<&str>, version: &str, content: &[u8]) {
        let download_ref = format!(
            "mock://{}/{}/{}",
            name,
            branch.unwrap_or("_release"),
            version
        );
        let meta = RemoteMeta {
            name: name.to_string(),
            branch: branch.map(String::from),
            latest_version: version.to_string(),
            download_ref: download_ref.clone(),
            artifact_name: format!("{}-{}.tar.gz", name, version),
            checksum: Some(digest_bytes(content)),
        };

        let mut state = self.lock();
        state.descriptions.entry(name.to_string()).or_insert(None);
        state.artifacts.insert(
            download_ref,
            Artifact {
                name: name.to_string(),
                content: content.to_vec(),
            },
        );
        state
            .metas
            .insert((name.to_string(), branch.map(String::from)), meta);
    }

    /// Serve different bytes than the published digest describes.
    pub fn tamper(&self, name: &str, branch: Option<&str>, content: &[u8]) {
        let mut state = self.lock();
        let key = (name.to_string(), branch.map(String::from));
        if let Some(download_ref) = state.metas.get(&key).map(|m| m.download_ref.clone()) {
            if let Some(artifact) = state.artifacts.get_mut(&download_ref) {
                artifact.content = content.to_vec();
            }
        }
    }

    /// Drop the published digest for a tool.
    pub fn clear_checksum(&self, name: &str, branch: Option<&str>) {
        let key = (name.to_string(), branch.map(String::from));
        if let Some(meta) = self.lock().metas.get_mut(&key) {
            meta.checksum = None;
        }
    }

    /// Set the description shown when listing available tools.
    pub fn describe(&self, name: &str, description: &str) {
        self.lock()
            .descriptions
            .insert(name.to_string(), Some(description.to_string()));
    }

    /// Make metadata requests for `name` fail.
    pub fn fail_meta(&self, name: &str, failure: MockFailure) {
        self.lock().meta_failures.insert(name.to_string(), failure);
    }

    /// Make downloads of `name` fail after writing `partial_bytes` bytes.
    pub fn fail_download(&self, name: &str, partial_bytes: usize) {
        self.lock()
            .download_failures
            .insert(name.to_string(), partial_bytes);
    }

    /// Remove any injected failures for `name`.
    pub fn clear_failures(&self, name: &str) {
        let mut state = self.lock();
        state.meta_failures.remove(name);
        state.download_failures.remove(name);
    }

    /// Number of `get_meta` calls so far.
    pub fn meta_calls(&self) -> usize {
        self.lock().meta_calls
    }

    /// Number of downloads attempted so far.
    pub fn download_count(&self) -> usize {
        self.lock().downloads.len()
    }

    /// Number of downloads attempted for one tool.
    pub fn downloads_of(&self, name: &str) -> usize {
        self.lock().downloads.iter().filter(|n| *n == name).count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Fetcher for MockFetcher {
    fn get_meta(&self, name: &str, branch: Option<&str>) -> Result<RemoteMeta> {
        let mut state = self.lock();
        state.meta_calls += 1;

        if is_excluded(name) {
            return Err(XeError::Excluded {
                name: name.to_string(),
            });
        }
        if let Some(failure) = state.meta_failures.get(name) {
            return Err(failure.into_error(name, branch));
        }

        state
            .metas
            .get(&(name.to_string(), branch.map(String::from)))
            .cloned()
            .ok_or_else(|| XeError::NotFound {
                name: name.to_string(),
                branch: branch.map(String::from),
            })
    }

    fn download(&self, download_ref: &str, dest: &Path) -> Result<u64> {
        let (artifact, fail_after) = {
            let mut state = self.lock();
            let artifact = state
                .artifacts
                .get(download_ref)
                .cloned()
                .ok_or_else(|| XeError::Network {
                    message: format!("HTTP 404 downloading {}", download_ref),
                })?;
            state.downloads.push(artifact.name.clone());
            let fail_after = state.download_failures.get(&artifact.name).copied();
            (artifact, fail_after)
        };

        if let Some(partial) = fail_after {
            let partial = partial.min(artifact.content.len());
            fs::write(dest, &artifact.content[..partial]).map_err(|e| XeError::disk(dest, e))?;
            return Err(XeError::Network {
                message: format!("connection reset downloading {}", download_ref),
            });
        }

        fs::write(dest, &artifact.content).map_err(|e| XeError::disk(dest, e))?;
        Ok(artifact.content.len() as u64)
    }

    fn list_available(&self) -> Result<Vec<AvailableTool>> {
        Ok(self
            .lock()
            .descriptions
            .iter()
            .filter(|(name, _)| !is_excluded(name))
            .map(|(name, description)| AvailableTool {
                name: name.clone(),
                description: description.clone(),
            })
            .collect())
    }
}
