//! GitHub REST API fetcher.
//!
//! Tools are the repositories of one organisation. The latest release of a
//! repository is its default version; a named branch resolves to the
//! branch head commit and a source zipball.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{current_os, is_excluded, AvailableTool, Fetcher, RemoteMeta};
use crate::config::Config;
use crate::error::{Result, XeError};

/// Environment variables checked for an API token, in order.
pub const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

const USER_AGENT: &str = concat!("xecli/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: Option<String>,
    zipball_url: Option<String>,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Branch {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct Repo {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

/// Fetches tool metadata and artifacts from GitHub.
pub struct GithubFetcher {
    client: Client,
    api_url: String,
    org: String,
    token: Option<String>,
    os: String,
    timeout: Duration,
}

impl GithubFetcher {
    /// Create a fetcher for `org` against the API at `api_url`.
    pub fn new(
        api_url: impl Into<String>,
        org: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| XeError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            org: org.into(),
            token: None,
            os: current_os().to_string(),
            timeout,
        })
    }

    /// Create a fetcher from configuration and the process environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = TOKEN_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|t| !t.is_empty()));

        Ok(Self::new(config.api_url(), config.org(), config.timeout()?)?.with_token(token))
    }

    /// Authenticate requests with a bearer token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Select artifacts for a different platform.
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Organisation whose repositories are tools.
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        self.request(url)
            .send()
            .map_err(|e| self.request_error(url, e))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        name: &str,
        branch: Option<&str>,
    ) -> Result<T> {
        let response = self.send(url)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(XeError::NotFound {
                name: name.to_string(),
                branch: branch.map(String::from),
            });
        }
        if !status.is_success() {
            return Err(XeError::Network {
                message: format!("HTTP {} fetching {}", status, url),
            });
        }

        response.json::<T>().map_err(|e| {
            if e.is_timeout() {
                self.request_error(url, e)
            } else {
                XeError::Network {
                    message: format!("Failed to parse response from {}: {}", url, e),
                }
            }
        })
    }

    fn request_error(&self, url: &str, err: reqwest::Error) -> XeError {
        if err.is_timeout() {
            XeError::Timeout {
                message: format!("{} after {}s", url, self.timeout.as_secs()),
            }
        } else {
            XeError::Network {
                message: format!("Failed to fetch {}: {}", url, err),
            }
        }
    }

    fn release_meta(&self, name: &str) -> Result<RemoteMeta> {
        let url = format!("{}/repos/{}/{}/releases/latest", self.api_url, self.org, name);
        let release: Release = self.get_json(&url, name, None)?;
        let tag = release.tag_name.unwrap_or_else(|| "latest".to_string());

        if let Some(asset) = select_asset(&release.assets, &self.os) {
            return Ok(RemoteMeta {
                name: name.to_string(),
                branch: None,
                latest_version: tag,
                download_ref: asset.browser_download_url.clone(),
                artifact_name: asset.name.clone(),
                checksum: asset.digest.clone().filter(|d| d.starts_with("sha256:")),
            });
        }

        match release.zipball_url {
            Some(zipball) => Ok(RemoteMeta {
                name: name.to_string(),
                branch: None,
                artifact_name: format!("{}-{}.zip", name, tag),
                latest_version: tag,
                download_ref: zipball,
                checksum: None,
            }),
            None => Err(XeError::NotFound {
                name: name.to_string(),
                branch: None,
            }),
        }
    }

    fn branch_meta(&self, name: &str, branch: &str) -> Result<RemoteMeta> {
        let repo = format!("{}/repos/{}/{}", self.api_url, self.org, name);
        let url = format!("{}/branches/{}", repo, branch);
        let head: Branch = self.get_json(&url, name, Some(branch))?;

        Ok(RemoteMeta {
            name: name.to_string(),
            branch: Some(branch.to_string()),
            latest_version: head.commit.sha,
            download_ref: format!("{}/zipball/{}", repo, branch),
            artifact_name: format!("{}-{}.zip", name, branch.replace('/', "-")),
            checksum: None,
        })
    }
}

/// Pick the release asset for a platform.
///
/// Windows takes the first `.exe`; other platforms take the first
/// `.tar.gz`, `.tgz` or `.zip`, preferring assets that mention the
/// platform in their name.
fn select_asset<'a>(assets: &'a [Asset], os: &str) -> Option<&'a Asset> {
    let extensions: &[&str] = if os == "windows" {
        &[".exe"]
    } else {
        &[".tar.gz", ".tgz", ".zip"]
    };

    let candidates: Vec<&Asset> = assets
        .iter()
        .filter(|a| {
            let lower = a.name.to_ascii_lowercase();
            extensions.iter().any(|ext| lower.ends_with(ext))
        })
        .collect();

    let mentions_os = |name: &str| match os {
        "macos" => ["macos", "darwin", "apple"].iter().any(|alias| name.contains(alias)),
        other => name.contains(other),
    };

    candidates
        .iter()
        .find(|a| mentions_os(&a.name.to_ascii_lowercase()))
        .or_else(|| candidates.first())
        .copied()
}

impl Fetcher for GithubFetcher {
    fn get_meta(&self, name: &str, branch: Option<&str>) -> Result<RemoteMeta> {
        if is_excluded(name) {
            return Err(XeError::Excluded {
                name: name.to_string(),
            });
        }

        match branch {
            Some(branch) => self.branch_meta(name, branch),
            None => self.release_meta(name),
        }
    }

    fn download(&self, download_ref: &str, dest: &Path) -> Result<u64> {
        let mut response = self.send(download_ref)?;
        let status = response.status();
        if !status.is_success() {
            return Err(XeError::Network {
                message: format!("HTTP {} downloading {}", status, download_ref),
            });
        }

        let mut file = File::create(dest).map_err(|e| XeError::disk(dest, e))?;
        let written = io::copy(&mut response, &mut file).map_err(|e| match e.kind() {
            ErrorKind::TimedOut => XeError::Timeout {
                message: format!("{} after {}s", download_ref, self.timeout.as_secs()),
            },
            _ => XeError::Network {
                message: format!("Download of {} interrupted: {}", download_ref, e),
            },
        })?;

        file.sync_all().map_err(|e| XeError::disk(dest, e))?;
        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }

    fn list_available(&self) -> Result<Vec<AvailableTool>> {
        let url = format!("{}/orgs/{}/repos?per_page=100", self.api_url, self.org);
        let repos: Vec<Repo> = self.get_json(&url, &self.org, None)?;

        let mut tools: Vec<AvailableTool> = repos
            .into_iter()
            .filter(|r| !is_excluded(&r.name))
            .map(|r| AvailableTool {
                name: r.name,
                description: r.description.filter(|d| !d.is_empty()),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tools)
    }
}
