//! Locations of xecli's files on disk.

use std::path::{Path, PathBuf};

/// Environment variable overriding the base directory.
pub const HOME_ENV: &str = "XECLI_HOME";

/// Resolved file locations rooted at the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    base: PathBuf,
}

impl AppPaths {
    /// Paths rooted at an explicit base directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Discover the base directory.
    ///
    /// Resolution order:
    /// 1. `XECLI_HOME` environment variable
    /// 2. Platform local data directory (`~/.local/share`, `%LOCALAPPDATA%`)
    /// 3. `./.xecli` as a last resort
    pub fn discover() -> Self {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Self::new(home);
        }

        let base = dirs::data_local_dir()
            .map(|d| d.join("xecli"))
            .unwrap_or_else(|| PathBuf::from(".xecli"));
        Self::new(base)
    }

    /// The base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Registry of installed tools.
    pub fn registry_file(&self) -> PathBuf {
        self.base.join("tools.json")
    }

    /// Key/value configuration file.
    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.yml")
    }

    /// Directory holding the log file.
    pub fn log_dir(&self) -> &Path {
        &self.base
    }

    /// Log file name inside [`log_dir`](Self::log_dir).
    pub fn log_file_name(&self) -> &'static str {
        "xecli.log"
    }

    /// Log file path.
    pub fn log_file(&self) -> PathBuf {
        self.base.join(self.log_file_name())
    }

    /// Default root under which tools are installed.
    pub fn default_download_dir(&self) -> PathBuf {
        self.base.join("tools")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_base() {
        let paths = AppPaths::new("/data/xecli");
        assert_eq!(paths.registry_file(), PathBuf::from("/data/xecli/tools.json"));
        assert_eq!(paths.config_file(), PathBuf::from("/data/xecli/config.yml"));
        assert_eq!(paths.log_file(), PathBuf::from("/data/xecli/xecli.log"));
        assert_eq!(
            paths.default_download_dir(),
            PathBuf::from("/data/xecli/tools")
        );
    }

    #[test]
    fn discover_returns_some_base() {
        let paths = AppPaths::discover();
        assert!(!paths.base().as_os_str().is_empty());
    }
}
