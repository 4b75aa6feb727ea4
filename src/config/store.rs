//! Key/value configuration store.
//!
//! Values are resolved in this order (first match wins):
//! 1. Command-line overrides (e.g. `--timeout`)
//! 2. `XECLI_<KEY>` environment variables
//! 3. The YAML file at `<base>/config.yml`
//! 4. Built-in defaults

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, XeError};

use super::paths::AppPaths;

/// Keys understood by xecli, with their built-in defaults.
///
/// `download_dir` has no static default; it falls back to
/// [`AppPaths::default_download_dir`].
pub const KNOWN_KEYS: &[(&str, Option<&str>)] = &[
    ("download_dir", None),
    ("org", Some("xEclipsity")),
    ("api_url", Some("https://api.github.com")),
    ("timeout_secs", Some("30")),
    ("jobs", Some("4")),
];

const ENV_PREFIX: &str = "XECLI_";
const MAX_JOBS: usize = 64;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Environment,
    File,
    Default,
}

impl ValueSource {
    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            ValueSource::Flag => "flag",
            ValueSource::Environment => "env",
            ValueSource::File => "file",
            ValueSource::Default => "default",
        }
    }
}

/// Loaded configuration.
#[derive(Debug, Clone)]
pub struct Config {
    paths: AppPaths,
    values: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration for the given paths, reading overrides from the
    /// process environment.
    pub fn load(paths: &AppPaths) -> Result<Self> {
        let env = std::env::vars()
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .collect();
        Self::load_with_env(paths, env)
    }

    /// Load configuration with explicit environment overrides (for testing).
    pub fn load_with_env(paths: &AppPaths, env: BTreeMap<String, String>) -> Result<Self> {
        let path = paths.config_file();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            parse_values(&content).map_err(|message| XeError::ConfigParseError {
                path: path.clone(),
                message,
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            paths: paths.clone(),
            values,
            env,
            overrides: BTreeMap::new(),
        })
    }

    /// In-memory configuration with no file and no overrides.
    pub fn empty(paths: &AppPaths) -> Self {
        Self {
            paths: paths.clone(),
            values: BTreeMap::new(),
            env: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Paths this configuration was loaded from.
    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.resolve(key).map(|(value, _)| value)
    }

    /// Look up a value along with where it came from.
    pub fn resolve(&self, key: &str) -> Option<(String, ValueSource)> {
        if let Some(value) = self.overrides.get(key) {
            return Some((value.clone(), ValueSource::Flag));
        }

        let env_key = format!("{}{}", ENV_PREFIX, key.to_uppercase());
        if let Some(value) = self.env.get(&env_key).filter(|v| !v.is_empty()) {
            return Some((value.clone(), ValueSource::Environment));
        }

        if let Some(value) = self.values.get(key) {
            return Some((value.clone(), ValueSource::File));
        }

        KNOWN_KEYS
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, default)| *default)
            .map(|d| (d.to_string(), ValueSource::Default))
    }

    /// Override a value for this process only. Never saved.
    pub fn with_override(mut self, key: &str, value: &str) -> Result<Self> {
        validate(key, value)?;
        self.overrides.insert(key.to_string(), value.trim().to_string());
        Ok(self)
    }

    /// Set a value in the file layer. Call [`save`](Self::save) to persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate(key, value)?;
        self.values.insert(key.to_string(), value.trim().to_string());
        Ok(())
    }

    /// Remove a value from the file layer.
    pub fn unset(&mut self, key: &str) -> Result<bool> {
        ensure_known(key)?;
        Ok(self.values.remove(key).is_some())
    }

    /// All known keys with their resolved values.
    pub fn entries(&self) -> Vec<(&'static str, Option<(String, ValueSource)>)> {
        KNOWN_KEYS
            .iter()
            .map(|(key, _)| (*key, self.resolve(key)))
            .collect()
    }

    /// Save the file layer using atomic write.
    pub fn save(&self) -> Result<()> {
        let path = self.paths.config_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(&self.values).map_err(|e| {
            XeError::ConfigValidationError {
                message: format!("Failed to serialize config: {}", e),
            }
        })?;

        let temp_path = path.with_extension("yml.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    // --- Typed accessors ---

    /// Root directory under which each tool gets its own install directory.
    ///
    /// Relative values are resolved against the base directory.
    pub fn download_dir(&self) -> PathBuf {
        match self.get("download_dir") {
            Some(dir) => {
                let dir = expand_home(&dir);
                if dir.is_absolute() {
                    dir
                } else {
                    self.paths.base().join(dir)
                }
            }
            None => self.paths.default_download_dir(),
        }
    }

    /// GitHub organisation whose repositories are the installable tools.
    pub fn org(&self) -> String {
        self.get("org").unwrap_or_else(|| "xEclipsity".to_string())
    }

    /// Base URL of the GitHub REST API.
    pub fn api_url(&self) -> String {
        self.get("api_url")
            .unwrap_or_else(|| "https://api.github.com".to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Network timeout for metadata requests and downloads.
    pub fn timeout(&self) -> Result<Duration> {
        let raw = self.get("timeout_secs").unwrap_or_else(|| "30".to_string());
        parse_positive("timeout_secs", &raw).map(Duration::from_secs)
    }

    /// Number of tools processed concurrently by batch operations.
    pub fn jobs(&self) -> Result<usize> {
        let raw = self.get("jobs").unwrap_or_else(|| "4".to_string());
        let jobs = parse_positive("jobs", &raw)? as usize;
        Ok(jobs.min(MAX_JOBS))
    }
}

/// Check that `key` is a known configuration key.
fn ensure_known(key: &str) -> Result<()> {
    if KNOWN_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        let known: Vec<&str> = KNOWN_KEYS.iter().map(|(k, _)| *k).collect();
        Err(XeError::ConfigValidationError {
            message: format!("unknown key '{}' (known keys: {})", key, known.join(", ")),
        })
    }
}

fn validate(key: &str, value: &str) -> Result<()> {
    ensure_known(key)?;
    let value = value.trim();

    let invalid = |reason: &str| XeError::ConfigValidationError {
        message: format!("{} for '{}': {}", reason, key, value),
    };

    if value.is_empty() {
        return Err(invalid("empty value"));
    }

    match key {
        "timeout_secs" | "jobs" => {
            parse_positive(key, value)?;
        }
        "api_url" if !(value.starts_with("http://") || value.starts_with("https://")) => {
            return Err(invalid("expected an http(s) URL"));
        }
        "org" if value.contains('/') => {
            return Err(invalid("organisation names cannot contain '/'"));
        }
        _ => {}
    }

    Ok(())
}

fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(XeError::ConfigValidationError {
            message: format!("'{}' must be a positive integer, got '{}'", key, raw),
        }),
    }
}

fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}

/// Parse the YAML mapping, accepting any scalar as a string value.
fn parse_values(content: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw: BTreeMap<String, serde_yaml::Value> =
        serde_yaml::from_str(content).map_err(|e| e.to_string())?;

    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => return Err(format!("'{}' must be a scalar, got {:?}", key, other)),
            };
            Ok((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths() -> (TempDir, AppPaths) {
        let temp = TempDir::new().unwrap();
        let paths = AppPaths::new(temp.path());
        (temp, paths)
    }

    #[test]
    fn defaults_apply_without_file() {
        let (_temp, paths) = paths();
        let config = Config::load_with_env(&paths, BTreeMap::new()).unwrap();

        assert_eq!(config.get("org"), Some("xEclipsity".to_string()));
        assert_eq!(config.get("download_dir"), None);
        assert_eq!(config.download_dir(), paths.default_download_dir());
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.jobs().unwrap(), 4);
    }

    #[test]
    fn file_values_override_defaults() {
        let (_temp, paths) = paths();
        fs::write(paths.config_file(), "org: acme\njobs: 8\n").unwrap();

        let config = Config::load_with_env(&paths, BTreeMap::new()).unwrap();
        assert_eq!(config.org(), "acme");
        assert_eq!(config.jobs().unwrap(), 8);
        assert_eq!(
            config.resolve("org").unwrap().1,
            ValueSource::File
        );
    }

    #[test]
    fn env_overrides_file() {
        let (_temp, paths) = paths();
        fs::write(paths.config_file(), "org: acme\n").unwrap();

        let mut env = BTreeMap::new();
        env.insert("XECLI_ORG".to_string(), "other".to_string());

        let config = Config::load_with_env(&paths, env).unwrap();
        assert_eq!(config.org(), "other");
        assert_eq!(
            config.resolve("org").unwrap().1,
            ValueSource::Environment
        );
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let (_temp, paths) = paths();
        fs::write(paths.config_file(), "org: [unclosed\n").unwrap();

        let result = Config::load_with_env(&paths, BTreeMap::new());
        assert!(matches!(result, Err(XeError::ConfigParseError { .. })));
    }

    #[test]
    fn set_and_save_round_trip() {
        let (_temp, paths) = paths();
        let mut config = Config::empty(&paths);
        config.set("download_dir", "/opt/tools").unwrap();
        config.save().unwrap();

        assert!(!paths.config_file().with_extension("yml.tmp").exists());

        let loaded = Config::load_with_env(&paths, BTreeMap::new()).unwrap();
        assert_eq!(loaded.download_dir(), PathBuf::from("/opt/tools"));
    }

    #[test]
    fn relative_download_dir_resolves_against_base() {
        let (_temp, paths) = paths();
        let mut config = Config::empty(&paths);
        config.set("download_dir", "bin").unwrap();
        assert_eq!(config.download_dir(), paths.base().join("bin"));
    }

    #[test]
    fn set_rejects_unknown_key() {
        let (_temp, paths) = paths();
        let mut config = Config::empty(&paths);
        let err = config.set("colour", "blue").unwrap_err();
        assert!(err.to_string().contains("unknown key"));
    }

    #[test]
    fn set_rejects_invalid_values() {
        let (_temp, paths) = paths();
        let mut config = Config::empty(&paths);
        assert!(config.set("jobs", "0").is_err());
        assert!(config.set("timeout_secs", "soon").is_err());
        assert!(config.set("api_url", "ftp://example.com").is_err());
        assert!(config.set("org", "a/b").is_err());
        assert!(config.set("org", "  ").is_err());
    }

    #[test]
    fn unset_removes_file_value() {
        let (_temp, paths) = paths();
        let mut config = Config::empty(&paths);
        config.set("org", "acme").unwrap();
        assert!(config.unset("org").unwrap());
        assert_eq!(config.org(), "xEclipsity");
        assert!(!config.unset("org").unwrap());
    }

    #[test]
    fn jobs_are_capped() {
        let (_temp, paths) = paths();
        let mut config = Config::empty(&paths);
        config.set("jobs", "1000").unwrap();
        assert_eq!(config.jobs().unwrap(), MAX_JOBS);
    }

    #[test]
    fn api_url_trailing_slash_trimmed() {
        let (_temp, paths) = paths();
        let mut config = Config::empty(&paths);
        config.set("api_url", "http://localhost:8080/").unwrap();
        assert_eq!(config.api_url(), "http://localhost:8080");
    }

    #[test]
    fn entries_list_every_known_key() {
        let (_temp, paths) = paths();
        let config = Config::empty(&paths);
        let entries = config.entries();
        assert_eq!(entries.len(), KNOWN_KEYS.len());
        assert!(entries.iter().any(|(k, v)| *k == "download_dir" && v.is_none()));
    }

    #[test]
    fn override_wins_and_is_not_saved() {
        let (_temp, paths) = paths();
        let mut env = BTreeMap::new();
        env.insert("XECLI_TIMEOUT_SECS".to_string(), "10".to_string());
        let config = Config::load_with_env(&paths, env)
            .unwrap()
            .with_override("timeout_secs", "5")
            .unwrap();

        assert_eq!(
            config.resolve("timeout_secs"),
            Some(("5".to_string(), ValueSource::Flag))
        );
        config.save().unwrap();
        let saved = fs::read_to_string(paths.config_file()).unwrap();
        assert!(!saved.contains("timeout_secs"));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let (_temp, paths) = paths();
        let err = Config::empty(&paths).with_override("timeout_secs", "0").err();
        assert!(matches!(err, Some(XeError::ConfigValidationError { .. })));
    }
}
