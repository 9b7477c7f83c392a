//! Configuration loader and validator for the admin console.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "SMM_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub api: Api,
}

/// Local, client-side settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Directory holding `session.json`.
    pub data_dir: String,
    /// Where ZIP downloads are written.
    pub download_dir: String,
    /// Concurrent requests used by bulk operations.
    pub bulk_concurrency: usize,
    pub max_upload_bytes: u64,
    pub recent_activity_limit: u32,
}

/// Backend endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    /// Customer/media service.
    pub base_url: String,
    /// Analytics service (dashboard, tasks, notes, activities).
    pub analytics_base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

impl Config {
    /// Ensure required directories exist.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.app.data_dir)?;
        fs::create_dir_all(&self.app.download_dir)
    }

    pub fn session_path(&self) -> PathBuf {
        Path::new(&self.app.data_dir).join("session.json")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }

    /// Apply environment overrides on top of the file values.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.download_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.download_dir must be non-empty"));
    }
    if cfg.app.bulk_concurrency == 0 {
        return Err(ConfigError::Invalid("app.bulk_concurrency must be > 0"));
    }
    if cfg.app.max_upload_bytes == 0 {
        return Err(ConfigError::Invalid("app.max_upload_bytes must be > 0"));
    }

    for (url, msg) in [
        (&cfg.api.base_url, "api.base_url must be an absolute http(s) URL"),
        (
            &cfg.api.analytics_base_url,
            "api.analytics_base_url must be an absolute http(s) URL",
        ),
    ] {
        match reqwest::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::Invalid(msg)),
        }
    }
    if cfg.api.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("api.timeout_seconds must be > 0"));
    }
    if let Some(token) = &cfg.api.token {
        if token.trim().is_empty() {
            return Err(ConfigError::Invalid("api.token must be omitted or non-empty"));
        }
    }

    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  download_dir: "./downloads"
  bulk_concurrency: 4
  max_upload_bytes: 104857600
  recent_activity_limit: 10

api:
  base_url: "http://localhost:8080/"
  analytics_base_url: "http://localhost:8081/"
  timeout_seconds: 30
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.api.token, None);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_base_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "localhost:8080".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("api.base_url")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.analytics_base_url = "ftp://example.com/".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("analytics_base_url")), _ => panic!("wrong error") }
    }

    #[test]
    fn invalid_app_limits() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.bulk_concurrency = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.max_upload_bytes = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.timeout_seconds = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.token = Some("  ".into());
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_directories() {
        let td = tempdir().unwrap();
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = td.path().join("data").to_string_lossy().to_string();
        cfg.app.download_dir = td.path().join("dl").to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(td.path().join("data").exists());
        assert!(td.path().join("dl").exists());
        assert_eq!(cfg.session_path(), td.path().join("data").join("session.json"));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.bulk_concurrency, 4);
    }
}
