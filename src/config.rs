//! Runner configuration
//!
//! Defaults, then an optional TOML file, then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "CODE_RUNNER_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the remote judge
    pub judge_url: String,
    /// Base URL of the code API serving `/ai`
    pub analysis_url: String,
    /// Python interpreter used by the sandbox worker
    pub python: PathBuf,
    /// Execution budget handed to the sandbox worker (ms)
    pub sandbox_timeout_ms: u64,
    /// Extra wait on top of the budget before the worker is declared hung (ms)
    pub grace_ms: u64,
    /// Address space limit of the worker process (MB)
    pub worker_memory_mb: u64,
    /// Timeout of a judge HTTP request (s)
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            judge_url: "https://judge0api.xuyue.cc".into(),
            analysis_url: "https://code.xuyue.cc/api".into(),
            python: PathBuf::from("python3"),
            sandbox_timeout_ms: 5000,
            grace_ms: 250,
            worker_memory_mb: 512,
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load from `path` (or `CODE_RUNNER_CONFIG`) and apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content).map_err(|source| Error::Config {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("JUDGE_URL") {
            self.judge_url = url;
        }
        if let Ok(url) = std::env::var("CODEAPI_URL") {
            self.analysis_url = url;
        }
        if let Some(python) = std::env::var_os("PYTHON_BIN") {
            self.python = PathBuf::from(python);
        }
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
judge_url = "http://localhost:2358"
sandbox_timeout_ms = 2000
"#,
        )
        .unwrap();

        assert_eq!(config.judge_url, "http://localhost:2358");
        assert_eq!(config.sandbox_timeout_ms, 2000);
        assert_eq!(config.grace_ms, 250);
        assert_eq!(config.python, PathBuf::from("python3"));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "worker_memory_mb = 128").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.worker_memory_mb, 128);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "grace_ms = \"soon\"").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
