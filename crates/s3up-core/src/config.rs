use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::scheduler::SchedulerSettings;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per job (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds between attempts (e.g. 5.0).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds. Equal to the base delay for a fixed interval.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 5.0,
            max_delay_secs: 5,
        }
    }
}

impl RetryConfig {
    /// Negative or NaN base delays become zero; values too large for a
    /// `Duration` (including `inf`) fall back to the maximum delay.
    pub fn policy(&self) -> RetryPolicy {
        let max_delay = Duration::from_secs(self.max_delay_secs);
        let base_delay = Duration::try_from_secs_f64(self.base_delay_secs.max(0.0))
            .unwrap_or_else(|e| {
                tracing::warn!(
                    base_delay_secs = self.base_delay_secs,
                    "invalid retry base delay ({}), using max_delay_secs",
                    e
                );
                max_delay
            });
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }
}

/// Transfer executor command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Program to run (looked up on PATH).
    pub program: String,
    /// Arguments inserted before `s3 cp ...` (e.g. `["--profile", "media"]`).
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: "aws".to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// Connectivity check before each attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    pub enabled: bool,
    /// Endpoint probed with a HEAD request.
    pub url: String,
    /// Connect and overall timeout for the probe.
    pub timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://www.google.com".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Global configuration loaded from `~/.config/s3up/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Maximum number of folders uploading at the same time.
    pub max_concurrent_uploads: usize,
    /// How long cancel-all waits for running workers before aborting them.
    pub cancel_grace_secs: u64,
    /// Default bucket; the CLI `--bucket` flag / `AWS_BUCKET` take precedence.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: 5,
            cancel_grace_secs: 10,
            bucket: None,
            retry: None,
            executor: ExecutorConfig::default(),
            connectivity: ConnectivityConfig::default(),
        }
    }
}

impl UploaderConfig {
    /// Pretty TOML, as written to the config file.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            max_concurrent: self.max_concurrent_uploads.max(1),
            retry: self.retry.clone().unwrap_or_default().policy(),
            cancel_grace: Duration::from_secs(self.cancel_grace_secs),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("s3up")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UploaderConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] with an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<UploaderConfig> {
    if !path.exists() {
        let default_cfg = UploaderConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: UploaderConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
