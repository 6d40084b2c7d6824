use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AnalysisOptions, PaperSumError, Result};

pub const ENV_API_URL: &str = "PAPERSUM_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "PAPERSUM_TIMEOUT_SECS";
pub const ENV_POLL_MS: &str = "PAPERSUM_POLL_MS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperSumConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub defaults: AnalysisOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: 1500 }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl PaperSumConfig {
    /// Defaults overlaid with `PAPERSUM_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.api.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.api.timeout_secs = parse_positive(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_MS) {
            config.poll.interval_ms = parse_positive(ENV_POLL_MS, &raw)?;
        }

        config.api.base_url = normalize_base_url(&config.api.base_url)?;
        Ok(config)
    }
}

/// Trim whitespace and trailing slashes so paths can be appended with `/`
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(PaperSumError::Config(format!(
            "API URL must start with http:// or https://, got '{}'",
            raw
        )));
    }
    Ok(url.to_string())
}

fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(PaperSumError::Config(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}
