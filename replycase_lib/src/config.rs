//! Harvest configuration: embedded defaults, an optional user TOML file,
//! and `REPLYCASE_*` environment overrides, applied in that order.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use replycase_api::{Client, Endpoints};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ReplyCaseError;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Upper bound on concurrent detail workers.
pub const MAX_CONCURRENCY: usize = 256;

/// Error types for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    TomlParse(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Retry policy for retryable detail-fetch failures.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
            max_delay_ms: 15000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based): exponential, capped,
    /// with +/-20% jitter.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(30) as u32;
        let exp = 1u64 << shift;
        let base = self
            .base_delay_ms
            .saturating_mul(exp)
            .min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((base as f64 * jitter) as u64)
    }
}

/// Everything the pipeline needs from its environment.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HarvestConfig {
    /// Rows requested per listing page.
    pub page_size: u64,
    /// Size of the detail-fetch worker pool.
    pub concurrency: usize,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    /// Stop listing after this many rows.
    #[serde(default)]
    pub max_items: Option<u64>,
    pub timeout_secs: u64,
    /// Failures kept verbatim in the batch report.
    pub failure_sample_size: usize,
    /// Lower bound on registration date for the date-filtered listings.
    pub date_start: String,
    /// Upper bound; today when absent.
    #[serde(default)]
    pub date_end: Option<String>,
    /// `searchType` sent to the integrated listing.
    #[serde(default)]
    pub integ_search_type: Option<String>,
    #[serde(default)]
    pub retry: RetryPolicy,
    pub endpoints: Endpoints,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            concurrency: 16,
            delay_min_ms: 200,
            delay_max_ms: 500,
            max_items: None,
            timeout_secs: 30,
            failure_sample_size: 3,
            date_start: "2000-01-01".to_string(),
            date_end: None,
            integ_search_type: None,
            retry: RetryPolicy::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl HarvestConfig {
    /// Loads the embedded defaults.
    pub fn embedded() -> Result<Self, ConfigError> {
        toml::from_str(DEFAULT_CONFIG).map_err(|e| ConfigError::TomlParse(e.to_string()))
    }

    /// Loads the embedded defaults with a user TOML document layered on top.
    /// Tables are merged key by key, so the overlay may be partial.
    pub fn from_toml_overlay(overlay: &str) -> Result<Self, ConfigError> {
        let mut base: toml::Value =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        let overlay: toml::Value =
            toml::from_str(overlay).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        merge(&mut base, overlay);
        base.try_into()
            .map_err(|e: toml::de::Error| ConfigError::TomlParse(e.to_string()))
    }

    /// Loads the embedded defaults overlaid with the file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_overlay(&content)
    }

    /// Embedded defaults, overlaid with the file at `path` when given, then
    /// `REPLYCASE_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ReplyCaseError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::embedded()?,
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Applies `REPLYCASE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup. Unset keys are left alone;
    /// set but unparsable values are an error.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("REPLYCASE_BASE_URL") {
            self.endpoints.base_url = url;
        }
        if let Some(v) = parse_var(&lookup, "REPLYCASE_CONCURRENCY")? {
            self.concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "REPLYCASE_PAGE_SIZE")? {
            self.page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "REPLYCASE_MAX_ITEMS")? {
            self.max_items = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "REPLYCASE_DELAY_MIN_MS")? {
            self.delay_min_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "REPLYCASE_DELAY_MAX_MS")? {
            self.delay_max_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "REPLYCASE_RETRY_MAX")? {
            self.retry.max_retries = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Invalid(format!(
                "concurrency must be at most {}, got {}",
                MAX_CONCURRENCY, self.concurrency
            )));
        }
        if self.delay_min_ms > self.delay_max_ms {
            return Err(ConfigError::Invalid(format!(
                "delay_min_ms ({}) exceeds delay_max_ms ({})",
                self.delay_min_ms, self.delay_max_ms
            )));
        }
        Ok(())
    }

    /// Bounds of the randomized per-request delay.
    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.delay_min_ms),
            Duration::from_millis(self.delay_max_ms),
        )
    }

    /// Upper registration-date bound, defaulting to today.
    pub fn date_end_or_today(&self) -> String {
        self.date_end
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string())
    }

    /// Builds the shared connection-pooled client for one harvest run.
    pub fn client(&self) -> Result<Client, ReplyCaseError> {
        let client = Client::builder()
            .base_url(&self.endpoints.base_url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .pool_size(self.concurrency)
            .headers(self.endpoints.headers.clone())
            .build()?;
        Ok(client)
    }
}

/// Sleeps for a random duration within `[min, max]`.
pub(crate) async fn jittered_sleep(min: Duration, max: Duration) {
    if max.is_zero() {
        return;
    }
    let ms = if min >= max {
        max.as_millis() as u64
    } else {
        rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64)
    };
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value: raw,
            }),
    }
}

fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
