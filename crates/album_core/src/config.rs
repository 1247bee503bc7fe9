use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// HTTP settings for document fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Skip certificate verification. The platform's edge hosts present
    /// certificate chains some trust stores reject, so this is on by default.
    pub accept_invalid_certs: bool,
    pub accept_language: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            request_timeout_ms: 45_000,
            redirect_limit: 5,
            max_bytes: 10 * 1024 * 1024,
            accept_invalid_certs: true,
            accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
        }
    }
}

impl FetchSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Browser-driven link harvesting limits and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSettings {
    pub max_rounds: u32,
    pub stagnant_round_limit: u32,
    pub scroll_pause_min_ms: u64,
    pub scroll_pause_max_ms: u64,
    /// Extra wait after the initial navigation settles.
    pub settle_delay_ms: u64,
    pub navigation_timeout_ms: u64,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            max_rounds: 50,
            stagnant_round_limit: 5,
            scroll_pause_min_ms: 2_000,
            scroll_pause_max_ms: 4_000,
            settle_delay_ms: 2_000,
            navigation_timeout_ms: 60_000,
        }
    }
}

impl HarvestSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// Windowed batch pacing for article extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub unit_delay_min_ms: u64,
    pub unit_delay_max_ms: u64,
    pub window_pause_ms: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            unit_delay_min_ms: 2_000,
            unit_delay_max_ms: 5_000,
            window_pause_ms: 8_000,
        }
    }
}

impl BatchSettings {
    pub fn window_pause(&self) -> Duration {
        Duration::from_millis(self.window_pause_ms)
    }
}

/// Complete, immutable configuration handed to the extractor at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub fetch: FetchSettings,
    pub harvest: HarvestSettings,
    pub batch: BatchSettings,
    pub retry: RetryPolicy,
}

impl ExtractorConfig {
    /// Parses a RON document; missing fields take their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.request_timeout_ms < 30_000 {
            return Err(ConfigError::Invalid(
                "fetch.request_timeout_ms must be at least 30000".into(),
            ));
        }
        if !(3..=5).contains(&self.fetch.redirect_limit) {
            return Err(ConfigError::Invalid(
                "fetch.redirect_limit must be between 3 and 5".into(),
            ));
        }
        if self.batch.batch_size == 0 {
            return Err(ConfigError::Invalid("batch.batch_size must be positive".into()));
        }
        if self.batch.unit_delay_min_ms > self.batch.unit_delay_max_ms {
            return Err(ConfigError::Invalid(
                "batch.unit_delay_min_ms exceeds batch.unit_delay_max_ms".into(),
            ));
        }
        if self.harvest.scroll_pause_min_ms > self.harvest.scroll_pause_max_ms {
            return Err(ConfigError::Invalid(
                "harvest.scroll_pause_min_ms exceeds harvest.scroll_pause_max_ms".into(),
            ));
        }
        if self.harvest.max_rounds == 0 || self.harvest.stagnant_round_limit == 0 {
            return Err(ConfigError::Invalid(
                "harvest round limits must be positive".into(),
            ));
        }
        Ok(())
    }
}
