//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so running without `--config` is valid.
//! The API credential is not read from here: it comes from the command line
//! (or `OPENAI_API_KEY`) on every run and is never persisted.
//!
//! ```yaml
//! model: gpt-4o-2024-08-06
//! api_base_url: https://api.openai.com/v1
//! fetch_timeout_secs: 30
//! user_agent: promo_extract/0.1
//! cache_ttl_secs: 3600
//! cache_capacity: 16
//! ```

use crate::error::PipelineError;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

/// Settings for the fetcher, the LLM client, and the batch cache.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Chat model used for both LLM calls.
    pub model: String,
    /// Base URL of the OpenAI-compatible API (no trailing slash).
    pub api_base_url: String,
    /// Timeout applied to each page fetch.
    pub fetch_timeout_secs: u64,
    /// `User-Agent` header sent with page fetches.
    pub user_agent: String,
    /// How long a finished batch stays in the cache.
    pub cache_ttl_secs: u64,
    /// Maximum number of batches kept in the cache.
    pub cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-2024-08-06".to_string(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            fetch_timeout_secs: 30,
            user_agent: concat!("promo_extract/", env!("CARGO_PKG_VERSION")).to_string(),
            cache_ttl_secs: 3600,
            cache_capacity: 16,
        }
    }
}

impl PipelineConfig {
    /// Parse a config from YAML text. Missing keys take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, PipelineError> {
        let mut config: PipelineConfig =
            serde_yaml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Load the config file at `path`, or defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, PipelineError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(Path::new(path))
            .await
            .map_err(|e| PipelineError::Config(format!("cannot read {path}: {e}")))?;
        let config = Self::from_yaml(&text)?;
        info!(model = %config.model, base_url = %config.api_base_url, "Loaded configuration");
        Ok(config)
    }
}
