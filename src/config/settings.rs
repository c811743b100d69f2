//! Configuration settings for silver-anno.

use crate::error::{AnnoError, Result};
use crate::retry::{Backoff, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub model: ModelSettings,
    pub retry: RetrySettings,
    pub pipeline: PipelineSettings,
    pub storage: StorageSettings,
    pub prompts: PromptSettings,
}

/// Remote annotation service provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Anthropic Messages API (default).
    #[default]
    Anthropic,
    /// OpenAI Chat Completions.
    OpenAI,
}

impl Provider {
    /// Environment variable holding the provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAI),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Remote model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider (anthropic, openai).
    pub provider: Provider,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature. Zero keeps annotations deterministic.
    pub temperature: f32,
    /// Cap on generated tokens per row.
    pub max_tokens: u32,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Override for the provider's API base URL.
    pub base_url: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            model: "claude-3-haiku-20240307".to_string(),
            temperature: 0.0,
            max_tokens: 100,
            timeout_seconds: 300,
            base_url: None,
        }
    }
}

/// Back-off shape between retries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// Retry settings for remote calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts per row. None retries forever.
    pub max_attempts: Option<u32>,
    /// Maximum time spent retrying a single row, in seconds. None = no limit.
    pub max_elapsed_seconds: Option<u64>,
    /// Delay before the first retry, in seconds.
    pub delay_seconds: u64,
    /// Back-off shape (fixed, exponential).
    pub backoff: BackoffKind,
    /// Growth factor for exponential back-off.
    pub multiplier: f64,
    /// Upper bound for exponential back-off, in seconds.
    pub max_delay_seconds: u64,
    /// Also retry errors that cannot succeed on retry (auth, bad request).
    pub retry_fatal: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: None,
            max_elapsed_seconds: None,
            delay_seconds: 30,
            backoff: BackoffKind::Fixed,
            multiplier: 2.0,
            max_delay_seconds: 300,
            retry_fatal: true,
        }
    }
}

impl RetrySettings {
    /// Build the retry policy described by these settings.
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        if self.backoff == BackoffKind::Exponential
            && !(self.multiplier.is_finite() && self.multiplier >= 1.0)
        {
            return Err(AnnoError::Config(format!(
                "retry.multiplier must be a finite number >= 1, got {}",
                self.multiplier
            )));
        }

        let initial = Duration::from_secs(self.delay_seconds);
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed(initial),
            BackoffKind::Exponential => Backoff::Exponential {
                initial,
                multiplier: self.multiplier,
                max: Duration::from_secs(self.max_delay_seconds),
            },
        };

        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            max_elapsed: self.max_elapsed_seconds.map(Duration::from_secs),
            backoff,
            retry_fatal: self.retry_fatal,
        })
    }
}

/// Batch pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Rows annotated concurrently. 1 keeps one remote call in flight.
    pub concurrency: usize,
    /// Check model responses against the tag format and log problems.
    pub validate_responses: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            validate_responses: false,
        }
    }
}

/// Input/output table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory annotated tables are written to.
    pub output_dir: String,
    /// Delete the input table once the output has been written.
    pub delete_input: bool,
    /// Project directory a relative `output_dir` and the `.env` file are
    /// resolved against. None uses the working directory.
    pub base_dir: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            output_dir: "annotations/3-llm-in-progress".to_string(),
            delete_input: true,
            base_dir: None,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AnnoError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("silver-anno")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded project base directory, if one is configured.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.storage.base_dir.as_deref().map(Self::expand_path)
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        let dir = Self::expand_path(&self.storage.output_dir);
        match self.base_dir() {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir,
        }
    }
}
