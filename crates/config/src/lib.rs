//! Configuration loading, validation, and management for Marquee.
//!
//! Loads configuration from `~/.marquee/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The root configuration structure.
///
/// Maps directly to `~/.marquee/config.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// LLM provider settings
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// TMDB settings (now-playing listings, reviews)
    #[serde(default)]
    pub tmdb: TmdbConfig,

    /// SerpAPI settings (showtime search)
    #[serde(default)]
    pub serpapi: SerpApiConfig,

    /// Function-dispatch settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Assistant persona settings
    #[serde(default)]
    pub persona: PersonaConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai", &self.openai)
            .field("tmdb", &self.tmdb)
            .field("serpapi", &self.serpapi)
            .field("dispatch", &self.dispatch)
            .field("persona", &self.persona)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key for the chat-completions endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for both function routing and final answers
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    500
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct TmdbConfig {
    /// Bearer token for api.themoviedb.org
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct SerpApiConfig {
    /// API key for serpapi.com
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for SerpApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpApiConfig")
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How many callback follow-up rounds a single turn may issue
    /// before failing closed.
    #[serde(default = "default_max_callback_depth")]
    pub max_callback_depth: u32,
}

fn default_max_callback_depth() -> u32 {
    4
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_callback_depth: default_max_callback_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersonaConfig {
    /// Override the assistant's persona prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.marquee/config.toml).
    ///
    /// Environment variables override the file:
    /// - `MARQUEE_API_KEY` / `OPENAI_API_KEY` — provider key
    /// - `MARQUEE_MODEL` — model
    /// - `TMDB_API_ACCESS_TOKEN` — TMDB bearer token
    /// - `SERP_API_KEY` — SerpAPI key
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.openai.api_key.is_none() {
            config.openai.api_key = std::env::var("MARQUEE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("MARQUEE_MODEL") {
            config.openai.model = model;
        }

        if config.tmdb.access_token.is_none() {
            config.tmdb.access_token = std::env::var("TMDB_API_ACCESS_TOKEN").ok();
        }

        if config.serpapi.api_key.is_none() {
            config.serpapi.api_key = std::env::var("SERP_API_KEY").ok();
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".marquee")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.openai.temperature < 0.0 || self.openai.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "openai.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.dispatch.max_callback_depth == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.max_callback_depth must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if a provider API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.openai.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
