//! Configuration management for Chatwire.
//!
//! Provides configuration loading from TOML files with support for
//! multiple file locations, environment variable overrides, and sensible defaults.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::content::PrefixTrimmer;
use crate::request::{ModelInfo, RequestOptions, ToolUse};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CHATWIRE_CONFIG";

/// Environment variable that overrides `api_key`.
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        /// Path to the configuration file that could not be parsed.
        path: PathBuf,
        /// The underlying TOML parse error.
        source: toml::de::Error,
    },
}

/// Per-model settings under `[models.<id>]`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelConfig {
    /// Force the reasoning-model field set on or off.
    #[serde(default)]
    pub reasoning: Option<bool>,

    /// Extra request fields for this model, merged last.
    #[serde(default)]
    pub request_params: Option<Map<String, Value>>,
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Chat Completions endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key for the endpoint. `OPENAI_API_KEY` takes precedence.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name to use.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub system_message: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Request streamed replies.
    #[serde(default = "default_stream")]
    pub stream: bool,

    #[serde(default)]
    pub tool_use: ToolUse,

    /// Role-echo prefixes stripped from the edges of multipart turns.
    #[serde(default)]
    pub trim_prefixes: Vec<String>,

    /// Backend-level extra request fields.
    #[serde(default)]
    pub request_params: Option<Map<String, Value>>,

    /// Per-model overrides keyed by model id.
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_stream() -> bool {
    true
}

impl Config {
    /// Load configuration from file system.
    ///
    /// Priority order:
    /// 1. CHATWIRE_CONFIG environment variable
    /// 2. ./chatwire.toml (local directory)
    /// 3. ~/.config/chatwire/config.toml (user config)
    ///
    /// Returns default config if no config file found.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if a found file cannot be read.
    /// Returns [`ConfigError::ParseError`] if a found file is not valid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                return Self::load_from(p);
            }
            tracing::debug!(path = %path, "config: {CONFIG_ENV_VAR} points to a missing file");
        }

        let local = PathBuf::from("chatwire.toml");
        if local.exists() {
            return Self::load_from(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config/chatwire/config.toml");
            if user_config.exists() {
                return Self::load_from(user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read.
    /// Returns [`ConfigError::ParseError`] if the file is not valid TOML.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config: loaded");
        Ok(config)
    }

    /// API key from `OPENAI_API_KEY`, falling back to the file value.
    pub fn resolve_api_key(&self) -> Option<String> {
        pick_api_key(std::env::var(API_KEY_ENV_VAR).ok(), self.api_key.as_deref())
    }

    /// Builder input for the configured model.
    pub fn model_info(&self) -> ModelInfo {
        self.model_info_for(&self.model)
    }

    /// Builder input for `model`, applying its `[models.<id>]` section if any.
    pub fn model_info_for(&self, model: &str) -> ModelInfo {
        let overrides = self.models.get(model);
        ModelInfo {
            id: model.to_string(),
            reasoning: overrides.and_then(|m| m.reasoning),
            backend_params: self.request_params.clone(),
            model_params: overrides.and_then(|m| m.request_params.clone()),
        }
    }

    /// Per-call options seeded from this configuration.
    ///
    /// Tools and response schemas are not file settings; callers add them.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            system_message: self.system_message.clone(),
            stream: self.stream,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tool_use: self.tool_use,
            trimmer: PrefixTrimmer::new(self.trim_prefixes.iter().cloned()),
            ..RequestOptions::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            system_message: None,
            temperature: None,
            max_tokens: None,
            stream: default_stream(),
            tool_use: ToolUse::default(),
            trim_prefixes: Vec::new(),
            request_params: None,
            models: HashMap::new(),
        }
    }
}

fn pick_api_key(env: Option<String>, file: Option<&str>) -> Option<String> {
    env.filter(|key| !key.is_empty())
        .or_else(|| file.filter(|key| !key.is_empty()).map(str::to_string))
}
