use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::options::CallOptions;

/// Model identifiers grouped by modality.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ModelRoster {
    /// Text-completion models, preferred first.
    #[serde(default)]
    pub text: Vec<String>,
    /// Vision-capable models, preferred first.
    #[serde(default)]
    pub vision: Vec<String>,
}

/// OpenAI-compatible backend settings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OpenAiConfig {
    /// API key. Falls back to the `OPENAI_API_KEY` env var when absent.
    pub api_key: Option<String>,
    /// Alternate chat-completions endpoint.
    pub base_url: Option<String>,
    /// Known models per modality.
    #[serde(default)]
    pub models: ModelRoster,
    /// Default sampling temperature.
    pub temperature: Option<f64>,
    /// Default output token cap.
    pub max_tokens: Option<u32>,
}

impl OpenAiConfig {
    /// Builds call options from the configured defaults, using the
    /// first text model as the default model.
    pub fn default_options(&self) -> CallOptions {
        CallOptions {
            model: self.models.text.first().cloned(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..CallOptions::default()
        }
    }

    /// Builds call options for vision calls, using the first vision
    /// model instead.
    pub fn default_vision_options(&self) -> CallOptions {
        CallOptions {
            model: self.models.vision.first().cloned(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..CallOptions::default()
        }
    }
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AiConfig {
    /// OpenAI-compatible backend section.
    pub openai: Option<OpenAiConfig>,
}

impl AiConfig {
    /// Loads the configuration from the resolved path.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        let raw = fs::read_to_string(&path).map_err(|err| {
            Error::Config(format!(
                "Failed to read config file '{}': {err}",
                path.display()
            ))
        })?;
        Self::parse(&raw, &path)
    }

    fn parse(raw: &str, path: &Path) -> Result<Self> {
        toml::from_str(raw).map_err(|err| {
            Error::Config(format!(
                "Failed to parse config file '{}': {err}",
                path.display()
            ))
        })
    }
}

fn config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var("PP_CONFIG") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed).join("promptpipe").join("config.toml"));
        }
    }

    let home = env::var("HOME").map_err(|_| {
        Error::Config("Cannot resolve config path: set PP_CONFIG or HOME/XDG_CONFIG_HOME.".to_string())
    })?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("promptpipe")
        .join("config.toml"))
}
