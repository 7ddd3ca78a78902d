//! Configuration management for Deskclerk
//!
//! Handles loading and saving the assistant configuration: model selection,
//! token budget, API credentials, and the system instructions template.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default instructions template. Placeholders are resolved per request; if any
/// of them cannot be resolved the template is used verbatim.
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are an AI assistant integrated \
with the {company} back office. You answer questions for {user_name} ({user_email}, \
roles: {roles}) using only the data returned by your tools. Always finish by calling \
the final_answer tool. The current date and time is {now}.";

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> usize {
    8_000
}

fn default_system_instructions() -> String {
    DEFAULT_SYSTEM_INSTRUCTIONS.to_string()
}

/// Assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model to use for chat completions
    pub model: String,
    /// Token budget for the conversation sent to the model
    pub max_tokens: usize,
    /// API key (can be loaded from env)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Base URL for the API (optional, for self-hosted gateways)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// System instructions template with named placeholders
    pub system_instructions: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            base_url: None,
            system_instructions: default_system_instructions(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), text)?;
        Ok(())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("deskclerk"))
            .unwrap_or_else(|| PathBuf::from(".deskclerk"))
            .join("config.toml")
    }

    /// Resolve the API key: explicit key first, then the configured env var
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key
            && !key.is_empty()
        {
            return Some(key.clone());
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.is_empty())
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the token budget
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the API key directly
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the system instructions template
    pub fn with_system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = instructions.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 8_000);
        assert!(config.system_instructions.contains("{now}"));
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_model("gpt-4o-mini")
            .with_max_tokens(4_000)
            .with_api_key("sk-test");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 4_000);
        assert_eq!(config.resolve_api_key(), Some("sk-test".to_string()));
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::default().with_model("gpt-4o-mini");
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.model, "gpt-4o-mini");
        assert_eq!(loaded.max_tokens, config.max_tokens);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"gpt-4.1\"\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.model, "gpt-4.1");
        assert_eq!(loaded.max_tokens, 8_000);
    }
}
