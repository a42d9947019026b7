//! Configuration file support

use kestrel_ai::CostInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for kestrel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default model to use
    pub model: Option<String>,
    /// Anthropic API key (alternative to ANTHROPIC_API_KEY)
    pub api_key: Option<String>,
    /// Override for the API base URL
    pub base_url: Option<String>,
    /// Maximum tokens per reply
    pub max_tokens: Option<u32>,
    /// Custom system prompt file path
    pub system_prompt_file: Option<String>,
    /// Suppress the per-turn cost line
    pub disable_cost_message: bool,
    /// Per-model pricing overrides, in dollars per million tokens
    pub pricing: HashMap<String, CostInfo>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kestrel")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("KESTREL_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file, falling back to defaults when it is missing
    /// or malformed
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "failed to parse config: {}", e);
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Pricing override for a model, if configured
    pub fn pricing_for(&self, model_id: &str) -> Option<CostInfo> {
        self.pricing.get(model_id).copied()
    }

    /// Read the custom system prompt, if one is configured
    pub fn system_prompt(&self) -> std::io::Result<Option<String>> {
        match &self.system_prompt_file {
            Some(file) => {
                let path = crate::tools::resolve_path(file);
                fs::read_to_string(path).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Write the commented example config if no file exists yet
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        init_at(&path)?;
        Ok(path)
    }
}

fn init_at(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, example_config())
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# kestrel configuration file
# Place at ~/.config/kestrel/config.toml (Linux/Mac) or %APPDATA%\kestrel\config.toml (Windows)

# Default model to use
model = "claude-sonnet-4-5-20250929"

# API key (optional - ANTHROPIC_API_KEY is used when unset)
# api_key = "sk-ant-..."

# API base URL override (optional)
# base_url = "https://api.anthropic.com"

# Maximum tokens per reply (defaults to the model's limit)
# max_tokens = 8192

# Custom system prompt file (optional)
# system_prompt_file = "~/.config/kestrel/system_prompt.txt"

# Set to true to hide the cost line printed after each turn
disable_cost_message = false

# Pricing overrides in dollars per million tokens
# [pricing."claude-sonnet-4-5-20250929"]
# input = 3.0
# output = 15.0
# cache_write = 3.75
# cache_read = 0.3
"#
}
