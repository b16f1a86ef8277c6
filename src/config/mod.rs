//! Configuration management for Turnstile
//!
//! Configuration is loaded from `~/.turnstile/config.json` (or an explicit
//! path) with environment variable overrides following the pattern
//! `TURNSTILE_SECTION_KEY`.

mod types;
pub mod validate;

pub use types::*;

use crate::error::{Result, TurnstileError};
use std::path::{Path, PathBuf};

/// Fallback environment variable for the provider API key.
pub const TOGETHER_API_KEY_ENV: &str = "TOGETHER_API_KEY";

impl Config {
    /// Returns the Turnstile configuration directory path (~/.turnstile)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".turnstile")
    }

    /// Returns the path to the config file (~/.turnstile/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| {
                TurnstileError::Config(format!("failed to parse {}: {}", path.display(), e))
            })?
        } else {
            Config::default()
        };

        config.expand_paths();
        config.apply_env_overrides();

        Ok(config)
    }

    /// Expand a leading `~` in file-provided paths.
    fn expand_paths(&mut self) {
        for path in [&mut self.prompts.dir, &mut self.history.path]
            .into_iter()
            .flatten()
        {
            let expanded = path
                .to_str()
                .filter(|s| s.starts_with('~'))
                .map(expand_home);
            if let Some(expanded) = expanded {
                *path = expanded;
            }
        }
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Unparseable numeric or enum values are ignored.
    fn apply_env_overrides(&mut self) {
        // Provider
        if let Ok(val) = std::env::var("TURNSTILE_PROVIDER_API_KEY") {
            self.provider.api_key = Some(val);
        } else if self.provider.api_key.is_none() {
            if let Ok(val) = std::env::var(TOGETHER_API_KEY_ENV) {
                self.provider.api_key = Some(val);
            }
        }
        if let Ok(val) = std::env::var("TURNSTILE_PROVIDER_API_BASE") {
            self.provider.api_base = val;
        }
        if let Ok(val) = std::env::var("TURNSTILE_PROVIDER_MODEL") {
            self.provider.model = val;
        }
        if let Ok(val) = std::env::var("TURNSTILE_PROVIDER_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                self.provider.max_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("TURNSTILE_PROVIDER_TEMPERATURE") {
            if let Ok(v) = val.parse() {
                self.provider.temperature = v;
            }
        }

        // Prompts
        if let Ok(val) = std::env::var("TURNSTILE_PROMPTS_DIR") {
            self.prompts.dir = Some(expand_home(&val));
        }
        if let Ok(val) = std::env::var("TURNSTILE_PROMPTS_SYSTEM_PROMPT") {
            self.prompts.system_prompt = val;
        }

        // History
        if let Ok(val) = std::env::var("TURNSTILE_HISTORY_BACKEND") {
            match val.to_ascii_lowercase().as_str() {
                "memory" => self.history.backend = HistoryBackend::Memory,
                "file" => self.history.backend = HistoryBackend::File,
                _ => {}
            }
        }
        if let Ok(val) = std::env::var("TURNSTILE_HISTORY_PATH") {
            self.history.path = Some(expand_home(&val));
        }

        // Bus
        if let Ok(val) = std::env::var("TURNSTILE_BUS_BUFFER_SIZE") {
            if let Ok(v) = val.parse() {
                self.bus.buffer_size = v;
            }
        }

        // Logging
        if let Ok(val) = std::env::var("TURNSTILE_LOGGING_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("TURNSTILE_LOGGING_FORMAT") {
            match val.to_ascii_lowercase().as_str() {
                "pretty" => self.logging.format = LogFormat::Pretty,
                "component" => self.logging.format = LogFormat::Component,
                "json" => self.logging.format = LogFormat::Json,
                _ => {}
            }
        }
        if let Ok(val) = std::env::var("TURNSTILE_LOGGING_FILE") {
            self.logging.file = Some(val);
        }
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check semantic constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            return Err(TurnstileError::Config(
                "provider.model must not be empty".to_string(),
            ));
        }
        if self.provider.api_base.trim().is_empty() {
            return Err(TurnstileError::Config(
                "provider.api_base must not be empty".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(TurnstileError::Config(format!(
                "provider.temperature must be between 0.0 and 2.0, got {}",
                self.provider.temperature
            )));
        }
        if self.bus.buffer_size == 0 {
            return Err(TurnstileError::Config(
                "bus.buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.prompts.system_prompt.trim().is_empty() {
            return Err(TurnstileError::Config(
                "prompts.system_prompt must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// A copy safe to print, with the API key masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(ref key) = copy.provider.api_key {
            copy.provider.api_key = Some(mask_secret(key));
        }
        copy
    }
}

/// Keep the last four characters of a secret.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Expand ~ to home directory in a path string
pub(crate) fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
