//! Configuration type definitions for Turnstile
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so a partial (or absent) config file is always valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration struct for Turnstile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion provider settings
    pub provider: ProviderConfig,
    /// System prompt resolution
    pub prompts: PromptsConfig,
    /// Conversation history storage
    pub history: HistoryConfig,
    /// In-process message bus
    pub bus: BusConfig,
    /// Log output
    pub logging: LoggingConfig,
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Default OpenAI-compatible endpoint (Together)
pub const DEFAULT_API_BASE: &str = "https://api.together.xyz/v1";
/// Default chat model
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";

/// Settings for the OpenAI-compatible completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Bearer token for the API
    pub api_key: Option<String>,
    /// Base URL; `/chat/completions` is appended
    pub api_base: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Maximum tokens to generate per completion
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

// ============================================================================
// Prompts Configuration
// ============================================================================

/// Where system prompts come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory of `<name>.md` prompt files, checked before built-ins
    pub dir: Option<PathBuf>,
    /// Name of the system prompt used for every generation
    pub system_prompt: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            system_prompt: crate::prompts::DEFAULT_PROMPT_NAME.to_string(),
        }
    }
}

// ============================================================================
// History Configuration
// ============================================================================

/// Conversation store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// Process-lifetime only
    Memory,
    /// JSON file per user
    #[default]
    File,
}

/// Conversation history storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Storage backend
    pub backend: HistoryBackend,
    /// Directory for the file backend; defaults to `~/.turnstile/conversations`
    pub path: Option<PathBuf>,
}

// ============================================================================
// Bus Configuration
// ============================================================================

/// Message bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Capacity of the inbound and outbound channels
    pub buffer_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { buffer_size: 100 }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    Pretty,
    /// Compact text with `component` fields
    #[default]
    Component,
    /// JSON lines
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Append log lines to this file instead of stderr
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}
