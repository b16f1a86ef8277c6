//! Shared helpers for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use turnstile::agent::GenerationCoordinator;
use turnstile::config::Config;
use turnstile::history::{ConversationStore, HistoryFormatter};
use turnstile::prompts::PromptLibrary;
use turnstile::providers::OpenAIProvider;
use turnstile::tools::{ToolCallExecutor, ToolRegistry};

/// The config file in effect: `--config` if given, else the default path.
pub(crate) fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(Config::path)
}

/// Load config without validating it.
pub(crate) fn read_config(path: Option<&Path>) -> Result<Config> {
    let file = config_file(path);
    Config::load_from_path(&file)
        .with_context(|| format!("Failed to load configuration from {}", file.display()))
}

/// Load and validate config.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = read_config(path)?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub(crate) fn history_store(config: &Config) -> Result<Arc<ConversationStore>> {
    let store = ConversationStore::from_config(config)
        .context("Failed to open conversation store")?;
    Ok(Arc::new(store))
}

/// Wire a coordinator from config: OpenAI-compatible provider, built-in
/// tools, prompt library and conversation store.
pub(crate) fn build_coordinator(config: &Config) -> Result<GenerationCoordinator> {
    let provider = OpenAIProvider::from_config(&config.provider)?;

    let mut prompts = PromptLibrary::new();
    if let Some(dir) = &config.prompts.dir {
        prompts = prompts.with_dir(dir.clone());
    }
    let formatter =
        HistoryFormatter::new(Arc::new(prompts)).with_prompt_name(&config.prompts.system_prompt);

    Ok(GenerationCoordinator::new(
        history_store(config)?,
        Arc::new(provider),
        ToolCallExecutor::new(Arc::new(ToolRegistry::with_builtins())),
        formatter,
    ))
}
