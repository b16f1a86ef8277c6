//! System prompt resolution
//!
//! The [`HistoryFormatter`](crate::history::HistoryFormatter) asks a
//! [`PromptProvider`] for a named system prompt on every attempt, so edits to
//! prompt files apply to the next generation without touching stored history.

use crate::error::{Result, TurnstileError};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Name of the system prompt used when none is configured.
pub const DEFAULT_PROMPT_NAME: &str = "default_system";

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful conversational assistant.

A user may send several short messages in a row; treat them together as one request.

You have access to tools. Use them when they help answer the user, and answer directly otherwise.

Be concise but helpful."#;

/// Source of named system prompts.
pub trait PromptProvider: Send + Sync {
    /// Resolve the system prompt registered under `name`.
    fn get_system_prompt(&self, name: &str) -> Result<String>;
}

/// Prompt library backed by built-in prompts and an optional directory.
///
/// A prompt named `foo` resolves to `<dir>/foo.md` when that file exists,
/// falling back to the built-in table.
///
/// # Example
/// ```
/// use turnstile::prompts::{PromptLibrary, PromptProvider};
///
/// let library = PromptLibrary::new().with_prompt("terse", "Answer in one line.");
/// assert_eq!(library.get_system_prompt("terse").unwrap(), "Answer in one line.");
/// assert!(library.get_system_prompt("default_system").is_ok());
/// assert!(library.get_system_prompt("missing").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    builtin: HashMap<String, String>,
    dir: Option<PathBuf>,
}

impl PromptLibrary {
    /// Create a library holding only the built-in `default_system` prompt.
    pub fn new() -> Self {
        let mut builtin = HashMap::new();
        builtin.insert(
            DEFAULT_PROMPT_NAME.to_string(),
            DEFAULT_SYSTEM_PROMPT.to_string(),
        );
        Self { builtin, dir: None }
    }

    /// Look up prompts in `dir` before the built-in table.
    pub fn with_dir(mut self, dir: PathBuf) -> Self {
        self.dir = Some(dir);
        self
    }

    /// Register (or replace) a built-in prompt.
    pub fn with_prompt(mut self, name: &str, text: &str) -> Self {
        self.builtin.insert(name.to_string(), text.to_string());
        self
    }

    /// Names of the built-in prompts, sorted.
    pub fn builtin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.builtin.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn read_from_dir(&self, name: &str) -> Result<Option<String>> {
        let Some(ref dir) = self.dir else {
            return Ok(None);
        };
        // Prompt names are plain identifiers; refuse anything path-like.
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(TurnstileError::Prompt(format!(
                "invalid prompt name '{}'",
                name
            )));
        }
        let path = dir.join(format!("{}.md", name));
        if !path.is_file() {
            return Ok(None);
        }
        debug!(prompt = name, path = %path.display(), "Loading prompt from file");
        let text = std::fs::read_to_string(&path)?;
        Ok(Some(text.trim_end().to_string()))
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptProvider for PromptLibrary {
    fn get_system_prompt(&self, name: &str) -> Result<String> {
        if let Some(text) = self.read_from_dir(name)? {
            return Ok(text);
        }
        self.builtin
            .get(name)
            .cloned()
            .ok_or_else(|| TurnstileError::Prompt(format!("unknown system prompt '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_prompt_present() {
        let library = PromptLibrary::new();
        let prompt = library.get_system_prompt(DEFAULT_PROMPT_NAME).unwrap();
        assert!(prompt.contains("helpful"));
        assert_eq!(library.builtin_names(), vec!["default_system"]);
    }

    #[test]
    fn test_missing_prompt_is_prompt_error() {
        let err = PromptLibrary::new().get_system_prompt("nope").unwrap_err();
        assert!(matches!(err, TurnstileError::Prompt(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_dir_overrides_builtin() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("default_system.md"), "From disk.\n\n").unwrap();

        let library = PromptLibrary::new().with_dir(temp.path().to_path_buf());
        assert_eq!(
            library.get_system_prompt("default_system").unwrap(),
            "From disk."
        );
    }

    #[test]
    fn test_dir_falls_back_to_builtin() {
        let temp = TempDir::new().unwrap();
        let library = PromptLibrary::new()
            .with_dir(temp.path().to_path_buf())
            .with_prompt("support", "Support agent.");
        assert_eq!(library.get_system_prompt("support").unwrap(), "Support agent.");
    }

    #[test]
    fn test_path_like_names_rejected() {
        let temp = TempDir::new().unwrap();
        let library = PromptLibrary::new().with_dir(temp.path().to_path_buf());
        assert!(library.get_system_prompt("../etc/passwd").is_err());
        assert!(library.get_system_prompt(".hidden").is_err());
    }
}
