//! Projection of persisted history into a completion prompt

use std::sync::Arc;

use crate::error::Result;
use crate::prompts::{PromptProvider, DEFAULT_PROMPT_NAME};

use super::Turn;

/// Builds the turn sequence sent to the completion provider.
///
/// The system turn is resolved fresh on every call and never persisted.
#[derive(Clone)]
pub struct HistoryFormatter {
    prompts: Arc<dyn PromptProvider>,
    prompt_name: String,
}

impl HistoryFormatter {
    /// Create a formatter using the `default_system` prompt.
    pub fn new(prompts: Arc<dyn PromptProvider>) -> Self {
        Self {
            prompts,
            prompt_name: DEFAULT_PROMPT_NAME.to_string(),
        }
    }

    /// Use a different named system prompt.
    pub fn with_prompt_name(mut self, name: &str) -> Self {
        self.prompt_name = name.to_string();
        self
    }

    /// The configured system prompt name.
    pub fn prompt_name(&self) -> &str {
        &self.prompt_name
    }

    /// A system turn followed by `history` in original order.
    ///
    /// # Errors
    ///
    /// Fails if the configured prompt cannot be resolved.
    pub fn format(&self, history: &[Turn]) -> Result<Vec<Turn>> {
        let system = self.prompts.get_system_prompt(&self.prompt_name)?;
        let mut turns = Vec::with_capacity(history.len() + 1);
        turns.push(Turn::system(&system));
        turns.extend_from_slice(history);
        Ok(turns)
    }

    /// Build the prompt for one attempt over pending batch `batch`.
    ///
    /// The last `batch.len()` turns of `history` are dropped, since the
    /// dispatcher has already persisted those messages individually; the batch
    /// is then appended as one newline-joined user turn. Dropping never reaches
    /// into the system turn.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use turnstile::history::{HistoryFormatter, Turn};
    /// use turnstile::prompts::PromptLibrary;
    ///
    /// let formatter = HistoryFormatter::new(Arc::new(PromptLibrary::new()));
    /// let history = vec![Turn::user("hi"), Turn::user("how are you")];
    /// let batch = vec!["hi".to_string(), "how are you".to_string()];
    ///
    /// let prompt = formatter.build_prompt(&history, &batch).unwrap();
    /// assert_eq!(prompt.len(), 2);
    /// assert_eq!(prompt[1].content, "hi\nhow are you");
    /// ```
    pub fn build_prompt(&self, history: &[Turn], batch: &[String]) -> Result<Vec<Turn>> {
        let keep = history.len().saturating_sub(batch.len());
        let mut turns = self.format(&history[..keep])?;
        turns.push(Turn::user(&batch.join("\n")));
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TurnstileError;
    use crate::history::Role;
    use crate::prompts::PromptLibrary;

    fn formatter() -> HistoryFormatter {
        let library = PromptLibrary::new().with_prompt("test", "SYSTEM");
        HistoryFormatter::new(Arc::new(library)).with_prompt_name("test")
    }

    fn batch(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_format_prepends_system_turn() {
        let history = vec![Turn::user("a"), Turn::assistant("b")];
        let turns = formatter().format(&history).unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0], Turn::system("SYSTEM"));
        assert_eq!(&turns[1..], &history[..]);
    }

    #[test]
    fn test_build_prompt_drops_batch_sized_tail() {
        let history = vec![
            Turn::user("old"),
            Turn::assistant("old reply"),
            Turn::user("hi"),
            Turn::user("how are you"),
        ];
        let prompt = formatter()
            .build_prompt(&history, &batch(&["hi", "how are you"]))
            .unwrap();

        let contents: Vec<&str> = prompt.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["SYSTEM", "old", "old reply", "hi\nhow are you"]
        );
        assert_eq!(prompt.last().map(|t| t.role), Some(Role::User));
    }

    #[test]
    fn test_build_prompt_short_history_keeps_system() {
        let history = vec![Turn::user("only")];
        let prompt = formatter()
            .build_prompt(&history, &batch(&["x", "y", "z"]))
            .unwrap();
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0].role, Role::System);
        assert_eq!(prompt[1].content, "x\ny\nz");
    }

    #[test]
    fn test_missing_prompt_fails() {
        let formatter =
            HistoryFormatter::new(Arc::new(PromptLibrary::new())).with_prompt_name("absent");
        let err = formatter.build_prompt(&[], &batch(&["hi"])).unwrap_err();
        assert!(matches!(err, TurnstileError::Prompt(_)));
    }

    #[test]
    fn test_default_prompt_name() {
        let formatter = HistoryFormatter::new(Arc::new(PromptLibrary::new()));
        assert_eq!(formatter.prompt_name(), "default_system");
    }
}
