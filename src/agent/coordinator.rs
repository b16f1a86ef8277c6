//! Generation coordinator
//!
//! Runs the per-user generation loop: snapshot the pending batch, fetch
//! history, call the provider with tools enabled, optionally execute tool
//! calls and call the provider again with tools disabled, then settle. Any
//! message that arrives before settlement discards the attempt and restarts
//! it with a fresh snapshot, so no outcome is ever built from a stale view.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::{Result, TurnstileError};
use crate::history::{HistoryFormatter, HistoryStore, ToolCallResult, Turn};
use crate::processor::{GenerationGuard, MessageProcessor, ProcessorRegistry, Submission};
use crate::providers::CompletionProvider;
use crate::tools::ToolCallExecutor;

/// Result of one attempt over a snapshot.
enum Attempt {
    /// Newer messages arrived after phase 1; discard and restart.
    Stale,
    /// Outcome turns, pending final settlement.
    Ready(Vec<Turn>),
}

/// Coalesces bursts of user messages into single generations.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use turnstile::agent::GenerationCoordinator;
/// use turnstile::history::{ConversationStore, HistoryFormatter, Turn};
/// use turnstile::prompts::PromptLibrary;
/// use turnstile::providers::{Completion, CompletionProvider, ToolDefinition};
/// use turnstile::tools::{ToolCallExecutor, ToolRegistry};
///
/// struct Canned;
///
/// #[async_trait]
/// impl CompletionProvider for Canned {
///     async fn complete(
///         &self,
///         _turns: Vec<Turn>,
///         _tools: Option<Vec<ToolDefinition>>,
///     ) -> turnstile::Result<Completion> {
///         Ok(Completion::text("Hello!"))
///     }
///
///     fn name(&self) -> &str {
///         "canned"
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let coordinator = GenerationCoordinator::new(
///     Arc::new(ConversationStore::new_memory()),
///     Arc::new(Canned),
///     ToolCallExecutor::new(Arc::new(ToolRegistry::with_builtins())),
///     HistoryFormatter::new(Arc::new(PromptLibrary::new())),
/// );
///
/// let turns = coordinator.generate_response("user-1", "hi").await.unwrap();
/// assert_eq!(turns, vec![Turn::assistant("Hello!")]);
/// # });
/// ```
pub struct GenerationCoordinator {
    registry: Arc<ProcessorRegistry>,
    history: Arc<dyn HistoryStore>,
    provider: Arc<dyn CompletionProvider>,
    executor: ToolCallExecutor,
    formatter: HistoryFormatter,
}

impl GenerationCoordinator {
    /// Create a coordinator with a fresh processor registry.
    pub fn new(
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn CompletionProvider>,
        executor: ToolCallExecutor,
        formatter: HistoryFormatter,
    ) -> Self {
        Self {
            registry: Arc::new(ProcessorRegistry::new()),
            history,
            provider,
            executor,
            formatter,
        }
    }

    /// Use a shared processor registry.
    pub fn with_registry(mut self, registry: Arc<ProcessorRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// The processor registry.
    pub fn registry(&self) -> &Arc<ProcessorRegistry> {
        &self.registry
    }

    /// The conversation history store.
    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Record an inbound message without starting a generation.
    ///
    /// The message is picked up by the user's next generation attempt.
    pub fn append(&self, user_id: &str, text: &str) {
        self.registry.append(user_id, text);
    }

    /// Buffer an inbound message and try to become the user's active
    /// generation, without running it.
    ///
    /// Callers that handle messages concurrently must submit in arrival
    /// order and then drive each result with
    /// [`run_submission`](Self::run_submission).
    pub fn submit(&self, user_id: &str, text: &str) -> Submission {
        self.registry.submit(user_id, text)
    }

    /// Generate a response for a submission that holds the user's gate.
    ///
    /// A deferred submission returns `None` immediately: the running
    /// generation already owns its message.
    pub async fn run_submission(&self, user_id: &str, submission: Submission) -> Option<Vec<Turn>> {
        let Submission { processor, guard } = submission;

        let Some(guard) = guard else {
            debug!(
                user_id,
                pending = processor.len(),
                "Generation in progress; message buffered"
            );
            return None;
        };

        let span = info_span!(
            "generation",
            user_id = %user_id,
            request_id = %Uuid::new_v4()
        );
        self.run(user_id, &processor, guard).instrument(span).await
    }

    /// Record an inbound message and, unless a generation for this user is
    /// already running, generate a response.
    ///
    /// Returns `None` when the message was buffered behind the running
    /// generation (which will include it) or when the attempt failed; the
    /// cause of a failure is logged. Never returns an error.
    pub async fn generate_response(&self, user_id: &str, text: &str) -> Option<Vec<Turn>> {
        let submission = self.submit(user_id, text);
        self.run_submission(user_id, submission).await
    }

    /// The main loop. Runs while holding `guard` and always gives it up
    /// before returning.
    async fn run(
        &self,
        user_id: &str,
        processor: &MessageProcessor,
        mut guard: GenerationGuard,
    ) -> Option<Vec<Turn>> {
        let mut attempt_no: u32 = 0;

        loop {
            attempt_no += 1;
            let batch = processor.snapshot();

            if batch.is_empty() {
                debug!("Pending buffer already drained");
                processor.release(guard);
                self.registry.evict(user_id);
                return None;
            }

            debug!(attempt = attempt_no, batch = batch.len(), "Starting attempt");

            match self.attempt(user_id, processor, &batch).await {
                Ok(Attempt::Stale) => {
                    info!(
                        attempt = attempt_no,
                        batch = batch.len(),
                        pending = processor.len(),
                        "New messages after phase 1; restarting"
                    );
                }
                Ok(Attempt::Ready(turns)) => match processor.settle(guard, batch.len()) {
                    Ok(()) => {
                        self.registry.evict(user_id);
                        info!(
                            attempts = attempt_no,
                            messages = batch.len(),
                            turns = turns.len(),
                            "Generation complete"
                        );
                        return Some(turns);
                    }
                    Err(held) => {
                        guard = held;
                        info!(
                            attempt = attempt_no,
                            batch = batch.len(),
                            pending = processor.len(),
                            "New messages before settlement; restarting"
                        );
                    }
                },
                Err(e) => {
                    error!(attempt = attempt_no, error = %e, "Generation failed");
                    processor.release(guard);
                    self.registry.evict(user_id);
                    return None;
                }
            }
        }
    }

    /// One attempt over `batch`. Does not touch the buffer or the lock.
    async fn attempt(
        &self,
        user_id: &str,
        processor: &MessageProcessor,
        batch: &[String],
    ) -> Result<Attempt> {
        let history = self
            .history
            .fetch_history(user_id)
            .await
            .map_err(|e| match e {
                TurnstileError::History(_) => e,
                other => TurnstileError::History(other.to_string()),
            })?;

        let prompt = self.formatter.build_prompt(&history, batch)?;

        debug!(phase = 1, turns = prompt.len(), "Requesting completion");
        let first = self
            .provider
            .complete(prompt.clone(), Some(self.executor.registry().definitions()))
            .await?;

        if processor.has_newer_than(batch.len()) {
            return Ok(Attempt::Stale);
        }

        if !first.has_tool_calls() {
            return Ok(Attempt::Ready(vec![Turn::assistant(&first.content)]));
        }

        let results = self.executor.execute(&first.tool_calls);
        info!(
            requested = first.tool_calls.len(),
            resolved = results.len(),
            "Tool calls executed"
        );

        let mut outcome = Vec::with_capacity(results.len() + 2);
        outcome.push(Turn::assistant_with_tool_calls(
            &first.content,
            first.tool_calls,
        ));
        outcome.extend(results.into_iter().map(ToolCallResult::into_turn));

        let mut augmented = prompt;
        augmented.extend(outcome.iter().cloned());

        debug!(phase = 2, turns = augmented.len(), "Requesting completion");
        let second = self.provider.complete(augmented, None).await?;

        outcome.push(Turn::assistant(&second.content));
        Ok(Attempt::Ready(outcome))
    }
}
