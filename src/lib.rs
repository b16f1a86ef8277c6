//! Turnstile - per-user message coalescing for conversational generation
//!
//! Bursts of messages from one user are merged into a single generation:
//! while a generation runs, later messages are buffered, and any that arrive
//! before it settles cause it to restart over the combined batch.

pub mod agent;
pub mod bus;
pub mod config;
pub mod error;
pub mod history;
pub mod processor;
pub mod prompts;
pub mod providers;
pub mod tools;
pub mod utils;

pub use agent::{Dispatcher, GenerationCoordinator};
pub use bus::{InboundMessage, MessageBus, OutboundMessage};
pub use config::Config;
pub use error::{ProviderError, Result, TurnstileError};
pub use history::{ConversationStore, HistoryFormatter, HistoryStore, Role, Turn};
pub use processor::{MessageProcessor, ProcessorRegistry};
pub use prompts::{PromptLibrary, PromptProvider};
pub use providers::{Completion, CompletionProvider, OpenAIProvider, ToolDefinition};
pub use tools::{ToolCallExecutor, ToolRegistry};
