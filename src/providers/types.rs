//! Provider types for Turnstile
//!
//! This module defines the [`CompletionProvider`] trait the generation
//! coordinator calls, along with chat options and completion types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::history::{ToolCallRequest, Turn};

/// Definition of a tool offered to the model in phase 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name the model uses to call the tool
    pub name: String,
    /// What the tool does, shown to the model
    pub description: String,
    /// JSON Schema for the tool's arguments
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    ///
    /// # Example
    /// ```
    /// use turnstile::providers::ToolDefinition;
    /// use serde_json::json;
    ///
    /// let tool = ToolDefinition::new(
    ///     "lookup_order",
    ///     "Look up an order by id",
    ///     json!({"type": "object", "properties": {"id": {"type": "string"}}}),
    /// );
    /// assert_eq!(tool.name, "lookup_order");
    /// ```
    pub fn new(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// A language-model completion service.
///
/// `tools` is `Some` for phase-1 calls (tool use enabled) and `None` for
/// phase-2 calls. Any failure, including a response with no usable choice,
/// is reported as an error.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request one completion over `turns`.
    async fn complete(
        &self,
        turns: Vec<Turn>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<Completion>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Sampling options sent with every request.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub stop: Option<Vec<String>>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }
}

/// The result of one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text; empty when the model returned none
    pub content: String,
    /// Tool calls requested by the model, in issue order
    pub tool_calls: Vec<ToolCallRequest>,
    /// Token usage, when the provider reports it
    pub usage: Option<Usage>,
}

impl Completion {
    /// A plain text completion.
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            tool_calls: vec![],
            usage: None,
        }
    }

    /// A completion requesting tool calls.
    pub fn with_tools(content: &str, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: content.to_string(),
            tool_calls,
            usage: None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Token usage for one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}
