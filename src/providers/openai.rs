//! OpenAI-compatible Provider Implementation
//!
//! This module implements [`CompletionProvider`] for any endpoint speaking the
//! OpenAI Chat Completions protocol. The default base URL is Together's
//! OpenAI-compatible API.
//!
//! # Example
//!
//! ```rust,ignore
//! use turnstile::history::Turn;
//! use turnstile::providers::{CompletionProvider, OpenAIProvider};
//!
//! async fn example() {
//!     let provider = OpenAIProvider::new("your-api-key");
//!
//!     let turns = vec![
//!         Turn::system("You are a helpful assistant."),
//!         Turn::user("Hello!"),
//!     ];
//!
//!     let completion = provider.complete(turns, None).await.unwrap();
//!     println!("Model: {}", completion.content);
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ProviderConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::error::{ProviderError, Result, TurnstileError};
use crate::history::{Role, ToolCallRequest, Turn};

use super::{parse_provider_error, ChatOptions, Completion, CompletionProvider, ToolDefinition, Usage};

// ============================================================================
// OpenAI API Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest {
    id: String,
    r#type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunctionDef,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// ============================================================================
// OpenAI API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCallResponse {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
}

// ============================================================================
// OpenAI Provider
// ============================================================================

/// Completion provider for OpenAI-compatible Chat Completions endpoints.
pub struct OpenAIProvider {
    api_key: String,
    api_base: String,
    model: String,
    options: ChatOptions,
    client: Client,
}

impl OpenAIProvider {
    /// Create a provider against the default endpoint and model.
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE)
    }

    /// Create a provider against a custom endpoint.
    pub fn with_base_url(api_key: &str, api_base: &str) -> Self {
        Self::with_client(api_key, api_base, Client::new())
    }

    /// Create a provider with a preconfigured HTTP client.
    pub fn with_client(api_key: &str, api_base: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            options: ChatOptions::default(),
            client,
        }
    }

    /// Build a provider from the `provider` config section.
    ///
    /// # Errors
    ///
    /// Fails if no API key is configured.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                TurnstileError::Config(
                    "no API key configured (set TURNSTILE_PROVIDER_API_KEY or TOGETHER_API_KEY)"
                        .to_string(),
                )
            })?;

        Ok(Self::with_base_url(api_key, &config.api_base)
            .with_model(&config.model)
            .with_options(
                ChatOptions::new()
                    .with_max_tokens(config.max_tokens)
                    .with_temperature(config.temperature),
            ))
    }

    /// Use a different model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Set the sampling options sent with every request.
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// The model sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, turns: Vec<Turn>, tools: Option<Vec<ToolDefinition>>) -> OpenAIRequest {
        let tools = tools.filter(|t| !t.is_empty()).map(convert_tools);
        OpenAIRequest {
            model: self.model.clone(),
            messages: convert_turns(turns),
            tool_choice: tools.as_ref().map(|_| "auto".to_string()),
            tools,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            top_p: self.options.top_p,
            stop: self.options.stop.clone(),
        }
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

fn convert_turns(turns: Vec<Turn>) -> Vec<OpenAIMessage> {
    turns
        .into_iter()
        .map(|turn| {
            let role = match turn.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            }
            .to_string();

            let tool_calls = turn.tool_calls.map(|calls| {
                calls
                    .into_iter()
                    .map(|call| OpenAIToolCallRequest {
                        id: call.call_id,
                        r#type: "function".to_string(),
                        function: OpenAIFunctionCall {
                            name: call.function_name,
                            arguments: call.arguments,
                        },
                    })
                    .collect()
            });

            OpenAIMessage {
                role,
                content: if turn.content.is_empty() && tool_calls.is_some() {
                    None
                } else {
                    Some(turn.content)
                },
                tool_calls,
                tool_call_id: turn.tool_call_id,
            }
        })
        .collect()
}

fn convert_tools(tools: Vec<ToolDefinition>) -> Vec<OpenAITool> {
    tools
        .into_iter()
        .map(|t| OpenAITool {
            r#type: "function".to_string(),
            function: OpenAIFunctionDef {
                name: t.name,
                description: t.description,
                parameters: t.parameters,
            },
        })
        .collect()
}

/// A response without any choice is a failed completion.
fn convert_response(response: OpenAIResponse) -> Result<Completion> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        TurnstileError::Provider("completion response contained no choices".to_string())
    })?;

    let content = choice.message.content.unwrap_or_default();
    let tool_calls: Vec<ToolCallRequest> = choice
        .message
        .tool_calls
        .map(|calls| {
            calls
                .into_iter()
                .map(|tc| ToolCallRequest::new(&tc.id, &tc.function.name, &tc.function.arguments))
                .collect()
        })
        .unwrap_or_default();

    let mut completion = Completion::with_tools(&content, tool_calls);
    if let Some(usage) = response.usage {
        completion = completion.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
    }
    Ok(completion)
}

fn classify_transport_error(err: reqwest::Error) -> TurnstileError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string()).into()
    } else {
        TurnstileError::Provider(format!("request failed: {}", err))
    }
}

// ============================================================================
// CompletionProvider Implementation
// ============================================================================

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(
        &self,
        turns: Vec<Turn>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<Completion> {
        let request = self.build_request(turns, tools);

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map(Vec::len).unwrap_or(0),
            "Sending completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();

            let detail = match serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                Ok(parsed) => match parsed.error.r#type {
                    Some(kind) => format!("{} - {}", kind, parsed.error.message),
                    None => parsed.error.message,
                },
                Err(_) => error_text,
            };

            return Err(parse_provider_error(status, &detail).into());
        }

        let parsed: OpenAIResponse = response.json().await.map_err(|e| {
            TurnstileError::Provider(format!("failed to parse completion response: {}", e))
        })?;

        let completion = convert_response(parsed)?;
        info!(
            tool_calls = completion.tool_calls.len(),
            total_tokens = completion.usage.map(|u| u.total_tokens).unwrap_or(0),
            "Completion received"
        );
        Ok(completion)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Tests
// ============================================================================
