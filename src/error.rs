//! Error types for Turnstile
//!
//! Uses `thiserror` for the `Display` and `Error` implementations. The
//! generation coordinator never lets these escape `generate_response`; they
//! are logged and turned into an absent outcome at that boundary.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Structured classification of completion provider HTTP failures.
///
/// Failed provider calls are not retried by this crate, so the classification
/// only serves to make logged causes precise.
#[derive(Debug)]
pub enum ProviderError {
    /// 401: Invalid API key or authentication failure
    Auth(String),
    /// 429: Rate limit or quota exceeded
    RateLimit(String),
    /// 402: Payment required or billing issue
    Billing(String),
    /// 500/502/503/504: Server-side errors
    ServerError(String),
    /// 400: Bad request, invalid JSON, malformed parameters
    InvalidRequest(String),
    /// 404: Model not found or endpoint not available
    ModelNotFound(String),
    /// Connection or read timeout
    Timeout(String),
    /// Catch-all for unrecognized errors
    Unknown(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            ProviderError::RateLimit(msg) => write!(f, "Rate limit error: {}", msg),
            ProviderError::Billing(msg) => write!(f, "Billing error: {}", msg),
            ProviderError::ServerError(msg) => write!(f, "Server error: {}", msg),
            ProviderError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProviderError::ModelNotFound(msg) => write!(f, "Model not found: {}", msg),
            ProviderError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ProviderError::Unknown(msg) => write!(f, "Unknown provider error: {}", msg),
        }
    }
}

impl ProviderError {
    /// Returns the HTTP status code associated with this error, if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Auth(_) => Some(401),
            ProviderError::RateLimit(_) => Some(429),
            ProviderError::Billing(_) => Some(402),
            ProviderError::ServerError(_) => Some(500),
            ProviderError::InvalidRequest(_) => Some(400),
            ProviderError::ModelNotFound(_) => Some(404),
            ProviderError::Timeout(_) | ProviderError::Unknown(_) => None,
        }
    }
}

impl From<ProviderError> for TurnstileError {
    fn from(err: ProviderError) -> Self {
        TurnstileError::ProviderTyped(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for Turnstile operations.
#[derive(Error, Debug)]
pub enum TurnstileError {
    /// Configuration-related errors (invalid config, missing API key, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion provider failures in either generation phase.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Structured provider error carrying an HTTP classification.
    #[error("Provider error: {0}")]
    ProviderTyped(ProviderError),

    /// Conversation history could not be fetched or persisted.
    #[error("History error: {0}")]
    History(String),

    /// The named system prompt could not be resolved.
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// A model-issued tool call named a function that is not registered.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A tool rejected its arguments or failed while running.
    #[error("Tool error: {0}")]
    Tool(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Message bus channel closed unexpectedly
    #[error("Bus error: channel closed")]
    BusClosed,
}

/// A specialized `Result` type for Turnstile operations.
pub type Result<T> = std::result::Result<T, TurnstileError>;
