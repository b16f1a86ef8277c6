//! Providers module - Completion providers
//!
//! This module defines the [`CompletionProvider`] trait the generation
//! coordinator calls, and ships an OpenAI-compatible implementation.

pub mod openai;
mod types;

use crate::error::ProviderError;

pub use openai::OpenAIProvider;
pub use types::{ChatOptions, Completion, CompletionProvider, ToolDefinition, Usage};

/// Parse an HTTP status code and response body into a structured [`ProviderError`].
pub fn parse_provider_error(status: u16, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth(body.to_string()),
        402 => ProviderError::Billing(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        408 => ProviderError::Timeout(body.to_string()),
        429 => ProviderError::RateLimit(body.to_string()),
        400 | 422 => ProviderError::InvalidRequest(body.to_string()),
        500..=599 => ProviderError::ServerError(body.to_string()),
        _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_error_auth() {
        let err = parse_provider_error(401, "invalid api key");
        assert!(matches!(err, ProviderError::Auth(_)));
        assert!(matches!(
            parse_provider_error(403, "forbidden"),
            ProviderError::Auth(_)
        ));
    }

    #[test]
    fn test_parse_provider_error_billing_and_model() {
        assert!(matches!(
            parse_provider_error(402, "payment required"),
            ProviderError::Billing(_)
        ));
        assert!(matches!(
            parse_provider_error(404, "model not found"),
            ProviderError::ModelNotFound(_)
        ));
    }

    #[test]
    fn test_parse_provider_error_rate_limit_and_timeout() {
        assert!(matches!(
            parse_provider_error(429, "slow down"),
            ProviderError::RateLimit(_)
        ));
        assert!(matches!(
            parse_provider_error(408, "timeout"),
            ProviderError::Timeout(_)
        ));
    }

    #[test]
    fn test_parse_provider_error_invalid_request() {
        assert!(matches!(
            parse_provider_error(400, "bad json"),
            ProviderError::InvalidRequest(_)
        ));
        assert!(matches!(
            parse_provider_error(422, "bad schema"),
            ProviderError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_parse_provider_error_server() {
        for status in [500, 502, 503, 504] {
            assert!(matches!(
                parse_provider_error(status, "oops"),
                ProviderError::ServerError(_)
            ));
        }
    }

    #[test]
    fn test_parse_provider_error_unknown() {
        let err = parse_provider_error(418, "teapot");
        assert!(matches!(err, ProviderError::Unknown(_)));
        assert!(err.to_string().contains("HTTP 418"));
    }
}
