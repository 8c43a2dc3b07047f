//! The seam between manifest analysis and a text classification service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Failure talking to a completion service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Client could not be built, or the service is switched off
    #[error("completion service unavailable: {0}")]
    Unavailable(String),

    /// Service answered with a non-success status
    #[error("completion request rejected: {0}")]
    RequestFailed(String),

    #[error("completion service throttled the request (retry after {retry_after_ms:?} ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("transport failure: {0}")]
    NetworkError(String),

    /// Body was not a chat completion
    #[error("unexpected completion body: {0}")]
    ParseError(String),
}

/// Anything that can answer a single-turn prompt.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Identifier shown in logs, usually the model name.
    fn id(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Single-turn prompt with optional instructions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Instructions sent ahead of the prompt
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask for a JSON object reply
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(self, system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            ..self
        }
    }

    pub fn with_max_tokens(self, max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..self
        }
    }

    /// Clamped to 0.0 - 2.0.
    pub fn with_temperature(self, temperature: f32) -> Self {
        Self {
            temperature: Some(temperature.clamp(0.0, 2.0)),
            ..self
        }
    }

    pub fn with_json_output(self) -> Self {
        Self {
            json_output: true,
            ..self
        }
    }
}

/// What came back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    /// Generation stopped at the token limit
    pub truncated: bool,
    /// Prompt plus completion tokens, when the service reports them
    pub tokens_used: Option<u32>,
}

impl CompletionResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            truncated: false,
            tokens_used: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::user("classify this")
            .with_system("you are a classifier")
            .with_temperature(5.0)
            .with_json_output();

        assert_eq!(request.prompt, "classify this");
        assert_eq!(request.system.as_deref(), Some("you are a classifier"));
        assert_eq!(request.temperature, Some(2.0));
        assert!(request.max_tokens.is_none());
        assert!(request.json_output);
    }
}
