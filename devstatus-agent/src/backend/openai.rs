//! Chat-completions backend for OpenAI-style HTTP APIs (vLLM, Ollama, hosted).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{CompletionBackend, CompletionRequest, CompletionResponse, LlmError};

/// Talks to `{base_url}/chat/completions`.
pub struct OpenAiBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiBackend {
    /// `base_url` is the API root, e.g. `http://localhost:11434/v1`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Unavailable(format!("http client: {e}")))?;

        let base_url = base_url.into();
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
        })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatBody<'a> {
        let messages = request
            .system
            .as_deref()
            .map(|content| Turn {
                role: "system",
                content,
            })
            .into_iter()
            .chain(std::iter::once(Turn {
                role: "user",
                content: &request.prompt,
            }))
            .collect();

        ChatBody {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.json_output.then_some(JsonMode {
                kind: "json_object",
            }),
        }
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<Turn<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonMode>,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct JsonMode {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ReplyChoice>,
    usage: Option<ReplyUsage>,
}

#[derive(Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ReplyUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Seconds from a `Retry-After` header, in milliseconds.
fn retry_after_ms(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs * 1000)
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut http = self.client.post(&self.endpoint).json(&self.body(&request));
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        debug!(model = %self.model, endpoint = %self.endpoint, "Posting chat completion");
        let response = http
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(LlmError::RateLimited {
                    retry_after_ms: retry_after_ms(&response),
                });
            }
            status => {
                let detail = response.text().await.unwrap_or_default();
                return Err(LlmError::RequestFailed(format!("{status}: {detail}")));
            }
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let Some(choice) = reply.choices.into_iter().next() else {
            return Err(LlmError::ParseError("reply has no choices".to_string()));
        };

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            truncated: choice.finish_reason.as_deref() == Some("length"),
            tokens_used: reply.usage.map(|u| u.prompt_tokens + u.completion_tokens),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(uri: &str, key: Option<&str>) -> OpenAiBackend {
        OpenAiBackend::new(
            format!("{uri}/v1/"),
            "test-model",
            key.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_choice_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "response_format": {"type": "json_object"},
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"content": "[]"}, "finish_reason": "length"}
                ],
                "usage": {"prompt_tokens": 12, "completion_tokens": 1}
            })))
            .mount(&server)
            .await;

        let response = backend(&server.uri(), Some("secret"))
            .complete(CompletionRequest::user("hi").with_json_output())
            .await
            .unwrap();

        assert_eq!(response.content, "[]");
        assert!(response.truncated);
        assert_eq!(response.tokens_used, Some(13));
    }

    #[tokio::test]
    async fn test_throttling_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let result = backend(&server.uri(), None)
            .complete(CompletionRequest::user("hi"))
            .await;

        assert!(matches!(
            result,
            Err(LlmError::RateLimited {
                retry_after_ms: Some(3000)
            })
        ));
    }

    #[tokio::test]
    async fn test_no_choices_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let result = backend(&server.uri(), None)
            .complete(CompletionRequest::user("hi"))
            .await;

        assert!(matches!(result, Err(LlmError::ParseError(_))));
    }
}
