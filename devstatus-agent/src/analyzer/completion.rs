//! Completion-service manifest analyzer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    AnalyzerError, AnalyzerMatch, CandidateItem, ManifestAnalyzer, ManifestInput, MatchStatus,
};
use crate::backend::{CompletionBackend, CompletionRequest};

const SYSTEM_PROMPT: &str = "You map software dependencies to engineering checklist items. \
Reply with JSON only.";

/// Asks a completion backend to classify a manifest against the candidates.
pub struct CompletionAnalyzer {
    backend: Arc<dyn CompletionBackend>,
    max_tokens: u32,
}

impl CompletionAnalyzer {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            max_tokens: 1024,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_prompt(input: &ManifestInput) -> String {
        let candidates = candidates_json(&input.candidates);
        format!(
            "Analyze this {filename} file and map its dependencies to the following project subcategories.\n\n\
             Subcategories: {candidates}\n\n\
             File Content:\n{content}\n\n\
             Return a JSON array of objects with keys: \"slug\", \"status\" (enum: in_progress, done), \
             \"reason\", \"confidence\" (0-100).\n\
             Only return matches found in the file.",
            filename = input.filename,
            candidates = candidates,
            content = input.content,
        )
    }
}

fn candidates_json(candidates: &[CandidateItem]) -> String {
    serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string())
}

/// Reply entry as the service returns it. Status and confidence are loose.
#[derive(Debug, Deserialize)]
struct RawMatch {
    slug: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawReply {
    List(Vec<RawMatch>),
    Wrapped { matches: Vec<RawMatch> },
}

impl From<RawMatch> for AnalyzerMatch {
    fn from(raw: RawMatch) -> Self {
        let status = if raw.status.eq_ignore_ascii_case("done") {
            MatchStatus::Done
        } else {
            MatchStatus::InProgress
        };
        Self {
            slug: raw.slug,
            status,
            reason: raw.reason,
            confidence: raw.confidence.round().clamp(0.0, 100.0) as u8,
        }
    }
}

/// Parse a reply: a bare array, or an object with a `matches` array,
/// optionally inside a markdown code fence.
pub(crate) fn parse_reply(content: &str) -> Result<Vec<AnalyzerMatch>, AnalyzerError> {
    let body = strip_fence(content.trim());
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let reply: RawReply =
        serde_json::from_str(body).map_err(|e| AnalyzerError::Malformed(e.to_string()))?;

    let raw = match reply {
        RawReply::List(list) => list,
        RawReply::Wrapped { matches } => matches,
    };
    Ok(raw.into_iter().map(AnalyzerMatch::from).collect())
}

fn strip_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl ManifestAnalyzer for CompletionAnalyzer {
    fn name(&self) -> &str {
        "Completion Analyzer"
    }

    async fn analyze(&self, input: &ManifestInput) -> Result<Vec<AnalyzerMatch>, AnalyzerError> {
        if input.content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let request = CompletionRequest::user(Self::build_prompt(input))
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.0)
            .with_json_output();

        debug!(backend = %self.backend.id(), file = %input.filename, "Requesting manifest classification");

        let response = self.backend.complete(request).await?;
        let matches = parse_reply(&response.content).inspect_err(|e| {
            warn!(backend = %self.backend.id(), error = %e, "Unreadable analyzer reply");
        })?;

        debug!(file = %input.filename, matches = matches.len(), "Completion analysis complete");
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LlmError, MockBackend, OpenAiBackend};
    use checklist::EnvName;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn input(content: &str) -> ManifestInput {
        ManifestInput::new(
            "package.json",
            content,
            vec![CandidateItem {
                slug: "unit-tests".to_string(),
                title: "Unit Tests (Local)".to_string(),
                stages: BTreeSet::from([EnvName::Dev]),
            }],
        )
    }

    #[test]
    fn test_parse_bare_and_wrapped() {
        let bare = parse_reply(
            r#"[{"slug": "unit-tests", "status": "done", "reason": "jest", "confidence": 87.6}]"#,
        )
        .unwrap();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].status, MatchStatus::Done);
        assert_eq!(bare[0].confidence, 88);

        let wrapped = parse_reply(
            "```json\n{\"matches\": [{\"slug\": \"db-local\", \"status\": \"started\", \"confidence\": 140}]}\n```",
        )
        .unwrap();
        assert_eq!(wrapped[0].status, MatchStatus::InProgress);
        assert_eq!(wrapped[0].confidence, 100);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let result = parse_reply("I found a few dependencies!");
        assert!(matches!(result, Err(AnalyzerError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_prompt_contains_file_and_candidates() {
        let backend = Arc::new(MockBackend::new("mock").with_response(
            r#"[{"slug": "unit-tests", "status": "in_progress", "reason": "Detected Jest", "confidence": 90}]"#,
        ));
        let analyzer = CompletionAnalyzer::new(backend.clone());

        let matches = analyzer.analyze(&input("{\"jest\": \"29\"}")).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].reason, "Detected Jest");

        let request = backend.last_request().unwrap();
        assert!(request.json_output);
        let prompt = &request.prompt;
        assert!(prompt.contains("Analyze this package.json file"));
        assert!(prompt.contains("\"slug\":\"unit-tests\""));
        assert!(prompt.contains("{\"jest\": \"29\"}"));
    }

    #[tokio::test]
    async fn test_empty_content_skips_backend() {
        let backend = Arc::new(MockBackend::new("mock"));
        let analyzer = CompletionAnalyzer::new(backend.clone());

        assert!(analyzer.analyze(&input("   ")).await.unwrap().is_empty());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_is_error() {
        let backend = Arc::new(MockBackend::new("mock").with_available(false));
        let analyzer = CompletionAnalyzer::new(backend);

        let result = analyzer.analyze(&input("jest")).await;
        assert!(matches!(
            result,
            Err(AnalyzerError::Backend(LlmError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_against_http_backend() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"content": "{\"matches\": [{\"slug\": \"unit-tests\", \"status\": \"done\", \"reason\": \"vitest\", \"confidence\": 95}]}"},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(
            format!("{}/v1", server.uri()),
            "test-model",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let analyzer = CompletionAnalyzer::new(Arc::new(backend));

        let matches = analyzer.analyze(&input("vitest")).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].status, MatchStatus::Done);
        assert_eq!(matches[0].confidence, 95);
    }
}
