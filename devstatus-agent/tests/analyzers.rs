//! Analyzer construction from settings, run against the built-in catalog.

use checklist::Catalog;
use devstatus_agent::{
    build_analyzer, candidates_from_catalog, AnalyzerError, AnalyzerSettings, LlmError,
    ManifestInput, MatchStatus,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manifest(content: &str) -> ManifestInput {
    ManifestInput::new(
        "package.json",
        content,
        candidates_from_catalog(&Catalog::builtin()),
    )
}

fn completion_settings(server: &MockServer, api_key: Option<&str>) -> AnalyzerSettings {
    AnalyzerSettings::Completion {
        base_url: format!("{}/v1", server.uri()),
        model: "test-model".to_string(),
        api_key: api_key.map(str::to_string),
        timeout_ms: 5_000,
    }
}

#[tokio::test]
async fn keyword_settings_scan_in_table_order() {
    let analyzer = build_analyzer(&AnalyzerSettings::default()).unwrap();
    assert_eq!(analyzer.name(), "Keyword Analyzer");

    let matches = analyzer
        .analyze(&manifest(r#"{"dependencies": {"winston": "3", "pg": "8", "@supabase/supabase-js": "2"}}"#))
        .await
        .unwrap();
    let slugs: Vec<_> = matches.iter().map(|m| m.slug.as_str()).collect();
    assert_eq!(slugs, vec!["db-local", "logs-live"]);
    assert!(matches.iter().all(|m| m.status == MatchStatus::InProgress && m.confidence == 90));
}

#[tokio::test]
async fn completion_settings_send_key_and_parse_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {"content": "```json\n[{\"slug\": \"load-test\", \"status\": \"in_progress\", \"reason\": \"k6 scripts\", \"confidence\": 70.4}]\n```"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = build_analyzer(&completion_settings(&server, Some("secret"))).unwrap();
    assert_eq!(analyzer.name(), "Completion Analyzer");

    let matches = analyzer.analyze(&manifest(r#"{"k6": "0.50"}"#)).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].slug, "load-test");
    assert_eq!(matches[0].confidence, 70);
}

#[tokio::test]
async fn completion_server_error_surfaces_as_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let analyzer = build_analyzer(&completion_settings(&server, None)).unwrap();
    let result = analyzer.analyze(&manifest("jest")).await;
    assert!(matches!(
        result,
        Err(AnalyzerError::Backend(LlmError::RequestFailed(_)))
    ));
}
