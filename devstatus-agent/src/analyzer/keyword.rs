//! Keyword-table manifest analyzer.

use async_trait::async_trait;
use tracing::debug;

use super::{AnalyzerError, AnalyzerMatch, ManifestAnalyzer, ManifestInput, MatchStatus};

/// Confidence attached to every keyword hit.
const KEYWORD_CONFIDENCE: u8 = 90;

/// Keyword, target slug, reason. Scanned in order.
const KEYWORD_TABLE: &[(&str, &str, &str)] = &[
    // Dev - Infra
    ("postgres", "db-local", "Detected PostgreSQL dependency"),
    ("supabase", "db-local", "Detected Supabase client"),
    ("react", "fe-be-sep", "Detected React Frontend"),
    ("next", "fe-be-sep", "Detected Next.js Framework"),
    ("dotenv", "env-vars", "Detected dotenv"),
    // Dev - Workflow
    ("jest", "unit-tests", "Detected Jest"),
    ("vitest", "unit-tests", "Detected Vitest"),
    // Dev - Advanced
    ("auth0", "auth-local", "Detected Auth0 SDK"),
    ("passport", "auth-local", "Detected Passport.js"),
    // Staging
    ("k6", "load-test", "Detected K6 Load Testing"),
    ("@pulumi/pulumi", "terraform", "Detected Pulumi IaC"),
    // Prod
    ("winston", "logs-live", "Detected Winston Logger"),
    ("mixpanel", "mixpanel", "Detected Mixpanel SDK"),
];

/// Case-insensitive substring scan over a fixed keyword table.
///
/// Every hit is reported as `in_progress`. Candidates are not consulted;
/// slugs that do not resolve in the target stage are dropped downstream.
#[derive(Debug, Default, Clone)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn scan(content: &str) -> Vec<AnalyzerMatch> {
        let haystack = content.to_lowercase();
        KEYWORD_TABLE
            .iter()
            .filter(|(keyword, _, _)| haystack.contains(keyword))
            .map(|(_, slug, reason)| AnalyzerMatch {
                slug: slug.to_string(),
                status: MatchStatus::InProgress,
                reason: reason.to_string(),
                confidence: KEYWORD_CONFIDENCE,
            })
            .collect()
    }
}

#[async_trait]
impl ManifestAnalyzer for KeywordAnalyzer {
    fn name(&self) -> &str {
        "Keyword Analyzer"
    }

    async fn analyze(&self, input: &ManifestInput) -> Result<Vec<AnalyzerMatch>, AnalyzerError> {
        let matches = Self::scan(&input.content);
        debug!(file = %input.filename, matches = matches.len(), "Keyword scan complete");
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(content: &str) -> ManifestInput {
        ManifestInput::new("package.json", content, Vec::new())
    }

    #[tokio::test]
    async fn test_jest_maps_to_unit_tests() {
        let matches = KeywordAnalyzer::new()
            .analyze(&input(r#"{"devDependencies": {"jest": "^29.0.0"}}"#))
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].slug, "unit-tests");
        assert_eq!(matches[0].reason, "Detected Jest");
        assert_eq!(matches[0].confidence, 90);
        assert_eq!(matches[0].status, MatchStatus::InProgress);
    }

    #[tokio::test]
    async fn test_case_insensitive_and_ordered() {
        let matches = KeywordAnalyzer::new()
            .analyze(&input("WINSTON\nPostgres\nReact"))
            .await
            .unwrap();

        let slugs: Vec<_> = matches.iter().map(|m| m.slug.as_str()).collect();
        assert_eq!(slugs, vec!["db-local", "fe-be-sep", "logs-live"]);
    }

    #[tokio::test]
    async fn test_empty_and_unrecognised_content() {
        let analyzer = KeywordAnalyzer::new();
        assert!(analyzer.analyze(&input("")).await.unwrap().is_empty());
        assert!(analyzer
            .analyze(&input("\u{1}\u{2}garbage%%%"))
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_name_and_cargo_manifest() {
        let analyzer = KeywordAnalyzer::new();
        assert_eq!(analyzer.name(), "Keyword Analyzer");

        let input = ManifestInput::new("Cargo.toml", "passport = \"1\"", Vec::new());
        let matches = tokio_test::block_on(analyzer.analyze(&input)).unwrap();
        assert_eq!(matches[0].slug, "auth-local");
    }

    #[test]
    fn test_substring_semantics() {
        // "nextjs" contains "next"; "lodash" contains nothing.
        let matches = KeywordAnalyzer::scan("nextjs lodash");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].reason, "Detected Next.js Framework");
    }
}
