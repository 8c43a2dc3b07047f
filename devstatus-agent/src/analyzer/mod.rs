//! Dependency-manifest analysis.
//!
//! A [`ManifestAnalyzer`] reads a manifest file (package.json, Cargo.toml,
//! ...) and reports which checklist items the declared dependencies point
//! at. Two implementations exist:
//!
//! - [`KeywordAnalyzer`]: fixed keyword table, no I/O
//! - [`CompletionAnalyzer`]: asks a [`CompletionBackend`] to classify the file
//!
//! The implementation is picked from [`AnalyzerSettings`] by
//! [`build_analyzer`].

mod completion;
mod keyword;

pub use completion::CompletionAnalyzer;
pub use keyword::KeywordAnalyzer;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use checklist::{Catalog, EnvName, StatusEnum};
use serde::{Deserialize, Serialize};

use crate::backend::{CompletionBackend, LlmError, OpenAiBackend};

/// Error types for manifest analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// Completion backend failed
    #[error("Backend error: {0}")]
    Backend(#[from] LlmError),

    /// Reply could not be read as a list of matches
    #[error("Malformed analyzer reply: {0}")]
    Malformed(String),

    /// Analysis task panicked or was cancelled before it finished
    #[error("Analysis aborted: {0}")]
    Aborted(String),
}

/// A checklist item the analyzer may report against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub slug: String,
    pub title: String,
    pub stages: BTreeSet<EnvName>,
}

/// What the analyzer is asked to look at.
#[derive(Debug, Clone)]
pub struct ManifestInput {
    /// File name as saved, e.g. `package.json`
    pub filename: String,
    /// Raw file content
    pub content: String,
    /// Items the analyzer may map dependencies onto
    pub candidates: Vec<CandidateItem>,
}

impl ManifestInput {
    pub fn new(
        filename: impl Into<String>,
        content: impl Into<String>,
        candidates: Vec<CandidateItem>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            candidates,
        }
    }
}

/// Every subcategory of the catalog as an analyzer candidate.
pub fn candidates_from_catalog(catalog: &Catalog) -> Vec<CandidateItem> {
    catalog
        .subcategories()
        .iter()
        .map(|sub| CandidateItem {
            slug: sub.slug.clone(),
            title: sub.title.clone(),
            stages: sub.stages.clone(),
        })
        .collect()
}

/// Status an analyzer may suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    InProgress,
    Done,
}

impl From<MatchStatus> for StatusEnum {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::InProgress => StatusEnum::InProgress,
            MatchStatus::Done => StatusEnum::Done,
        }
    }
}

/// One dependency-to-item mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerMatch {
    pub slug: String,
    pub status: MatchStatus,
    pub reason: String,
    /// 0 - 100
    pub confidence: u8,
}

/// Maps manifest dependencies onto checklist items.
#[async_trait]
pub trait ManifestAnalyzer: Send + Sync {
    /// Name used in activity messages.
    fn name(&self) -> &str;

    /// Analyze one manifest. Empty content yields no matches.
    async fn analyze(&self, input: &ManifestInput) -> Result<Vec<AnalyzerMatch>, AnalyzerError>;
}

/// Which analyzer to construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyzerSettings {
    /// Built-in keyword table
    Keyword,
    /// OpenAI-compatible chat completions endpoint
    Completion {
        base_url: String,
        model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self::Keyword
    }
}

/// Construct the analyzer described by `settings`.
pub fn build_analyzer(
    settings: &AnalyzerSettings,
) -> Result<Arc<dyn ManifestAnalyzer>, AnalyzerError> {
    match settings {
        AnalyzerSettings::Keyword => Ok(Arc::new(KeywordAnalyzer::new())),
        AnalyzerSettings::Completion {
            base_url,
            model,
            api_key,
            timeout_ms,
        } => {
            let backend: Arc<dyn CompletionBackend> = Arc::new(OpenAiBackend::new(
                base_url.as_str(),
                model.as_str(),
                api_key.clone(),
                Duration::from_millis(*timeout_ms),
            )?);
            Ok(Arc::new(CompletionAnalyzer::new(backend)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_yaml() {
        let settings: AnalyzerSettings = serde_yaml::from_str(
            "kind: completion\nbase_url: http://localhost:11434/v1\nmodel: llama3\n",
        )
        .unwrap();

        match settings {
            AnalyzerSettings::Completion {
                model,
                api_key,
                timeout_ms,
                ..
            } => {
                assert_eq!(model, "llama3");
                assert!(api_key.is_none());
                assert_eq!(timeout_ms, 30_000);
            }
            other => panic!("unexpected settings: {other:?}"),
        }

        let keyword: AnalyzerSettings = serde_yaml::from_str("kind: keyword").unwrap();
        assert_eq!(keyword, AnalyzerSettings::Keyword);
    }

    #[test]
    fn test_build_selects_implementation() {
        let keyword = build_analyzer(&AnalyzerSettings::Keyword).unwrap();
        assert_eq!(keyword.name(), "Keyword Analyzer");

        let completion = build_analyzer(&AnalyzerSettings::Completion {
            base_url: "http://localhost:1/v1".to_string(),
            model: "m".to_string(),
            api_key: None,
            timeout_ms: 1000,
        })
        .unwrap();
        assert_eq!(completion.name(), "Completion Analyzer");
    }

    #[test]
    fn test_candidates_cover_catalog() {
        let catalog = Catalog::builtin();
        let candidates = candidates_from_catalog(&catalog);
        assert_eq!(candidates.len(), catalog.subcategories().len());
        assert!(candidates
            .iter()
            .any(|c| c.slug == "unit-tests" && c.stages.contains(&EnvName::Dev)));
    }

    #[test]
    fn test_match_status_maps_to_status() {
        assert_eq!(StatusEnum::from(MatchStatus::Done), StatusEnum::Done);
        assert_eq!(StatusEnum::from(MatchStatus::InProgress), StatusEnum::InProgress);
    }
}
