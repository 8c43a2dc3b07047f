//! DevStatus Agents - developer-tool agents and manifest analysis
//!
//! Provides the pieces of DevStatus that talk to (or stand in for) the
//! outside world:
//! - The agent roster (IDE, CI and AI assistants that emit events)
//! - Trait-based completion backends (OpenAI-compatible, mock)
//! - The [`ManifestAnalyzer`] capability with a keyword implementation and a
//!   completion-service implementation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            ManifestAnalyzer             │
//! │  (filename + content + candidates)      │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┴───────────┐
//!      ▼                       ▼
//! ┌─────────────┐       ┌──────────────────┐
//! │  Keyword    │       │  Completion      │
//! │  table scan │       │  (CompletionBackend)
//! └─────────────┘       └──────────────────┘
//! ```

pub mod analyzer;
pub mod backend;
pub mod types;

// Re-export main types for convenience
pub use analyzer::{
    build_analyzer, candidates_from_catalog, AnalyzerError, AnalyzerMatch, AnalyzerSettings,
    CandidateItem, CompletionAnalyzer, KeywordAnalyzer, ManifestAnalyzer, ManifestInput,
    MatchStatus,
};
pub use backend::traits::{CompletionBackend, CompletionRequest, CompletionResponse, LlmError};
pub use types::*;
