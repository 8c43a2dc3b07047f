//! Status records, audit entries, and engine errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use checklist::StatusEnum;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Kind of supporting artifact attached to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    Pr,
    Pipeline,
    File,
    ConsoleLog,
    Screenshot,
    Artifact,
    AiChat,
}

impl EvidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pr => "pr",
            Self::Pipeline => "pipeline",
            Self::File => "file",
            Self::ConsoleLog => "console_log",
            Self::Screenshot => "screenshot",
            Self::Artifact => "artifact",
            Self::AiChat => "ai_chat",
        }
    }
}

impl Default for EvidenceType {
    fn default() -> Self {
        Self::Pr
    }
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "pr" => Ok(Self::Pr),
            "pipeline" => Ok(Self::Pipeline),
            "file" => Ok(Self::File),
            "console_log" => Ok(Self::ConsoleLog),
            "screenshot" => Ok(Self::Screenshot),
            "artifact" => Ok(Self::Artifact),
            "ai_chat" => Ok(Self::AiChat),
            other => Err(format!("unknown evidence type: {other}")),
        }
    }
}

/// Supporting material for a status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Unique identifier for this evidence entry
    pub id: String,
    /// What the link points at
    #[serde(rename = "type")]
    pub kind: EvidenceType,
    /// Link, or `#` for automated changes
    pub url: String,
    /// Short description shown next to the link
    pub label: String,
    /// When the evidence was attached
    pub created_at: DateTime<Utc>,
    /// Operator who vouched for it (manual updates only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
}

/// One accepted status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Unique identifier for this history entry
    pub id: String,
    /// When the transition was applied
    pub timestamp: DateTime<Utc>,
    /// Display name of whoever made the change
    pub actor: String,
    /// Status before the change
    pub previous_status: StatusEnum,
    /// Status after the change
    pub new_status: StatusEnum,
    /// Why it changed
    pub reason: String,
}

/// Free-form note on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Comment {
    /// Unique identifier for this comment
    pub id: String,
    /// Display name of the commenter
    pub author: String,
    /// Comment body
    pub text: String,
    /// When the comment was added
    pub timestamp: DateTime<Utc>,
}

/// Status of one checklist item in one environment.
///
/// `evidence`, `history` and `comments` are newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    /// Unique identifier for this record
    pub id: String,
    /// Project the record belongs to
    pub project_id: String,
    /// Environment partition
    pub env_id: String,
    /// Checklist item tracked
    pub subcategory_id: String,
    /// Current status
    pub status: StatusEnum,
    /// `system_agent` or an operator id
    pub last_updated_by: String,
    /// When the status last changed
    pub last_updated_at: DateTime<Utc>,
    /// 0 - 100
    pub confidence_score: u8,
    /// Rationale of the last automated change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_explanation: Option<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Category of an activity feed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Update,
    Alert,
    Agent,
    Ai,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Alert => "alert",
            Self::Agent => "agent",
            Self::Ai => "ai",
        }
    }
}

/// A line in the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ActivityLogEntry {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

/// Error types for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Environment id not in the catalog
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    /// Project id not in the catalog
    #[error("Unknown project: {0}")]
    UnknownProject(String),

    /// Loaded status records break the one-record-per-item rule
    #[error("Invalid status snapshot: {0}")]
    InvalidSnapshot(String),

    /// Catalog error
    #[error("Catalog error: {0}")]
    Catalog(#[from] checklist::CatalogError),

    /// Analyzer construction error
    #[error("Analyzer error: {0}")]
    Analyzer(#[from] devstatus_agent::AnalyzerError),

    /// Persistence error
    #[error("Storage error: {0}")]
    Storage(#[from] crate::persist::StorageError),

    /// Export rendering error
    #[error("Export error: {0}")]
    Export(String),

    /// Dashboard worker is gone
    #[error("Dashboard service stopped")]
    ServiceStopped,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tolerates_missing_lists() {
        let json = r#"{
            "id": "ps-e1-s_dev_docker",
            "projectId": "p1",
            "envId": "e1",
            "subcategoryId": "s_dev_docker",
            "status": "in_progress",
            "lastUpdatedBy": "system_agent",
            "lastUpdatedAt": "2025-01-01T00:00:00Z",
            "confidenceScore": 75,
            "evidence": []
        }"#;
        let record: StatusRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, StatusEnum::InProgress);
        assert!(record.history.is_empty());
        assert!(record.comments.is_empty());
        assert!(record.ai_explanation.is_none());
    }

    #[test]
    fn test_evidence_wire_format() {
        let evidence = Evidence {
            id: "ev-1".to_string(),
            kind: EvidenceType::AiChat,
            url: "#".to_string(),
            label: "Cursor Chat Session".to_string(),
            created_at: Utc::now(),
            verified_by: None,
        };
        let json = serde_json::to_value(&evidence).unwrap();
        assert_eq!(json["type"], "ai_chat");
        assert!(json.get("verifiedBy").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_evidence_type_from_str() {
        assert_eq!("console-log".parse::<EvidenceType>(), Ok(EvidenceType::ConsoleLog));
        assert_eq!("PR".parse::<EvidenceType>(), Ok(EvidenceType::Pr));
        assert!("email".parse::<EvidenceType>().is_err());
    }
}
