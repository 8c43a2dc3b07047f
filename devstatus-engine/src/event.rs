//! Developer-tool events.
//!
//! Wire shape: `{"id", "agentId", "type": "file_saved", "payload": {...},
//! "timestamp"}`. The `type` tag selects the payload shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{Clock, IdGenerator};

/// Agent id given to events that do not name one.
pub const DEFAULT_AGENT_ID: &str = "sim";

/// Command run inside an editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum LocalCommand {
    OpenFile { file: String },
    #[serde(other)]
    Other,
}

/// Outcome reported by a CI run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Success,
    Failure,
    Running,
    #[serde(other)]
    Unknown,
}

/// Action performed by an AI assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiActionKind {
    GenerateTests,
    Refactor,
    Explain,
    #[serde(other)]
    Other,
}

/// Event payload, tagged by event type.
///
/// A missing or null `payload` reads as `{}`, so kinds whose payload fields
/// are all optional can be submitted as just `{"type": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    try_from = "RawEventKind"
)]
pub enum EventKind {
    FileSaved {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    LocalCommand(LocalCommand),
    CiPipeline {
        status: PipelineStatus,
    },
    AiAction {
        action: AiActionKind,
    },
    PrMerged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        number: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
    },
    Deployment {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
}

/// Tag and payload as submitted, before the payload shape is checked.
#[derive(Deserialize)]
struct RawEventKind {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Adjacently tagged reading of [`EventKind`].
#[allow(dead_code)]
#[derive(Deserialize)]
#[serde(
    remote = "EventKind",
    tag = "type",
    content = "payload",
    rename_all = "snake_case"
)]
enum TaggedEventKind {
    FileSaved {
        path: String,
        #[serde(default)]
        content: Option<String>,
    },
    LocalCommand(LocalCommand),
    CiPipeline {
        status: PipelineStatus,
    },
    AiAction {
        action: AiActionKind,
    },
    PrMerged {
        #[serde(default)]
        number: Option<u64>,
        #[serde(default)]
        branch: Option<String>,
    },
    Deployment {
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },
}

impl TryFrom<RawEventKind> for EventKind {
    type Error = serde_json::Error;

    fn try_from(raw: RawEventKind) -> Result<Self, Self::Error> {
        let payload = match raw.payload {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            payload => payload,
        };
        TaggedEventKind::deserialize(serde_json::json!({
            "type": raw.kind,
            "payload": payload,
        }))
    }
}

impl EventKind {
    /// Wire name of the event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::FileSaved { .. } => "file_saved",
            Self::LocalCommand(_) => "local_command",
            Self::CiPipeline { .. } => "ci_pipeline",
            Self::AiAction { .. } => "ai_action",
            Self::PrMerged { .. } => "pr_merged",
            Self::Deployment { .. } => "deployment",
        }
    }
}

/// A complete event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    pub id: String,
    pub agent_id: String,
    #[serde(flatten)]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

/// An event as submitted. Missing fields are filled in at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EventDraft {
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: None,
            agent_id: None,
            kind,
            timestamp: None,
        }
    }

    pub fn from_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn file_saved(path: impl Into<String>, content: Option<String>) -> Self {
        Self::new(EventKind::FileSaved {
            path: path.into(),
            content,
        })
    }

    pub fn open_file(file: impl Into<String>) -> Self {
        Self::new(EventKind::LocalCommand(LocalCommand::OpenFile { file: file.into() }))
    }

    pub fn ci_pipeline(status: PipelineStatus) -> Self {
        Self::new(EventKind::CiPipeline { status })
    }

    pub fn ai_action(action: AiActionKind) -> Self {
        Self::new(EventKind::AiAction { action })
    }

    /// Fill in id, timestamp and agent.
    pub fn complete(self, ids: &dyn IdGenerator, clock: &dyn Clock) -> AgentEvent {
        AgentEvent {
            id: self.id.unwrap_or_else(|| ids.next_id("evt")),
            agent_id: self
                .agent_id
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| DEFAULT_AGENT_ID.to_string()),
            kind: self.kind,
            timestamp: self.timestamp.unwrap_or_else(|| clock.now()),
        }
    }
}

impl From<EventKind> for EventDraft {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}
