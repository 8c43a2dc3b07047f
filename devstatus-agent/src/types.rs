//! Agent roster types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Kind of developer tool an agent runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Vscode,
    Cursor,
    Github,
    Ci,
    Antigravity,
}

/// Connectivity of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
}

/// An entry in the agent roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    /// Unique identifier for this agent
    pub id: String,
    /// Tool the agent runs in
    #[serde(rename = "type")]
    pub kind: AgentKind,
    /// When the agent last reported in
    pub last_seen: DateTime<Utc>,
    /// Whether the agent is currently reachable
    pub status: AgentStatus,
    /// Agent-specific settings
    #[serde(default)]
    #[cfg_attr(feature = "typescript", ts(type = "Record<string, unknown>"))]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl AgentInfo {
    pub fn new(id: impl Into<String>, kind: AgentKind, last_seen: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind,
            last_seen,
            status: AgentStatus::Online,
            config: serde_json::Map::new(),
        }
    }
}

/// The roster a fresh dashboard starts with.
pub fn default_roster(now: DateTime<Utc>) -> Vec<AgentInfo> {
    vec![
        AgentInfo::new("a1", AgentKind::Vscode, now),
        AgentInfo::new("a2", AgentKind::Github, now - Duration::hours(1)),
        AgentInfo::new("a3", AgentKind::Cursor, now - Duration::minutes(2)),
        AgentInfo::new("a4", AgentKind::Antigravity, now),
        AgentInfo::new("a5", AgentKind::Ci, now),
    ]
}
