//! Core catalog types.
//!
//! Wire names follow the dashboard's TypeScript model (camelCase fields,
//! lowercase enum values). With the `typescript` feature enabled these types
//! can be exported with ts-rs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Deployment tier a checklist item is tracked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum EnvName {
    Local,
    Dev,
    Staging,
    Prod,
}

impl EnvName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Staging => "staging",
            Self::Prod => "prod",
        }
    }

    /// All stages in promotion order.
    pub fn all() -> [Self; 4] {
        [Self::Local, Self::Dev, Self::Staging, Self::Prod]
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "staging" => Ok(Self::Staging),
            "prod" => Ok(Self::Prod),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Status of a checklist item in one environment.
///
/// Ordered by maturity, though transitions are not strictly linear:
/// `Blocked` can follow any state. `Verified` is sticky for automated
/// updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum StatusEnum {
    NotStarted,
    InProgress,
    Blocked,
    Done,
    Verified,
}

impl StatusEnum {
    /// Wire value, e.g. `in_progress`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Done => "done",
            Self::Verified => "verified",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Blocked => "Blocked",
            Self::Done => "Done",
            Self::Verified => "Verified",
        }
    }

    /// Whether the item counts towards completion.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Done | Self::Verified)
    }

    /// Whether only a human may move the item out of this state.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl Default for StatusEnum {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for StatusEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusEnum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "done" => Ok(Self::Done),
            "verified" => Ok(Self::Verified),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// A deployment environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Environment {
    pub id: String,
    pub name: EnvName,
}

impl Environment {
    pub fn new(id: impl Into<String>, name: EnvName) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// A tracked repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub repo_url: String,
    pub default_branch: String,
}

/// A group of checklist items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub order: u32,
    pub stages: BTreeSet<EnvName>,
}

/// One trackable engineering practice, scoped to the stages where it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub id: String,
    pub category_id: String,
    pub slug: String,
    pub title: String,
    pub required: bool,
    pub stages: BTreeSet<EnvName>,
}

impl Subcategory {
    /// Whether this item is tracked in the given stage.
    pub fn applies_to(&self, stage: EnvName) -> bool {
        self.stages.contains(&stage)
    }
}
