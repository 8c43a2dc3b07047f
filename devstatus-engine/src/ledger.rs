//! Evidence, history and comment ledgers on a status record.
//!
//! All three lists are newest first and only ever grow. These helpers build
//! the next version of a record; the store swaps it in.

use chrono::{DateTime, Utc};

use checklist::StatusEnum;

use crate::types::{Comment, Evidence, EvidenceType, HistoryEntry, StatusRecord};

/// A status change to write into a record.
#[derive(Debug, Clone)]
pub struct Transition {
    pub status: StatusEnum,
    pub actor_id: String,
    pub actor_name: String,
    pub confidence: u8,
    pub reason: String,
    /// `Some` for automated changes, cleared for manual ones
    pub explanation: Option<String>,
    pub evidence: Option<EvidenceDraft>,
}

/// Evidence before it has an id and timestamp.
#[derive(Debug, Clone)]
pub struct EvidenceDraft {
    pub kind: EvidenceType,
    pub url: String,
    pub label: String,
    pub verified_by: Option<String>,
}

impl EvidenceDraft {
    fn into_evidence(self, id: String, now: DateTime<Utc>) -> Evidence {
        Evidence {
            id,
            kind: self.kind,
            url: self.url,
            label: self.label,
            created_at: now,
            verified_by: self.verified_by,
        }
    }
}

/// Ids for the entries a transition appends.
#[derive(Debug, Clone)]
pub struct EntryIds {
    pub evidence: String,
    pub history: String,
}

/// Next version of `record` after `transition`.
///
/// Appends exactly one history entry whose `previous_status` is the
/// record's current status.
pub fn apply_transition(
    record: &StatusRecord,
    transition: Transition,
    ids: EntryIds,
    now: DateTime<Utc>,
) -> StatusRecord {
    let mut next = record.clone();

    if let Some(draft) = transition.evidence {
        next.evidence.insert(0, draft.into_evidence(ids.evidence, now));
    }

    next.history.insert(
        0,
        HistoryEntry {
            id: ids.history,
            timestamp: now,
            actor: transition.actor_name,
            previous_status: record.status,
            new_status: transition.status,
            reason: transition.reason,
        },
    );

    next.status = transition.status;
    next.last_updated_at = now;
    next.last_updated_by = transition.actor_id;
    next.confidence_score = transition.confidence.min(100);
    next.ai_explanation = transition.explanation;
    next
}

/// Next version of `record` with a comment prepended.
pub fn add_comment(
    record: &StatusRecord,
    id: String,
    author: &str,
    text: &str,
    now: DateTime<Utc>,
) -> StatusRecord {
    let mut next = record.clone();
    next.comments.insert(
        0,
        Comment {
            id,
            author: author.to_string(),
            text: text.to_string(),
            timestamp: now,
        },
    );
    next
}
