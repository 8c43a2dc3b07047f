//! Bounded activity feed.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::types::{ActivityKind, ActivityLogEntry};

/// Entries kept before the oldest is dropped.
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 50;

/// Recent activity, newest first.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityLogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ACTIVITY_CAPACITY)
    }

    /// Create with a custom capacity (at least one entry).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Restore from persisted entries, newest first. Extra entries are dropped.
    pub fn from_entries(entries: Vec<ActivityLogEntry>, capacity: usize) -> Self {
        let mut log = Self::with_capacity(capacity);
        log.entries = entries.into_iter().take(log.capacity).collect();
        log
    }

    /// Prepend an entry, evicting the oldest past capacity.
    pub fn push(
        &mut self,
        id: String,
        kind: ActivityKind,
        message: impl Into<String>,
        confidence: Option<u8>,
        now: DateTime<Utc>,
    ) -> &ActivityLogEntry {
        self.entries.push_front(ActivityLogEntry {
            id,
            message: message.into(),
            timestamp: now,
            kind,
            confidence,
        });

        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }

        &self.entries[0]
    }

    pub fn entries(&self) -> impl Iterator<Item = &ActivityLogEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ActivityLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_newest_first() {
        let mut log = ActivityLog::new();
        for i in 0..60 {
            log.push(format!("log-{i}"), ActivityKind::Agent, format!("event {i}"), None, Utc::now());
        }

        assert_eq!(log.len(), 50);
        let entries = log.to_vec();
        assert_eq!(entries[0].message, "event 59");
        assert_eq!(entries[49].message, "event 10");
    }

    #[test]
    fn test_from_entries_truncates() {
        let mut source = ActivityLog::with_capacity(10);
        for i in 0..10 {
            source.push(format!("log-{i}"), ActivityKind::Update, format!("m{i}"), Some(90), Utc::now());
        }

        let restored = ActivityLog::from_entries(source.to_vec(), 4);
        assert_eq!(restored.len(), 4);
        assert_eq!(restored.to_vec()[0].message, "m9");
    }
}
