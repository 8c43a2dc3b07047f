//! Status store: one record per (subcategory, environment).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use checklist::{Catalog, StatusEnum};

use crate::types::{EngineError, Result, StatusRecord};

/// `lastUpdatedBy` of records nobody has touched yet.
pub const SYSTEM_ACTOR: &str = "system";

/// Deterministic record id for a key.
pub fn record_id(env_id: &str, subcategory_id: &str) -> String {
    format!("ps-{env_id}-{subcategory_id}")
}

/// Progress rollup for one environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub env_id: String,
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub done: usize,
    pub verified: usize,
    /// Required items not yet done or verified
    pub required_remaining: usize,
    /// Share of done or verified items, 0 - 100
    pub percent_complete: u8,
}

/// Authoritative status records.
///
/// Records are kept in catalog order. `replace` is the only way to change
/// one.
#[derive(Debug, Clone)]
pub struct StatusStore {
    catalog: Arc<Catalog>,
    records: Vec<StatusRecord>,
    index: HashMap<(String, String), usize>,
}

impl StatusStore {
    /// The initial snapshot: every applicable item in every environment,
    /// not started.
    pub fn initial(catalog: Arc<Catalog>, project_id: &str, now: DateTime<Utc>) -> Self {
        let mut records = Vec::new();
        for env in catalog.environments() {
            for sub in catalog.applicable(env.name) {
                records.push(StatusRecord {
                    id: record_id(&env.id, &sub.id),
                    project_id: project_id.to_string(),
                    env_id: env.id.clone(),
                    subcategory_id: sub.id.clone(),
                    status: StatusEnum::NotStarted,
                    last_updated_by: SYSTEM_ACTOR.to_string(),
                    last_updated_at: now,
                    confidence_score: 0,
                    ai_explanation: None,
                    evidence: Vec::new(),
                    history: Vec::new(),
                    comments: Vec::new(),
                });
            }
        }
        debug!(records = records.len(), "Generated initial status snapshot");
        Self::build(catalog, records)
    }

    /// Load records, checking there is exactly one per applicable key.
    pub fn from_records(catalog: Arc<Catalog>, records: Vec<StatusRecord>) -> Result<Self> {
        let mut seen = HashSet::new();
        for record in &records {
            let env = catalog.environment(&record.env_id).ok_or_else(|| {
                EngineError::InvalidSnapshot(format!("unknown environment {}", record.env_id))
            })?;
            let sub = catalog.subcategory(&record.subcategory_id).ok_or_else(|| {
                EngineError::InvalidSnapshot(format!("unknown subcategory {}", record.subcategory_id))
            })?;
            if !sub.applies_to(env.name) {
                return Err(EngineError::InvalidSnapshot(format!(
                    "{} is not tracked in {}",
                    sub.id, env.name
                )));
            }
            if !seen.insert((record.subcategory_id.clone(), record.env_id.clone())) {
                return Err(EngineError::InvalidSnapshot(format!(
                    "duplicate record for {}@{}",
                    record.subcategory_id, record.env_id
                )));
            }
            if record.confidence_score > 100 {
                return Err(EngineError::InvalidSnapshot(format!(
                    "confidence {} out of range on {}",
                    record.confidence_score, record.id
                )));
            }
        }

        let expected: usize = catalog
            .environments()
            .iter()
            .map(|env| catalog.applicable(env.name).count())
            .sum();
        if seen.len() != expected {
            return Err(EngineError::InvalidSnapshot(format!(
                "expected {expected} records, found {}",
                seen.len()
            )));
        }

        // Reorder into catalog order.
        let mut by_key: HashMap<(String, String), StatusRecord> = records
            .into_iter()
            .map(|r| ((r.subcategory_id.clone(), r.env_id.clone()), r))
            .collect();
        let mut ordered = Vec::with_capacity(expected);
        for env in catalog.environments() {
            for sub in catalog.applicable(env.name) {
                if let Some(record) = by_key.remove(&(sub.id.clone(), env.id.clone())) {
                    ordered.push(record);
                }
            }
        }

        Ok(Self::build(catalog, ordered))
    }

    fn build(catalog: Arc<Catalog>, records: Vec<StatusRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| ((r.subcategory_id.clone(), r.env_id.clone()), i))
            .collect();
        Self {
            catalog,
            records,
            index,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get(&self, subcategory_id: &str, env_id: &str) -> Option<&StatusRecord> {
        self.index
            .get(&(subcategory_id.to_string(), env_id.to_string()))
            .map(|&i| &self.records[i])
    }

    /// Records of one environment, in catalog order.
    pub fn list(&self, env_id: &str) -> Vec<&StatusRecord> {
        self.records.iter().filter(|r| r.env_id == env_id).collect()
    }

    /// Every record.
    pub fn all(&self) -> &[StatusRecord] {
        &self.records
    }

    /// Apply `mutation` to the matching record. Returns false if there is none.
    pub fn replace<F>(&mut self, subcategory_id: &str, env_id: &str, mutation: F) -> bool
    where
        F: FnOnce(&StatusRecord) -> StatusRecord,
    {
        let Some(&i) = self
            .index
            .get(&(subcategory_id.to_string(), env_id.to_string()))
        else {
            debug!(subcategory_id, env_id, "No record to replace");
            return false;
        };
        let mut updated = mutation(&self.records[i]);
        // Key fields never change.
        updated.id = self.records[i].id.clone();
        updated.env_id = self.records[i].env_id.clone();
        updated.subcategory_id = self.records[i].subcategory_id.clone();
        self.records[i] = updated;
        true
    }

    /// Progress rollup for one environment.
    pub fn summary(&self, env_id: &str) -> StatusSummary {
        let mut summary = StatusSummary {
            env_id: env_id.to_string(),
            ..Default::default()
        };

        for record in self.records.iter().filter(|r| r.env_id == env_id) {
            summary.total += 1;
            match record.status {
                StatusEnum::NotStarted => summary.not_started += 1,
                StatusEnum::InProgress => summary.in_progress += 1,
                StatusEnum::Blocked => summary.blocked += 1,
                StatusEnum::Done => summary.done += 1,
                StatusEnum::Verified => summary.verified += 1,
            }
            let required = self
                .catalog
                .subcategory(&record.subcategory_id)
                .map(|s| s.required)
                .unwrap_or(false);
            if required && !record.status.is_complete() {
                summary.required_remaining += 1;
            }
        }

        if summary.total > 0 {
            let complete = (summary.done + summary.verified) as f64;
            summary.percent_complete = (complete / summary.total as f64 * 100.0).round() as u8;
        }
        summary
    }
}
