//! DevStatus Engine - event-to-status reconciliation
//!
//! Turns developer-tool events into checklist status changes:
//!
//! - **Rule matching**: pure mapping from an event to a plan of proposals,
//!   deferred effects and manifest scans
//! - **Conflict policy**: verified items are locked against automation;
//!   suspicious jumps are flagged
//! - **Audit trail**: every accepted change prepends evidence and a history
//!   entry; a bounded activity feed records what happened
//! - **Dashboard service**: single-queue async worker that owns the engine
//!   and writes state through to a key-value store
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    DashboardService                      │
//! │                                                          │
//! │  commands ──▶ ┌─────────────┐      ┌─────────────────┐   │
//! │               │ RuleMatcher │ ───▶ │   Reconciler    │   │
//! │               └─────────────┘      │ policy + ledger │   │
//! │  deferred ───────────────────────▶ │  StatusStore    │   │
//! │  analysis ───────────────────────▶ │  ActivityLog    │   │
//! │                                    └────────┬────────┘   │
//! │                                             ▼            │
//! │                                       KvStore write      │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod activity;
pub mod config;
pub mod deferred;
pub mod event;
pub mod export;
pub mod ids;
pub mod ledger;
pub mod matcher;
pub mod persist;
pub mod policy;
pub mod reconciler;
pub mod service;
pub mod store;
pub mod types;

// Re-export main types
pub use config::EngineConfig;
pub use event::{AgentEvent, EventDraft, EventKind};
pub use export::{ExportFormat, ExportRow};
pub use reconciler::{ManualUpdate, Reconciler, TransitionOutcome};
pub use service::DashboardService;
pub use store::{StatusStore, StatusSummary};
pub use types::*;
