//! Reconciliation engine.
//!
//! Owns the status store, the activity feed and the agent roster, and is
//! the only thing that writes to them. Events go through the rule matcher;
//! the resulting proposals are checked against the conflict policy and
//! either written (with evidence and history) or rejected with an alert.
//!
//! The reconciler is synchronous. Work that has to wait (quick-fix delays,
//! manifest analysis) is handed back to the caller as [`DeferredTask`]s and
//! [`AnalysisRequest`]s, and re-enters through [`Reconciler::apply_deferred`]
//! and [`Reconciler::apply_analysis`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use checklist::{Catalog, EnvName, Environment, StatusEnum};
use devstatus_agent::{
    candidates_from_catalog, default_roster, AgentInfo, AgentStatus, AnalyzerError, AnalyzerMatch,
    ManifestInput,
};

use crate::activity::ActivityLog;
use crate::config::{EngineConfig, OperatorConfig};
use crate::deferred::DeferredTask;
use crate::event::{AgentEvent, EventDraft};
use crate::export::{self, ExportFormat, ExportRow};
use crate::ids::{Clock, IdGenerator};
use crate::ledger::{self, EntryIds, EvidenceDraft, Transition};
use crate::matcher::{LogNote, ProposedTransition, RuleMatcher};
use crate::persist::{LoadedState, PersistedState};
use crate::policy::{self, ConflictPolicy, Verdict};
use crate::store::{StatusStore, StatusSummary};
use crate::types::{ActivityKind, ActivityLogEntry, EngineError, EvidenceType, Result, StatusRecord};

/// `lastUpdatedBy` of automated changes.
pub const SYSTEM_AGENT_ID: &str = "system_agent";
/// History actor of automated changes.
pub const SYSTEM_AGENT_NAME: &str = "System Agent";
/// Evidence url of automated changes.
const PLACEHOLDER_URL: &str = "#";

/// What happened to one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Written to the store
    Applied,
    /// Blocked by the verified lock
    Conflict,
    /// No matching item in the target environment
    Unresolved,
}

/// A manifest waiting for the analyzer.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Environment selected when the event arrived
    pub env_id: String,
    /// Path as saved, used in activity messages
    pub filename: String,
    /// What the analyzer is handed
    pub input: ManifestInput,
}

/// Result of taking in one event.
#[derive(Debug, Clone)]
pub struct EventOutcome {
    /// The event with defaults filled in
    pub event: AgentEvent,
    /// One entry per immediate proposal, in rule order
    pub outcomes: Vec<TransitionOutcome>,
    /// Effects to run after their delay
    pub deferred: Vec<DeferredTask>,
    /// Manifest scan to start, if the file was a manifest
    pub analysis: Option<AnalysisRequest>,
}

/// A human status change.
#[derive(Debug, Clone)]
pub struct ManualUpdate {
    /// Item to update in the selected environment
    pub subcategory_id: String,
    /// New status
    pub status: StatusEnum,
    /// Recorded on the history entry
    pub reason: String,
    /// Link to attach; empty means none
    pub evidence_url: Option<String>,
    /// Kind of the attached link
    pub evidence_type: EvidenceType,
}

impl ManualUpdate {
    pub fn new(
        subcategory_id: impl Into<String>,
        status: StatusEnum,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            subcategory_id: subcategory_id.into(),
            status,
            reason: reason.into(),
            evidence_url: None,
            evidence_type: EvidenceType::Pr,
        }
    }

    pub fn with_evidence(mut self, url: impl Into<String>, kind: EvidenceType) -> Self {
        self.evidence_url = Some(url.into());
        self.evidence_type = kind;
        self
    }
}

/// The reconciliation engine.
pub struct Reconciler {
    catalog: Arc<Catalog>,
    store: StatusStore,
    activity: ActivityLog,
    agents: Vec<AgentInfo>,
    matcher: RuleMatcher,
    policy: ConflictPolicy,
    operator: OperatorConfig,
    selected_env: Environment,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    /// Build from loaded state.
    pub fn new(
        catalog: Arc<Catalog>,
        state: LoadedState,
        config: &EngineConfig,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if !catalog.projects().iter().any(|p| p.id == config.project_id) {
            return Err(EngineError::UnknownProject(config.project_id.clone()));
        }
        let selected_env = resolve_environment(&catalog, &config.initial_environment)?.clone();

        info!(
            project = %config.project_id,
            environment = %selected_env.id,
            records = state.store.all().len(),
            catalog = %catalog.fingerprint(),
            "Reconciler ready"
        );

        Ok(Self {
            catalog,
            store: state.store,
            activity: state.activity,
            agents: state.agents,
            matcher: RuleMatcher::new(config.rules.clone()),
            policy: ConflictPolicy::new(),
            operator: config.operator.clone(),
            selected_env,
            ids,
            clock,
        })
    }

    /// Build with a generated snapshot, empty feed and default roster.
    pub fn fresh(
        catalog: Arc<Catalog>,
        config: &EngineConfig,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let now = clock.now();
        let state = LoadedState {
            store: StatusStore::initial(catalog.clone(), &config.project_id, now),
            activity: ActivityLog::with_capacity(config.activity.capacity),
            agents: default_roster(now),
        };
        Self::new(catalog, state, config, ids, clock)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    pub fn selected_environment(&self) -> &Environment {
        &self.selected_env
    }

    /// Switch the environment new events and manual changes apply to.
    pub fn select_environment(&mut self, env: &str) -> Result<Environment> {
        let env = resolve_environment(&self.catalog, env)?.clone();
        info!(environment = %env.id, name = %env.name, "Environment selected");
        self.selected_env = env.clone();
        Ok(env)
    }

    /// Take in one event: log it, match it, apply immediate proposals.
    pub fn handle_event(&mut self, draft: EventDraft) -> EventOutcome {
        let event = draft.complete(self.ids.as_ref(), self.clock.as_ref());
        self.log(
            ActivityKind::Agent,
            format!("Received event: {}", event.kind.type_name()),
            None,
        );
        self.touch_agent(&event);

        let plan = self.matcher.plan(&event);
        let env_id = self.selected_env.id.clone();
        debug!(
            event_id = %event.id,
            agent = %event.agent_id,
            kind = event.kind.type_name(),
            env = %env_id,
            "Event received"
        );

        for note in plan.notes {
            self.log_note(note);
        }

        let outcomes = plan
            .proposals
            .iter()
            .map(|proposal| self.apply_proposal(&env_id, proposal))
            .collect();

        let deferred = plan
            .deferred
            .into_iter()
            .map(|effect| DeferredTask {
                env_id: env_id.clone(),
                effect,
            })
            .collect();

        let analysis = plan.scan.map(|scan| AnalysisRequest {
            env_id: env_id.clone(),
            filename: scan.path.clone(),
            input: ManifestInput::new(scan.path, scan.content, candidates_from_catalog(&self.catalog)),
        });

        EventOutcome {
            event,
            outcomes,
            deferred,
            analysis,
        }
    }

    /// Run a deferred effect against the environment it was scheduled for.
    pub fn apply_deferred(&mut self, task: DeferredTask) -> Vec<TransitionOutcome> {
        self.log_note(task.effect.note);
        task.effect
            .proposals
            .iter()
            .map(|proposal| self.apply_proposal(&task.env_id, proposal))
            .collect()
    }

    /// Apply the analyzer's answer for a manifest.
    ///
    /// A failed analysis becomes one alert and changes nothing else.
    pub fn apply_analysis(
        &mut self,
        request: &AnalysisRequest,
        analyzer_name: &str,
        result: std::result::Result<Vec<AnalyzerMatch>, AnalyzerError>,
    ) -> Vec<TransitionOutcome> {
        let matches = match result {
            Ok(matches) => matches,
            Err(e) => {
                warn!(file = %request.filename, analyzer = analyzer_name, error = %e, "Manifest analysis failed");
                self.log(
                    ActivityKind::Alert,
                    format!("Manifest analysis failed for {}", request.filename),
                    None,
                );
                return Vec::new();
            }
        };

        let outcomes = matches
            .iter()
            .map(|m| {
                let proposal = ProposedTransition::new(
                    m.slug.clone(),
                    StatusEnum::from(m.status),
                    m.confidence.min(100),
                    format!("Manifest analysis: {}", m.reason),
                    EvidenceType::File,
                    request.filename.clone(),
                );
                self.apply_proposal(&request.env_id, &proposal)
            })
            .collect();

        if !matches.is_empty() {
            self.log(
                ActivityKind::Ai,
                format!(
                    "{} analyzed {} and found {} matches across lifecycle stages",
                    analyzer_name,
                    request.filename,
                    matches.len()
                ),
                None,
            );
        }
        outcomes
    }

    /// Check and apply one automated proposal.
    pub fn apply_proposal(&mut self, env_id: &str, proposal: &ProposedTransition) -> TransitionOutcome {
        let Some(stage) = self.catalog.environment(env_id).map(|e| e.name) else {
            debug!(env_id, "Proposal for unknown environment discarded");
            return TransitionOutcome::Unresolved;
        };
        let Some((sub_id, title)) = self.resolve(&proposal.subcategory_slug, stage) else {
            debug!(slug = %proposal.subcategory_slug, stage = %stage, "No matching item, proposal discarded");
            return TransitionOutcome::Unresolved;
        };
        let Some(current) = self.store.get(&sub_id, env_id).map(|r| r.status) else {
            return TransitionOutcome::Unresolved;
        };

        match self.policy.evaluate(current, proposal.target_status) {
            Verdict::RejectLocked => {
                warn!(item = %sub_id, env = env_id, to = %proposal.target_status, "Automated update of verified item rejected");
                self.log(ActivityKind::Alert, policy::conflict_message(&title), None);
                return TransitionOutcome::Conflict;
            }
            Verdict::ApplyWithAnomaly => {
                warn!(item = %sub_id, env = env_id, "Suspicious jump to verified");
                self.log(ActivityKind::Alert, policy::anomaly_message(&title), None);
            }
            Verdict::Apply => {}
        }

        let transition = Transition {
            status: proposal.target_status,
            actor_id: SYSTEM_AGENT_ID.to_string(),
            actor_name: SYSTEM_AGENT_NAME.to_string(),
            confidence: proposal.confidence,
            reason: proposal.rationale.clone(),
            explanation: Some(proposal.rationale.clone()),
            evidence: Some(EvidenceDraft {
                kind: proposal.evidence_type,
                url: PLACEHOLDER_URL.to_string(),
                label: proposal.evidence_label.clone(),
                verified_by: None,
            }),
        };
        self.write_transition(&sub_id, env_id, transition);

        info!(item = %sub_id, env = env_id, from = %current, to = %proposal.target_status, confidence = proposal.confidence, "Transition applied");
        self.log(
            ActivityKind::Agent,
            format!(
                "Matched: {} -> {} ({}%)",
                title, proposal.target_status, proposal.confidence
            ),
            Some(proposal.confidence),
        );
        TransitionOutcome::Applied
    }

    /// Human status change in the selected environment. Not subject to the
    /// verified lock. `None` if the item is not tracked there.
    pub fn manual_update(&mut self, update: ManualUpdate) -> Option<StatusRecord> {
        let env_id = self.selected_env.id.clone();
        let title = self.catalog.subcategory(&update.subcategory_id)?.title.clone();
        self.store.get(&update.subcategory_id, &env_id)?;

        let evidence = update
            .evidence_url
            .filter(|url| !url.is_empty())
            .map(|url| EvidenceDraft {
                kind: update.evidence_type,
                url,
                label: "Manual Evidence".to_string(),
                verified_by: Some(self.operator.id.clone()),
            });
        let transition = Transition {
            status: update.status,
            actor_id: self.operator.id.clone(),
            actor_name: self.operator.display_name.clone(),
            confidence: 100,
            reason: update.reason,
            explanation: None,
            evidence,
        };
        self.write_transition(&update.subcategory_id, &env_id, transition);

        info!(item = %update.subcategory_id, env = %env_id, to = %update.status, operator = %self.operator.id, "Manual update");
        self.log(
            ActivityKind::Update,
            format!("User manually updated {} to {}", title, update.status),
            None,
        );
        self.store.get(&update.subcategory_id, &env_id).cloned()
    }

    /// Comment on an item in the selected environment.
    pub fn add_comment(&mut self, subcategory_id: &str, text: &str) -> Option<StatusRecord> {
        let env_id = self.selected_env.id.clone();
        let title = self.catalog.subcategory(subcategory_id)?.title.clone();

        let id = self.ids.next_id("c");
        let now = self.clock.now();
        let author = self.operator.display_name.clone();
        if !self
            .store
            .replace(subcategory_id, &env_id, |r| ledger::add_comment(r, id, &author, text, now))
        {
            return None;
        }

        self.log(ActivityKind::Update, format!("Comment added to {title}"), None);
        self.store.get(subcategory_id, &env_id).cloned()
    }

    pub fn records(&self, env_id: &str) -> Result<Vec<StatusRecord>> {
        self.check_environment(env_id)?;
        Ok(self.store.list(env_id).into_iter().cloned().collect())
    }

    pub fn summary(&self, env_id: &str) -> Result<StatusSummary> {
        self.check_environment(env_id)?;
        Ok(self.store.summary(env_id))
    }

    pub fn export_snapshot(&self, env_id: &str) -> Result<Vec<ExportRow>> {
        self.check_environment(env_id)?;
        Ok(export::snapshot_rows(&self.catalog, self.store.list(env_id)))
    }

    /// Render a report and note it in the feed.
    pub fn export(&mut self, env_id: &str, format: ExportFormat) -> Result<String> {
        let rows = self.export_snapshot(env_id)?;
        let rendered = export::render(&rows, format)?;
        self.log(
            ActivityKind::Update,
            format!("Report exported as {}", format.label()),
            None,
        );
        Ok(rendered)
    }

    pub fn activity(&self) -> Vec<ActivityLogEntry> {
        self.activity.to_vec()
    }

    pub fn agents(&self) -> &[AgentInfo] {
        &self.agents
    }

    /// Everything that gets persisted.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            records: self.store.all().to_vec(),
            activity: self.activity.to_vec(),
            agents: self.agents.clone(),
        }
    }

    fn resolve(&self, slug: &str, stage: EnvName) -> Option<(String, String)> {
        self.catalog
            .resolve_slug(slug, stage)
            .map(|sub| (sub.id.clone(), sub.title.clone()))
    }

    fn write_transition(&mut self, subcategory_id: &str, env_id: &str, transition: Transition) {
        let ids = EntryIds {
            evidence: self.ids.next_id("ev"),
            history: self.ids.next_id("h"),
        };
        let now = self.clock.now();
        self.store.replace(subcategory_id, env_id, |record| {
            ledger::apply_transition(record, transition, ids, now)
        });
    }

    fn check_environment(&self, env_id: &str) -> Result<()> {
        self.catalog
            .environment(env_id)
            .map(|_| ())
            .ok_or_else(|| EngineError::UnknownEnvironment(env_id.to_string()))
    }

    fn touch_agent(&mut self, event: &AgentEvent) {
        if let Some(agent) = self.agents.iter_mut().find(|a| a.id == event.agent_id) {
            agent.last_seen = event.timestamp;
            agent.status = AgentStatus::Online;
        }
    }

    fn log_note(&mut self, note: LogNote) {
        self.log(note.kind, note.message, None);
    }

    fn log(&mut self, kind: ActivityKind, message: String, confidence: Option<u8>) {
        let id = self.ids.next_id("log");
        let now = self.clock.now();
        self.activity.push(id, kind, message, confidence, now);
    }
}

/// Find an environment by id, or failing that by name.
pub fn resolve_environment<'a>(catalog: &'a Catalog, env: &str) -> Result<&'a Environment> {
    catalog
        .environment(env)
        .or_else(|| {
            env.parse::<EnvName>()
                .ok()
                .and_then(|name| catalog.environment_by_name(name))
        })
        .ok_or_else(|| EngineError::UnknownEnvironment(env.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AiActionKind, PipelineStatus};
    use crate::ids::{ManualClock, SequentialIds};
    use chrono::Utc;
    use devstatus_agent::MatchStatus;

    fn reconciler() -> Reconciler {
        Reconciler::fresh(
            Arc::new(Catalog::builtin()),
            &EngineConfig::default(),
            Arc::new(SequentialIds::new()),
            Arc::new(ManualClock::new(Utc::now())),
        )
        .unwrap()
    }

    fn set_status(r: &mut Reconciler, sub: &str, env: &str, status: StatusEnum) {
        r.store.replace(sub, env, |rec| StatusRecord {
            status,
            ..rec.clone()
        });
    }

    #[test]
    fn test_intake_logs_event() {
        let mut r = reconciler();
        let outcome = r.handle_event(EventDraft::new(crate::event::EventKind::PrMerged {
            number: Some(7),
            branch: None,
        }));
        assert!(outcome.outcomes.is_empty());
        assert_eq!(r.activity()[0].message, "Received event: pr_merged");
        assert_eq!(r.activity()[0].kind, ActivityKind::Agent);
    }

    #[test]
    fn test_payloadless_drafts_are_received() {
        let mut r = reconciler();
        for raw in [r#"{"type": "pr_merged"}"#, r#"{"type": "deployment"}"#] {
            let draft: EventDraft = serde_json::from_str(raw).unwrap();
            let outcome = r.handle_event(draft);
            assert!(outcome.outcomes.is_empty());
        }

        let messages: Vec<_> = r.activity().iter().map(|e| e.message.clone()).collect();
        assert_eq!(
            messages,
            vec!["Received event: deployment", "Received event: pr_merged"]
        );
    }

    #[test]
    fn test_applied_transition_logs_match() {
        let mut r = reconciler();
        let outcome = r.handle_event(EventDraft::ai_action(AiActionKind::GenerateTests));
        assert_eq!(outcome.outcomes, vec![TransitionOutcome::Applied]);

        let record = r.store().get("s_dev_unit", "e1").unwrap();
        assert_eq!(record.status, StatusEnum::InProgress);
        assert_eq!(record.ai_explanation.as_deref(), Some("Cursor generated unit tests"));
        assert_eq!(record.evidence[0].url, "#");
        assert_eq!(record.history[0].actor, "System Agent");

        let log = r.activity();
        assert_eq!(log[0].message, "Matched: Unit Tests (Local) -> in_progress (85%)");
        assert_eq!(log[0].confidence, Some(85));
    }

    #[test]
    fn test_unresolved_slug_is_silent() {
        let mut r = reconciler();
        r.select_environment("e3").unwrap();
        let before = r.store().all().to_vec();

        // unit-tests only exists in dev
        let outcome = r.handle_event(EventDraft::ai_action(AiActionKind::GenerateTests));
        assert_eq!(outcome.outcomes, vec![TransitionOutcome::Unresolved]);
        assert_eq!(r.store().all(), before.as_slice());
        assert_eq!(r.activity().len(), 1);
    }

    #[test]
    fn test_anomaly_still_applies() {
        let mut r = reconciler();
        let proposal = ProposedTransition::new(
            "owasp",
            StatusEnum::Verified,
            99,
            "scanner",
            EvidenceType::Artifact,
            "report.html",
        );
        assert_eq!(r.apply_proposal("e1", &proposal), TransitionOutcome::Applied);
        let log = r.activity();
        assert_eq!(log[1].message, "Anomaly detected: Suspicious jump to VERIFIED for OWASP Top 10 Scanning");
        assert_eq!(log[1].kind, ActivityKind::Alert);
        assert_eq!(r.store().get("s_dev_owasp", "e1").unwrap().status, StatusEnum::Verified);
    }

    #[test]
    fn test_verified_blocks_automation_but_not_humans() {
        let mut r = reconciler();
        set_status(&mut r, "s_dev_unit", "e1", StatusEnum::Verified);

        let outcome = r.handle_event(EventDraft::ai_action(AiActionKind::GenerateTests));
        assert_eq!(outcome.outcomes, vec![TransitionOutcome::Conflict]);
        assert_eq!(r.store().get("s_dev_unit", "e1").unwrap().status, StatusEnum::Verified);

        let updated = r
            .manual_update(ManualUpdate::new("s_dev_unit", StatusEnum::InProgress, "reopened"))
            .unwrap();
        assert_eq!(updated.status, StatusEnum::InProgress);
        assert_eq!(updated.history[0].previous_status, StatusEnum::Verified);
    }

    #[test]
    fn test_manual_update_with_evidence() {
        let mut r = reconciler();
        let updated = r
            .manual_update(
                ManualUpdate::new("s_dev_git", StatusEnum::Done, "branch rules set")
                    .with_evidence("https://github.com/org/repo/pull/1", EvidenceType::Pr),
            )
            .unwrap();
        assert_eq!(updated.evidence[0].label, "Manual Evidence");
        assert_eq!(updated.evidence[0].verified_by.as_deref(), Some("user_1"));
        assert_eq!(
            r.activity()[0].message,
            "User manually updated Version Control (Branching) to done"
        );

        assert!(r
            .manual_update(ManualUpdate::new("s_prod_cdn", StatusEnum::Done, "wrong env"))
            .is_none());
    }

    #[test]
    fn test_manual_update_empty_url_adds_no_evidence() {
        let mut r = reconciler();
        let updated = r
            .manual_update(
                ManualUpdate::new("s_dev_git", StatusEnum::InProgress, "started")
                    .with_evidence("", EvidenceType::Pr),
            )
            .unwrap();
        assert_eq!(updated.status, StatusEnum::InProgress);
        assert!(updated.evidence.is_empty());
        assert_eq!(updated.history.len(), 1);
    }

    #[test]
    fn test_comment() {
        let mut r = reconciler();
        let record = r.add_comment("s_dev_docker", "needs compose file").unwrap();
        assert_eq!(record.comments[0].text, "needs compose file");
        assert_eq!(record.comments[0].author, "User (JD)");
        assert!(record.history.is_empty());
        assert_eq!(r.activity()[0].message, "Comment added to Docker Basics & DevContainers");
        assert!(r.add_comment("missing", "x").is_none());
    }

    #[test]
    fn test_events_bind_selected_environment() {
        let mut r = reconciler();
        let outcome = r.handle_event(EventDraft::open_file("Dockerfile"));
        assert_eq!(outcome.deferred.len(), 1);
        assert_eq!(outcome.deferred[0].env_id, "e1");

        // Switching away does not retarget the pending effect.
        r.select_environment("staging").unwrap();
        let task = outcome.deferred.into_iter().next().unwrap();
        let outcomes = r.apply_deferred(task);
        assert_eq!(outcomes, vec![TransitionOutcome::Applied]);
        assert_eq!(
            r.store().get("s_dev_docker", "e1").unwrap().status,
            StatusEnum::InProgress
        );
        assert_eq!(r.store().get("s_dev_docker", "e1").unwrap().confidence_score, 80);
    }

    #[test]
    fn test_analysis_results() {
        let mut r = reconciler();
        let outcome = r.handle_event(EventDraft::file_saved("package.json", Some("jest".into())));
        let request = outcome.analysis.unwrap();
        assert_eq!(request.filename, "package.json");
        assert!(!request.input.candidates.is_empty());

        let outcomes = r.apply_analysis(
            &request,
            "Keyword Analyzer",
            Ok(vec![
                AnalyzerMatch {
                    slug: "unit-tests".to_string(),
                    status: MatchStatus::Done,
                    reason: "Detected Jest".to_string(),
                    confidence: 90,
                },
                AnalyzerMatch {
                    slug: "mixpanel".to_string(),
                    status: MatchStatus::InProgress,
                    reason: "Detected Mixpanel SDK".to_string(),
                    confidence: 90,
                },
            ]),
        );
        assert_eq!(outcomes, vec![TransitionOutcome::Applied, TransitionOutcome::Unresolved]);

        let record = r.store().get("s_dev_unit", "e1").unwrap();
        assert_eq!(record.status, StatusEnum::Done);
        assert_eq!(record.ai_explanation.as_deref(), Some("Manifest analysis: Detected Jest"));
        assert_eq!(record.evidence[0].label, "package.json");
        assert_eq!(
            r.activity()[0].message,
            "Keyword Analyzer analyzed package.json and found 2 matches across lifecycle stages"
        );
    }

    #[test]
    fn test_analysis_failure_single_alert() {
        let mut r = reconciler();
        let outcome = r.handle_event(EventDraft::file_saved("package.json", Some("x".into())));
        let request = outcome.analysis.unwrap();
        let before = r.activity().len();
        let before_records = r.store().all().to_vec();

        let outcomes = r.apply_analysis(
            &request,
            "Completion Analyzer",
            Err(AnalyzerError::Malformed("prose".to_string())),
        );
        assert!(outcomes.is_empty());
        assert_eq!(r.activity().len(), before + 1);
        assert_eq!(r.activity()[0].message, "Manifest analysis failed for package.json");
        assert_eq!(r.activity()[0].kind, ActivityKind::Alert);
        assert_eq!(r.store().all(), before_records.as_slice());
    }

    #[test]
    fn test_export_logs() {
        let mut r = reconciler();
        let csv = r.export("e2", ExportFormat::Csv).unwrap();
        assert!(csv.starts_with("Category,Subcategory"));
        assert_eq!(r.activity()[0].message, "Report exported as CSV");
        assert!(matches!(
            r.export("e9", ExportFormat::Json),
            Err(EngineError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn test_known_agent_is_touched() {
        let mut r = reconciler();
        let before = r.agents().iter().find(|a| a.id == "a2").unwrap().last_seen;
        r.handle_event(EventDraft::ci_pipeline(PipelineStatus::Running).from_agent("a2"));
        let after = r.agents().iter().find(|a| a.id == "a2").unwrap().last_seen;
        assert!(after > before);
    }

    #[test]
    fn test_resolve_environment_by_name() {
        let catalog = Catalog::builtin();
        assert_eq!(resolve_environment(&catalog, "e2").unwrap().name, EnvName::Staging);
        assert_eq!(resolve_environment(&catalog, "prod").unwrap().id, "e3");
        assert!(resolve_environment(&catalog, "local").is_err());
    }
}
