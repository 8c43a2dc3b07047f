//! Rule matching: event in, plan out.
//!
//! The matcher is pure. It never looks at the store; it only describes what
//! the reconciler should do. Rules are evaluated in priority order:
//!
//! 1. Manifest save: request dependency analysis (stops here)
//! 2. `open_file` command: schedule the quick-fix effect (stops here)
//! 3. Webhook CI run: mark the CI items done on success (stops here)
//! 4. Dockerfile save
//! 5. Generic CI success
//! 6. AI test generation
//!
//! Rules 4 to 6 are independent of each other.

use std::time::Duration;

use checklist::StatusEnum;
use tracing::debug;

use crate::config::RulesConfig;
use crate::event::{AgentEvent, AiActionKind, EventKind, LocalCommand, PipelineStatus};
use crate::types::{ActivityKind, EvidenceType};

/// File names treated as dependency manifests.
pub const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Pipfile",
    "Cargo.toml",
    "go.mod",
    "Gemfile",
    "pom.xml",
    "build.gradle",
    "composer.json",
];

/// Whether `path` names a dependency manifest.
pub fn is_manifest(path: &str) -> bool {
    let filename = path.rsplit(['/', '\\']).next().unwrap_or(path);
    MANIFEST_FILES.contains(&filename)
}

/// A status change the rules would like to make.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedTransition {
    pub subcategory_slug: String,
    pub target_status: StatusEnum,
    /// 0 - 100
    pub confidence: u8,
    pub rationale: String,
    pub evidence_type: EvidenceType,
    pub evidence_label: String,
}

impl ProposedTransition {
    pub fn new(
        slug: impl Into<String>,
        target_status: StatusEnum,
        confidence: u8,
        rationale: impl Into<String>,
        evidence_type: EvidenceType,
        evidence_label: impl Into<String>,
    ) -> Self {
        Self {
            subcategory_slug: slug.into(),
            target_status,
            confidence,
            rationale: rationale.into(),
            evidence_type,
            evidence_label: evidence_label.into(),
        }
    }
}

/// An activity line the plan asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct LogNote {
    pub kind: ActivityKind,
    pub message: String,
}

impl LogNote {
    pub fn new(kind: ActivityKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Work that lands after a delay.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredEffect {
    pub delay: Duration,
    /// Logged when the effect fires
    pub note: LogNote,
    pub proposals: Vec<ProposedTransition>,
}

/// A manifest to hand to the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestScan {
    pub path: String,
    pub content: String,
}

/// Everything one event should cause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPlan {
    /// Logged immediately, before any proposal is applied
    pub notes: Vec<LogNote>,
    pub proposals: Vec<ProposedTransition>,
    pub deferred: Vec<DeferredEffect>,
    pub scan: Option<ManifestScan>,
}

impl MatchPlan {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
            && self.proposals.is_empty()
            && self.deferred.is_empty()
            && self.scan.is_none()
    }
}

/// Maps events to plans.
#[derive(Debug, Clone, Default)]
pub struct RuleMatcher {
    config: RulesConfig,
}

impl RuleMatcher {
    pub fn new(config: RulesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Build the plan for one event.
    pub fn plan(&self, event: &AgentEvent) -> MatchPlan {
        let mut plan = MatchPlan::default();

        match &event.kind {
            EventKind::FileSaved { path, content } if is_manifest(path) => {
                plan.notes.push(LogNote::new(
                    ActivityKind::Ai,
                    format!("Analyzing {path} dependencies..."),
                ));
                plan.scan = Some(ManifestScan {
                    path: path.clone(),
                    content: content.clone().unwrap_or_default(),
                });
                debug!(event_id = %event.id, rule = "manifest", "Rule matched");
                return plan;
            }
            EventKind::LocalCommand(LocalCommand::OpenFile { file }) => {
                plan.notes.push(LogNote::new(
                    ActivityKind::Agent,
                    format!("Opening {file} in VS Code..."),
                ));
                let mut proposals = Vec::new();
                if file.contains("Dockerfile") {
                    proposals.push(ProposedTransition::new(
                        "docker-basics",
                        StatusEnum::InProgress,
                        80,
                        "Manual fix applied in IDE",
                        EvidenceType::File,
                        file.clone(),
                    ));
                }
                plan.deferred.push(DeferredEffect {
                    delay: self.config.quick_fix_delay(),
                    note: LogNote::new(
                        ActivityKind::Update,
                        format!("Engineer fixed {file}. updating status..."),
                    ),
                    proposals,
                });
                debug!(event_id = %event.id, rule = "quick_fix", "Rule matched");
                return plan;
            }
            EventKind::CiPipeline { status } if event.agent_id == self.config.webhook_agent_id => {
                if *status == PipelineStatus::Success {
                    plan.proposals.push(ProposedTransition::new(
                        "gh-actions",
                        StatusEnum::Done,
                        100,
                        "Webhook: CI Passed",
                        EvidenceType::Pipeline,
                        "GH Action #123",
                    ));
                    plan.proposals.push(ProposedTransition::new(
                        "auto-test-ci",
                        StatusEnum::Done,
                        100,
                        "Webhook: Tests Passed",
                        EvidenceType::Pipeline,
                        "GH Action #123",
                    ));
                }
                debug!(event_id = %event.id, rule = "webhook", "Rule matched");
                return plan;
            }
            _ => {}
        }

        match &event.kind {
            EventKind::FileSaved { path, .. } if path.contains("Dockerfile") => {
                plan.proposals.push(ProposedTransition::new(
                    "docker-basics",
                    StatusEnum::InProgress,
                    75,
                    "Agent detected Dockerfile modification",
                    EvidenceType::File,
                    "src/infra/Dockerfile",
                ));
            }
            EventKind::CiPipeline {
                status: PipelineStatus::Success,
            } => {
                plan.proposals.push(ProposedTransition::new(
                    "auto-test-ci",
                    StatusEnum::Done,
                    98,
                    "CI Pipeline passed",
                    EvidenceType::Pipeline,
                    "GitHub Actions Run #88",
                ));
            }
            EventKind::AiAction {
                action: AiActionKind::GenerateTests,
            } => {
                plan.proposals.push(ProposedTransition::new(
                    "unit-tests",
                    StatusEnum::InProgress,
                    85,
                    "Cursor generated unit tests",
                    EvidenceType::AiChat,
                    "Cursor Chat Session",
                ));
            }
            EventKind::FileSaved { .. }
            | EventKind::LocalCommand(_)
            | EventKind::CiPipeline { .. }
            | EventKind::AiAction { .. }
            | EventKind::PrMerged { .. }
            | EventKind::Deployment { .. } => {}
        }

        debug!(event_id = %event.id, proposals = plan.proposals.len(), "Event matched");
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventDraft;
    use crate::ids::{ManualClock, SequentialIds};
    use chrono::Utc;

    fn event(draft: EventDraft) -> AgentEvent {
        draft.complete(&SequentialIds::new(), &ManualClock::new(Utc::now()))
    }

    fn matcher() -> RuleMatcher {
        RuleMatcher::default()
    }

    #[test]
    fn test_manifest_detection() {
        assert!(is_manifest("package.json"));
        assert!(is_manifest("web/app/package.json"));
        assert!(is_manifest("services\\api\\Cargo.toml"));
        assert!(!is_manifest("package.json.bak"));
        assert!(!is_manifest("docs/Dockerfile"));
    }

    #[test]
    fn test_manifest_rule_short_circuits() {
        // A manifest inside a Dockerfile directory must not also hit rule 4.
        let plan = matcher().plan(&event(EventDraft::file_saved(
            "Dockerfile.d/package.json",
            Some("{\"jest\": \"1\"}".to_string()),
        )));
        assert!(plan.proposals.is_empty());
        assert_eq!(plan.notes[0].message, "Analyzing Dockerfile.d/package.json dependencies...");
        assert_eq!(plan.notes[0].kind, ActivityKind::Ai);
        let scan = plan.scan.unwrap();
        assert_eq!(scan.content, "{\"jest\": \"1\"}");
    }

    #[test]
    fn test_manifest_without_content() {
        let plan = matcher().plan(&event(EventDraft::file_saved("go.mod", None)));
        assert_eq!(plan.scan.unwrap().content, "");
    }

    #[test]
    fn test_dockerfile_save() {
        let plan = matcher().plan(&event(EventDraft::file_saved("src/infra/Dockerfile", None)));
        assert_eq!(plan.proposals.len(), 1);
        let p = &plan.proposals[0];
        assert_eq!(p.subcategory_slug, "docker-basics");
        assert_eq!(p.target_status, StatusEnum::InProgress);
        assert_eq!(p.confidence, 75);
        assert_eq!(p.evidence_type, EvidenceType::File);
        assert_eq!(p.evidence_label, "src/infra/Dockerfile");
    }

    #[test]
    fn test_open_file_defers() {
        let plan = matcher().plan(&event(EventDraft::open_file("Dockerfile")));
        assert!(plan.proposals.is_empty());
        assert_eq!(plan.notes[0].message, "Opening Dockerfile in VS Code...");

        let effect = &plan.deferred[0];
        assert_eq!(effect.delay, Duration::from_secs(2));
        assert_eq!(effect.note.message, "Engineer fixed Dockerfile. updating status...");
        assert_eq!(effect.proposals[0].confidence, 80);
        assert_eq!(effect.proposals[0].evidence_label, "Dockerfile");

        let other = matcher().plan(&event(EventDraft::open_file("src/main.rs")));
        assert!(other.deferred[0].proposals.is_empty());
    }

    #[test]
    fn test_webhook_success() {
        let plan = matcher().plan(&event(
            EventDraft::ci_pipeline(PipelineStatus::Success).from_agent("webhook"),
        ));
        let slugs: Vec<_> = plan.proposals.iter().map(|p| p.subcategory_slug.as_str()).collect();
        assert_eq!(slugs, vec!["gh-actions", "auto-test-ci"]);
        assert!(plan.proposals.iter().all(|p| p.confidence == 100));
    }

    #[test]
    fn test_webhook_failure_stops_generic_rule() {
        let plan = matcher().plan(&event(
            EventDraft::ci_pipeline(PipelineStatus::Failure).from_agent("webhook"),
        ));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_generic_ci() {
        let success = matcher().plan(&event(EventDraft::ci_pipeline(PipelineStatus::Success)));
        assert_eq!(success.proposals.len(), 1);
        assert_eq!(success.proposals[0].subcategory_slug, "auto-test-ci");
        assert_eq!(success.proposals[0].confidence, 98);

        let failed = matcher().plan(&event(EventDraft::ci_pipeline(PipelineStatus::Failure)));
        assert!(failed.is_empty());
    }

    #[test]
    fn test_ai_generate_tests() {
        let plan = matcher().plan(&event(EventDraft::ai_action(AiActionKind::GenerateTests)));
        assert_eq!(plan.proposals[0].subcategory_slug, "unit-tests");
        assert_eq!(plan.proposals[0].evidence_type, EvidenceType::AiChat);

        let explain = matcher().plan(&event(EventDraft::ai_action(AiActionKind::Explain)));
        assert!(explain.is_empty());
    }

    #[test]
    fn test_custom_webhook_agent() {
        let matcher = RuleMatcher::new(RulesConfig {
            webhook_agent_id: "gh-hook".to_string(),
            ..Default::default()
        });
        let plan = matcher.plan(&event(
            EventDraft::ci_pipeline(PipelineStatus::Success).from_agent("webhook"),
        ));
        // Not the webhook agent any more, so the generic rule applies.
        assert_eq!(plan.proposals.len(), 1);
        assert_eq!(plan.proposals[0].confidence, 98);
    }
}
