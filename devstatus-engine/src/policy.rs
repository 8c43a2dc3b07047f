//! Conflict policy for automated transitions.
//!
//! Two checks run before an automated change is written:
//! - Anomaly (advisory): NOT_STARTED straight to VERIFIED is flagged but
//!   still applied.
//! - Lock (blocking): a VERIFIED item is never moved by an automated
//!   source. Only a manual update may change it.

use checklist::StatusEnum;

/// Outcome of checking one proposed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Apply the transition
    Apply,
    /// Apply, but raise an anomaly alert first
    ApplyWithAnomaly,
    /// Leave the record alone and raise a conflict alert
    RejectLocked,
}

impl Verdict {
    pub fn applies(&self) -> bool {
        !matches!(self, Self::RejectLocked)
    }
}

/// Checks automated transitions against the current status.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictPolicy;

impl ConflictPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `current -> target` may be applied automatically.
    pub fn evaluate(&self, current: StatusEnum, target: StatusEnum) -> Verdict {
        if current.is_locked() && target != current {
            return Verdict::RejectLocked;
        }
        if current == StatusEnum::NotStarted && target == StatusEnum::Verified {
            return Verdict::ApplyWithAnomaly;
        }
        Verdict::Apply
    }
}

/// Alert text for a suspicious jump.
pub fn anomaly_message(title: &str) -> String {
    format!("Anomaly detected: Suspicious jump to VERIFIED for {title}")
}

/// Alert text for a rejected change.
pub fn conflict_message(title: &str) -> String {
    format!("Conflict: System tried to update verified {title}, ignored.")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [StatusEnum; 5] = [
        StatusEnum::NotStarted,
        StatusEnum::InProgress,
        StatusEnum::Blocked,
        StatusEnum::Done,
        StatusEnum::Verified,
    ];

    #[test]
    fn test_verified_is_locked() {
        let policy = ConflictPolicy::new();
        for target in ALL {
            let verdict = policy.evaluate(StatusEnum::Verified, target);
            if target == StatusEnum::Verified {
                assert!(verdict.applies());
            } else {
                assert_eq!(verdict, Verdict::RejectLocked);
            }
        }
    }

    #[test]
    fn test_anomaly_only_from_not_started() {
        let policy = ConflictPolicy::new();
        assert_eq!(
            policy.evaluate(StatusEnum::NotStarted, StatusEnum::Verified),
            Verdict::ApplyWithAnomaly
        );
        assert_eq!(policy.evaluate(StatusEnum::Done, StatusEnum::Verified), Verdict::Apply);
        assert_eq!(
            policy.evaluate(StatusEnum::NotStarted, StatusEnum::InProgress),
            Verdict::Apply
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            conflict_message("Docker Basics & DevContainers"),
            "Conflict: System tried to update verified Docker Basics & DevContainers, ignored."
        );
        assert!(anomaly_message("CDN").ends_with("VERIFIED for CDN"));
    }
}
