//! Human-readable plan narratives.
//!
//! A [`Narrator`] turns a finished schedule and its risks into text. It runs
//! after planning and is optional: [`narrate_or_skip`] turns a failure into an
//! absent narrative so callers never lose the plan itself.

use std::fmt::Write as _;

use thiserror::Error;
use tracing::warn;

use crate::models::{Risk, Schedule, Severity};

/// Narrative generation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NarrativeError {
    /// The generator could not produce text.
    #[error("narrative generation failed: {0}")]
    Failed(String),
}

/// Produces text from a schedule and its risks.
pub trait Narrator: Send + Sync {
    /// Narrates one plan.
    fn narrate(&self, schedule: &Schedule, risks: &[Risk]) -> Result<String, NarrativeError>;
}

/// Narrator that produces no text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNarrator;

impl Narrator for SilentNarrator {
    fn narrate(&self, _schedule: &Schedule, _risks: &[Risk]) -> Result<String, NarrativeError> {
        Ok(String::new())
    }
}

/// Deterministic plain-text summary.
///
/// ```text
/// 4 of 5 stories scheduled through Sprint 3; 1 deferred, 0 blocked.
/// 2 risks (1 high, 1 low):
/// - [high] overdue: Story S4 is not scheduled but is due in Sprint 2
/// - [low] cross-team dependency: S1 (alpha) -> S2 (beta)
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SummaryNarrator {
    /// Maximum number of risks listed line by line.
    pub max_listed: usize,
}

impl Default for SummaryNarrator {
    fn default() -> Self {
        Self { max_listed: 10 }
    }
}

impl SummaryNarrator {
    /// Creates a narrator listing up to `max_listed` risks.
    pub fn new(max_listed: usize) -> Self {
        Self { max_listed }
    }
}

impl Narrator for SummaryNarrator {
    fn narrate(&self, schedule: &Schedule, risks: &[Risk]) -> Result<String, NarrativeError> {
        let scheduled = schedule.assignment_count();
        let deferred = schedule.deferred().len();
        let blocked = schedule.blocked().len();
        let planned = scheduled + deferred + blocked;

        let mut text = String::new();
        let horizon = match schedule.last_sprint() {
            Some(last) => format!(" through Sprint {}", last + 1),
            None => String::new(),
        };
        writeln!(
            text,
            "{scheduled} of {planned} stories scheduled{horizon}; {deferred} deferred, {blocked} blocked."
        )
        .map_err(|e| NarrativeError::Failed(e.to_string()))?;

        if risks.is_empty() {
            text.push_str("No risks detected.");
            return Ok(text);
        }

        let counts: Vec<String> = [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ]
        .into_iter()
        .filter_map(|severity| {
            let n = risks.iter().filter(|r| r.severity == severity).count();
            (n > 0).then(|| format!("{n} {severity}"))
        })
        .collect();
        let noun = if risks.len() == 1 { "risk" } else { "risks" };
        write!(text, "{} {noun} ({}):", risks.len(), counts.join(", "))
            .map_err(|e| NarrativeError::Failed(e.to_string()))?;

        let mut ordered: Vec<&Risk> = risks.iter().collect();
        // stable: keeps detection order within a severity
        ordered.sort_by(|a, b| b.severity.cmp(&a.severity));
        for risk in ordered.iter().take(self.max_listed) {
            write!(
                text,
                "\n- [{}] {}: {}",
                risk.severity, risk.kind, risk.description
            )
            .map_err(|e| NarrativeError::Failed(e.to_string()))?;
        }
        if risks.len() > self.max_listed {
            write!(text, "\n- ... and {} more", risks.len() - self.max_listed)
                .map_err(|e| NarrativeError::Failed(e.to_string()))?;
        }

        Ok(text)
    }
}

/// Runs a narrator, treating failure as "no narrative".
pub fn narrate_or_skip(
    narrator: &dyn Narrator,
    schedule: &Schedule,
    risks: &[Risk],
) -> Option<String> {
    match narrator.narrate(schedule, risks) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(event = "narrative_skipped", error = %err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, DeferralReason, RiskKind, StoryOutcome};

    struct FailingNarrator;

    impl Narrator for FailingNarrator {
        fn narrate(&self, _: &Schedule, _: &[Risk]) -> Result<String, NarrativeError> {
            Err(NarrativeError::Failed("model timeout".into()))
        }
    }

    fn make_schedule() -> Schedule {
        let mut schedule = Schedule::new(3);
        schedule.add_assignment(Assignment::new("S1", "F1", "alpha", 0, 3.0));
        schedule.add_assignment(Assignment::new("S2", "F1", "alpha", 2, 5.0));
        schedule.set_outcome(
            "S3",
            StoryOutcome::Deferred {
                reason: DeferralReason::NoCapacity,
            },
        );
        schedule
    }

    fn make_risks() -> Vec<Risk> {
        vec![
            Risk::new(
                "cross_team:S1:S2",
                RiskKind::CrossTeamDependency,
                Severity::Low,
                vec!["S1".into(), "S2".into()],
                "S1 (alpha) -> S2 (beta)",
            ),
            Risk::new(
                "overdue:S3",
                RiskKind::Overdue,
                Severity::High,
                vec!["S3".into()],
                "S3 is not scheduled",
            ),
        ]
    }

    #[test]
    fn test_silent() {
        let text = SilentNarrator.narrate(&make_schedule(), &make_risks()).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_summary_text() {
        let text = SummaryNarrator::default()
            .narrate(&make_schedule(), &make_risks())
            .unwrap();
        assert_eq!(
            text,
            "2 of 3 stories scheduled through Sprint 3; 1 deferred, 0 blocked.\n\
             2 risks (1 high, 1 low):\n\
             - [high] overdue: S3 is not scheduled\n\
             - [low] cross-team dependency: S1 (alpha) -> S2 (beta)"
        );
    }

    #[test]
    fn test_summary_truncates() {
        let text = SummaryNarrator::new(1)
            .narrate(&make_schedule(), &make_risks())
            .unwrap();
        assert!(text.ends_with("- ... and 1 more"));
        assert!(!text.contains("cross-team"));
    }

    #[test]
    fn test_summary_empty_plan() {
        let text = SummaryNarrator::default()
            .narrate(&Schedule::new(0), &[])
            .unwrap();
        assert_eq!(
            text,
            "0 of 0 stories scheduled; 0 deferred, 0 blocked.\nNo risks detected."
        );
    }

    #[test]
    fn test_narrate_or_skip() {
        let schedule = make_schedule();
        assert_eq!(narrate_or_skip(&FailingNarrator, &schedule, &[]), None);
        assert!(narrate_or_skip(&SummaryNarrator::default(), &schedule, &[]).is_some());
    }
}
