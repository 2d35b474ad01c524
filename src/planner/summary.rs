//! Plan summary metrics.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Scheduled / Deferred / Blocked | Story outcome counts |
//! | Scheduled Effort | Sum of reserved effort |
//! | Last Sprint | Latest sprint with an assignment |
//! | Completion Rate | Scheduled / planned stories |
//! | Utilization | Reserved / total per (team, sprint) |
//! | Avg Utilization | Mean over slots with capacity |

use serde::{Deserialize, Serialize};

use crate::ledger::CapacityLedger;
use crate::models::Schedule;

/// Utilization of one (team, sprint) slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotUtilization {
    /// Team id.
    pub team: String,
    /// Sprint index.
    pub sprint: usize,
    /// Reserved effort.
    pub reserved: f64,
    /// Available capacity.
    pub total: f64,
    /// Reserved / total (0.0 for a zero-capacity slot).
    pub utilization: f64,
}

/// Plan-level indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Scheduled stories.
    pub scheduled: usize,
    /// Deferred stories.
    pub deferred: usize,
    /// Blocked stories.
    pub blocked: usize,
    /// Sum of reserved effort across assignments.
    pub scheduled_effort: f64,
    /// Latest sprint in use.
    pub last_sprint: Option<usize>,
    /// Fraction of planned stories that were scheduled (0.0..1.0).
    pub completion_rate: f64,
    /// Per-slot utilization, ordered by team then sprint.
    pub utilization: Vec<SlotUtilization>,
    /// Mean utilization over slots with positive capacity.
    pub avg_utilization: f64,
}

impl PlanSummary {
    /// Computes the summary from a schedule and its ledger.
    pub fn calculate(schedule: &Schedule, ledger: &CapacityLedger) -> Self {
        let scheduled = schedule.assignment_count();
        let deferred = schedule.deferred().len();
        let blocked = schedule.blocked().len();
        let planned = scheduled + deferred + blocked;

        let utilization: Vec<SlotUtilization> = ledger
            .entries()
            .map(|(team, sprint, entry)| SlotUtilization {
                team: team.to_string(),
                sprint,
                reserved: entry.reserved,
                total: entry.total,
                utilization: entry.utilization(),
            })
            .collect();

        let with_capacity: Vec<f64> = utilization
            .iter()
            .filter(|u| u.total > 0.0)
            .map(|u| u.utilization)
            .collect();
        let avg_utilization = if with_capacity.is_empty() {
            0.0
        } else {
            with_capacity.iter().sum::<f64>() / with_capacity.len() as f64
        };

        Self {
            scheduled,
            deferred,
            blocked,
            scheduled_effort: schedule.assignments.iter().map(|a| a.effort).sum(),
            last_sprint: schedule.last_sprint(),
            completion_rate: if planned == 0 {
                1.0
            } else {
                scheduled as f64 / planned as f64
            },
            utilization,
            avg_utilization,
        }
    }

    /// Utilization of a single slot.
    pub fn utilization_of(&self, team: &str, sprint: usize) -> Option<f64> {
        self.utilization
            .iter()
            .find(|u| u.team == team && u.sprint == sprint)
            .map(|u| u.utilization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, DeferralReason, StoryOutcome, Team};

    fn make_run() -> (Schedule, CapacityLedger) {
        let mut ledger = CapacityLedger::from_teams(&[Team::new("alpha", 10.0)], 2, 0.0);
        let mut schedule = Schedule::new(2);

        ledger.reserve("alpha", 0, 10.0).unwrap();
        ledger.reserve("alpha", 1, 5.0).unwrap();
        schedule.add_assignment(Assignment::new("S1", "F1", "alpha", 0, 10.0));
        schedule.add_assignment(Assignment::new("S2", "F1", "alpha", 1, 5.0));
        schedule.set_outcome(
            "S3",
            StoryOutcome::Deferred {
                reason: DeferralReason::NoCapacity,
            },
        );
        (schedule, ledger)
    }

    #[test]
    fn test_summary_counts() {
        let (schedule, ledger) = make_run();
        let summary = PlanSummary::calculate(&schedule, &ledger);

        assert_eq!(summary.scheduled, 2);
        assert_eq!(summary.deferred, 1);
        assert_eq!(summary.blocked, 0);
        assert_eq!(summary.scheduled_effort, 15.0);
        assert_eq!(summary.last_sprint, Some(1));
        assert!((summary.completion_rate - 2.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_utilization() {
        let (schedule, ledger) = make_run();
        let summary = PlanSummary::calculate(&schedule, &ledger);

        assert_eq!(summary.utilization_of("alpha", 0), Some(1.0));
        assert_eq!(summary.utilization_of("alpha", 1), Some(0.5));
        assert_eq!(summary.utilization_of("beta", 0), None);
        assert!((summary.avg_utilization - 0.75).abs() < 1e-10);
    }

    #[test]
    fn test_summary_empty() {
        let summary = PlanSummary::calculate(&Schedule::new(0), &CapacityLedger::new());
        assert_eq!(summary.completion_rate, 1.0);
        assert_eq!(summary.avg_utilization, 0.0);
        assert!(summary.utilization.is_empty());
    }
}
