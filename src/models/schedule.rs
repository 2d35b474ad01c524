//! Schedule (planning result) model.
//!
//! A schedule records, for every planned story, either a sprint assignment
//! or the reason it could not be placed. It is created fresh by each
//! planning run and never mutates the backlog.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A story placed in a sprint for a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned story.
    pub story_id: String,
    /// Parent feature (denormalized for query convenience).
    pub feature_id: String,
    /// Team whose capacity was reserved.
    pub team_id: String,
    /// Sprint index.
    pub sprint: usize,
    /// Reserved effort.
    pub effort: f64,
    /// 1-based position in the order decisions were made.
    pub sequence: usize,
}

impl Assignment {
    /// Creates an assignment.
    pub fn new(
        story_id: impl Into<String>,
        feature_id: impl Into<String>,
        team_id: impl Into<String>,
        sprint: usize,
        effort: f64,
    ) -> Self {
        Self {
            story_id: story_id.into(),
            feature_id: feature_id.into(),
            team_id: team_id.into(),
            sprint,
            effort,
            sequence: 0,
        }
    }

    /// Sets the decision sequence number.
    pub fn with_sequence(mut self, sequence: usize) -> Self {
        self.sequence = sequence;
        self
    }
}

/// Why a story was deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferralReason {
    /// Neither the story nor its feature names a team.
    NoTeam,
    /// The named team has no capacity rows.
    UnknownTeam,
    /// No sprint in the scan window has enough remaining capacity.
    NoCapacity,
    /// Dependencies push the earliest start past the horizon.
    DependenciesBeyondHorizon,
}

impl fmt::Display for DeferralReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DeferralReason::NoTeam => "no team assigned",
            DeferralReason::UnknownTeam => "team has no capacity in this plan",
            DeferralReason::NoCapacity => "insufficient capacity in every candidate sprint",
            DeferralReason::DependenciesBeyondHorizon => {
                "dependencies push the start beyond the planning horizon"
            }
        };
        f.write_str(text)
    }
}

/// Terminal outcome of a story in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StoryOutcome {
    /// Placed in a sprint.
    Scheduled {
        /// Sprint index.
        sprint: usize,
        /// Team id.
        team: String,
    },
    /// Could not be placed within the horizon.
    Deferred {
        /// Cause.
        reason: DeferralReason,
    },
    /// Waits on predecessors that never got scheduled.
    Blocked {
        /// Unscheduled predecessors.
        waiting_on: Vec<String>,
    },
}

impl StoryOutcome {
    /// Assigned sprint, if scheduled.
    pub fn sprint(&self) -> Option<usize> {
        match self {
            StoryOutcome::Scheduled { sprint, .. } => Some(*sprint),
            _ => None,
        }
    }

    /// Whether the story was scheduled.
    pub fn is_scheduled(&self) -> bool {
        matches!(self, StoryOutcome::Scheduled { .. })
    }
}

/// Sprint range occupied by a feature's stories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpan {
    /// Earliest scheduled story sprint.
    pub start: Option<usize>,
    /// Latest scheduled story sprint, set only when every
    /// non-complete story of the feature is scheduled.
    pub finish: Option<usize>,
}

/// Sprint placement queries used by dependency checks.
pub trait SprintLookup {
    /// Sprint in which the item starts.
    fn start_sprint(&self, id: &str) -> Option<usize>;

    /// Sprint in which the item finishes.
    fn finish_sprint(&self, id: &str) -> Option<usize>;

    /// Whether the item was already complete before planning.
    fn is_complete(&self, id: &str) -> bool;
}

/// A complete planning result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Number of sprints in the plan.
    pub sprint_count: usize,
    /// Assignments in decision order.
    pub assignments: Vec<Assignment>,
    /// Outcome per planned story.
    pub outcomes: BTreeMap<String, StoryOutcome>,
    /// Sprint span per feature.
    pub feature_spans: BTreeMap<String, FeatureSpan>,
    /// Items that were complete before planning.
    pub completed: BTreeSet<String>,
}

impl Schedule {
    /// Creates an empty schedule over `sprint_count` sprints.
    pub fn new(sprint_count: usize) -> Self {
        Self {
            sprint_count,
            ..Self::default()
        }
    }

    /// Adds an assignment and records the story as scheduled.
    pub fn add_assignment(&mut self, assignment: Assignment) {
        self.outcomes.insert(
            assignment.story_id.clone(),
            StoryOutcome::Scheduled {
                sprint: assignment.sprint,
                team: assignment.team_id.clone(),
            },
        );
        self.assignments.push(assignment);
    }

    /// Removes a story's assignment, returning it.
    pub fn remove_assignment(&mut self, story_id: &str) -> Option<Assignment> {
        let pos = self
            .assignments
            .iter()
            .position(|a| a.story_id == story_id)?;
        self.outcomes.remove(story_id);
        Some(self.assignments.remove(pos))
    }

    /// Records a non-scheduled outcome.
    pub fn set_outcome(&mut self, story_id: impl Into<String>, outcome: StoryOutcome) {
        self.outcomes.insert(story_id.into(), outcome);
    }

    /// Finds the assignment for a story.
    pub fn assignment_for_story(&self, story_id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.story_id == story_id)
    }

    /// Assignments for a (team, sprint) pair.
    pub fn assignments_in(&self, team_id: &str, sprint: usize) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.team_id == team_id && a.sprint == sprint)
            .collect()
    }

    /// Assignments for a feature's stories.
    pub fn assignments_for_feature(&self, feature_id: &str) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.feature_id == feature_id)
            .collect()
    }

    /// Sum of reserved effort per (team, sprint).
    pub fn load_by_team_sprint(&self) -> BTreeMap<(String, usize), f64> {
        let mut load = BTreeMap::new();
        for a in &self.assignments {
            *load.entry((a.team_id.clone(), a.sprint)).or_insert(0.0) += a.effort;
        }
        load
    }

    /// Outcome of a story.
    pub fn outcome(&self, story_id: &str) -> Option<&StoryOutcome> {
        self.outcomes.get(story_id)
    }

    /// Ids of deferred stories.
    pub fn deferred(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, StoryOutcome::Deferred { .. }))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Ids of blocked stories.
    pub fn blocked(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, StoryOutcome::Blocked { .. }))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Latest sprint used by any assignment.
    pub fn last_sprint(&self) -> Option<usize> {
        self.assignments.iter().map(|a| a.sprint).max()
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }
}

impl SprintLookup for Schedule {
    fn start_sprint(&self, id: &str) -> Option<usize> {
        match self.outcomes.get(id) {
            Some(outcome) => outcome.sprint(),
            None => self.feature_spans.get(id).and_then(|s| s.start),
        }
    }

    fn finish_sprint(&self, id: &str) -> Option<usize> {
        match self.outcomes.get(id) {
            Some(outcome) => outcome.sprint(),
            None => self.feature_spans.get(id).and_then(|s| s.finish),
        }
    }

    fn is_complete(&self, id: &str) -> bool {
        self.completed.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new(3);
        s.add_assignment(Assignment::new("S1", "F1", "alpha", 0, 5.0).with_sequence(1));
        s.add_assignment(Assignment::new("S2", "F1", "alpha", 0, 3.0).with_sequence(2));
        s.add_assignment(Assignment::new("S3", "F2", "beta", 2, 8.0).with_sequence(3));
        s.set_outcome(
            "S4",
            StoryOutcome::Deferred {
                reason: DeferralReason::NoCapacity,
            },
        );
        s.set_outcome(
            "S5",
            StoryOutcome::Blocked {
                waiting_on: vec!["S4".into()],
            },
        );
        s
    }

    #[test]
    fn test_queries() {
        let s = sample_schedule();
        assert_eq!(s.assignment_count(), 3);
        assert_eq!(s.assignment_for_story("S3").unwrap().team_id, "beta");
        assert!(s.assignment_for_story("S4").is_none());
        assert_eq!(s.assignments_in("alpha", 0).len(), 2);
        assert_eq!(s.assignments_for_feature("F1").len(), 2);
        assert_eq!(s.last_sprint(), Some(2));
        assert_eq!(s.deferred(), vec!["S4"]);
        assert_eq!(s.blocked(), vec!["S5"]);
    }

    #[test]
    fn test_load_by_team_sprint() {
        let s = sample_schedule();
        let load = s.load_by_team_sprint();
        assert_eq!(load[&("alpha".to_string(), 0)], 8.0);
        assert_eq!(load[&("beta".to_string(), 2)], 8.0);
    }

    #[test]
    fn test_remove_assignment() {
        let mut s = sample_schedule();
        let removed = s.remove_assignment("S1").unwrap();
        assert_eq!(removed.effort, 5.0);
        assert!(s.outcome("S1").is_none());
        assert!(s.remove_assignment("S1").is_none());
    }

    #[test]
    fn test_sprint_lookup() {
        let mut s = sample_schedule();
        s.feature_spans.insert(
            "F1".into(),
            FeatureSpan {
                start: Some(0),
                finish: Some(0),
            },
        );
        s.completed.insert("S0".into());

        assert_eq!(s.start_sprint("S3"), Some(2));
        assert_eq!(s.finish_sprint("S4"), None);
        assert_eq!(s.finish_sprint("F1"), Some(0));
        assert!(s.is_complete("S0"));
        assert!(!s.is_complete("S1"));
    }

    #[test]
    fn test_empty_schedule() {
        let s = Schedule::new(0);
        assert_eq!(s.last_sprint(), None);
        assert_eq!(s.assignment_count(), 0);
    }
}
