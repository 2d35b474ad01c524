//! Sprint proposal strategies.
//!
//! A strategy answers one question per story: which sprint should the
//! planner try first? It reads the planner's state through a
//! [`StrategyContext`] and never mutates it.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::ledger::CapacityLedger;
use crate::models::{Backlog, DeferralReason, Schedule, Story};

/// A strategy's answer for one story.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    /// Try `sprint` first, then later sprints up to (excluding) `window_end`.
    Candidate {
        /// First sprint to try.
        sprint: usize,
        /// Exclusive end of the scan window.
        window_end: usize,
    },
    /// Predecessors are not scheduled yet; retry on a later pass.
    Waiting {
        /// Unscheduled predecessors.
        on: Vec<String>,
    },
    /// The story cannot be placed in this run.
    Unavailable(DeferralReason),
}

/// Read-only planner state handed to a strategy.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    /// Input backlog.
    pub backlog: &'a Backlog,
    /// Assignments made so far.
    pub schedule: &'a Schedule,
    /// Current reservations.
    pub ledger: &'a CapacityLedger,
    /// Sprints in the calendar.
    pub sprint_count: usize,
    /// Scan window length in sprints.
    pub horizon: usize,
}

impl<'a> StrategyContext<'a> {
    /// Team that plans the story, checked against the ledger.
    pub fn resolve_team<'s>(&self, story: &'s Story) -> Result<&'s str, DeferralReason>
    where
        'a: 's,
    {
        let team = self
            .backlog
            .story_team(story)
            .ok_or(DeferralReason::NoTeam)?;
        if self.ledger.has_team(team) {
            Ok(team)
        } else {
            Err(DeferralReason::UnknownTeam)
        }
    }

    /// Earliest sprint allowed by the story's feature.
    pub fn feature_floor(&self, story: &Story) -> usize {
        self.backlog
            .feature(&story.feature_id)
            .and_then(|f| f.earliest_sprint)
            .unwrap_or(0)
    }

    /// Exclusive end of the scan window that starts at `floor`.
    pub fn window_end(&self, floor: usize) -> usize {
        floor.saturating_add(self.horizon).min(self.sprint_count)
    }

    /// First sprint in `[floor, window_end)` whose remaining capacity
    /// covers the story's effort.
    pub fn first_fit(&self, story: &Story, team: &str, floor: usize) -> Proposal {
        let effort = story.planning_effort();
        let window_end = self.window_end(floor);
        (floor..window_end)
            .find(|&sprint| self.ledger.remaining(team, sprint) + 1e-9 >= effort)
            .map(|sprint| Proposal::Candidate { sprint, window_end })
            .unwrap_or(Proposal::Unavailable(DeferralReason::NoCapacity))
    }
}

/// A pluggable sprint-selection policy.
pub trait SchedulingStrategy: Send + Sync + Debug {
    /// Strategy name (e.g., "standard").
    fn name(&self) -> &'static str;

    /// Whether the planner should order and gate stories by dependencies.
    fn respects_dependencies(&self) -> bool;

    /// Proposes a sprint for the story.
    fn propose_sprint(&self, story: &Story, context: &StrategyContext<'_>) -> Proposal;
}

/// Earliest sprint with room, ignoring dependency state.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardStrategy;

impl SchedulingStrategy for StandardStrategy {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn respects_dependencies(&self) -> bool {
        false
    }

    fn propose_sprint(&self, story: &Story, context: &StrategyContext<'_>) -> Proposal {
        let team = match context.resolve_team(story) {
            Ok(team) => team,
            Err(reason) => return Proposal::Unavailable(reason),
        };
        context.first_fit(story, team, context.feature_floor(story))
    }
}

/// Earliest sprint with room strictly after every predecessor.
///
/// Predecessors are the story's own story dependencies plus every
/// unfinished story of the features it is gated on. A story with an
/// unscheduled predecessor waits for the next pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyAwareStrategy;

impl SchedulingStrategy for DependencyAwareStrategy {
    fn name(&self) -> &'static str {
        "dependency_aware"
    }

    fn respects_dependencies(&self) -> bool {
        true
    }

    fn propose_sprint(&self, story: &Story, context: &StrategyContext<'_>) -> Proposal {
        let team = match context.resolve_team(story) {
            Ok(team) => team,
            Err(reason) => return Proposal::Unavailable(reason),
        };

        let base = context.feature_floor(story);
        let mut floor = base;
        let mut waiting = Vec::new();
        for pred in context.backlog.expanded_predecessors(story) {
            match context.schedule.outcome(&pred).and_then(|o| o.sprint()) {
                Some(sprint) => floor = floor.max(sprint + 1),
                None => waiting.push(pred),
            }
        }

        if !waiting.is_empty() {
            return Proposal::Waiting { on: waiting };
        }
        // only a predecessor can push the start past the horizon
        if floor > base && floor >= context.sprint_count {
            return Proposal::Unavailable(DeferralReason::DependenciesBeyondHorizon);
        }
        context.first_fit(story, team, floor)
    }
}

/// Built-in strategy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// [`StandardStrategy`].
    Standard,
    /// [`DependencyAwareStrategy`].
    #[default]
    DependencyAware,
}

impl SchedulingStrategy for StrategyKind {
    fn name(&self) -> &'static str {
        match self {
            StrategyKind::Standard => StandardStrategy.name(),
            StrategyKind::DependencyAware => DependencyAwareStrategy.name(),
        }
    }

    fn respects_dependencies(&self) -> bool {
        matches!(self, StrategyKind::DependencyAware)
    }

    fn propose_sprint(&self, story: &Story, context: &StrategyContext<'_>) -> Proposal {
        match self {
            StrategyKind::Standard => StandardStrategy.propose_sprint(story, context),
            StrategyKind::DependencyAware => DependencyAwareStrategy.propose_sprint(story, context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Feature, Team};

    fn make_backlog() -> Backlog {
        Backlog::new()
            .with_feature(Feature::new("F1").with_team("alpha"))
            .with_feature(Feature::new("F2").with_team("alpha").with_earliest_sprint(1))
            .with_story(Story::new("A", "F1").with_effort(4.0))
            .with_story(Story::new("B", "F1").with_effort(4.0).with_dependency("A"))
            .with_story(Story::new("C", "F2").with_effort(4.0))
            .with_story(Story::new("D", "F1").with_effort(4.0).with_team("ghost"))
    }

    fn make_ledger() -> CapacityLedger {
        CapacityLedger::from_teams(&[Team::new("alpha", 6.0)], 3, 0.0)
    }

    fn context<'a>(
        backlog: &'a Backlog,
        schedule: &'a Schedule,
        ledger: &'a CapacityLedger,
    ) -> StrategyContext<'a> {
        StrategyContext {
            backlog,
            schedule,
            ledger,
            sprint_count: 3,
            horizon: 3,
        }
    }

    #[test]
    fn test_standard_ignores_dependencies() {
        let backlog = make_backlog();
        let schedule = Schedule::new(3);
        let ledger = make_ledger();
        let ctx = context(&backlog, &schedule, &ledger);

        let b = backlog.story("B").unwrap();
        assert_eq!(
            StandardStrategy.propose_sprint(b, &ctx),
            Proposal::Candidate {
                sprint: 0,
                window_end: 3
            }
        );
    }

    #[test]
    fn test_feature_floor_respected() {
        let backlog = make_backlog();
        let schedule = Schedule::new(3);
        let ledger = make_ledger();
        let ctx = context(&backlog, &schedule, &ledger);

        let c = backlog.story("C").unwrap();
        assert_eq!(
            StandardStrategy.propose_sprint(c, &ctx),
            Proposal::Candidate {
                sprint: 1,
                window_end: 3
            }
        );
    }

    #[test]
    fn test_dependency_aware_waits_then_follows() {
        let backlog = make_backlog();
        let mut schedule = Schedule::new(3);
        let ledger = make_ledger();
        let b = backlog.story("B").unwrap();

        let ctx = context(&backlog, &schedule, &ledger);
        assert_eq!(
            DependencyAwareStrategy.propose_sprint(b, &ctx),
            Proposal::Waiting {
                on: vec!["A".into()]
            }
        );

        schedule.add_assignment(Assignment::new("A", "F1", "alpha", 0, 4.0));
        let ctx = context(&backlog, &schedule, &ledger);
        assert_eq!(
            DependencyAwareStrategy.propose_sprint(b, &ctx),
            Proposal::Candidate {
                sprint: 1,
                window_end: 3
            }
        );
    }

    #[test]
    fn test_dependencies_beyond_horizon() {
        let backlog = make_backlog();
        let mut schedule = Schedule::new(3);
        schedule.add_assignment(Assignment::new("A", "F1", "alpha", 2, 4.0));
        let ledger = make_ledger();
        let ctx = context(&backlog, &schedule, &ledger);

        let b = backlog.story("B").unwrap();
        assert_eq!(
            StrategyKind::DependencyAware.propose_sprint(b, &ctx),
            Proposal::Unavailable(DeferralReason::DependenciesBeyondHorizon)
        );
    }

    #[test]
    fn test_empty_calendar_is_not_a_dependency_problem() {
        let backlog = make_backlog();
        let schedule = Schedule::new(0);
        let ledger = make_ledger();
        let ctx = StrategyContext {
            sprint_count: 0,
            ..context(&backlog, &schedule, &ledger)
        };

        let a = backlog.story("A").unwrap();
        assert_eq!(
            DependencyAwareStrategy.propose_sprint(a, &ctx),
            Proposal::Unavailable(DeferralReason::NoCapacity)
        );
        assert_eq!(
            DependencyAwareStrategy.propose_sprint(a, &ctx),
            StandardStrategy.propose_sprint(a, &ctx)
        );
    }

    #[test]
    fn test_team_resolution() {
        let backlog = make_backlog().with_feature(Feature::new("F3")).with_story(Story::new("E", "F3"));
        let schedule = Schedule::new(3);
        let ledger = make_ledger();
        let ctx = context(&backlog, &schedule, &ledger);

        let d = backlog.story("D").unwrap();
        let e = backlog.story("E").unwrap();
        assert_eq!(
            StrategyKind::Standard.propose_sprint(d, &ctx),
            Proposal::Unavailable(DeferralReason::UnknownTeam)
        );
        assert_eq!(
            StrategyKind::Standard.propose_sprint(e, &ctx),
            Proposal::Unavailable(DeferralReason::NoTeam)
        );
    }

    #[test]
    fn test_no_capacity_in_window() {
        let backlog = make_backlog();
        let schedule = Schedule::new(3);
        let ledger = make_ledger();
        let ctx = StrategyContext {
            horizon: 1,
            ..context(&backlog, &schedule, &ledger)
        };

        let big = Story::new("Z", "F1").with_effort(7.0);
        assert_eq!(
            StandardStrategy.propose_sprint(&big, &ctx),
            Proposal::Unavailable(DeferralReason::NoCapacity)
        );
        assert_eq!(ctx.window_end(2), 3);
    }

    #[test]
    fn test_kind_serde() {
        let kind: StrategyKind = serde_json::from_str("\"standard\"").unwrap();
        assert_eq!(kind, StrategyKind::Standard);
        assert_eq!(StrategyKind::default().name(), "dependency_aware");
        assert!(!kind.respects_dependencies());
    }
}
