//! The planning run.
//!
//! # Algorithm
//!
//! 1. Validate the backlog and build both dependency graphs. Any fatal
//!    error returns here, before a ledger exists.
//! 2. Rank features, then sequence stories by (feature position, own rank).
//!    Dependency-aware strategies follow the graphs' topological orders.
//! 3. Pass over pending stories. Each story is proposed a sprint by the
//!    strategy; the planner reserves there or at the next sprint with room
//!    inside the scan window. Stories waiting on predecessors are retried
//!    on the next pass.
//! 4. Stop when nothing waits, when a pass resolves nothing, or after one
//!    pass per story. Stories still waiting are Blocked.
//!
//! # Complexity
//! O(p * n * h) reservations, where p = passes, n = stories, h = horizon.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::strategy::{Proposal, SchedulingStrategy, StrategyContext};
use super::summary::PlanSummary;
use crate::error::{PlanningError, Result};
use crate::graph::DependencyGraph;
use crate::ledger::{CapacityLedger, LedgerError};
use crate::models::{
    Assignment, Backlog, DeferralReason, EventKind, EventLog, Feature, FeatureSpan, Schedule,
    SprintCalendar, Story, StoryOutcome, Team,
};
use crate::prioritization::{Prioritizer, RankingContext};
use crate::validation::validate_backlog;

/// Result of one planning run.
///
/// Owns its ledger; nothing is shared between runs.
#[derive(Debug, Clone)]
pub struct PlanRun {
    /// Assignments and per-story outcomes.
    pub schedule: Schedule,
    /// Capacity reservations backing the assignments.
    pub ledger: CapacityLedger,
    /// Decisions in the order they were made.
    pub events: EventLog,
    /// Story-level dependency graph.
    pub story_graph: DependencyGraph,
    /// Feature-level dependency graph.
    pub feature_graph: DependencyGraph,
}

impl PlanRun {
    /// Removes a story's assignment and releases its reservation.
    ///
    /// # Errors
    /// [`PlanningError::UnknownStory`] if the story has no assignment.
    pub fn release_story(&mut self, story_id: &str) -> Result<Assignment> {
        let assignment = self
            .schedule
            .remove_assignment(story_id)
            .ok_or_else(|| PlanningError::UnknownStory(story_id.to_string()))?;
        self.ledger
            .release(&assignment.team_id, assignment.sprint, assignment.effort)?;

        let start = self
            .schedule
            .assignments_for_feature(&assignment.feature_id)
            .iter()
            .map(|a| a.sprint)
            .min();
        self.schedule
            .feature_spans
            .insert(assignment.feature_id.clone(), FeatureSpan { start, finish: None });

        debug!(
            event = "story_released",
            story = story_id,
            team = assignment.team_id.as_str(),
            sprint = assignment.sprint,
        );
        Ok(assignment)
    }

    /// Counts and utilization of this run.
    pub fn summary(&self) -> PlanSummary {
        PlanSummary::calculate(&self.schedule, &self.ledger)
    }
}

/// Greedy, priority-ordered sprint planner.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use pi_planner::models::{Backlog, Feature, SprintCalendar, Story, Team};
/// use pi_planner::planner::{Planner, StrategyKind};
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
/// let planner = Planner::new(
///     SprintCalendar::new(start, 14, 3),
///     vec![Team::new("alpha", 10.0)],
///     StrategyKind::DependencyAware,
/// );
/// let backlog = Backlog::new()
///     .with_feature(Feature::new("F1").with_team("alpha"))
///     .with_story(Story::new("S1", "F1").with_effort(5.0));
///
/// let run = planner.run(&backlog).unwrap();
/// assert_eq!(run.schedule.assignment_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Planner {
    calendar: SprintCalendar,
    teams: Vec<Team>,
    strategy: Arc<dyn SchedulingStrategy>,
    prioritizer: Prioritizer,
    horizon: Option<usize>,
    capacity_buffer: f64,
    as_of: Option<NaiveDate>,
}

impl Planner {
    /// Creates a planner over a calendar and team roster.
    pub fn new<S: SchedulingStrategy + 'static>(
        calendar: SprintCalendar,
        teams: Vec<Team>,
        strategy: S,
    ) -> Self {
        Self {
            calendar,
            teams,
            strategy: Arc::new(strategy),
            prioritizer: Prioritizer::standard(),
            horizon: None,
            capacity_buffer: 0.0,
            as_of: None,
        }
    }

    /// Sets the scan window length in sprints (default: sprint count).
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Sets the fraction of capacity withheld from every slot.
    pub fn with_capacity_buffer(mut self, buffer: f64) -> Self {
        self.capacity_buffer = buffer;
        self
    }

    /// Sets the date target dates are judged against
    /// (default: calendar start).
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Replaces the ranking rules.
    pub fn with_prioritizer(mut self, prioritizer: Prioritizer) -> Self {
        self.prioritizer = prioritizer;
        self
    }

    /// Sprint calendar.
    pub fn calendar(&self) -> &SprintCalendar {
        &self.calendar
    }

    /// Team roster.
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Active strategy name.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Effective scan window length.
    pub fn horizon(&self) -> usize {
        self.horizon.unwrap_or(self.calendar.count).max(1)
    }

    fn ranking_context(&self) -> RankingContext {
        RankingContext::as_of(self.as_of.unwrap_or(self.calendar.start))
    }

    /// Plans the backlog.
    ///
    /// # Errors
    /// - [`PlanningError::InvalidBacklog`] on duplicate ids, orphan stories,
    ///   or invalid numbers
    /// - [`PlanningError::UnknownReference`] / [`PlanningError::Cycle`] on
    ///   broken dependency graphs
    /// - [`PlanningError::LedgerInvariant`] on an internal ledger defect
    pub fn run(&self, backlog: &Backlog) -> Result<PlanRun> {
        validate_backlog(backlog).map_err(PlanningError::InvalidBacklog)?;

        let feature_graph = DependencyGraph::build(
            backlog.features.iter().map(|f| f.id()),
            &backlog.feature_dependencies(),
        )?;
        let story_graph = DependencyGraph::build(
            backlog.stories.iter().map(|s| s.id()),
            &backlog.story_dependencies(),
        )?;
        check_feature_references(backlog)?;

        let sprint_count = self.calendar.count;
        let horizon = self.horizon();
        let order = self.sequence(backlog, &feature_graph, &story_graph);

        let mut schedule = Schedule::new(sprint_count);
        let mut ledger =
            CapacityLedger::from_teams(&self.teams, sprint_count, self.capacity_buffer);
        let mut events = EventLog::new();
        mark_completed(backlog, &mut schedule);

        info!(
            event = "plan_start",
            strategy = self.strategy.name(),
            stories = order.len(),
            sprints = sprint_count,
            horizon = horizon,
        );
        events.push(EventKind::RunStarted {
            strategy: self.strategy.name().to_string(),
            stories: order.len(),
            sprints: sprint_count,
        });

        let max_passes = order.len().max(1);
        let mut pending = order;
        let mut waiting_on: HashMap<String, Vec<String>> = HashMap::new();
        let mut passes = 0;
        let mut sequence = 0;

        loop {
            passes += 1;
            debug!(event = "pass_start", pass = passes, pending = pending.len());
            events.push(EventKind::PassStarted {
                pass: passes,
                pending: pending.len(),
            });

            let mut still_waiting = Vec::new();
            let mut progressed = false;

            for story in pending {
                let id = story.id();
                let effort = story.planning_effort();
                let team = backlog.story_team(story);
                events.push(EventKind::StoryConsidered {
                    story: id.to_string(),
                    team: team.map(str::to_string),
                    effort,
                });

                let proposal = {
                    let context = StrategyContext {
                        backlog,
                        schedule: &schedule,
                        ledger: &ledger,
                        sprint_count,
                        horizon,
                    };
                    self.strategy.propose_sprint(story, &context)
                };

                match proposal {
                    Proposal::Candidate { sprint, window_end } => {
                        progressed = true;
                        let placed = match team {
                            None => Err(DeferralReason::NoTeam),
                            Some(team) if !ledger.has_team(team) => {
                                Err(DeferralReason::UnknownTeam)
                            }
                            Some(team) => reserve_first(
                                &mut ledger,
                                &mut events,
                                id,
                                team,
                                effort,
                                sprint..window_end.min(sprint_count),
                            )?
                            .map(|sprint| (team, sprint))
                            .ok_or(DeferralReason::NoCapacity),
                        };

                        match placed {
                            Ok((team, sprint)) => {
                                sequence += 1;
                                debug!(
                                    event = "story_scheduled",
                                    story = id,
                                    team = team,
                                    sprint = sprint,
                                    effort = effort,
                                );
                                schedule.add_assignment(
                                    Assignment::new(id, &story.feature_id, team, sprint, effort)
                                        .with_sequence(sequence),
                                );
                                events.push(EventKind::StoryScheduled {
                                    story: id.to_string(),
                                    team: team.to_string(),
                                    sprint,
                                    effort,
                                });
                            }
                            Err(reason) => defer(&mut schedule, &mut events, id, reason),
                        }
                    }
                    Proposal::Waiting { on } => {
                        debug!(event = "story_waiting", story = id, waiting_on = ?on);
                        events.push(EventKind::StoryWaiting {
                            story: id.to_string(),
                            waiting_on: on.clone(),
                        });
                        waiting_on.insert(id.to_string(), on);
                        still_waiting.push(story);
                    }
                    Proposal::Unavailable(reason) => {
                        progressed = true;
                        defer(&mut schedule, &mut events, id, reason);
                    }
                }
            }

            pending = still_waiting;
            if pending.is_empty() || !progressed || passes >= max_passes {
                break;
            }
        }

        for story in pending {
            let id = story.id();
            let unmet: Vec<String> = waiting_on
                .remove(id)
                .unwrap_or_default()
                .into_iter()
                .filter(|pred| {
                    !schedule
                        .outcome(pred)
                        .is_some_and(StoryOutcome::is_scheduled)
                })
                .collect();
            warn!(event = "story_blocked", story = id, waiting_on = ?unmet);
            schedule.set_outcome(
                id,
                StoryOutcome::Blocked {
                    waiting_on: unmet.clone(),
                },
            );
            events.push(EventKind::StoryBlocked {
                story: id.to_string(),
                waiting_on: unmet,
            });
        }

        schedule.feature_spans = feature_spans(backlog, &schedule);

        let scheduled = schedule.assignment_count();
        let deferred = schedule.deferred().len();
        let blocked = schedule.blocked().len();
        info!(
            event = "plan_end",
            passes = passes,
            scheduled = scheduled,
            deferred = deferred,
            blocked = blocked,
        );
        events.push(EventKind::RunCompleted {
            passes,
            scheduled,
            deferred,
            blocked,
        });

        Ok(PlanRun {
            schedule,
            ledger,
            events,
            story_graph,
            feature_graph,
        })
    }

    /// Non-complete stories in the order the first pass considers them.
    fn sequence<'b>(
        &self,
        backlog: &'b Backlog,
        feature_graph: &DependencyGraph,
        story_graph: &DependencyGraph,
    ) -> Vec<&'b Story> {
        let context = self.ranking_context();
        let features: HashMap<&str, &Feature> =
            backlog.features.iter().map(|f| (f.id(), f)).collect();
        let stories: HashMap<&str, &Story> =
            backlog.stories.iter().map(|s| (s.id(), s)).collect();

        let feature_order = if self.strategy.respects_dependencies() {
            feature_graph.topological_order(|a, b| match (features.get(a), features.get(b)) {
                (Some(fa), Some(fb)) => self.prioritizer.compare(&fa.item, &fb.item, &context),
                _ => a.cmp(b),
            })
        } else {
            self.prioritizer.rank_ids(&backlog.features, &context)
        };
        let position: HashMap<&str, usize> = feature_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let compare_stories = |a: &Story, b: &Story| -> Ordering {
            let pa = position.get(a.feature_id.as_str()).copied().unwrap_or(usize::MAX);
            let pb = position.get(b.feature_id.as_str()).copied().unwrap_or(usize::MAX);
            pa.cmp(&pb)
                .then_with(|| self.prioritizer.compare(&a.item, &b.item, &context))
        };

        let order: Vec<&Story> = if self.strategy.respects_dependencies() {
            story_graph
                .topological_order(|a, b| match (stories.get(a), stories.get(b)) {
                    (Some(sa), Some(sb)) => compare_stories(*sa, *sb),
                    _ => a.cmp(b),
                })
                .iter()
                .filter_map(|id| stories.get(id.as_str()).copied())
                .collect()
        } else {
            let mut order: Vec<&Story> = backlog.stories.iter().collect();
            order.sort_by(|a, b| compare_stories(*a, *b));
            order
        };

        order
            .into_iter()
            .filter(|s| !s.item.status.is_complete())
            .collect()
    }
}

/// Tries sprints in order until a reservation succeeds.
fn reserve_first(
    ledger: &mut CapacityLedger,
    events: &mut EventLog,
    story: &str,
    team: &str,
    effort: f64,
    sprints: std::ops::Range<usize>,
) -> Result<Option<usize>> {
    for sprint in sprints {
        match ledger.reserve(team, sprint, effort) {
            Ok(()) => return Ok(Some(sprint)),
            Err(LedgerError::InsufficientCapacity {
                requested,
                remaining,
                ..
            }) => {
                debug!(
                    event = "capacity_rejected",
                    story = story,
                    team = team,
                    sprint = sprint,
                    requested = requested,
                    remaining = remaining,
                );
                events.push(EventKind::CapacityRejected {
                    story: story.to_string(),
                    team: team.to_string(),
                    sprint,
                    requested,
                    remaining,
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(None)
}

fn defer(schedule: &mut Schedule, events: &mut EventLog, story: &str, reason: DeferralReason) {
    warn!(event = "story_deferred", story = story, reason = %reason);
    schedule.set_outcome(story, StoryOutcome::Deferred { reason });
    events.push(EventKind::StoryDeferred {
        story: story.to_string(),
        reason,
    });
}

/// Story-to-feature edges must name known features.
fn check_feature_references(backlog: &Backlog) -> Result<()> {
    for story in &backlog.stories {
        for feature_id in &story.depends_on_features {
            if backlog.feature(feature_id).is_none() {
                return Err(PlanningError::UnknownReference {
                    from: feature_id.clone(),
                    to: story.item.id.clone(),
                    missing: feature_id.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Records already-finished stories, and features with no open stories.
fn mark_completed(backlog: &Backlog, schedule: &mut Schedule) {
    for story in &backlog.stories {
        if story.item.status.is_complete() {
            schedule.completed.insert(story.item.id.clone());
        }
    }
    for feature in &backlog.features {
        if backlog.is_complete(feature.id()) {
            schedule.completed.insert(feature.item.id.clone());
        }
    }
}

fn feature_spans(backlog: &Backlog, schedule: &Schedule) -> BTreeMap<String, FeatureSpan> {
    let mut spans = BTreeMap::new();
    for feature in &backlog.features {
        let sprints: Vec<Option<usize>> = backlog
            .stories_of(feature.id())
            .filter(|s| !s.item.status.is_complete())
            .map(|s| schedule.outcome(s.id()).and_then(StoryOutcome::sprint))
            .collect();
        let start = sprints.iter().flatten().min().copied();
        let finish = if !sprints.is_empty() && sprints.iter().all(Option::is_some) {
            sprints.iter().flatten().max().copied()
        } else {
            None
        };
        spans.insert(feature.item.id.clone(), FeatureSpan { start, finish });
    }
    spans
}
