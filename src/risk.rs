//! Risk detection over a finished schedule.
//!
//! A pure pass: it reads the schedule, the backlog, and the ledger, and
//! produces a fresh list of [`Risk`]s. Checks are independent of each
//! other, so one story may carry several risks.
//!
//! # Checks
//!
//! | Kind | Severity |
//! |------|----------|
//! | Overdue | 1 sprint late: low, 2: medium, 3+ or never placed: high |
//! | CapacityOverflow | over by more than 20%: critical, else high |
//! | BrokenDependency | same sprint: medium, later or unplaced: high |
//! | CrossTeamDependency | low |
//! | UnplannedFeature | medium |

use std::collections::BTreeSet;

use tracing::info;

use crate::ledger::CapacityLedger;
use chrono::NaiveDate;

use crate::models::{
    Backlog, Feature, Risk, RiskKind, Schedule, Severity, SprintCalendar, SprintLookup, Story,
    StoryOutcome,
};
use crate::planner::PlanRun;

const EPSILON: f64 = 1e-9;

/// Overcommit ratio above which an overflow is critical.
const CRITICAL_OVERCOMMIT: f64 = 0.2;

/// Stateless risk analyzer.
#[derive(Debug, Clone)]
pub struct RiskDetector {
    calendar: SprintCalendar,
}

impl RiskDetector {
    /// Creates a detector for schedules over `calendar`.
    pub fn new(calendar: SprintCalendar) -> Self {
        Self { calendar }
    }

    /// Analyzes a plan run.
    pub fn analyze_run(&self, run: &PlanRun, backlog: &Backlog) -> Vec<Risk> {
        self.analyze(&run.schedule, backlog, &run.ledger)
    }

    /// Runs every check. Output is ordered by check, then backlog order.
    pub fn analyze(
        &self,
        schedule: &Schedule,
        backlog: &Backlog,
        ledger: &CapacityLedger,
    ) -> Vec<Risk> {
        let mut risks = Vec::new();
        risks.extend(self.overdue(schedule, backlog));
        risks.extend(capacity_overflow(schedule, ledger));
        risks.extend(broken_dependencies(schedule, backlog));
        risks.extend(cross_team_dependencies(schedule, backlog));
        risks.extend(unplanned_features(schedule, backlog));

        info!(
            event = "risk_pass",
            risks = risks.len(),
            high = risks.iter().filter(|r| r.severity >= Severity::High).count(),
        );
        risks
    }

    /// Stories and features delivered late, or not at all within their
    /// deadline. Stories come first, then features, each in backlog order.
    pub fn overdue(&self, schedule: &Schedule, backlog: &Backlog) -> Vec<Risk> {
        let stories = backlog
            .stories
            .iter()
            .filter(|s| !s.item.status.is_complete())
            .filter_map(|story| self.story_overdue(story, schedule, backlog));
        let features = backlog
            .features
            .iter()
            .filter(|f| !backlog.is_complete(f.id()))
            .filter_map(|feature| self.feature_overdue(feature, schedule, backlog));
        stories.chain(features).collect()
    }

    fn story_overdue(&self, story: &Story, schedule: &Schedule, backlog: &Backlog) -> Option<Risk> {
        let target = backlog.story_target_date(story);
        let deadline = backlog.story_deadline_sprint(story);
        let id = story.id();

        let (severity, description) = match schedule.outcome(id)? {
            StoryOutcome::Scheduled { sprint, .. } => {
                let gap = self.sprints_late(*sprint, target, deadline)?;
                (
                    Severity::from_sprint_gap(gap),
                    format!(
                        "Story '{id}' finishes in sprint {} ({gap} sprint(s) late)",
                        sprint + 1
                    ),
                )
            }
            StoryOutcome::Deferred { .. } | StoryOutcome::Blocked { .. } => {
                if !self.due_within_plan(target, deadline) {
                    return None;
                }
                (
                    Severity::High,
                    format!("Story '{id}' is not scheduled but is due within the plan"),
                )
            }
        };

        Some(overdue_risk(id, severity, description))
    }

    /// Checks a feature against its own target date and deadline sprint.
    ///
    /// The feature finishes with its last open story; it has no finish while
    /// any open story is unplaced.
    fn feature_overdue(
        &self,
        feature: &Feature,
        schedule: &Schedule,
        backlog: &Backlog,
    ) -> Option<Risk> {
        let target = feature.item.target_date;
        let deadline = feature.item.deadline_sprint;
        if target.is_none() && deadline.is_none() {
            return None;
        }
        let id = feature.id();

        let finish = backlog
            .stories_of(id)
            .filter(|s| !s.item.status.is_complete())
            .map(|s| schedule.outcome(s.id()).and_then(StoryOutcome::sprint))
            .try_fold(None, |latest: Option<usize>, sprint| {
                sprint.map(|s| Some(latest.map_or(s, |l| l.max(s))))
            });

        let (severity, description) = match finish {
            Some(Some(sprint)) => {
                let gap = self.sprints_late(sprint, target, deadline)?;
                (
                    Severity::from_sprint_gap(gap),
                    format!(
                        "Feature '{id}' finishes in sprint {} ({gap} sprint(s) late)",
                        sprint + 1
                    ),
                )
            }
            // no open stories
            Some(None) => return None,
            None => {
                if !self.due_within_plan(target, deadline) {
                    return None;
                }
                (
                    Severity::High,
                    format!("Feature '{id}' has unscheduled stories but is due within the plan"),
                )
            }
        };

        Some(overdue_risk(id, severity, description))
    }

    /// Sprints by which finishing in `sprint` misses the target date or the
    /// deadline sprint, whichever is worse. `None` when on time.
    fn sprints_late(
        &self,
        sprint: usize,
        target: Option<NaiveDate>,
        deadline: Option<usize>,
    ) -> Option<usize> {
        let sprint_end = self.calendar.sprint_end(sprint)?;
        let date_gap = target
            .filter(|t| sprint_end > *t)
            .map(|t| self.calendar.sprints_late(t, sprint_end))
            .unwrap_or(0);
        let deadline_gap = deadline.map(|d| sprint.saturating_sub(d)).unwrap_or(0);
        let gap = date_gap.max(deadline_gap);
        (gap > 0).then_some(gap)
    }

    fn due_within_plan(&self, target: Option<NaiveDate>, deadline: Option<usize>) -> bool {
        let deadline_inside = deadline.is_some_and(|d| d < self.calendar.count);
        let target_inside = match (target, self.calendar.end()) {
            (Some(t), Some(end)) => t <= end,
            _ => false,
        };
        deadline_inside || target_inside
    }
}

fn overdue_risk(id: &str, severity: Severity, description: String) -> Risk {
    Risk::new(
        format!("overdue:{id}"),
        RiskKind::Overdue,
        severity,
        vec![id.to_string()],
        description,
    )
}

/// Slots reserved beyond their total, by ledger or by assignments.
///
/// The affected items are the stories assigned to the slot.
pub fn capacity_overflow(schedule: &Schedule, ledger: &CapacityLedger) -> Vec<Risk> {
    let load = schedule.load_by_team_sprint();
    let mut slots: BTreeSet<(String, usize)> = load.keys().cloned().collect();
    slots.extend(ledger.entries().map(|(team, sprint, _)| (team.to_string(), sprint)));

    slots
        .into_iter()
        .filter_map(|(team, sprint)| {
            let entry = ledger.entry(&team, sprint);
            let total = entry.map(|e| e.total).unwrap_or(0.0);
            let assigned = load.get(&(team.clone(), sprint)).copied().unwrap_or(0.0);
            let reserved = entry.map(|e| e.reserved).unwrap_or(0.0).max(assigned);
            if reserved <= total + EPSILON {
                return None;
            }
            let severity = if total <= EPSILON || reserved / total - 1.0 > CRITICAL_OVERCOMMIT {
                Severity::Critical
            } else {
                Severity::High
            };
            let stories = schedule
                .assignments_in(&team, sprint)
                .into_iter()
                .map(|a| a.story_id.clone())
                .collect();
            Some(Risk::new(
                format!("capacity:{team}:{sprint}"),
                RiskKind::CapacityOverflow,
                severity,
                stories,
                format!(
                    "Team '{team}' sprint {} holds {reserved} against capacity {total}",
                    sprint + 1
                ),
            ))
        })
        .collect()
}

/// Dependency edges the schedule does not honor, in both layers and
/// across them.
pub fn broken_dependencies(schedule: &Schedule, backlog: &Backlog) -> Vec<Risk> {
    let mut edges: Vec<(String, String)> = backlog
        .feature_dependencies()
        .into_iter()
        .chain(backlog.story_dependencies())
        .map(|d| (d.from, d.to))
        .collect();
    for story in &backlog.stories {
        for feature in &story.depends_on_features {
            edges.push((feature.clone(), story.item.id.clone()));
        }
    }

    edges
        .into_iter()
        .filter_map(|(from, to)| {
            let severity = edge_violation(schedule, &from, &to)?;
            let description = match schedule.finish_sprint(&from) {
                Some(finish) => format!(
                    "'{to}' starts before '{from}' finishes (sprint {})",
                    finish + 1
                ),
                None => format!("'{to}' is scheduled but its predecessor '{from}' is not"),
            };
            Some(Risk::new(
                format!("dependency:{from}:{to}"),
                RiskKind::BrokenDependency,
                severity,
                vec![from, to],
                description,
            ))
        })
        .collect()
}

fn edge_violation<L: SprintLookup>(lookup: &L, from: &str, to: &str) -> Option<Severity> {
    if lookup.is_complete(from) || lookup.is_complete(to) {
        return None;
    }
    let start = lookup.start_sprint(to)?;
    match lookup.finish_sprint(from) {
        None => Some(Severity::High),
        Some(finish) if finish > start => Some(Severity::High),
        Some(finish) if finish == start => Some(Severity::Medium),
        Some(_) => None,
    }
}

/// Story edges whose endpoints are scheduled on different teams.
pub fn cross_team_dependencies(schedule: &Schedule, backlog: &Backlog) -> Vec<Risk> {
    backlog
        .story_dependencies()
        .into_iter()
        .filter_map(|d| {
            let from = schedule.assignment_for_story(&d.from)?;
            let to = schedule.assignment_for_story(&d.to)?;
            if from.team_id == to.team_id {
                return None;
            }
            Some(Risk::new(
                format!("cross_team:{}:{}", d.from, d.to),
                RiskKind::CrossTeamDependency,
                Severity::Low,
                vec![d.from.clone(), d.to.clone()],
                format!(
                    "'{}' ({}) depends on '{}' ({})",
                    d.to, to.team_id, d.from, from.team_id
                ),
            ))
        })
        .collect()
}

/// Features with open stories and nothing scheduled.
pub fn unplanned_features(schedule: &Schedule, backlog: &Backlog) -> Vec<Risk> {
    backlog
        .features
        .iter()
        .filter(|f| {
            let mut open = backlog
                .stories_of(f.id())
                .filter(|s| !s.item.status.is_complete())
                .peekable();
            open.peek().is_some()
                && !open.any(|s| schedule.outcome(s.id()).is_some_and(StoryOutcome::is_scheduled))
        })
        .map(|f| {
            Risk::new(
                format!("unplanned:{}", f.id()),
                RiskKind::UnplannedFeature,
                Severity::Medium,
                vec![f.item.id.clone()],
                format!("Feature '{}' has open stories but none is scheduled", f.id()),
            )
        })
        .collect()
}
