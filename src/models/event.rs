//! Planning event log.
//!
//! The planner appends one event per decision. The log is returned with the
//! run and read afterwards by reporting collaborators; it is never mutated
//! once the run ends. Events are ordered by a sequence ordinal rather than
//! wall-clock time so identical runs produce identical logs.

use serde::{Deserialize, Serialize};

use super::DeferralReason;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A run began.
    RunStarted {
        /// Strategy name.
        strategy: String,
        /// Stories to plan.
        stories: usize,
        /// Sprints in the calendar.
        sprints: usize,
    },
    /// A pass over pending stories began.
    PassStarted {
        /// 1-based pass number.
        pass: usize,
        /// Stories considered in this pass.
        pending: usize,
    },
    /// A story is being considered.
    StoryConsidered {
        /// Story id.
        story: String,
        /// Team id, if resolved.
        team: Option<String>,
        /// Effort to reserve.
        effort: f64,
    },
    /// A reservation attempt failed for lack of capacity.
    CapacityRejected {
        /// Story id.
        story: String,
        /// Team id.
        team: String,
        /// Sprint index.
        sprint: usize,
        /// Effort requested.
        requested: f64,
        /// Capacity remaining.
        remaining: f64,
    },
    /// A story was placed.
    StoryScheduled {
        /// Story id.
        story: String,
        /// Team id.
        team: String,
        /// Sprint index.
        sprint: usize,
        /// Effort reserved.
        effort: f64,
    },
    /// A story could not be placed; terminal for this run.
    StoryDeferred {
        /// Story id.
        story: String,
        /// Cause.
        reason: DeferralReason,
    },
    /// A story waits for predecessors and will be retried next pass.
    StoryWaiting {
        /// Story id.
        story: String,
        /// Unscheduled predecessors.
        waiting_on: Vec<String>,
    },
    /// A story stays blocked at the end of the run.
    StoryBlocked {
        /// Story id.
        story: String,
        /// Unscheduled predecessors.
        waiting_on: Vec<String>,
    },
    /// The run finished.
    RunCompleted {
        /// Passes performed.
        passes: usize,
        /// Scheduled stories.
        scheduled: usize,
        /// Deferred stories.
        deferred: usize,
        /// Blocked stories.
        blocked: usize,
    },
}

/// One log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningEvent {
    /// Position in the log, starting at 0.
    pub seq: u64,
    /// Event payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Append-only event sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<PlanningEvent>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event, assigning the next ordinal.
    pub fn push(&mut self, kind: EventKind) -> &PlanningEvent {
        let seq = self.events.len() as u64;
        self.events.push(PlanningEvent { seq, kind });
        &self.events[self.events.len() - 1]
    }

    /// All events in order.
    pub fn events(&self) -> &[PlanningEvent] {
        &self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over events.
    pub fn iter(&self) -> std::slice::Iter<'_, PlanningEvent> {
        self.events.iter()
    }

    /// Events concerning one story.
    pub fn for_story<'a>(&'a self, story_id: &'a str) -> impl Iterator<Item = &'a PlanningEvent> + 'a {
        self.events.iter().filter(move |e| match &e.kind {
            EventKind::StoryConsidered { story, .. }
            | EventKind::CapacityRejected { story, .. }
            | EventKind::StoryScheduled { story, .. }
            | EventKind::StoryDeferred { story, .. }
            | EventKind::StoryWaiting { story, .. }
            | EventKind::StoryBlocked { story, .. } => story == story_id,
            _ => false,
        })
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a PlanningEvent;
    type IntoIter = std::slice::Iter<'a, PlanningEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_ordinals() {
        let mut log = EventLog::new();
        log.push(EventKind::PassStarted {
            pass: 1,
            pending: 2,
        });
        let e = log.push(EventKind::StoryDeferred {
            story: "S1".into(),
            reason: DeferralReason::NoCapacity,
        });
        assert_eq!(e.seq, 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0].seq, 0);
    }

    #[test]
    fn test_for_story() {
        let mut log = EventLog::new();
        log.push(EventKind::StoryConsidered {
            story: "S1".into(),
            team: Some("alpha".into()),
            effort: 3.0,
        });
        log.push(EventKind::StoryConsidered {
            story: "S2".into(),
            team: None,
            effort: 1.0,
        });
        log.push(EventKind::StoryScheduled {
            story: "S1".into(),
            team: "alpha".into(),
            sprint: 0,
            effort: 3.0,
        });
        assert_eq!(log.for_story("S1").count(), 2);
        assert_eq!(log.for_story("S3").count(), 0);
    }

    #[test]
    fn test_serializes_flat() {
        let mut log = EventLog::new();
        log.push(EventKind::StoryDeferred {
            story: "S1".into(),
            reason: DeferralReason::NoTeam,
        });
        let json = serde_json::to_string(&log.events()[0]).unwrap();
        assert_eq!(
            json,
            r#"{"seq":0,"kind":"story_deferred","story":"S1","reason":"no_team"}"#
        );
    }
}
