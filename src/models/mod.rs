//! Planning domain models.
//!
//! Plain data types for the planning input (backlog, teams, calendar) and
//! output (schedule, risks, event log). Algorithms live in sibling modules.
//!
//! # Domain Mappings
//!
//! | pi-planner | SAFe | Scrum | Kanban |
//! |------------|------|-------|--------|
//! | Feature | Feature/Epic | Epic | Work package |
//! | Story | User Story | Backlog item | Card |
//! | Team | Agile Release Train team | Scrum team | Service class |
//! | Sprint | Iteration | Sprint | Cadence |

mod calendar;
mod event;
mod item;
mod risk;
mod schedule;
mod team;

pub use calendar::{Sprint, SprintCalendar};
pub use event::{EventKind, EventLog, PlanningEvent};
pub use item::{Backlog, CostOfDelay, Dependency, Feature, ItemStatus, Story, WorkItem};
pub use risk::{Risk, RiskKind, Severity};
pub use schedule::{
    Assignment, DeferralReason, FeatureSpan, Schedule, SprintLookup, StoryOutcome,
};
pub use team::{CapacityOverride, Team};
