//! Sprint planner and scheduling strategies.
//!
//! Assigns stories to sprints across teams with bounded capacity.
//!
//! # Algorithm
//!
//! [`Planner`] is a greedy, priority-ordered heuristic. It is not optimal,
//! but it is deterministic: identical inputs give identical schedules and
//! identical event logs.
//!
//! # Strategies
//!
//! | Strategy | Order | Sprint choice |
//! |----------|-------|---------------|
//! | [`StandardStrategy`] | Priority | Earliest sprint with room |
//! | [`DependencyAwareStrategy`] | Topological, priority-broken | Earliest sprint with room after every predecessor |
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Leffingwell (2011), "Agile Software Requirements", Ch. 15 (PI planning)

mod engine;
mod strategy;
mod summary;

pub use engine::{PlanRun, Planner};
pub use strategy::{
    DependencyAwareStrategy, Proposal, SchedulingStrategy, StandardStrategy, StrategyContext,
    StrategyKind,
};
pub use summary::{PlanSummary, SlotUtilization};
