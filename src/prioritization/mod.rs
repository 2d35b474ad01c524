//! Priority rules and the ranking engine for work items.
//!
//! Ranks features and stories by deadline urgency, WSJF, cost of delay,
//! and explicit priority, with a final deterministic tie-break by id.
//!
//! # Usage
//!
//! ```
//! use pi_planner::prioritization::{Prioritizer, RankingContext};
//! use pi_planner::models::Feature;
//!
//! let features = vec![Feature::new("F2"), Feature::new("F1")];
//! let ranked = Prioritizer::standard().rank_ids(&features, &RankingContext::default());
//! assert_eq!(ranked, vec!["F1", "F2"]);
//! ```
//!
//! # References
//!
//! - Reinertsen (2009), "The Principles of Product Development Flow", Ch. 3
//! - Leffingwell (2011), "Agile Software Requirements", Ch. 23 (WSJF)

mod context;
mod engine;
pub mod rules;

pub use context::RankingContext;
pub use engine::Prioritizer;

use crate::models::WorkItem;
use std::fmt::Debug;

/// Score returned by a priority rule.
///
/// Lower scores = higher priority (ranked first).
pub type RuleScore = f64;

/// A rule that scores a work item.
///
/// # Score Convention
/// **Lower score = higher priority.** Rules return smaller values for items
/// that should be planned first.
pub trait PriorityRule: Send + Sync + Debug {
    /// Rule name (e.g., "WSJF").
    fn name(&self) -> &'static str;

    /// Scores an item. Lower = higher priority.
    fn evaluate(&self, item: &WorkItem, context: &RankingContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
