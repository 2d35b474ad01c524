//! Built-in priority rules.
//!
//! # Categories
//!
//! - **Urgency**: OVERDUE, DEADLINE
//! - **Economic**: WSJF, COD
//! - **Explicit**: PRIORITY
//!
//! # Score Convention
//! All rules return lower scores for higher priority items.

use super::{PriorityRule, RankingContext, RuleScore};
use crate::models::WorkItem;

/// Overdue target date first.
///
/// Scores 0 for items whose target date lies before the context date,
/// 1 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct OverdueTarget;

impl PriorityRule for OverdueTarget {
    fn name(&self) -> &'static str {
        "OVERDUE"
    }

    fn evaluate(&self, item: &WorkItem, context: &RankingContext) -> RuleScore {
        match context.as_of {
            Some(as_of) if item.is_target_overdue(as_of) => 0.0,
            _ => 1.0,
        }
    }

    fn description(&self) -> &'static str {
        "Overdue Target Date"
    }
}

/// Earliest deadline sprint.
///
/// Items without a deadline sprint rank last.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineSprint;

impl PriorityRule for DeadlineSprint {
    fn name(&self) -> &'static str {
        "DEADLINE"
    }

    fn evaluate(&self, item: &WorkItem, _context: &RankingContext) -> RuleScore {
        item.deadline_sprint.map(|s| s as f64).unwrap_or(f64::MAX)
    }

    fn description(&self) -> &'static str {
        "Earliest Deadline Sprint"
    }
}

/// Weighted Shortest Job First.
///
/// Cost of delay divided by effort, highest first. Zero-effort items have
/// no WSJF and rank last.
///
/// # Reference
/// Reinertsen (2009), "The Principles of Product Development Flow", Ch. 16
#[derive(Debug, Clone, Copy)]
pub struct Wsjf;

impl PriorityRule for Wsjf {
    fn name(&self) -> &'static str {
        "WSJF"
    }

    fn evaluate(&self, item: &WorkItem, _context: &RankingContext) -> RuleScore {
        item.wsjf().map(|w| -w).unwrap_or(f64::MAX)
    }

    fn description(&self) -> &'static str {
        "Weighted Shortest Job First"
    }
}

/// Highest cost of delay.
#[derive(Debug, Clone, Copy)]
pub struct CostOfDelayRule;

impl PriorityRule for CostOfDelayRule {
    fn name(&self) -> &'static str {
        "COD"
    }

    fn evaluate(&self, item: &WorkItem, _context: &RankingContext) -> RuleScore {
        -item.cost_of_delay.total()
    }

    fn description(&self) -> &'static str {
        "Cost of Delay"
    }
}

/// Explicit priority.
///
/// Prioritizes items with higher `priority` values.
/// (Negated because lower score = higher priority in convention.)
#[derive(Debug, Clone, Copy)]
pub struct ExplicitPriority;

impl PriorityRule for ExplicitPriority {
    fn name(&self) -> &'static str {
        "PRIORITY"
    }

    fn evaluate(&self, item: &WorkItem, _context: &RankingContext) -> RuleScore {
        -(item.priority as f64)
    }

    fn description(&self) -> &'static str {
        "Explicit Priority"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CostOfDelay;
    use chrono::NaiveDate;

    fn make_item(id: &str, effort: f64, cod: f64) -> WorkItem {
        let mut item = WorkItem::new(id);
        item.effort = effort;
        item.cost_of_delay = CostOfDelay::new(cod, 0.0, 0.0);
        item
    }

    #[test]
    fn test_overdue_target() {
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let ctx = RankingContext::as_of(as_of);
        let mut late = make_item("A", 1.0, 0.0);
        late.target_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        let mut on_day = make_item("B", 1.0, 0.0);
        on_day.target_date = Some(as_of);

        assert_eq!(OverdueTarget.evaluate(&late, &ctx), 0.0);
        assert_eq!(OverdueTarget.evaluate(&on_day, &ctx), 1.0);
        assert_eq!(OverdueTarget.evaluate(&late, &RankingContext::default()), 1.0);
    }

    #[test]
    fn test_deadline_missing_ranks_last() {
        let ctx = RankingContext::default();
        let mut due = make_item("A", 1.0, 0.0);
        due.deadline_sprint = Some(4);
        let open = make_item("B", 1.0, 0.0);

        assert!(DeadlineSprint.evaluate(&due, &ctx) < DeadlineSprint.evaluate(&open, &ctx));
    }

    #[test]
    fn test_wsjf_scores() {
        let ctx = RankingContext::default();
        let dense = make_item("A", 2.0, 10.0);
        let sparse = make_item("B", 10.0, 10.0);
        let zero = make_item("C", 0.0, 100.0);

        assert_eq!(Wsjf.evaluate(&dense, &ctx), -5.0);
        assert!(Wsjf.evaluate(&dense, &ctx) < Wsjf.evaluate(&sparse, &ctx));
        assert_eq!(Wsjf.evaluate(&zero, &ctx), f64::MAX);
    }

    #[test]
    fn test_cost_of_delay_and_priority() {
        let ctx = RankingContext::default();
        let mut item = make_item("A", 1.0, 7.0);
        item.priority = 3;

        assert_eq!(CostOfDelayRule.evaluate(&item, &ctx), -7.0);
        assert_eq!(ExplicitPriority.evaluate(&item, &ctx), -3.0);
    }
}
