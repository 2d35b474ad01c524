//! Sequential rule engine for ranking work items.
//!
//! Rules are applied in order; a later rule is consulted only when every
//! earlier rule ties. Items still tied after the last rule are ordered by
//! ascending id, so the ranking is total and reproducible.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::rules::{CostOfDelayRule, DeadlineSprint, ExplicitPriority, OverdueTarget, Wsjf};
use super::{PriorityRule, RankingContext, RuleScore};
use crate::models::WorkItem;

/// A composable ranking engine.
///
/// # Example
/// ```
/// use pi_planner::prioritization::{rules, Prioritizer};
///
/// let prioritizer = Prioritizer::new()
///     .with_rule(rules::Wsjf)
///     .with_rule(rules::ExplicitPriority);
/// assert_eq!(prioritizer.rule_names(), vec!["WSJF", "PRIORITY"]);
/// ```
#[derive(Clone)]
pub struct Prioritizer {
    rules: Vec<Arc<dyn PriorityRule>>,
    epsilon: f64,
}

impl Prioritizer {
    /// Creates an engine with no rules (pure id order).
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            epsilon: 1e-9,
        }
    }

    /// The standard ranking: overdue target, deadline sprint, WSJF,
    /// cost of delay, explicit priority.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(OverdueTarget)
            .with_rule(DeadlineSprint)
            .with_rule(Wsjf)
            .with_rule(CostOfDelayRule)
            .with_rule(ExplicitPriority)
    }

    /// Appends a rule.
    pub fn with_rule<R: PriorityRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Sorts items by priority (highest priority first).
    ///
    /// Returns indices into the original slice. The sort is stable.
    pub fn rank<T: AsRef<WorkItem>>(&self, items: &[T], context: &RankingContext) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..items.len()).collect();
        indices.sort_by(|&a, &b| self.compare(items[a].as_ref(), items[b].as_ref(), context));
        indices
    }

    /// Item ids in rank order.
    pub fn rank_ids<T: AsRef<WorkItem>>(&self, items: &[T], context: &RankingContext) -> Vec<String> {
        self.rank(items, context)
            .into_iter()
            .map(|i| items[i].as_ref().id.clone())
            .collect()
    }

    /// Evaluates a single item and returns the score from each rule.
    pub fn evaluate(&self, item: &WorkItem, context: &RankingContext) -> Vec<RuleScore> {
        self.rules.iter().map(|r| r.evaluate(item, context)).collect()
    }

    /// Total order: `Less` means `a` ranks ahead of `b`.
    pub fn compare(&self, a: &WorkItem, b: &WorkItem, context: &RankingContext) -> Ordering {
        for rule in &self.rules {
            let key_a = self.tie_key(rule.evaluate(a, context));
            let key_b = self.tie_key(rule.evaluate(b, context));

            match key_a.total_cmp(&key_b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        // All rules tied → deterministic by id
        a.id.cmp(&b.id)
    }
}

impl Prioritizer {
    /// Snaps a score onto the epsilon grid so that ties are transitive.
    fn tie_key(&self, score: RuleScore) -> f64 {
        // + 0.0 folds -0.0 into 0.0
        (score / self.epsilon).round() + 0.0
    }
}

impl Default for Prioritizer {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Prioritizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prioritizer")
            .field("rules", &self.rule_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CostOfDelay, Feature, Story};
    use chrono::NaiveDate;

    fn make_story(id: &str, effort: f64, value: f64, priority: i32) -> Story {
        Story::new(id, "F")
            .with_effort(effort)
            .with_cost_of_delay(CostOfDelay::new(value, 0.0, 0.0))
            .with_priority(priority)
    }

    #[test]
    fn test_wsjf_ordering() {
        let stories = vec![
            make_story("low", 10.0, 10.0, 0),
            make_story("high", 1.0, 10.0, 0),
            make_story("mid", 5.0, 10.0, 0),
        ];
        let ranked = Prioritizer::standard().rank_ids(&stories, &RankingContext::default());
        assert_eq!(ranked, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_deadline_beats_wsjf() {
        let stories = vec![
            make_story("valuable", 1.0, 50.0, 0),
            make_story("due", 8.0, 1.0, 0).with_deadline_sprint(1),
        ];
        let ranked = Prioritizer::standard().rank_ids(&stories, &RankingContext::default());
        assert_eq!(ranked, vec!["due", "valuable"]);
    }

    #[test]
    fn test_overdue_beats_deadline() {
        let as_of = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let stories = vec![
            make_story("due", 1.0, 1.0, 0).with_deadline_sprint(0),
            make_story("late", 1.0, 1.0, 0)
                .with_target_date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
        ];
        let ranked = Prioritizer::standard().rank_ids(&stories, &RankingContext::as_of(as_of));
        assert_eq!(ranked, vec!["late", "due"]);
    }

    #[test]
    fn test_identical_keys_break_by_id() {
        let stories = vec![
            make_story("S3", 2.0, 4.0, 1),
            make_story("S1", 2.0, 4.0, 1),
            make_story("S2", 2.0, 4.0, 1),
        ];
        let ranked = Prioritizer::standard().rank_ids(&stories, &RankingContext::default());
        assert_eq!(ranked, vec!["S1", "S2", "S3"]);
    }

    #[test]
    fn test_priority_after_cost_of_delay() {
        // Same WSJF, different cost of delay: cost of delay wins over priority.
        let stories = vec![
            make_story("A", 1.0, 2.0, 9),
            make_story("B", 2.0, 4.0, 0),
        ];
        let ranked = Prioritizer::standard().rank_ids(&stories, &RankingContext::default());
        assert_eq!(ranked, vec!["B", "A"]);

        let stories = vec![make_story("A", 1.0, 2.0, 0), make_story("B", 1.0, 2.0, 5)];
        let ranked = Prioritizer::standard().rank_ids(&stories, &RankingContext::default());
        assert_eq!(ranked, vec!["B", "A"]);
    }

    #[test]
    fn test_rank_indices_and_features() {
        let features = vec![
            Feature::new("F2").with_effort(1.0).with_cost_of_delay(CostOfDelay::new(1.0, 0.0, 0.0)),
            Feature::new("F1").with_effort(1.0).with_cost_of_delay(CostOfDelay::new(3.0, 0.0, 0.0)),
        ];
        let ctx = RankingContext::default();
        let p = Prioritizer::standard();
        assert_eq!(p.rank(&features, &ctx), vec![1, 0]);
        assert_eq!(
            p.compare(&features[1].item, &features[0].item, &ctx),
            Ordering::Less
        );
        assert_eq!(p.evaluate(&features[1].item, &ctx).len(), 5);
    }

    #[derive(Debug)]
    struct FixedScore;

    impl PriorityRule for FixedScore {
        fn name(&self) -> &'static str {
            "FIXED"
        }

        fn evaluate(&self, item: &WorkItem, _context: &RankingContext) -> RuleScore {
            match item.id.as_str() {
                "A" => 1.2e-9,
                "B" => 0.6e-9,
                _ => 0.0,
            }
        }
    }

    #[test]
    fn test_near_ties_form_a_total_order() {
        let stories = vec![
            make_story("A", 1.0, 1.0, 0),
            make_story("B", 1.0, 1.0, 0),
            make_story("C", 1.0, 1.0, 0),
        ];
        let ctx = RankingContext::default();
        let p = Prioritizer::new().with_rule(FixedScore);
        let (a, b, c) = (&stories[0].item, &stories[1].item, &stories[2].item);

        // A and B share a grid cell; C sits one cell lower.
        assert_eq!(p.compare(a, b, &ctx), Ordering::Less);
        assert_eq!(p.compare(b, c, &ctx), Ordering::Greater);
        assert_eq!(p.compare(a, c, &ctx), Ordering::Greater);
        assert_eq!(p.rank_ids(&stories, &ctx), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_empty() {
        let stories: Vec<Story> = Vec::new();
        assert!(Prioritizer::standard()
            .rank(&stories, &RankingContext::default())
            .is_empty());
        assert_eq!(format!("{:?}", Prioritizer::new()), "Prioritizer { rules: [] }");
    }
}
