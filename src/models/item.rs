//! Work item models: features, stories, and the dependency edges between them.
//!
//! A [`Feature`] owns an ordered list of [`Story`] ids. Stories are the
//! schedulable units; features give them a shared rank, team, deadline,
//! and feature-level dependencies.
//!
//! # Reference
//! Reinertsen (2009), "The Principles of Product Development Flow", Ch. 3 (Cost of Delay)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Workflow status of a work item, as reported by the tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not started.
    #[default]
    New,
    /// In progress; plans with remaining work when known.
    Active,
    /// Finished but not yet closed.
    Resolved,
    /// Finished.
    Closed,
}

impl ItemStatus {
    /// Whether the item is finished and needs no capacity.
    pub fn is_complete(self) -> bool {
        matches!(self, ItemStatus::Resolved | ItemStatus::Closed)
    }

    /// Parses a tracker state name. Unknown names map to `None`.
    pub fn parse(state: &str) -> Option<Self> {
        match state.trim().to_ascii_lowercase().as_str() {
            "new" | "proposed" | "ready" => Some(ItemStatus::New),
            "active" | "in progress" | "committed" => Some(ItemStatus::Active),
            "resolved" => Some(ItemStatus::Resolved),
            "closed" | "done" | "removed" => Some(ItemStatus::Closed),
            _ => None,
        }
    }
}

/// Cost-of-delay components. Each is non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostOfDelay {
    /// User/business value.
    pub business_value: f64,
    /// Time criticality.
    pub time_criticality: f64,
    /// Risk reduction / opportunity enablement.
    pub risk_reduction: f64,
}

impl CostOfDelay {
    /// Creates a cost-of-delay triple.
    pub fn new(business_value: f64, time_criticality: f64, risk_reduction: f64) -> Self {
        Self {
            business_value,
            time_criticality,
            risk_reduction,
        }
    }

    /// Sum of the three components.
    pub fn total(&self) -> f64 {
        self.business_value + self.time_criticality + self.risk_reduction
    }

    fn is_valid(&self) -> bool {
        [self.business_value, self.time_criticality, self.risk_reduction]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Attributes shared by features and stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique, stable identifier.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Story-point estimate (non-negative).
    pub effort: f64,
    /// Explicit priority (higher = more important).
    pub priority: i32,
    /// Date the item should be delivered by.
    pub target_date: Option<NaiveDate>,
    /// Last sprint index the item may finish in.
    pub deadline_sprint: Option<usize>,
    /// Cost-of-delay components.
    pub cost_of_delay: CostOfDelay,
    /// Owning team id.
    pub team: Option<String>,
    /// Tracker status.
    pub status: ItemStatus,
}

impl WorkItem {
    /// Creates an item with zero effort and no scheduling metadata.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            effort: 0.0,
            priority: 0,
            target_date: None,
            deadline_sprint: None,
            cost_of_delay: CostOfDelay::default(),
            team: None,
            status: ItemStatus::New,
        }
    }

    /// Weighted Shortest Job First: cost of delay / effort.
    ///
    /// `None` when effort is zero; such items rank last on this criterion.
    pub fn wsjf(&self) -> Option<f64> {
        if self.effort > 0.0 {
            Some(self.cost_of_delay.total() / self.effort)
        } else {
            None
        }
    }

    /// Whether the target date lies strictly before `as_of`.
    pub fn is_target_overdue(&self, as_of: NaiveDate) -> bool {
        self.target_date.is_some_and(|d| d < as_of)
    }

    pub(crate) fn has_valid_effort(&self) -> bool {
        self.effort.is_finite() && self.effort >= 0.0
    }

    pub(crate) fn has_valid_cost_of_delay(&self) -> bool {
        self.cost_of_delay.is_valid()
    }
}

impl AsRef<WorkItem> for WorkItem {
    fn as_ref(&self) -> &WorkItem {
        self
    }
}

/// Builder methods shared by [`Feature`] and [`Story`].
macro_rules! work_item_builders {
    ($ty:ty) => {
        impl $ty {
            /// Sets the title.
            pub fn with_title(mut self, title: impl Into<String>) -> Self {
                self.item.title = title.into();
                self
            }

            /// Sets the effort estimate.
            pub fn with_effort(mut self, effort: f64) -> Self {
                self.item.effort = effort;
                self
            }

            /// Sets the explicit priority.
            pub fn with_priority(mut self, priority: i32) -> Self {
                self.item.priority = priority;
                self
            }

            /// Sets the target date.
            pub fn with_target_date(mut self, date: NaiveDate) -> Self {
                self.item.target_date = Some(date);
                self
            }

            /// Sets the deadline sprint index.
            pub fn with_deadline_sprint(mut self, sprint: usize) -> Self {
                self.item.deadline_sprint = Some(sprint);
                self
            }

            /// Sets the cost-of-delay components.
            pub fn with_cost_of_delay(mut self, cost_of_delay: CostOfDelay) -> Self {
                self.item.cost_of_delay = cost_of_delay;
                self
            }

            /// Sets the owning team.
            pub fn with_team(mut self, team: impl Into<String>) -> Self {
                self.item.team = Some(team.into());
                self
            }

            /// Sets the tracker status.
            pub fn with_status(mut self, status: ItemStatus) -> Self {
                self.item.status = status;
                self
            }

            /// Item id.
            pub fn id(&self) -> &str {
                &self.item.id
            }
        }

        impl AsRef<WorkItem> for $ty {
            fn as_ref(&self) -> &WorkItem {
                &self.item
            }
        }
    };
}

/// A feature: a ranked container of stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Shared attributes.
    pub item: WorkItem,
    /// Owned story ids, in backlog order.
    pub stories: Vec<String>,
    /// Features that must finish before this one starts.
    pub depends_on: Vec<String>,
    /// Earliest sprint any of this feature's stories may occupy.
    pub earliest_sprint: Option<usize>,
}

impl Feature {
    /// Creates a feature with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            item: WorkItem::new(id),
            stories: Vec::new(),
            depends_on: Vec::new(),
            earliest_sprint: None,
        }
    }

    /// Adds a feature-level predecessor.
    pub fn with_dependency(mut self, feature_id: impl Into<String>) -> Self {
        self.depends_on.push(feature_id.into());
        self
    }

    /// Sets the minimum start sprint.
    pub fn with_earliest_sprint(mut self, sprint: usize) -> Self {
        self.earliest_sprint = Some(sprint);
        self
    }
}

work_item_builders!(Feature);

/// A user story: the unit the planner assigns to sprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Shared attributes.
    pub item: WorkItem,
    /// Owning feature.
    pub feature_id: String,
    /// Remaining work for active stories.
    pub remaining_work: Option<f64>,
    /// Stories that must finish before this one starts.
    pub depends_on: Vec<String>,
    /// Whole features that must finish before this one starts.
    pub depends_on_features: Vec<String>,
}

impl Story {
    /// Creates a story owned by `feature_id`.
    pub fn new(id: impl Into<String>, feature_id: impl Into<String>) -> Self {
        Self {
            item: WorkItem::new(id),
            feature_id: feature_id.into(),
            remaining_work: None,
            depends_on: Vec::new(),
            depends_on_features: Vec::new(),
        }
    }

    /// Adds a story-level predecessor.
    pub fn with_dependency(mut self, story_id: impl Into<String>) -> Self {
        self.depends_on.push(story_id.into());
        self
    }

    /// Adds a whole-feature predecessor.
    pub fn with_feature_dependency(mut self, feature_id: impl Into<String>) -> Self {
        self.depends_on_features.push(feature_id.into());
        self
    }

    /// Sets the remaining work.
    pub fn with_remaining_work(mut self, remaining: f64) -> Self {
        self.remaining_work = Some(remaining);
        self
    }

    /// Effort the planner reserves for this story.
    ///
    /// Active stories use remaining work when it is known.
    pub fn planning_effort(&self) -> f64 {
        match (self.item.status, self.remaining_work) {
            (ItemStatus::Active, Some(remaining)) => remaining,
            _ => self.item.effort,
        }
    }
}

work_item_builders!(Story);

/// Directed edge: `to` cannot start before `from` completes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Predecessor id.
    pub from: String,
    /// Dependent id.
    pub to: String,
}

impl Dependency {
    /// Creates an edge `from → to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// The immutable input of one planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Backlog {
    /// Features in ingestion order.
    pub features: Vec<Feature>,
    /// Stories in ingestion order.
    pub stories: Vec<Story>,
}

impl Backlog {
    /// Creates an empty backlog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a feature.
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Adds a story, registering it with its feature when that feature is known.
    pub fn with_story(mut self, story: Story) -> Self {
        if let Some(feature) = self
            .features
            .iter_mut()
            .find(|f| f.item.id == story.feature_id)
        {
            if !feature.stories.contains(&story.item.id) {
                feature.stories.push(story.item.id.clone());
            }
        }
        self.stories.push(story);
        self
    }

    /// Whether the backlog holds no work.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.stories.is_empty()
    }

    /// Finds a feature by id.
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.item.id == id)
    }

    /// Finds a story by id.
    pub fn story(&self, id: &str) -> Option<&Story> {
        self.stories.iter().find(|s| s.item.id == id)
    }

    /// Stories owned by a feature, in backlog order.
    pub fn stories_of<'a>(&'a self, feature_id: &'a str) -> impl Iterator<Item = &'a Story> + 'a {
        self.stories
            .iter()
            .filter(move |s| s.feature_id == feature_id)
    }

    /// Feature-level edges.
    pub fn feature_dependencies(&self) -> Vec<Dependency> {
        self.features
            .iter()
            .flat_map(|f| {
                f.depends_on
                    .iter()
                    .map(move |pred| Dependency::new(pred.clone(), f.item.id.clone()))
            })
            .collect()
    }

    /// Story-level edges.
    pub fn story_dependencies(&self) -> Vec<Dependency> {
        self.stories
            .iter()
            .flat_map(|s| {
                s.depends_on
                    .iter()
                    .map(move |pred| Dependency::new(pred.clone(), s.item.id.clone()))
            })
            .collect()
    }

    /// Whether the item is complete (status Resolved/Closed).
    ///
    /// A feature is also complete when none of its stories is open, which
    /// includes a feature with no stories at all.
    pub fn is_complete(&self, id: &str) -> bool {
        if let Some(story) = self.story(id) {
            return story.item.status.is_complete();
        }
        match self.feature(id) {
            Some(feature) => {
                feature.item.status.is_complete()
                    || self.stories_of(id).all(|s| s.item.status.is_complete())
            }
            None => false,
        }
    }

    /// Team responsible for a story (its own, else its feature's).
    pub fn story_team<'a>(&'a self, story: &'a Story) -> Option<&'a str> {
        story.item.team.as_deref().or_else(|| {
            self.feature(&story.feature_id)
                .and_then(|f| f.item.team.as_deref())
        })
    }

    /// Target date of a story (its own, else its feature's).
    pub fn story_target_date(&self, story: &Story) -> Option<NaiveDate> {
        story.item.target_date.or_else(|| {
            self.feature(&story.feature_id)
                .and_then(|f| f.item.target_date)
        })
    }

    /// Deadline sprint of a story (its own, else its feature's).
    pub fn story_deadline_sprint(&self, story: &Story) -> Option<usize> {
        story.item.deadline_sprint.or_else(|| {
            self.feature(&story.feature_id)
                .and_then(|f| f.item.deadline_sprint)
        })
    }

    /// Features whose completion gates a story: its own feature's
    /// predecessors plus its direct feature dependencies.
    pub fn gating_features<'a>(&'a self, story: &'a Story) -> Vec<&'a str> {
        let mut gating: Vec<&str> = self
            .feature(&story.feature_id)
            .map(|f| f.depends_on.iter().map(String::as_str).collect())
            .unwrap_or_default();
        for f in &story.depends_on_features {
            if !gating.contains(&f.as_str()) {
                gating.push(f);
            }
        }
        gating
    }

    /// Every non-complete story that must finish before `story` may start:
    /// direct story predecessors plus all stories of gating features.
    pub fn expanded_predecessors(&self, story: &Story) -> Vec<String> {
        let mut preds: Vec<String> = Vec::new();
        let mut push = |id: &str| {
            if id != story.item.id && !self.is_complete(id) && !preds.iter().any(|p| p == id) {
                preds.push(id.to_string());
            }
        };
        for id in &story.depends_on {
            push(id);
        }
        for feature_id in self.gating_features(story) {
            for s in self.stories_of(feature_id) {
                push(&s.item.id);
            }
        }
        preds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_story_builder() {
        let story = Story::new("S1", "F1")
            .with_title("Login form")
            .with_effort(5.0)
            .with_priority(3)
            .with_target_date(date(2025, 3, 1))
            .with_deadline_sprint(2)
            .with_team("alpha")
            .with_dependency("S0");

        assert_eq!(story.id(), "S1");
        assert_eq!(story.feature_id, "F1");
        assert_eq!(story.item.title, "Login form");
        assert_eq!(story.item.priority, 3);
        assert_eq!(story.item.deadline_sprint, Some(2));
        assert_eq!(story.item.team.as_deref(), Some("alpha"));
        assert_eq!(story.depends_on, vec!["S0".to_string()]);
    }

    #[test]
    fn test_wsjf() {
        let item = Feature::new("F1")
            .with_effort(4.0)
            .with_cost_of_delay(CostOfDelay::new(5.0, 2.0, 1.0));
        assert_eq!(item.item.wsjf(), Some(2.0));

        let zero = Feature::new("F2").with_cost_of_delay(CostOfDelay::new(5.0, 0.0, 0.0));
        assert_eq!(zero.item.wsjf(), None);
    }

    #[test]
    fn test_planning_effort_uses_remaining_work_when_active() {
        let active = Story::new("S1", "F1")
            .with_effort(8.0)
            .with_remaining_work(3.0)
            .with_status(ItemStatus::Active);
        assert_eq!(active.planning_effort(), 3.0);

        let new = Story::new("S2", "F1").with_effort(8.0).with_remaining_work(3.0);
        assert_eq!(new.planning_effort(), 8.0);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ItemStatus::parse("Active"), Some(ItemStatus::Active));
        assert_eq!(ItemStatus::parse(" done "), Some(ItemStatus::Closed));
        assert_eq!(ItemStatus::parse("weird"), None);
        assert!(ItemStatus::Resolved.is_complete());
        assert!(!ItemStatus::New.is_complete());
    }

    #[test]
    fn test_backlog_registers_stories() {
        let backlog = Backlog::new()
            .with_feature(Feature::new("F1"))
            .with_story(Story::new("S1", "F1"))
            .with_story(Story::new("S2", "F1"));

        assert_eq!(backlog.feature("F1").unwrap().stories, vec!["S1", "S2"]);
        assert_eq!(backlog.stories_of("F1").count(), 2);
    }

    #[test]
    fn test_inheritance_from_feature() {
        let backlog = Backlog::new()
            .with_feature(
                Feature::new("F1")
                    .with_team("alpha")
                    .with_target_date(date(2025, 2, 1))
                    .with_deadline_sprint(1),
            )
            .with_story(Story::new("S1", "F1"))
            .with_story(Story::new("S2", "F1").with_team("beta").with_deadline_sprint(3));

        let s1 = backlog.story("S1").unwrap();
        let s2 = backlog.story("S2").unwrap();
        assert_eq!(backlog.story_team(s1), Some("alpha"));
        assert_eq!(backlog.story_team(s2), Some("beta"));
        assert_eq!(backlog.story_target_date(s1), Some(date(2025, 2, 1)));
        assert_eq!(backlog.story_deadline_sprint(s2), Some(3));
    }

    #[test]
    fn test_expanded_predecessors() {
        let backlog = Backlog::new()
            .with_feature(Feature::new("F1"))
            .with_feature(Feature::new("F2").with_dependency("F1"))
            .with_story(Story::new("A", "F1"))
            .with_story(Story::new("B", "F1").with_status(ItemStatus::Closed))
            .with_story(Story::new("C", "F2").with_dependency("X"))
            .with_story(Story::new("X", "F2"));

        let c = backlog.story("C").unwrap();
        // X direct, A via F1; B is complete
        assert_eq!(backlog.expanded_predecessors(c), vec!["X", "A"]);
        assert_eq!(
            backlog.feature_dependencies(),
            vec![Dependency::new("F1", "F2")]
        );
        assert_eq!(backlog.story_dependencies(), vec![Dependency::new("X", "C")]);
    }

    #[test]
    fn test_feature_complete_when_all_stories_complete() {
        let backlog = Backlog::new()
            .with_feature(Feature::new("F1"))
            .with_feature(Feature::new("F2"))
            .with_story(Story::new("A", "F1").with_status(ItemStatus::Closed))
            .with_story(Story::new("B", "F1").with_status(ItemStatus::Resolved));

        assert!(backlog.is_complete("F1"));
        assert!(backlog.is_complete("F2")); // nothing left open
        assert!(backlog.is_complete("A"));
        assert!(!backlog.is_complete("missing"));

        let backlog = backlog.with_story(Story::new("C", "F2"));
        assert!(!backlog.is_complete("F2"));
    }
}
