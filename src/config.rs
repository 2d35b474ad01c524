//! Planning configuration.
//!
//! Load the calendar, team roster, strategy, and tracker field mapping
//! from TOML or YAML so a plan can be re-run without code changes.
//!
//! # Examples
//!
//! ```
//! use pi_planner::config::PlanningConfig;
//! use pi_planner::planner::StrategyKind;
//!
//! let config = PlanningConfig::from_toml_str(r#"
//!     strategy = "standard"
//!     capacity_buffer = 0.2
//!
//!     [sprints]
//!     count = 6
//!     length_days = 14
//!     start = "2025-01-06"
//!
//!     [[teams]]
//!     id = "alpha"
//!     default_capacity = 30.0
//!     overrides = [{ sprint = 5, capacity = 10.0 }]
//! "#).unwrap();
//!
//! assert_eq!(config.strategy, StrategyKind::Standard);
//! assert_eq!(config.teams()[0].capacity_for(5), 10.0);
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{CapacityOverride, CostOfDelay, ItemStatus, SprintCalendar, Story, Team};
use crate::planner::{Planner, StrategyKind};
use crate::source::SourceError;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level planning configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PlanningConfig {
    /// Active scheduling strategy.
    pub strategy: StrategyKind,

    /// Scan window length in sprints; defaults to the sprint count.
    pub horizon: Option<usize>,

    /// Fraction of every team's capacity withheld from planning.
    pub capacity_buffer: f64,

    /// Date target dates are judged against; defaults to the first sprint's start.
    pub as_of: Option<NaiveDate>,

    /// Sprint calendar.
    pub sprints: SprintSettings,

    /// Team roster.
    pub teams: Vec<TeamSettings>,

    /// Tracker field names.
    pub field_mapping: FieldMapping,
}

/// Sprint calendar settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintSettings {
    /// Number of sprints in the increment.
    pub count: usize,
    /// Sprint length in days.
    pub length_days: u32,
    /// First day of sprint 1.
    pub start: NaiveDate,
}

impl Default for SprintSettings {
    fn default() -> Self {
        Self {
            count: 6,
            length_days: 14,
            start: NaiveDate::default(),
        }
    }
}

/// One team's capacity settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSettings {
    /// Team id, matched against work item team references.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Capacity per sprint unless overridden.
    pub default_capacity: f64,
    /// Per-sprint overrides (0-based sprint index).
    #[serde(default)]
    pub overrides: Vec<CapacityOverride>,
}

impl PlanningConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, contains invalid TOML, or
    /// fails [`PlanningConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the strategy.
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the scan window length.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Sets the capacity buffer.
    pub fn with_capacity_buffer(mut self, buffer: f64) -> Self {
        self.capacity_buffer = buffer;
        self
    }

    /// Sets the sprint calendar.
    pub fn with_sprints(mut self, count: usize, length_days: u32, start: NaiveDate) -> Self {
        self.sprints = SprintSettings {
            count,
            length_days,
            start,
        };
        self
    }

    /// Adds a team.
    pub fn with_team(mut self, id: impl Into<String>, default_capacity: f64) -> Self {
        self.teams.push(TeamSettings {
            id: id.into(),
            name: None,
            default_capacity,
            overrides: Vec::new(),
        });
        self
    }

    /// Checks ranges and uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if self.sprints.count == 0 {
            return invalid("sprints.count must be positive".into());
        }
        if self.sprints.length_days == 0 {
            return invalid("sprints.length_days must be positive".into());
        }
        if !(0.0..1.0).contains(&self.capacity_buffer) {
            return invalid(format!(
                "capacity_buffer must be in [0, 1), got {}",
                self.capacity_buffer
            ));
        }
        if self.horizon == Some(0) {
            return invalid("horizon must be positive".into());
        }

        let mut seen = HashMap::new();
        for team in &self.teams {
            if team.id.trim().is_empty() {
                return invalid("team id must not be empty".into());
            }
            if seen.insert(team.id.as_str(), ()).is_some() {
                return invalid(format!("duplicate team id '{}'", team.id));
            }
            let capacities = std::iter::once(team.default_capacity)
                .chain(team.overrides.iter().map(|o| o.capacity));
            for capacity in capacities {
                if !capacity.is_finite() || capacity < 0.0 {
                    return invalid(format!(
                        "team '{}' has invalid capacity {capacity}",
                        team.id
                    ));
                }
            }
            if let Some(o) = team.overrides.iter().find(|o| o.sprint >= self.sprints.count) {
                return invalid(format!(
                    "team '{}' overrides sprint {} beyond the {} configured sprints",
                    team.id, o.sprint, self.sprints.count
                ));
            }
        }

        self.field_mapping.validate()
    }

    /// Sprint calendar.
    pub fn calendar(&self) -> SprintCalendar {
        SprintCalendar::new(
            self.sprints.start,
            self.sprints.length_days,
            self.sprints.count,
        )
    }

    /// Team roster.
    pub fn teams(&self) -> Vec<Team> {
        self.teams
            .iter()
            .map(|t| {
                let mut team = Team::new(t.id.clone(), t.default_capacity);
                if let Some(name) = &t.name {
                    team = team.with_name(name.clone());
                }
                for o in &t.overrides {
                    team = team.with_override(o.sprint, o.capacity);
                }
                team
            })
            .collect()
    }

    /// Active strategy.
    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// A planner configured from these settings.
    pub fn planner(&self) -> Planner {
        let mut planner = Planner::new(self.calendar(), self.teams(), self.strategy)
            .with_capacity_buffer(self.capacity_buffer);
        if let Some(horizon) = self.horizon {
            planner = planner.with_horizon(horizon);
        }
        if let Some(as_of) = self.as_of {
            planner = planner.with_as_of(as_of);
        }
        planner
    }
}

/// External field names for each work item attribute.
///
/// Defaults follow Azure DevOps reference names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Title.
    pub title: String,
    /// Workflow state.
    pub state: String,
    /// Story-point estimate.
    pub effort: String,
    /// Remaining work for active items.
    pub remaining_work: String,
    /// Explicit priority.
    pub priority: String,
    /// Target date.
    pub target_date: String,
    /// Deadline sprint (1-based in the tracker).
    pub deadline_sprint: String,
    /// Cost of delay: business value.
    pub business_value: String,
    /// Cost of delay: time criticality.
    pub time_criticality: String,
    /// Cost of delay: risk reduction / opportunity enablement.
    pub risk_reduction: String,
    /// Owning team.
    pub team: String,
    /// Tracker priorities rank 1 highest; negate them on import.
    pub invert_priority: bool,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            title: "System.Title".into(),
            state: "System.State".into(),
            effort: "Microsoft.VSTS.Scheduling.StoryPoints".into(),
            remaining_work: "Microsoft.VSTS.Scheduling.RemainingWork".into(),
            priority: "Microsoft.VSTS.Common.Priority".into(),
            target_date: "System.TargetDate".into(),
            deadline_sprint: "Custom.DeadlineSprint".into(),
            business_value: "Microsoft.VSTS.Common.BusinessValue".into(),
            time_criticality: "Microsoft.VSTS.Common.TimeCriticality".into(),
            risk_reduction: "Custom.RiskReductionOpportunityEnablement".into(),
            team: "System.AreaPath".into(),
            invert_priority: true,
        }
    }
}

impl FieldMapping {
    /// (key, external field) pairs.
    pub fn entries(&self) -> [(&'static str, &str); 11] {
        [
            ("title", &self.title),
            ("state", &self.state),
            ("effort", &self.effort),
            ("remaining_work", &self.remaining_work),
            ("priority", &self.priority),
            ("target_date", &self.target_date),
            ("deadline_sprint", &self.deadline_sprint),
            ("business_value", &self.business_value),
            ("time_criticality", &self.time_criticality),
            ("risk_reduction", &self.risk_reduction),
            ("team", &self.team),
        ]
    }

    /// Rejects empty names and fields mapped twice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for (key, field) in self.entries() {
            if field.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "field_mapping.{key} must not be empty"
                )));
            }
            if let Some(other) = seen.insert(field, key) {
                return Err(ConfigError::Invalid(format!(
                    "field_mapping.{key} and field_mapping.{other} both read '{field}'"
                )));
            }
        }
        Ok(())
    }

    /// Converts one tracker record into a story.
    ///
    /// Missing and null fields take defaults. Numbers may be JSON numbers or
    /// numeric strings; dates may be `YYYY-MM-DD` or RFC 3339. The caller
    /// sets the owning feature and dependencies.
    ///
    /// # Errors
    /// [`SourceError::InvalidField`] when a present field cannot be read.
    pub fn extract(&self, id: &str, fields: &Map<String, Value>) -> Result<Story, SourceError> {
        let get = |field: &str| fields.get(field).filter(|v| !v.is_null());
        let number_of = |field: &str| -> Result<Option<f64>, SourceError> {
            get(field)
                .map(|v| number(v).ok_or_else(|| invalid_field(id, field, v)))
                .transpose()
        };

        let mut story = Story::new(id, "");
        let item = &mut story.item;

        if let Some(v) = get(&self.title) {
            item.title = v.as_str().map_or_else(|| v.to_string(), str::to_string);
        }
        if let Some(v) = get(&self.state) {
            let state = v.as_str().ok_or_else(|| invalid_field(id, &self.state, v))?;
            item.status = parse_state(state);
        }
        if let Some(effort) = number_of(&self.effort)? {
            item.effort = effort;
        }
        if let Some(priority) = number_of(&self.priority)? {
            let raw = priority as i32;
            item.priority = if self.invert_priority { -raw } else { raw };
        }
        if let Some(v) = get(&self.target_date) {
            item.target_date = Some(date(v).ok_or_else(|| invalid_field(id, &self.target_date, v))?);
        }
        if let Some(v) = get(&self.deadline_sprint) {
            let sprint = number(v)
                .filter(|s| *s >= 1.0)
                .ok_or_else(|| invalid_field(id, &self.deadline_sprint, v))?;
            item.deadline_sprint = Some(sprint as usize - 1);
        }
        if let Some(v) = get(&self.team) {
            item.team = v.as_str().map(str::to_string);
        }

        item.cost_of_delay = CostOfDelay::new(
            number_of(&self.business_value)?.unwrap_or(0.0),
            number_of(&self.time_criticality)?.unwrap_or(0.0),
            number_of(&self.risk_reduction)?.unwrap_or(0.0),
        );
        story.remaining_work = number_of(&self.remaining_work)?;

        Ok(story)
    }
}

fn invalid_field(item: &str, field: &str, value: &Value) -> SourceError {
    SourceError::InvalidField {
        item: item.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Tracker states vary by process template; match on fragments.
fn parse_state(state: &str) -> ItemStatus {
    if let Some(status) = ItemStatus::parse(state) {
        return status;
    }
    let lower = state.to_ascii_lowercase();
    if lower.contains("new") {
        ItemStatus::New
    } else if lower.contains("active") || lower.contains("progress") {
        ItemStatus::Active
    } else if lower.contains("resolved") {
        ItemStatus::Resolved
    } else {
        ItemStatus::Closed
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|d| d.date_naive()))
}
