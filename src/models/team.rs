//! Team model.
//!
//! A team holds capacity (story points) in every sprint of the plan.
//! Each team has a default capacity and optional per-sprint overrides
//! (holidays, onboarding, shared duties).

use serde::{Deserialize, Serialize};

/// A team that delivers stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Capacity per sprint when no override applies.
    pub default_capacity: f64,
    /// Per-sprint capacity overrides.
    pub overrides: Vec<CapacityOverride>,
}

/// Capacity for one specific sprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityOverride {
    /// Sprint index.
    pub sprint: usize,
    /// Capacity in that sprint.
    pub capacity: f64,
}

impl Team {
    /// Creates a team with the given default capacity.
    pub fn new(id: impl Into<String>, default_capacity: f64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            default_capacity,
            overrides: Vec::new(),
        }
    }

    /// Sets the team name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the capacity of one sprint. Later overrides win.
    pub fn with_override(mut self, sprint: usize, capacity: f64) -> Self {
        self.overrides.push(CapacityOverride { sprint, capacity });
        self
    }

    /// Capacity available in `sprint`.
    pub fn capacity_for(&self, sprint: usize) -> f64 {
        self.overrides
            .iter()
            .rev()
            .find(|o| o.sprint == sprint)
            .map(|o| o.capacity)
            .unwrap_or(self.default_capacity)
    }

    /// Display label: name if set, else id.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_builder() {
        let team = Team::new("alpha", 40.0).with_name("Team Alpha");
        assert_eq!(team.id, "alpha");
        assert_eq!(team.label(), "Team Alpha");
        assert_eq!(team.capacity_for(0), 40.0);
        assert_eq!(Team::new("beta", 10.0).label(), "beta");
    }

    #[test]
    fn test_capacity_override() {
        let team = Team::new("alpha", 40.0)
            .with_override(2, 20.0)
            .with_override(2, 25.0);
        assert_eq!(team.capacity_for(1), 40.0);
        assert_eq!(team.capacity_for(2), 25.0);
    }
}
