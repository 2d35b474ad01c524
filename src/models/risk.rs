//! Risk model.
//!
//! Risks are diagnostic output of the risk pass over a finished schedule.
//! They never abort planning.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal risk severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Worth noting.
    Low,
    /// Needs attention.
    Medium,
    /// Threatens delivery.
    High,
    /// Internal inconsistency in the plan.
    Critical,
}

impl Severity {
    /// Severity for a violation `gap` sprints wide.
    pub fn from_sprint_gap(gap: usize) -> Self {
        match gap {
            0 | 1 => Severity::Low,
            2 => Severity::Medium,
            _ => Severity::High,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(text)
    }
}

/// Risk classification.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    /// Delivered after its target date or deadline sprint, or not at all.
    Overdue,
    /// A (team, sprint) reserved beyond its total.
    CapacityOverflow,
    /// A dependency edge not honored by the schedule.
    BrokenDependency,
    /// A dependency edge between stories of different teams.
    CrossTeamDependency,
    /// A feature with open work and nothing scheduled.
    UnplannedFeature,
}

impl fmt::Display for RiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RiskKind::Overdue => "overdue",
            RiskKind::CapacityOverflow => "capacity overflow",
            RiskKind::BrokenDependency => "broken dependency",
            RiskKind::CrossTeamDependency => "cross-team dependency",
            RiskKind::UnplannedFeature => "unplanned feature",
        };
        f.write_str(text)
    }
}

/// A detected risk. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    /// Stable identifier derived from kind and affected items.
    pub id: String,
    /// Classification.
    pub kind: RiskKind,
    /// Ordinal severity.
    pub severity: Severity,
    /// Affected item ids (stories, features, or teams).
    pub items: Vec<String>,
    /// Human-readable description.
    pub description: String,
}

impl Risk {
    /// Creates a risk.
    pub fn new(
        id: impl Into<String>,
        kind: RiskKind,
        severity: Severity,
        items: Vec<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            severity,
            items,
            description: description.into(),
        }
    }

    /// Whether the risk concerns `item_id`.
    pub fn affects(&self, item_id: &str) -> bool {
        self.items.iter().any(|i| i == item_id)
    }
}
