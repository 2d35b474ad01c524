//! Per-team, per-sprint capacity ledger.
//!
//! Each (team, sprint) slot holds a fixed total and a reserved amount.
//! [`CapacityLedger::reserve`] and [`CapacityLedger::release`] are the only
//! mutators, and neither can leave `reserved > total` or `reserved < 0`.
//! A ledger belongs to exactly one planning run.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::PlanningError;
use crate::models::Team;

const EPSILON: f64 = 1e-9;

/// Ledger operation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// The slot cannot take the requested amount.
    #[error("team '{team}' sprint {sprint}: requested {requested}, remaining {remaining}")]
    InsufficientCapacity {
        /// Team id.
        team: String,
        /// Sprint index.
        sprint: usize,
        /// Amount requested.
        requested: f64,
        /// Amount still free.
        remaining: f64,
    },

    /// No slot exists for the pair.
    #[error("no capacity slot for team '{team}' sprint {sprint}")]
    UnknownSlot {
        /// Team id.
        team: String,
        /// Sprint index.
        sprint: usize,
    },

    /// The operation would break the ledger's invariants.
    #[error("{0}")]
    InvariantViolation(String),
}

impl From<LedgerError> for PlanningError {
    fn from(err: LedgerError) -> Self {
        PlanningError::LedgerInvariant(err.to_string())
    }
}

/// One (team, sprint) slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerEntry {
    /// Capacity available for planning.
    pub total: f64,
    /// Capacity already reserved.
    pub reserved: f64,
}

impl LedgerEntry {
    /// Creates an empty slot with the given total.
    pub fn new(total: f64) -> Self {
        Self {
            total,
            reserved: 0.0,
        }
    }

    /// Unreserved capacity.
    pub fn remaining(&self) -> f64 {
        (self.total - self.reserved).max(0.0)
    }

    /// Reserved / total, or 0 for a zero-capacity slot.
    pub fn utilization(&self) -> f64 {
        if self.total > 0.0 {
            self.reserved / self.total
        } else {
            0.0
        }
    }

    /// Whether more is reserved than the slot holds.
    pub fn is_overbooked(&self) -> bool {
        self.reserved > self.total + EPSILON
    }
}

/// Capacity ledger keyed by (team id, sprint index).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityLedger {
    slots: BTreeMap<(String, usize), LedgerEntry>,
}

impl CapacityLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger for `sprint_count` sprints of every team.
    ///
    /// Each slot's total is the team's capacity for that sprint with
    /// `buffer` (a fraction in `0.0..1.0`) withheld.
    pub fn from_teams(teams: &[Team], sprint_count: usize, buffer: f64) -> Self {
        let factor = 1.0 - buffer.clamp(0.0, 1.0);
        let mut ledger = Self::new();
        for team in teams {
            for sprint in 0..sprint_count {
                ledger.add_slot(&team.id, sprint, team.capacity_for(sprint) * factor);
            }
        }
        ledger
    }

    /// Adds or replaces a slot. Any prior reservation is discarded.
    pub fn add_slot(&mut self, team: impl Into<String>, sprint: usize, total: f64) {
        self.slots
            .insert((team.into(), sprint), LedgerEntry::new(total.max(0.0)));
    }

    /// Whether the team has any slot.
    pub fn has_team(&self, team: &str) -> bool {
        self.slots.keys().any(|(t, _)| t == team)
    }

    /// Reserves `amount` in a slot.
    ///
    /// # Errors
    /// - [`LedgerError::InsufficientCapacity`] if the slot cannot take it
    /// - [`LedgerError::UnknownSlot`] if the pair has no slot
    /// - [`LedgerError::InvariantViolation`] for a negative or non-finite amount
    pub fn reserve(&mut self, team: &str, sprint: usize, amount: f64) -> Result<(), LedgerError> {
        check_amount(amount)?;
        let entry = self.slot_mut(team, sprint)?;
        if entry.reserved + amount > entry.total + EPSILON {
            return Err(LedgerError::InsufficientCapacity {
                team: team.to_string(),
                sprint,
                requested: amount,
                remaining: entry.remaining(),
            });
        }
        entry.reserved += amount;
        Ok(())
    }

    /// Releases `amount` previously reserved in a slot.
    ///
    /// # Errors
    /// [`LedgerError::InvariantViolation`] when releasing more than is
    /// reserved; [`LedgerError::UnknownSlot`] if the pair has no slot.
    pub fn release(&mut self, team: &str, sprint: usize, amount: f64) -> Result<(), LedgerError> {
        check_amount(amount)?;
        let entry = self.slot_mut(team, sprint)?;
        if amount > entry.reserved + EPSILON {
            return Err(LedgerError::InvariantViolation(format!(
                "release of {amount} from team '{team}' sprint {sprint} exceeds reserved {}",
                entry.reserved
            )));
        }
        entry.reserved = (entry.reserved - amount).max(0.0);
        Ok(())
    }

    /// Unreserved capacity of a slot; 0 when the slot does not exist.
    pub fn remaining(&self, team: &str, sprint: usize) -> f64 {
        self.entry(team, sprint)
            .map(LedgerEntry::remaining)
            .unwrap_or(0.0)
    }

    /// Looks up a slot.
    pub fn entry(&self, team: &str, sprint: usize) -> Option<&LedgerEntry> {
        self.slots.get(&(team.to_string(), sprint))
    }

    /// All slots ordered by team id, then sprint.
    pub fn entries(&self) -> impl Iterator<Item = (&str, usize, &LedgerEntry)> {
        self.slots
            .iter()
            .map(|((team, sprint), entry)| (team.as_str(), *sprint, entry))
    }

    /// Sum of reservations across all slots.
    pub fn total_reserved(&self) -> f64 {
        self.slots.values().map(|e| e.reserved).sum()
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the ledger has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_mut(&mut self, team: &str, sprint: usize) -> Result<&mut LedgerEntry, LedgerError> {
        self.slots
            .get_mut(&(team.to_string(), sprint))
            .ok_or_else(|| LedgerError::UnknownSlot {
                team: team.to_string(),
                sprint,
            })
    }
}

fn check_amount(amount: f64) -> Result<(), LedgerError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvariantViolation(format!(
            "amount must be finite and non-negative, got {amount}"
        )))
    }
}
