//! Ranking context for priority rule evaluation.

use chrono::NaiveDate;

/// State passed to priority rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankingContext {
    /// Date against which target dates count as overdue.
    ///
    /// When absent no item is treated as overdue.
    pub as_of: Option<NaiveDate>,
}

impl RankingContext {
    /// Creates a context evaluated on the given date.
    pub fn as_of(date: NaiveDate) -> Self {
        Self { as_of: Some(date) }
    }
}
