//! Error types for planning runs.
//!
//! Every variant of [`PlanningError`] is fatal: a run that returns one has
//! made no reservation and produced no schedule. Per-story problems
//! (no capacity, unresolved predecessors) are outcomes, not errors.

use thiserror::Error;

use crate::validation::ValidationError;

/// Fatal planning error.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// The dependency graph contains a cycle.
    #[error("circular dependency: {}", .cycle.join(" -> "))]
    Cycle {
        /// Items on the cycle, first item repeated at the end.
        cycle: Vec<String>,
    },

    /// A dependency edge names an item that does not exist.
    #[error("dependency {from} -> {to} references unknown item '{missing}'")]
    UnknownReference {
        /// Predecessor id.
        from: String,
        /// Dependent id.
        to: String,
        /// The endpoint that was not found.
        missing: String,
    },

    /// The capacity ledger was driven into an impossible state.
    #[error("capacity ledger invariant violated: {0}")]
    LedgerInvariant(String),

    /// The backlog failed structural checks.
    #[error("invalid backlog: {}", summarize(.0))]
    InvalidBacklog(Vec<ValidationError>),

    /// A story has no active assignment to release.
    #[error("story '{0}' has no active assignment")]
    UnknownStory(String),
}

fn summarize(errors: &[ValidationError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}

/// Result type alias for planning operations.
pub type Result<T> = std::result::Result<T, PlanningError>;
