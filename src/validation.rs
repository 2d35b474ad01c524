//! Input validation for planning backlogs.
//!
//! Checks structural integrity of features and stories before planning.
//! Detects:
//! - Duplicate IDs (features and stories share one id space)
//! - Stories whose feature does not exist
//! - Feature story lists that disagree with story ownership
//! - Negative or non-finite effort, remaining work, and cost of delay
//!
//! Dependency references and cycles are checked by
//! [`DependencyGraph::build`](crate::graph::DependencyGraph::build).

use crate::models::Backlog;
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two items share the same ID.
    DuplicateId,
    /// A story references a feature that doesn't exist.
    UnknownFeature,
    /// A feature lists a story it does not own.
    OwnershipMismatch,
    /// Effort or remaining work is negative or not a number.
    InvalidEffort,
    /// A cost-of-delay component is negative or not a number.
    InvalidCostOfDelay,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a backlog.
///
/// Checks:
/// 1. No duplicate IDs across features and stories
/// 2. Every story's feature exists
/// 3. Every story listed by a feature exists and is owned by that feature
/// 4. Effort and remaining work are finite and non-negative
/// 5. Cost-of-delay components are finite and non-negative
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_backlog(backlog: &Backlog) -> ValidationResult {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();
    let mut feature_ids = HashSet::new();

    for feature in &backlog.features {
        let id = feature.item.id.as_str();
        if !ids.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate feature ID: {id}"),
            ));
        }
        feature_ids.insert(id);
        check_item(&feature.item, "Feature", &mut errors);
    }

    for story in &backlog.stories {
        let id = story.item.id.as_str();
        if !ids.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate story ID: {id}"),
            ));
        }
        if !feature_ids.contains(story.feature_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownFeature,
                format!(
                    "Story '{id}' references unknown feature '{}'",
                    story.feature_id
                ),
            ));
        }
        check_item(&story.item, "Story", &mut errors);
        if let Some(remaining) = story.remaining_work {
            if !remaining.is_finite() || remaining < 0.0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidEffort,
                    format!("Story '{id}' has invalid remaining work {remaining}"),
                ));
            }
        }
    }

    for feature in &backlog.features {
        for story_id in &feature.stories {
            match backlog.story(story_id) {
                Some(story) if story.feature_id == feature.item.id => {}
                Some(story) => errors.push(ValidationError::new(
                    ValidationErrorKind::OwnershipMismatch,
                    format!(
                        "Feature '{}' lists story '{story_id}' owned by '{}'",
                        feature.item.id, story.feature_id
                    ),
                )),
                None => errors.push(ValidationError::new(
                    ValidationErrorKind::OwnershipMismatch,
                    format!(
                        "Feature '{}' lists unknown story '{story_id}'",
                        feature.item.id
                    ),
                )),
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_item(item: &crate::models::WorkItem, label: &str, errors: &mut Vec<ValidationError>) {
    if !item.has_valid_effort() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidEffort,
            format!("{label} '{}' has invalid effort {}", item.id, item.effort),
        ));
    }
    if !item.has_valid_cost_of_delay() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidCostOfDelay,
            format!("{label} '{}' has a negative cost-of-delay component", item.id),
        ));
    }
}
