//! Work item ingestion.
//!
//! A [`DataSource`] supplies features and their stories before a run starts.
//! [`load_backlog`] turns one into the immutable [`Backlog`] the planner reads.
//!
//! # Sources
//!
//! | Source | Input |
//! |--------|-------|
//! | [`InMemorySource`] | Typed features and stories |
//! | [`RecordSource`] | Raw tracker records (JSON) read through a [`FieldMapping`] |

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::FieldMapping;
use crate::models::{Backlog, Feature, Story};

/// Data source error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// The source could not be reached.
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// A required field is absent.
    #[error("work item '{item}' is missing field '{field}'")]
    MissingField {
        /// Item id.
        item: String,
        /// External field name.
        field: String,
    },

    /// A field is present but unreadable.
    #[error("work item '{item}' has invalid value {value} in field '{field}'")]
    InvalidField {
        /// Item id.
        item: String,
        /// External field name.
        field: String,
        /// Raw value.
        value: String,
    },

    /// Stories were requested for a feature the source does not know.
    #[error("unknown feature '{0}'")]
    UnknownFeature(String),
}

/// Supplier of typed work items.
pub trait DataSource: Send + Sync {
    /// All features, in source order.
    fn fetch_features(&self) -> Result<Vec<Feature>, SourceError>;

    /// Stories owned by one feature, in source order.
    fn fetch_stories(&self, feature_id: &str) -> Result<Vec<Story>, SourceError>;
}

/// Reads every feature and its stories into a backlog.
///
/// Stories that come back without an owner are attached to the feature they
/// were fetched for.
///
/// # Errors
/// The first error reported by the source.
pub fn load_backlog(source: &dyn DataSource) -> Result<Backlog, SourceError> {
    let features = source.fetch_features()?;
    let mut backlog = Backlog::new();
    let ids: Vec<String> = features.iter().map(|f| f.item.id.clone()).collect();
    for feature in features {
        backlog = backlog.with_feature(feature);
    }

    for feature_id in &ids {
        for mut story in source.fetch_stories(feature_id)? {
            if story.feature_id.is_empty() {
                story.feature_id = feature_id.clone();
            }
            backlog = backlog.with_story(story);
        }
    }

    info!(
        event = "backlog_loaded",
        features = backlog.features.len(),
        stories = backlog.stories.len(),
    );
    Ok(backlog)
}

/// Source over already-typed work items.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    features: Vec<Feature>,
    stories: Vec<Story>,
}

impl InMemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source serving the contents of a backlog.
    pub fn from_backlog(backlog: Backlog) -> Self {
        Self {
            features: backlog.features,
            stories: backlog.stories,
        }
    }

    /// Adds a feature.
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Adds a story.
    pub fn with_story(mut self, story: Story) -> Self {
        self.stories.push(story);
        self
    }
}

impl DataSource for InMemorySource {
    fn fetch_features(&self) -> Result<Vec<Feature>, SourceError> {
        Ok(self.features.clone())
    }

    fn fetch_stories(&self, feature_id: &str) -> Result<Vec<Story>, SourceError> {
        if !self.features.iter().any(|f| f.item.id == feature_id) {
            return Err(SourceError::UnknownFeature(feature_id.to_string()));
        }
        Ok(self
            .stories
            .iter()
            .filter(|s| s.feature_id == feature_id)
            .cloned()
            .collect())
    }
}

/// Tracker work item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Feature record.
    Feature,
    /// Story record.
    Story,
}

/// One raw tracker record.
///
/// ```json
/// { "id": "S1", "kind": "story", "parent": "F1", "depends_on": ["S0"],
///   "fields": { "System.Title": "Login", "Microsoft.VSTS.Scheduling.StoryPoints": 3 } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRecord {
    /// Tracker id.
    pub id: String,
    /// Work item type.
    pub kind: RecordKind,
    /// Owning feature (stories only).
    #[serde(default)]
    pub parent: Option<String>,
    /// Same-layer predecessors.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Whole-feature predecessors (stories only).
    #[serde(default)]
    pub depends_on_features: Vec<String>,
    /// Earliest start sprint, 1-based (features only).
    #[serde(default)]
    pub earliest_sprint: Option<usize>,
    /// Tracker fields, read through the field mapping.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Source over raw tracker records.
///
/// Records that cannot be read are skipped with a warning and counted.
#[derive(Debug, Clone, Default)]
pub struct RecordSource {
    features: Vec<Feature>,
    stories: Vec<Story>,
    skipped: usize,
}

impl RecordSource {
    /// Reads records through `mapping`.
    pub fn new(records: &[Value], mapping: &FieldMapping) -> Self {
        let mut source = Self::default();
        let mut pending = Vec::new();

        for (index, raw) in records.iter().enumerate() {
            match parse_record(raw, mapping) {
                Ok(Parsed::Feature(feature)) => source.features.push(feature),
                Ok(Parsed::Story(story)) => pending.push(story),
                Err(err) => source.skip(index, &err),
            }
        }

        for story in pending {
            if source.features.iter().any(|f| f.item.id == story.feature_id) {
                source.stories.push(story);
            } else {
                let err = SourceError::UnknownFeature(story.feature_id.clone());
                warn!(
                    event = "record_skipped",
                    item = %story.item.id,
                    error = %err,
                );
                source.skipped += 1;
            }
        }

        info!(
            event = "records_read",
            features = source.features.len(),
            stories = source.stories.len(),
            skipped = source.skipped,
        );
        source
    }

    /// Parses a JSON array of records.
    ///
    /// # Errors
    /// [`SourceError::Unavailable`] when the document is not a JSON array.
    pub fn from_json_str(json: &str, mapping: &FieldMapping) -> Result<Self, SourceError> {
        let document: Value =
            serde_json::from_str(json).map_err(|e| SourceError::Unavailable(e.to_string()))?;
        match document {
            Value::Array(records) => Ok(Self::new(&records, mapping)),
            other => Err(SourceError::Unavailable(format!(
                "expected an array of records, got {}",
                kind_name(&other)
            ))),
        }
    }

    /// Number of records skipped as unreadable.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn skip(&mut self, index: usize, err: &SourceError) {
        warn!(event = "record_skipped", index, error = %err);
        self.skipped += 1;
    }
}

impl DataSource for RecordSource {
    fn fetch_features(&self) -> Result<Vec<Feature>, SourceError> {
        Ok(self.features.clone())
    }

    fn fetch_stories(&self, feature_id: &str) -> Result<Vec<Story>, SourceError> {
        if !self.features.iter().any(|f| f.item.id == feature_id) {
            return Err(SourceError::UnknownFeature(feature_id.to_string()));
        }
        Ok(self
            .stories
            .iter()
            .filter(|s| s.feature_id == feature_id)
            .cloned()
            .collect())
    }
}

enum Parsed {
    Feature(Feature),
    Story(Story),
}

fn parse_record(raw: &Value, mapping: &FieldMapping) -> Result<Parsed, SourceError> {
    let record = SourceRecord::deserialize(raw).map_err(|e| SourceError::InvalidField {
        item: raw
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string(),
        field: "record".to_string(),
        value: e.to_string(),
    })?;

    let extracted = mapping.extract(&record.id, &record.fields)?;
    match record.kind {
        RecordKind::Feature => {
            let earliest_sprint = match record.earliest_sprint {
                Some(0) => {
                    return Err(SourceError::InvalidField {
                        item: record.id,
                        field: "earliest_sprint".to_string(),
                        value: "0".to_string(),
                    })
                }
                other => other.map(|s| s - 1),
            };
            Ok(Parsed::Feature(Feature {
                item: extracted.item,
                stories: Vec::new(),
                depends_on: record.depends_on,
                earliest_sprint,
            }))
        }
        RecordKind::Story => {
            let parent = record.parent.ok_or_else(|| SourceError::MissingField {
                item: record.id.clone(),
                field: "parent".to_string(),
            })?;
            Ok(Parsed::Story(Story {
                feature_id: parent,
                depends_on: record.depends_on,
                depends_on_features: record.depends_on_features,
                ..extracted
            }))
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemStatus;
    use serde_json::json;

    struct OfflineSource;

    impl DataSource for OfflineSource {
        fn fetch_features(&self) -> Result<Vec<Feature>, SourceError> {
            Err(SourceError::Unavailable("connection refused".into()))
        }

        fn fetch_stories(&self, _feature_id: &str) -> Result<Vec<Story>, SourceError> {
            Err(SourceError::Unavailable("connection refused".into()))
        }
    }

    fn make_records() -> Vec<Value> {
        vec![
            json!({
                "id": "F1", "kind": "feature", "earliest_sprint": 2,
                "fields": { "System.Title": "Checkout", "System.AreaPath": "alpha" }
            }),
            json!({
                "id": "S1", "kind": "story", "parent": "F1",
                "fields": { "Microsoft.VSTS.Scheduling.StoryPoints": 3, "System.State": "New" }
            }),
            json!({
                "id": "S2", "kind": "story", "parent": "F1", "depends_on": ["S1"],
                "fields": { "Microsoft.VSTS.Scheduling.StoryPoints": "5", "System.State": "Closed" }
            }),
            json!({ "id": "S3", "kind": "story",
                "fields": { "Microsoft.VSTS.Scheduling.StoryPoints": 1 } }),
            json!({ "id": "S4", "kind": "story", "parent": "F9" }),
            json!({ "id": "S5", "kind": "story", "parent": "F1",
                "fields": { "Microsoft.VSTS.Scheduling.StoryPoints": "many" } }),
            json!({ "kind": "story" }),
        ]
    }

    #[test]
    fn test_in_memory_load() {
        let source = InMemorySource::new()
            .with_feature(Feature::new("F1"))
            .with_feature(Feature::new("F2"))
            .with_story(Story::new("S1", "F1"))
            .with_story(Story::new("S2", "F2"))
            .with_story(Story::new("S3", "F1"));

        let backlog = load_backlog(&source).unwrap();
        assert_eq!(backlog.features.len(), 2);
        let ids: Vec<&str> = backlog.stories.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["S1", "S3", "S2"]);
        assert_eq!(backlog.feature("F1").unwrap().stories, vec!["S1", "S3"]);
    }

    #[test]
    fn test_in_memory_unknown_feature() {
        let source = InMemorySource::new();
        assert_eq!(
            source.fetch_stories("F1"),
            Err(SourceError::UnknownFeature("F1".into()))
        );
    }

    #[test]
    fn test_unavailable_source() {
        let err = load_backlog(&OfflineSource).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[test]
    fn test_empty_source() {
        let backlog = load_backlog(&InMemorySource::new()).unwrap();
        assert!(backlog.is_empty());
    }

    #[test]
    fn test_record_source() {
        let source = RecordSource::new(&make_records(), &FieldMapping::default());
        // S3 has no parent, S4 an unknown parent, S5 bad points, the last no id.
        assert_eq!(source.skipped(), 4);

        let backlog = load_backlog(&source).unwrap();
        let feature = backlog.feature("F1").unwrap();
        assert_eq!(feature.item.title, "Checkout");
        assert_eq!(feature.item.team.as_deref(), Some("alpha"));
        assert_eq!(feature.earliest_sprint, Some(1));
        assert_eq!(feature.stories, vec!["S1", "S2"]);

        let s2 = backlog.story("S2").unwrap();
        assert_eq!(s2.item.effort, 5.0);
        assert_eq!(s2.item.status, ItemStatus::Closed);
        assert_eq!(s2.depends_on, vec!["S1"]);
    }

    #[test]
    fn test_record_source_from_json() {
        let json = r#"[
            { "id": "F1", "kind": "feature" },
            { "id": "S1", "kind": "story", "parent": "F1" }
        ]"#;
        let source = RecordSource::from_json_str(json, &FieldMapping::default()).unwrap();
        assert_eq!(source.skipped(), 0);
        assert_eq!(source.fetch_stories("F1").unwrap().len(), 1);

        let err = RecordSource::from_json_str("{}", &FieldMapping::default()).unwrap_err();
        assert_eq!(
            err,
            SourceError::Unavailable("expected an array of records, got an object".into())
        );
        assert!(RecordSource::from_json_str("not json", &FieldMapping::default()).is_err());
    }
}
