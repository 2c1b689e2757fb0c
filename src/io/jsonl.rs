//! Line-delimited JSON record format used by backup snapshots and the
//! legacy file store.

use serde::{Deserialize, Serialize};

/// A cross-reference as it appears in a JSONL entity record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonlCrossReference {
    /// The target branch name.
    #[serde(rename = "memoryBranch")]
    pub memory_branch: String,
    /// Target entity names.
    #[serde(rename = "entityNames")]
    pub entity_names: Vec<String>,
}

/// One line of a JSONL relation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonlRelation {
    /// Source entity name.
    pub from: String,
    /// Target entity name.
    pub to: String,
    /// Relation type.
    #[serde(rename = "relationType")]
    pub relation_type: String,
}

/// One record of a JSONL snapshot: either an entity or a relation,
/// discriminated by the `type` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonlRecord {
    /// An entity snapshot.
    Entity {
        /// Entity name.
        name: String,
        /// Entity type tag.
        #[serde(rename = "entityType")]
        entity_type: String,
        /// Observation contents, in order.
        observations: Vec<String>,
        /// Lifecycle status.
        status: String,
        /// Optional status reason.
        #[serde(rename = "statusReason", skip_serializing_if = "Option::is_none")]
        status_reason: Option<String>,
        /// ISO8601 last-update timestamp.
        #[serde(rename = "lastUpdated")]
        last_updated: String,
        /// Cross-references grouped by target branch.
        #[serde(rename = "crossReferences", default)]
        cross_references: Vec<JsonlCrossReference>,
    },
    /// A relation snapshot.
    Relation(JsonlRelation),
}

/// Parses a JSONL snapshot, skipping (and logging) any line that fails to
/// parse rather than aborting the whole file.
#[must_use]
pub fn parse_jsonl(contents: &str) -> Vec<JsonlRecord> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<JsonlRecord>(line) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed jsonl line");
                None
            }
        })
        .collect()
}

/// Serializes records as newline-joined JSON, one object per line.
#[must_use]
pub fn write_jsonl(records: &[JsonlRecord]) -> String {
    records
        .iter()
        .filter_map(|r| serde_json::to_string(r).ok())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jsonl_entity_and_relation() {
        let input = r#"{"type":"entity","name":"Auth","entityType":"Service","observations":["uses JWT"],"status":"active","lastUpdated":"2026-01-01T00:00:00Z"}
{"type":"relation","from":"Auth","to":"Database","relationType":"depends_on"}"#;
        let records = parse_jsonl(input);
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], JsonlRecord::Entity { .. }));
        assert!(matches!(records[1], JsonlRecord::Relation(_)));
    }

    #[test]
    fn test_parse_jsonl_skips_malformed_lines() {
        let input = "not json\n{\"type\":\"relation\",\"from\":\"a\",\"to\":\"b\",\"relationType\":\"rel\"}";
        let records = parse_jsonl(input);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_roundtrip() {
        let record = JsonlRecord::Relation(JsonlRelation {
            from: "a".to_string(),
            to: "b".to_string(),
            relation_type: "rel".to_string(),
        });
        let text = write_jsonl(&[record.clone()]);
        let parsed = parse_jsonl(&text);
        assert_eq!(parsed, vec![record]);
    }
}
