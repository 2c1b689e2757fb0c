//! Cross-reference types.
//!
//! A cross-reference links an entity in one branch to a named entity in
//! another branch, without requiring the target to exist yet (the target
//! branch need not even exist — see invariant 5 in the data model).

/// A stored link from one entity to a named entity in another branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossReference {
    /// Row id.
    pub id: i64,
    /// The entity the cross-reference belongs to.
    pub entity_id: i64,
    /// The branch the referenced entity is expected to live in.
    pub target_branch: String,
    /// The referenced entity's name (not resolved to an id; the target may
    /// not exist).
    pub target_entity_name: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

/// Explicit input record for creating cross-references from one entity to a
/// set of named entities in another branch.
#[derive(Debug, Clone)]
pub struct CrossReferenceInput {
    /// The branch the target entities live in.
    pub target_branch: String,
    /// The target entity names; one [`CrossReference`] row is materialized
    /// per name.
    pub entity_names: Vec<String>,
}

impl CrossReferenceInput {
    /// Creates a new cross-reference input targeting the given branch and
    /// entity names.
    #[must_use]
    pub fn new(target_branch: impl Into<String>, entity_names: Vec<String>) -> Self {
        Self {
            target_branch: target_branch.into(),
            entity_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_reference_input_new() {
        let input = CrossReferenceInput::new(
            "docs",
            vec!["Auth".to_string(), "Database".to_string()],
        );
        assert_eq!(input.target_branch, "docs");
        assert_eq!(input.entity_names.len(), 2);
    }
}
