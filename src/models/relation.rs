//! Relation types.

/// A directed, typed edge between two entities in the same branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Row id.
    pub id: i64,
    /// The branch both endpoints belong to.
    pub branch_id: i64,
    /// Source entity id.
    pub from_entity_id: i64,
    /// Target entity id.
    pub to_entity_id: i64,
    /// Free-form relation type (e.g. `"depends_on"`, `"implements"`).
    pub relation_type: String,
    /// `true` if this relation was created by the background indexer rather
    /// than an explicit caller request.
    pub auto_generated: bool,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

/// Explicit input record for creating a relation, addressing endpoints by
/// name rather than id.
#[derive(Debug, Clone)]
pub struct RelationInput {
    /// Source entity name.
    pub from: String,
    /// Target entity name.
    pub to: String,
    /// Relation type.
    pub relation_type: String,
}

impl RelationInput {
    /// Creates a new relation input.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_input_new() {
        let input = RelationInput::new("Auth", "Database", "depends_on");
        assert_eq!(input.from, "Auth");
        assert_eq!(input.to, "Database");
        assert_eq!(input.relation_type, "depends_on");
    }
}
