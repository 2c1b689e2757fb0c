//! Branch types.

/// The reserved name of the branch that is pre-seeded at id 1 and can never
/// be deleted.
pub const MAIN_BRANCH: &str = "main";

/// A named partition of the graph. The unit of isolation for entity names
/// and relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Row id. `main` is always id 1.
    pub id: i64,
    /// Globally unique branch name.
    pub name: String,
    /// Human-readable purpose, set at creation time.
    pub purpose: Option<String>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Last-write timestamp (Unix epoch seconds), refreshed on any write
    /// that touches an entity or relation owned by this branch.
    pub updated_at: u64,
}

impl Branch {
    /// Returns true if this is the reserved `main` branch.
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.name == MAIN_BRANCH
    }
}

/// Branch metadata with aggregated counts, as returned by `listBranches`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// The branch record.
    pub branch: Branch,
    /// Number of entities in the branch.
    pub entity_count: u64,
    /// Number of relations in the branch.
    pub relation_count: u64,
}

/// Validates a candidate branch name against the permissive identifier
/// pattern required by the data model (invariant 6): letters, digits,
/// dashes, underscores, and dots, non-empty.
#[must_use]
pub fn is_valid_branch_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_main() {
        let branch = Branch {
            id: 1,
            name: "main".to_string(),
            purpose: None,
            created_at: 0,
            updated_at: 0,
        };
        assert!(branch.is_main());
    }

    #[test]
    fn test_is_valid_branch_name() {
        assert!(is_valid_branch_name("main"));
        assert!(is_valid_branch_name("feature-123"));
        assert!(is_valid_branch_name("docs.v2"));
        assert!(!is_valid_branch_name(""));
        assert!(!is_valid_branch_name("has space"));
        assert!(!is_valid_branch_name("slash/es"));
    }
}
