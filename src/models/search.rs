//! Search request and result types.

use super::{Entity, Relation};
use crate::models::entity::EntityStatus;

/// Which branch(es) a search or read operation covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchScope {
    /// Restrict to a single named branch.
    Specific(String),
    /// Search across every branch.
    All,
}

impl Default for BranchScope {
    /// Defaults to the `main` branch, per the ambient default for callers
    /// that don't specify a scope.
    fn default() -> Self {
        Self::Specific(super::branch::MAIN_BRANCH.to_string())
    }
}

/// Which entity statuses a search or read operation includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// Only `Active` entities (the default).
    ActiveOnly,
    /// Every status.
    Any,
    /// Exactly one status.
    Exactly(EntityStatus),
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self::ActiveOnly
    }
}

impl StatusFilter {
    /// Returns true if `status` passes this filter.
    #[must_use]
    pub fn matches(&self, status: EntityStatus) -> bool {
        match self {
            Self::ActiveOnly => status == EntityStatus::Active,
            Self::Any => true,
            Self::Exactly(s) => *s == status,
        }
    }
}

/// The bundled result of a search or an `openEntities` read: the matched
/// entities plus every relation with both endpoints among them.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Matched entities, already ranked (best match first) for search
    /// results, or in request order for direct reads.
    pub entities: Vec<Entity>,
    /// Relations whose `from` and `to` are both present in `entities`.
    pub relations: Vec<Relation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_scope_default_is_main() {
        assert_eq!(
            BranchScope::default(),
            BranchScope::Specific("main".to_string())
        );
    }

    #[test]
    fn test_status_filter_matches() {
        assert!(StatusFilter::ActiveOnly.matches(EntityStatus::Active));
        assert!(!StatusFilter::ActiveOnly.matches(EntityStatus::Archived));
        assert!(StatusFilter::Any.matches(EntityStatus::Draft));
        assert!(StatusFilter::Exactly(EntityStatus::Draft).matches(EntityStatus::Draft));
        assert!(!StatusFilter::Exactly(EntityStatus::Draft).matches(EntityStatus::Active));
    }
}
