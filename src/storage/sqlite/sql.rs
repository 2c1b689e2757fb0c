//! SQL helper functions shared by the store's query builders.

use crate::models::{EntityStatus, StatusFilter};

/// Escapes `%`, `_`, and `\` so a string can be safely embedded in a
/// `LIKE ... ESCAPE '\'` clause.
#[must_use]
pub fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Wraps `term` as a `%term%` substring-match pattern, with `term`'s own
/// wildcard characters escaped first.
#[must_use]
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like_wildcards(term))
}

/// Builds a numbered-parameter SQL fragment for a [`StatusFilter`],
/// returning `(clause, bound value)`. The clause is empty (and the bound
/// value is `None`) for [`StatusFilter::Any`].
#[must_use]
pub fn status_clause(filter: StatusFilter, param: usize, column: &str) -> (String, Option<String>) {
    match filter {
        StatusFilter::Any => (String::new(), None),
        StatusFilter::ActiveOnly => (
            format!(" AND {column} = ?{param}"),
            Some(EntityStatus::Active.as_str().to_string()),
        ),
        StatusFilter::Exactly(status) => (
            format!(" AND {column} = ?{param}"),
            Some(status.as_str().to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like_wildcards("normal"), "normal");
        assert_eq!(escape_like_wildcards("100%"), "100\\%");
        assert_eq!(escape_like_wildcards("user_name"), "user\\_name");
        assert_eq!(escape_like_wildcards("path\\file"), "path\\\\file");
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("auth"), "%auth%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
    }

    #[test]
    fn test_status_clause_active_only() {
        let (clause, value) = status_clause(StatusFilter::ActiveOnly, 2, "e.status");
        assert_eq!(clause, " AND e.status = ?2");
        assert_eq!(value, Some("active".to_string()));
    }

    #[test]
    fn test_status_clause_any() {
        let (clause, value) = status_clause(StatusFilter::Any, 1, "e.status");
        assert!(clause.is_empty());
        assert_eq!(value, None);
    }
}
