//! Keyword types.

/// A single extracted keyword, indexed for the keyword search strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    /// Row id.
    pub id: i64,
    /// The entity this keyword was extracted from.
    pub entity_id: i64,
    /// Lowercased keyword text.
    pub term: String,
    /// Relative importance within the entity (higher is more salient),
    /// assigned by [`crate::text::keywords::extract_keywords`].
    pub weight: f32,
    /// The entity's type at extraction time, carried alongside the keyword
    /// since extraction runs once over the entity's combined rendering
    /// rather than per field.
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_fields() {
        let kw = Keyword {
            id: 1,
            entity_id: 2,
            term: "auth".to_string(),
            weight: 0.8,
            context: Some("service".to_string()),
        };
        assert_eq!(kw.term, "auth");
    }
}
