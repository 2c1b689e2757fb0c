//! Similarity scoring result types.

use super::Entity;

/// Confidence band for a similarity match, derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Composite score >= 0.85.
    High,
    /// Composite score >= 0.75.
    Medium,
    /// Composite score below the medium threshold (but above the overall
    /// similarity threshold, or it would not have been returned at all).
    Low,
}

impl Confidence {
    /// Classifies a composite similarity score into a confidence band.
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score >= 0.85 {
            Self::High
        } else if score >= 0.75 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A single candidate match produced by the similarity engine.
#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    /// The candidate entity.
    pub candidate: Entity,
    /// Composite similarity score in `[0.0, 1.0]`.
    pub score: f32,
    /// Confidence band derived from `score`.
    pub confidence: Confidence,
    /// The relation type the engine would suggest if a link were created.
    pub suggested_relation_type: String,
    /// A short human-readable explanation of which features drove the
    /// score, for surfacing in relationship suggestions.
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from_score(0.9), Confidence::High);
        assert_eq!(Confidence::from_score(0.85), Confidence::High);
        assert_eq!(Confidence::from_score(0.8), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.75), Confidence::Medium);
        assert_eq!(Confidence::from_score(0.6), Confidence::Low);
    }
}
