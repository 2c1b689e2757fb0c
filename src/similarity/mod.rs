//! Entity-to-entity similarity scoring and relation-type inference.

use crate::models::{Confidence, Entity, SimilarityMatch};
use crate::text::similarity::{jaccard, levenshtein_normalized, name_pattern_score};
use crate::text::tokenize::tokenize;

/// Composite score threshold below which a candidate is not returned.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

const MAX_RESULTS: usize = 8;

const WEIGHT_NAME: f32 = 0.35;
const WEIGHT_TYPE: f32 = 0.20;
const WEIGHT_CONTENT: f32 = 0.25;
const WEIGHT_PATTERN: f32 = 0.15;
const WEIGHT_STRUCTURAL: f32 = 0.05;

/// Scores entity-to-entity similarity and infers a relation type for
/// candidates above [`SIMILARITY_THRESHOLD`].
pub struct SimilarityEngine;

impl SimilarityEngine {
    /// Scores every candidate against `target`, returning up to 8 matches
    /// at or above the similarity threshold, sorted by score descending.
    #[must_use]
    pub fn detect_similar(target: &Entity, candidates: &[Entity]) -> Vec<SimilarityMatch> {
        let mut matches: Vec<SimilarityMatch> = candidates
            .iter()
            .filter(|c| c.id != target.id)
            .filter_map(|candidate| Self::score(target, candidate))
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(MAX_RESULTS);
        matches
    }

    fn score(target: &Entity, candidate: &Entity) -> Option<SimilarityMatch> {
        let name = Self::name_similarity(&target.name, &candidate.name);
        let entity_type = Self::type_similarity(&target.entity_type, &candidate.entity_type);
        let content = Self::content_similarity(target, candidate);
        let pattern = name_pattern_score(&target.name, &candidate.name);
        let structural = Self::structural_similarity(target, candidate);

        let score = WEIGHT_NAME * name
            + WEIGHT_TYPE * entity_type
            + WEIGHT_CONTENT * content
            + WEIGHT_PATTERN * pattern
            + WEIGHT_STRUCTURAL * structural;

        if score < SIMILARITY_THRESHOLD {
            return None;
        }

        let confidence = Confidence::from_score(score);
        let suggested_relation_type = Self::suggest_relation_type(target, candidate, score);
        let reasoning = format!(
            "name={name:.2} type={entity_type:.2} content={content:.2} pattern={pattern:.2} structural={structural:.2}"
        );

        Some(SimilarityMatch {
            candidate: candidate.clone(),
            score,
            confidence,
            suggested_relation_type,
            reasoning,
        })
    }

    fn name_similarity(a: &str, b: &str) -> f32 {
        let levenshtein = levenshtein_normalized(a, b);
        let tokens_a = tokenize(a);
        let tokens_b = tokenize(b);
        let jaccard_weighted = jaccard(&tokens_a, &tokens_b) * 0.8;
        levenshtein.max(jaccard_weighted)
    }

    fn type_similarity(a: &str, b: &str) -> f32 {
        if a.eq_ignore_ascii_case(b) {
            1.0
        } else {
            Self::name_similarity(a, b)
        }
    }

    fn content_similarity(target: &Entity, candidate: &Entity) -> f32 {
        let target_text = target.joined_observations();
        let candidate_text = candidate.joined_observations();
        if target_text.trim().is_empty() || candidate_text.trim().is_empty() {
            return 0.3;
        }

        let sentence = levenshtein_normalized(&target_text, &candidate_text);
        let keyword_set = jaccard(&tokenize(&target_text), &tokenize(&candidate_text));
        0.6 * sentence + 0.4 * keyword_set
    }

    fn structural_similarity(target: &Entity, candidate: &Entity) -> f32 {
        let o1 = target.observations.len() as f32;
        let o2 = candidate.observations.len() as f32;
        let count_term = if o1.max(o2) > 0.0 {
            0.4 * (1.0 - (o1 - o2).abs() / o1.max(o2))
        } else {
            0.4
        };
        let status_term = if target.status == candidate.status { 0.3 } else { 0.0 };
        (count_term + status_term).min(1.0)
    }

    fn suggest_relation_type(target: &Entity, candidate: &Entity, score: f32) -> String {
        let target_lower = target.name.to_lowercase();
        let candidate_lower = candidate.name.to_lowercase();

        if target_lower.contains(&candidate_lower) || candidate_lower.contains(&target_lower) {
            return if target_lower.len() >= candidate_lower.len() {
                "contains".to_string()
            } else {
                "part_of".to_string()
            };
        }

        if target.entity_type.eq_ignore_ascii_case(&candidate.entity_type) {
            return "similar_to".to_string();
        }

        if score > 0.9 {
            return "closely_related".to_string();
        }

        "related_to".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityStatus;

    fn entity(id: i64, name: &str, entity_type: &str, observations: &[&str]) -> Entity {
        Entity {
            id,
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            branch_id: 1,
            status: EntityStatus::Active,
            status_reason: None,
            original_content: String::new(),
            optimized_content: String::new(),
            token_count: 0,
            compression_ratio: 1.0,
            observations: observations
                .iter()
                .enumerate()
                .map(|(i, content)| crate::models::Observation {
                    id: i as i64,
                    entity_id: id,
                    content: (*content).to_string(),
                    optimized_content: (*content).to_string(),
                    sequence_order: i as i64,
                    created_at: 0,
                })
                .collect(),
            created_at: 0,
            updated_at: 0,
            last_accessed: 0,
        }
    }

    #[test]
    fn test_similar_entities_above_threshold() {
        let target = entity(1, "Dashboard Component Manager", "component", &["renders widgets"]);
        let candidate = entity(2, "Dashboard Grid System", "component", &["renders a grid"]);
        let matches = SimilarityEngine::detect_similar(&target, &[candidate]);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].score >= SIMILARITY_THRESHOLD);
        assert!(matches[0].score < 0.9);
        assert_eq!(matches[0].suggested_relation_type, "similar_to");
    }

    #[test]
    fn test_unrelated_entities_below_threshold() {
        let target = entity(1, "User Authentication Service", "service", &["handles login"]);
        let candidate = entity(2, "Database Connection Pool", "infra", &["manages connections"]);
        let matches = SimilarityEngine::detect_similar(&target, &[candidate]);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_contains_relation_type() {
        let target = entity(1, "Auth", "service", &[]);
        let candidate = entity(2, "Auth Service Extended", "service", &[]);
        let matches = SimilarityEngine::detect_similar(&target, &[candidate]);
        if let Some(m) = matches.first() {
            assert!(m.suggested_relation_type == "contains" || m.suggested_relation_type == "part_of");
        }
    }

    #[test]
    fn test_excludes_self() {
        let target = entity(1, "Auth", "service", &[]);
        let same = entity(1, "Auth", "service", &[]);
        let matches = SimilarityEngine::detect_similar(&target, &[same]);
        assert!(matches.is_empty());
    }
}
