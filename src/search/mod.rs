//! Multi-strategy ranked retrieval over the store.

use std::collections::HashMap;

use crate::models::{BranchScope, Entity, SearchOutcome, StatusFilter};
use crate::storage::Store;
use crate::text::tokenize::prepare_search_terms;
use crate::Result;

const KEYWORD_BONUS: f32 = 15.0;
const FTS_BONUS: f32 = 10.0;
const LIKE_BONUS: f32 = 5.0;
const MAX_RESULTS: usize = 50;

/// Ranked retrieval over [`Store`], combining the keyword, FTS, and
/// substring-LIKE strategies into a single `relevance_score` per entity.
pub struct SearchEngine<'a> {
    store: &'a Store,
}

impl<'a> SearchEngine<'a> {
    /// Wraps a store reference.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Runs the full search pipeline: prepare terms, run the three
    /// strategies, filter by branch/status, merge scores, rank, truncate to
    /// 50, then fetch relations among the survivors.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error`] on a storage failure. FTS syntax errors are
    /// swallowed (the strategy is skipped, not the whole search).
    pub fn search(&self, query: &str, scope: &BranchScope, status: StatusFilter) -> Result<SearchOutcome> {
        let terms = prepare_search_terms(query);
        if terms.is_empty() {
            return Ok(SearchOutcome::default());
        }

        let branch_id = match scope {
            BranchScope::Specific(name) => self.store.branch_id(name)?,
            BranchScope::All => None,
        };
        if matches!(scope, BranchScope::Specific(_)) && branch_id.is_none() {
            return Ok(SearchOutcome::default());
        }

        let mut relevance: HashMap<i64, f32> = HashMap::new();

        let keyword_matches = self.store.keyword_strategy(&terms, branch_id, status)?;
        for (entity_id, (count, max_weight)) in keyword_matches {
            let score = count as f32 * max_weight + KEYWORD_BONUS;
            *relevance.entry(entity_id).or_insert(0.0) += score;
        }

        match self.store.fts_strategy(&terms, branch_id, status) {
            Ok(fts_matches) => {
                for (entity_id, rank) in fts_matches {
                    *relevance.entry(entity_id).or_insert(0.0) += rank + FTS_BONUS;
                }
            }
            Err(crate::Error::FtsUnavailable(_)) => {
                tracing::warn!("fts strategy unavailable, continuing with keyword + like");
            }
            Err(err) => return Err(err),
        }

        let like_matches = self.store.like_strategy(&terms, branch_id, status)?;
        for (entity_id, score) in like_matches {
            *relevance.entry(entity_id).or_insert(0.0) += score + LIKE_BONUS;
        }

        let mut ranked: Vec<(i64, f32)> = relevance.into_iter().collect();
        let mut entities_by_id: HashMap<i64, Entity> = HashMap::new();
        for (id, _) in &ranked {
            if let Ok(entity) = self.store.get_entity_by_id(*id) {
                entities_by_id.insert(*id, entity);
            }
        }
        ranked.retain(|(id, _)| entities_by_id.contains_key(id));

        ranked.sort_by(|(id_a, score_a), (id_b, score_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let last_a = entities_by_id[id_a].last_accessed;
                    let last_b = entities_by_id[id_b].last_accessed;
                    last_b.cmp(&last_a)
                })
        });
        ranked.truncate(MAX_RESULTS);

        let entities: Vec<Entity> = ranked
            .into_iter()
            .filter_map(|(id, _)| entities_by_id.remove(&id))
            .collect();

        let ids: Vec<i64> = entities.iter().map(|e| e.id).collect();
        let relations = self.store.relations_among(&ids)?;

        Ok(SearchOutcome { entities, relations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityInput;

    fn store_with_entities() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .create_entity(
                "main",
                &EntityInput::new("Auth Service", "Service").with_observation("handles login"),
                "c",
                "c",
                1,
                1.0,
                &[("auth".to_string(), 2.0), ("login".to_string(), 1.5)],
            )
            .unwrap();
        store
            .create_entity(
                "main",
                &EntityInput::new("Database Pool", "Service").with_observation("manages connections"),
                "c",
                "c",
                1,
                1.0,
                &[("database".to_string(), 2.0)],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_search_empty_query_returns_empty() {
        let store = store_with_entities();
        let engine = SearchEngine::new(&store);
        let result = engine
            .search("", &BranchScope::default(), StatusFilter::ActiveOnly)
            .unwrap();
        assert!(result.entities.is_empty());
    }

    #[test]
    fn test_search_keyword_match() {
        let store = store_with_entities();
        let engine = SearchEngine::new(&store);
        let result = engine
            .search("auth", &BranchScope::default(), StatusFilter::ActiveOnly)
            .unwrap();
        assert!(result.entities.iter().any(|e| e.name == "Auth Service"));
    }

    #[test]
    fn test_search_truncates_and_ranks() {
        let store = store_with_entities();
        let engine = SearchEngine::new(&store);
        let result = engine
            .search("service", &BranchScope::default(), StatusFilter::ActiveOnly)
            .unwrap();
        assert!(result.entities.len() <= MAX_RESULTS);
    }

    #[test]
    fn test_search_unknown_branch_returns_empty() {
        let store = store_with_entities();
        let engine = SearchEngine::new(&store);
        let result = engine
            .search(
                "auth",
                &BranchScope::Specific("ghost".to_string()),
                StatusFilter::ActiveOnly,
            )
            .unwrap();
        assert!(result.entities.is_empty());
    }
}
