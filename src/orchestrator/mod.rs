//! The public API: wraps the [`Store`] with write-time policy (compression,
//! keyword extraction, auto-relation creation), read-time similarity
//! expansion, and process lifecycle (migration, backups, the background
//! indexer).

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::indexer::{Indexer, Priority, Task};
use crate::io::{
    backup_timestamp, discover_legacy_files, export_branch, parse_jsonl, write_jsonl, BranchExport, JsonlRecord,
    JsonlRelation,
};
use crate::models::{
    Branch, BranchInfo, BranchScope, Confidence, CrossReference, Entity, EntityInput, EntityStatus,
    Relation, RelationInput, SearchOutcome, StatusFilter, MAIN_BRANCH,
};
use crate::search::SearchEngine;
use crate::similarity::SimilarityEngine;
use crate::storage::Store;
use crate::text::{optimize, CompressionLevel};
use crate::{current_timestamp, Error, Result};

/// Minimum composite similarity score for the write-path auto-relation
/// policy, distinct from a `high`-confidence match (either condition
/// triggers relation creation).
const AUTO_RELATE_SCORE: f32 = 0.5;
const OTHER_ENTITY_CAP: usize = 200;

/// Outcome of a batch entity-creation call: per-item failures never abort
/// the batch.
#[derive(Debug, Default)]
pub struct CreateEntitiesOutcome {
    /// Entities that were created.
    pub created: Vec<Entity>,
    /// Relations auto-created (or, for `import`, explicitly created)
    /// alongside this batch.
    pub relations_created: Vec<Relation>,
    /// `(name, error message)` for entities that failed to create.
    pub failed: Vec<(String, String)>,
}

/// Public entry point: opens the store, runs pending migrations, and starts
/// the background indexer.
pub struct Orchestrator {
    store: Arc<Store>,
    indexer: Arc<Indexer>,
    indexer_handle: AsyncMutex<Option<JoinHandle<()>>>,
    config: Config,
    backups_dir: PathBuf,
    lock_path: PathBuf,
}

impl Orchestrator {
    /// Opens the store at `config.memory_path`, migrates any legacy JSON
    /// files discovered there, and starts the background indexer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the data directory or database cannot
    /// be opened, or if a discovered legacy file cannot be read.
    pub async fn open(config: Config) -> Result<Self> {
        let memory_dir = config.memory_path.join(".memory");
        std::fs::create_dir_all(&memory_dir).map_err(|e| Error::Storage {
            operation: "create_memory_dir".to_string(),
            cause: e.to_string(),
        })?;
        let backups_dir = memory_dir.join("backups");
        std::fs::create_dir_all(&backups_dir).map_err(|e| Error::Storage {
            operation: "create_backups_dir".to_string(),
            cause: e.to_string(),
        })?;
        let lock_path = memory_dir.join(".lock");
        let _ = std::fs::write(&lock_path, current_timestamp().to_string());

        let db_path = memory_dir.join("memory.db");
        let store = Arc::new(Store::open(&db_path)?);
        let indexer = Arc::new(Indexer::new(Arc::clone(&store), config.indexer_poll_interval));

        let orchestrator = Self {
            store,
            indexer,
            indexer_handle: AsyncMutex::new(None),
            config,
            backups_dir,
            lock_path,
        };

        orchestrator.run_pending_migration().await?;

        let handle = orchestrator.indexer.spawn();
        *orchestrator.indexer_handle.lock().await = Some(handle);
        orchestrator.indexer.enqueue(Task::CleanupStale, Priority::Low).await;

        Ok(orchestrator)
    }

    /// Trims backups to the configured retention, shuts down the indexer,
    /// and releases the advisory lockfile.
    pub async fn close(&self) {
        if let Err(err) = self.trim_backups() {
            tracing::warn!(error = %err, "failed to trim backups");
        }
        self.indexer.shutdown();
        if let Some(handle) = self.indexer_handle.lock().await.take() {
            let _ = handle.await;
        }
        let _ = std::fs::remove_file(&self.lock_path);
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| Error::BackgroundFailure(e.to_string()))?
    }

    // -- Branches -----------------------------------------------------------

    /// Lists every branch with aggregated counts.
    pub async fn list_branches(&self) -> Result<Vec<BranchInfo>> {
        self.blocking(|store| store.list_branches()).await
    }

    /// Creates a branch explicitly.
    pub async fn create_branch(&self, name: &str, purpose: Option<&str>) -> Result<Branch> {
        let (name, purpose) = (name.to_string(), purpose.map(str::to_string));
        self.blocking(move |store| store.create_branch(&name, purpose.as_deref())).await
    }

    /// Deletes a non-`main` branch.
    pub async fn delete_branch(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.blocking(move |store| store.delete_branch(&name)).await
    }

    // -- Entities -------------------------------------------------------------

    /// Write path: optimizes and extracts keywords for each entity, inserts
    /// it, snapshots the branch, enqueues indexing, and (if enabled)
    /// auto-creates relations for high-confidence similarity matches.
    /// Per-item failures are reported in [`CreateEntitiesOutcome::failed`]
    /// rather than aborting the batch.
    pub async fn create_entities(
        &self,
        branch: &str,
        inputs: Vec<EntityInput>,
        auto_create_relations: bool,
    ) -> Result<CreateEntitiesOutcome> {
        let mut outcome = CreateEntitiesOutcome::default();

        for input in inputs {
            let name = input.name.clone();
            match self.create_one_entity(branch, input).await {
                Ok(entity) => outcome.created.push(entity),
                Err(err) => outcome.failed.push((name, err.to_string())),
            }
        }

        if outcome.created.is_empty() {
            return Ok(outcome);
        }

        if let Err(err) = self.snapshot_branch(branch).await {
            tracing::warn!(error = %err, branch, "failed to write branch snapshot");
        }

        for entity in &outcome.created {
            self.indexer
                .enqueue(
                    Task::IndexEntity {
                        branch: branch.to_string(),
                        entity_id: entity.id,
                    },
                    Priority::Normal,
                )
                .await;
        }

        if auto_create_relations && self.config.auto_create_relations {
            for entity in outcome.created.clone() {
                match self.auto_relate(branch, &entity).await {
                    Ok(mut relations) => outcome.relations_created.append(&mut relations),
                    Err(err) => {
                        tracing::warn!(error = %err, entity = %entity.name, "auto-relation creation failed");
                    }
                }
            }
        }

        Ok(outcome)
    }

    async fn create_one_entity(&self, branch: &str, input: EntityInput) -> Result<Entity> {
        if input.name.trim().is_empty() || input.entity_type.trim().is_empty() {
            return Err(Error::Invalid("entity name and type must not be empty".to_string()));
        }

        let optimized_observations: Vec<String> = input
            .observations
            .iter()
            .map(|observation| optimize(observation, CompressionLevel::Aggressive).optimized)
            .collect();
        let optimized_content = optimized_observations.join(" ");

        let rendering = serde_json::json!({
            "name": input.name,
            "entityType": input.entity_type,
            "observations": input.observations,
        })
        .to_string();
        let keyword_pass = optimize(&rendering, CompressionLevel::Aggressive);

        let branch = branch.to_string();
        self.blocking(move |store| {
            store.create_entity(
                &branch,
                &input,
                &rendering,
                &optimized_content,
                keyword_pass.token_count,
                keyword_pass.compression_ratio,
                &keyword_pass.keywords,
            )
        })
        .await
    }

    async fn auto_relate(&self, branch: &str, entity: &Entity) -> Result<Vec<Relation>> {
        let branch_owned = branch.to_string();
        let candidates = self
            .blocking({
                let branch_owned = branch_owned.clone();
                move |store| {
                    store.list_entities_by_status(&branch_owned, &[EntityStatus::Active, EntityStatus::Draft])
                }
            })
            .await?;

        let matches = SimilarityEngine::detect_similar(entity, &candidates);
        let to_create: Vec<RelationInput> = matches
            .into_iter()
            .filter(|m| matches!(m.confidence, Confidence::High) || m.score > AUTO_RELATE_SCORE)
            .map(|m| RelationInput::new(entity.name.clone(), m.candidate.name, m.suggested_relation_type))
            .collect();

        if to_create.is_empty() {
            return Ok(Vec::new());
        }

        self.blocking(move |store| store.create_relations(&branch_owned, &to_create, true)).await
    }

    /// Loads, mutates, and stores a new status for an entity.
    pub async fn update_entity_status(
        &self,
        branch: &str,
        name: &str,
        status: EntityStatus,
        reason: Option<&str>,
    ) -> Result<Entity> {
        let (branch, name, reason) = (branch.to_string(), name.to_string(), reason.map(str::to_string));
        self.blocking(move |store| store.update_entity(&branch, &name, None, Some(status), reason.as_deref(), None))
            .await
    }

    /// Deletes entities by name; absent names are silently skipped.
    pub async fn delete_entities(&self, branch: &str, names: &[String]) -> Result<usize> {
        let (branch, names) = (branch.to_string(), names.to_vec());
        self.blocking(move |store| store.delete_entities(&branch, &names)).await
    }

    /// Appends observations, returning the contents actually added.
    pub async fn add_observations(&self, branch: &str, entity_name: &str, contents: &[String]) -> Result<Vec<String>> {
        let (branch, entity_name, contents) = (branch.to_string(), entity_name.to_string(), contents.to_vec());
        self.blocking(move |store| store.add_observations(&branch, &entity_name, &contents)).await
    }

    /// Deletes observations by exact content match.
    pub async fn delete_observations(&self, branch: &str, entity_name: &str, contents: &[String]) -> Result<usize> {
        let (branch, entity_name, contents) = (branch.to_string(), entity_name.to_string(), contents.to_vec());
        self.blocking(move |store| store.delete_observations(&branch, &entity_name, &contents)).await
    }

    // -- Relations ------------------------------------------------------------

    /// Creates relations by name; silently skips pairs with a missing
    /// endpoint.
    pub async fn create_relations(&self, branch: &str, relations: &[RelationInput]) -> Result<Vec<Relation>> {
        let (branch, relations) = (branch.to_string(), relations.to_vec());
        self.blocking(move |store| store.create_relations(&branch, &relations, false)).await
    }

    /// Deletes relations by key.
    pub async fn delete_relations(&self, branch: &str, relations: &[RelationInput]) -> Result<usize> {
        let (branch, relations) = (branch.to_string(), relations.to_vec());
        self.blocking(move |store| store.delete_relations(&branch, &relations)).await
    }

    // -- Cross-references -------------------------------------------------

    /// Creates cross-references from `entity_name` to each of `target_names`
    /// in `target_branch`.
    pub async fn create_cross_references(
        &self,
        branch: &str,
        entity_name: &str,
        target_branch: &str,
        target_names: &[String],
    ) -> Result<Vec<CrossReference>> {
        let (branch, entity_name, target_branch, target_names) = (
            branch.to_string(),
            entity_name.to_string(),
            target_branch.to_string(),
            target_names.to_vec(),
        );
        self.blocking(move |store| store.create_cross_references(&branch, &entity_name, &target_branch, &target_names))
            .await
    }

    /// Returns cross-references for an entity, grouped by target branch.
    pub async fn get_cross_references(&self, branch: &str, entity_name: &str) -> Result<HashMap<String, Vec<String>>> {
        let (branch, entity_name) = (branch.to_string(), entity_name.to_string());
        self.blocking(move |store| store.get_cross_references(&branch, &entity_name)).await
    }

    // -- Search -----------------------------------------------------------

    /// Read path: runs the Search Engine, then for branch-scoped,
    /// non-empty results, expands with high/medium-confidence similarity
    /// matches against other entities in the branch plus their relations.
    /// `all_branches` searches skip expansion.
    pub async fn search(&self, query: &str, scope: BranchScope, status: StatusFilter) -> Result<SearchOutcome> {
        let (query_owned, scope_for_search) = (query.to_string(), scope.clone());
        let mut outcome = self
            .blocking(move |store| SearchEngine::new(store).search(&query_owned, &scope_for_search, status))
            .await?;

        if let BranchScope::Specific(branch) = &scope {
            if !outcome.entities.is_empty() {
                if let Err(err) = self.expand_with_similarity(branch, &mut outcome, status).await {
                    tracing::warn!(error = %err, branch, "similarity expansion failed");
                }
            }
        }

        Ok(outcome)
    }

    async fn expand_with_similarity(&self, branch: &str, outcome: &mut SearchOutcome, status: StatusFilter) -> Result<()> {
        let result_ids: HashSet<i64> = outcome.entities.iter().map(|e| e.id).collect();
        let branch_owned = branch.to_string();
        let mut candidates = self
            .blocking(move |store| {
                store.list_entities_by_status(&branch_owned, &[EntityStatus::Active, EntityStatus::Draft])
            })
            .await?;
        candidates.retain(|c| !result_ids.contains(&c.id) && status.matches(c.status));
        candidates.truncate(OTHER_ENTITY_CAP);

        let mut added: Vec<Entity> = Vec::new();
        let mut seen = result_ids;
        for target in outcome.entities.clone() {
            for candidate_match in SimilarityEngine::detect_similar(&target, &candidates) {
                if matches!(candidate_match.confidence, Confidence::High | Confidence::Medium)
                    && seen.insert(candidate_match.candidate.id)
                {
                    added.push(candidate_match.candidate);
                }
            }
        }

        if added.is_empty() {
            return Ok(());
        }
        outcome.entities.extend(added);

        let ids: Vec<i64> = outcome.entities.iter().map(|e| e.id).collect();
        outcome.relations = self.blocking(move |store| store.relations_among(&ids)).await?;
        Ok(())
    }

    /// Direct lookup by exact name, plus every relation involving any of
    /// them within the branch, deduplicated.
    pub async fn open_entities(&self, names: &[String], branch: &str, status: StatusFilter) -> Result<SearchOutcome> {
        let (names, branch) = (names.to_vec(), branch.to_string());
        self.blocking(move |store| {
            let mut entities = Vec::new();
            for name in &names {
                match store.get_entity(&branch, name) {
                    Ok(entity) if status.matches(entity.status) => entities.push(entity),
                    Ok(_) | Err(Error::NotFound(_)) => {}
                    Err(err) => return Err(err),
                }
            }
            let ids: Vec<i64> = entities.iter().map(|e| e.id).collect();
            let relations = store.relations_among(&ids)?;
            Ok(SearchOutcome { entities, relations })
        })
        .await
    }

    /// Scores every non-`main` branch by name/purpose token overlap with
    /// `content` (and `entity_type`, if given), plus a small rule table for
    /// doc- and demo-flavored content. Returns the best-scoring branch, or
    /// `main` if none score above zero.
    pub async fn suggest_branch(&self, entity_type: Option<&str>, content: &str) -> Result<String> {
        let branches = self.list_branches().await?;
        let content_tokens: HashSet<String> = crate::text::tokenize(content).into_iter().collect();
        let type_tokens: HashSet<String> = entity_type
            .map(crate::text::tokenize)
            .unwrap_or_default()
            .into_iter()
            .collect();

        const DOC_MARKERS: [&str; 4] = ["doc", "documentation", "spec", "guide"];
        const DEMO_MARKERS: [&str; 4] = ["demo", "example", "sample", "test"];
        let all_tokens: HashSet<&String> = content_tokens.iter().chain(type_tokens.iter()).collect();
        let wants_doc = all_tokens.iter().any(|t| DOC_MARKERS.contains(&t.as_str()));
        let wants_demo = all_tokens.iter().any(|t| DEMO_MARKERS.contains(&t.as_str()));

        let mut best: Option<(String, u32)> = None;
        for info in branches {
            if info.branch.is_main() {
                continue;
            }
            let name_tokens: HashSet<String> = crate::text::tokenize(&info.branch.name).into_iter().collect();
            let purpose_tokens: HashSet<String> = info
                .branch
                .purpose
                .as_deref()
                .map(crate::text::tokenize)
                .unwrap_or_default()
                .into_iter()
                .collect();

            let mut score = content_tokens.intersection(&name_tokens).count() as u32
                + content_tokens.intersection(&purpose_tokens).count() as u32;
            if wants_doc && info.branch.name.to_lowercase().contains("doc") {
                score += 1;
            }
            if wants_demo && info.branch.name.to_lowercase().contains("demo") {
                score += 1;
            }

            if score > 0 && best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
                best = Some((info.branch.name, score));
            }
        }

        Ok(best.map_or_else(|| MAIN_BRANCH.to_string(), |(name, _)| name))
    }

    // -- Export / Import ----------------------------------------------------

    /// Reads all entities and relations in a branch and returns them in the
    /// pretty JSON export schema.
    pub async fn export_branch(&self, branch: &str) -> Result<BranchExport> {
        let branch = branch.to_string();
        self.blocking(move |store| {
            let entities = store.list_entities_by_status(&branch, EntityStatus::all())?;
            let ids: Vec<i64> = entities.iter().map(|e| e.id).collect();
            let relations = store.relations_among(&ids)?;
            let by_id: HashMap<i64, String> = entities.iter().map(|e| (e.id, e.name.clone())).collect();
            Ok(export_branch(&branch, &entities, &relations, |id| by_id.get(&id).cloned()))
        })
        .await
    }

    /// Imports an exported graph into `branch` via `create_entities` and
    /// `create_relations`.
    pub async fn import(&self, branch: &str, export: &BranchExport) -> Result<CreateEntitiesOutcome> {
        let inputs: Vec<EntityInput> = export
            .entities
            .iter()
            .map(|e| {
                let mut input = EntityInput::new(e.name.clone(), e.entity_type.clone());
                input.observations = e.observations.clone();
                input.status = EntityStatus::parse(&e.status);
                input
            })
            .collect();

        let mut outcome = self.create_entities(branch, inputs, false).await?;

        let relation_inputs: Vec<RelationInput> = export
            .relations
            .iter()
            .map(|r| RelationInput::new(r.from.clone(), r.to.clone(), r.relation_type.clone()))
            .collect();
        if !relation_inputs.is_empty() {
            let branch_owned = branch.to_string();
            let created = self
                .blocking(move |store| store.create_relations(&branch_owned, &relation_inputs, false))
                .await?;
            outcome.relations_created.extend(created);
        }

        Ok(outcome)
    }

    // -- Backups & migration ------------------------------------------------

    async fn snapshot_branch(&self, branch: &str) -> Result<()> {
        let branch_owned = branch.to_string();
        let (entities, relations) = self
            .blocking(move |store| {
                let entities = store.list_entities_by_status(&branch_owned, EntityStatus::all())?;
                let ids: Vec<i64> = entities.iter().map(|e| e.id).collect();
                let relations = store.relations_among(&ids)?;
                Ok((entities, relations))
            })
            .await?;

        let by_id: HashMap<i64, String> = entities.iter().map(|e| (e.id, e.name.clone())).collect();
        let mut records: Vec<JsonlRecord> = Vec::with_capacity(entities.len() + relations.len());

        for entity in &entities {
            let last_updated = chrono::DateTime::from_timestamp(i64::try_from(entity.updated_at).unwrap_or(0), 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            records.push(JsonlRecord::Entity {
                name: entity.name.clone(),
                entity_type: entity.entity_type.clone(),
                observations: entity.observations.iter().map(|o| o.content.clone()).collect(),
                status: entity.status.as_str().to_string(),
                status_reason: entity.status_reason.clone(),
                last_updated,
                cross_references: Vec::new(),
            });
        }
        for relation in &relations {
            let (Some(from), Some(to)) = (by_id.get(&relation.from_entity_id), by_id.get(&relation.to_entity_id)) else {
                continue;
            };
            records.push(JsonlRecord::Relation(JsonlRelation {
                from: from.clone(),
                to: to.clone(),
                relation_type: relation.relation_type.clone(),
            }));
        }

        let ts = backup_timestamp(chrono::Utc::now());
        let path = self.backups_dir.join(format!("{branch}_{ts}.json"));
        std::fs::write(&path, write_jsonl(&records)).map_err(|e| Error::Storage {
            operation: "write_snapshot".to_string(),
            cause: e.to_string(),
        })
    }

    async fn run_pending_migration(&self) -> Result<()> {
        let legacy_files = discover_legacy_files(&self.config.memory_path);
        for legacy in legacy_files {
            let contents = std::fs::read_to_string(&legacy.path).map_err(|e| Error::Storage {
                operation: "read_legacy_file".to_string(),
                cause: e.to_string(),
            })?;
            let records = parse_jsonl(&contents);

            let mut inputs = Vec::new();
            let mut relation_inputs = Vec::new();
            for record in records {
                match record {
                    JsonlRecord::Entity {
                        name,
                        entity_type,
                        observations,
                        status,
                        status_reason,
                        ..
                    } => {
                        let mut input = EntityInput::new(name, entity_type);
                        input.observations = observations;
                        input.status = EntityStatus::parse(&status);
                        input.status_reason = status_reason;
                        inputs.push(input);
                    }
                    JsonlRecord::Relation(relation) => {
                        relation_inputs.push(RelationInput::new(relation.from, relation.to, relation.relation_type));
                    }
                }
            }

            if !inputs.is_empty() {
                self.create_entities(&legacy.branch, inputs, false).await?;
            }
            if !relation_inputs.is_empty() {
                let branch_owned = legacy.branch.clone();
                self.blocking(move |store| store.create_relations(&branch_owned, &relation_inputs, false))
                    .await?;
            }

            let ts = backup_timestamp(chrono::Utc::now());
            let backup_path = self.backups_dir.join(format!("migration_{}_{ts}.json", legacy.branch));
            std::fs::copy(&legacy.path, &backup_path).map_err(|e| Error::Storage {
                operation: "write_migration_backup".to_string(),
                cause: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn trim_backups(&self) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(&self.backups_dir)
            .map_err(|e| Error::Storage {
                operation: "read_backups_dir".to_string(),
                cause: e.to_string(),
            })?
            .filter_map(std::result::Result::ok)
            .collect();
        entries.sort_by_key(std::fs::DirEntry::file_name);

        let retention = self.config.backup_retention;
        if entries.len() > retention {
            for entry in &entries[..entries.len() - retention] {
                let _ = std::fs::remove_file(entry.path());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            memory_path: dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_open_seeds_main_branch() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::open(test_config(dir.path())).await.unwrap();
        let branches = orchestrator.list_branches().await.unwrap();
        assert!(branches.iter().any(|b| b.branch.name == MAIN_BRANCH));
        orchestrator.close().await;
    }

    #[tokio::test]
    async fn test_create_entities_reports_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::open(test_config(dir.path())).await.unwrap();

        let outcome = orchestrator
            .create_entities(
                "main",
                vec![
                    EntityInput::new("Auth", "Service").with_observation("handles login"),
                    EntityInput::new("", "Service"),
                ],
                false,
            )
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        orchestrator.close().await;
    }

    #[tokio::test]
    async fn test_create_entities_auto_creates_relation() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::open(test_config(dir.path())).await.unwrap();

        orchestrator
            .create_entities(
                "main",
                vec![EntityInput::new("Dashboard Component Manager", "component")
                    .with_observation("renders widgets")],
                true,
            )
            .await
            .unwrap();
        let outcome = orchestrator
            .create_entities(
                "main",
                vec![EntityInput::new("Dashboard Grid System", "component").with_observation("renders a grid")],
                true,
            )
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 1);
        orchestrator.close().await;
    }

    #[tokio::test]
    async fn test_open_entities_dedupes_relations() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::open(test_config(dir.path())).await.unwrap();

        orchestrator
            .create_entities(
                "main",
                vec![
                    EntityInput::new("Auth", "Service"),
                    EntityInput::new("Database", "Service"),
                ],
                false,
            )
            .await
            .unwrap();
        orchestrator
            .create_relations("main", &[RelationInput::new("Auth", "Database", "depends_on")])
            .await
            .unwrap();

        let outcome = orchestrator
            .open_entities(&["Auth".to_string(), "Database".to_string()], "main", StatusFilter::Any)
            .await
            .unwrap();
        assert_eq!(outcome.entities.len(), 2);
        assert_eq!(outcome.relations.len(), 1);
        orchestrator.close().await;
    }

    #[tokio::test]
    async fn test_suggest_branch_defaults_to_main() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::open(test_config(dir.path())).await.unwrap();
        let suggestion = orchestrator.suggest_branch(None, "unrelated content").await.unwrap();
        assert_eq!(suggestion, MAIN_BRANCH);
        orchestrator.close().await;
    }

    #[tokio::test]
    async fn test_suggest_branch_matches_doc_branch() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::open(test_config(dir.path())).await.unwrap();
        orchestrator.create_branch("docs", Some("documentation guides")).await.unwrap();

        let suggestion = orchestrator.suggest_branch(None, "a new spec document").await.unwrap();
        assert_eq!(suggestion, "docs");
        orchestrator.close().await;
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::open(test_config(dir.path())).await.unwrap();

        orchestrator
            .create_entities(
                "main",
                vec![EntityInput::new("Auth", "Service").with_observation("handles login")],
                false,
            )
            .await
            .unwrap();

        let export = orchestrator.export_branch("main").await.unwrap();
        assert_eq!(export.stats.entity_count, 1);

        orchestrator.create_branch("copy", None).await.unwrap();
        let outcome = orchestrator.import("copy", &export).await.unwrap();
        assert_eq!(outcome.created.len(), 1);
        orchestrator.close().await;
    }
}
