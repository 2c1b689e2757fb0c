//! Background task queue that mines similarity across entities and proposes
//! typed relations, without blocking the foreground `Orchestrator` calls.
//!
//! A single consumer drains a FIFO-per-priority queue at a fixed poll
//! interval. Every database call runs inside `tokio::task::spawn_blocking`
//! since the `Store` is synchronous; the queue and its in-memory index live
//! behind `tokio::sync::Mutex` so the async loop never contends with a
//! `std::sync` primitive across an await point.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::models::{Confidence, Entity, EntityStatus, SimilarityMatch};
use crate::similarity::SimilarityEngine;
use crate::storage::Store;

/// Composite similarity score at/above which the indexer classifies a
/// suggestion as auto-creatable by the Orchestrator's write path.
pub const AUTO_RELATION_THRESHOLD: f32 = 0.78;

const OTHER_ENTITY_SAMPLE: usize = 20;
const CLEANUP_BATCH: usize = 50;
const SUGGESTION_LIMIT: usize = 10;

/// Queue priority. Drained high before normal before low; FIFO within a
/// priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Background maintenance sweeps.
    Low,
    /// Ordinary post-write indexing.
    Normal,
    /// User-triggered relationship detection.
    High,
}

/// One unit of background work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Extract and store the keyword set for one entity.
    IndexEntity {
        /// Branch the entity belongs to.
        branch: String,
        /// Entity id.
        entity_id: i64,
    },
    /// Run similarity scoring against other entities in the branch.
    DetectRelationships {
        /// Branch the entity belongs to.
        branch: String,
        /// Entity id.
        entity_id: i64,
    },
    /// Re-index the first batch of entities in every branch.
    CleanupStale,
}

impl Task {
    fn dedup_key(&self) -> (&'static str, Option<i64>, String) {
        match self {
            Self::IndexEntity { branch, entity_id } => ("index_entity", Some(*entity_id), branch.clone()),
            Self::DetectRelationships { branch, entity_id } => {
                ("detect_relationships", Some(*entity_id), branch.clone())
            }
            Self::CleanupStale => ("cleanup_stale", None, String::new()),
        }
    }
}

/// In-memory indexing result for one entity, rebuilt on every `IndexEntity`/
/// `DetectRelationships` pass.
#[derive(Debug, Clone, Default)]
pub struct IndexEntry {
    /// Keywords extracted from the entity's name, type, and observations.
    pub keywords: HashSet<String>,
    /// Similarity matches at or above medium confidence, most recent run.
    pub suggested_relations: Vec<SimilarityMatch>,
    /// Unix timestamp of the most recent indexing pass.
    pub last_indexed: u64,
}

struct Queued {
    task: Task,
    priority: Priority,
}

struct Inner {
    store: Arc<Store>,
    entries: Mutex<HashMap<i64, IndexEntry>>,
    queue: Mutex<VecDeque<Queued>>,
    pending: Mutex<HashSet<(&'static str, Option<i64>, String)>>,
    shutdown: Notify,
    poll_interval: Duration,
}

/// Background indexer: owns the task queue and the in-memory relationship
/// suggestion index.
pub struct Indexer {
    inner: Arc<Inner>,
}

impl Indexer {
    /// Builds an indexer over `store`, polling its queue every
    /// `poll_interval`.
    #[must_use]
    pub fn new(store: Arc<Store>, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                entries: Mutex::new(HashMap::new()),
                queue: Mutex::new(VecDeque::new()),
                pending: Mutex::new(HashSet::new()),
                shutdown: Notify::new(),
                poll_interval,
            }),
        }
    }

    /// Enqueues a task, skipping it if an equivalent task (same kind, entity,
    /// and branch) is already queued.
    pub async fn enqueue(&self, task: Task, priority: Priority) {
        let key = task.dedup_key();
        let mut pending = self.inner.pending.lock().await;
        if !pending.insert(key) {
            return;
        }
        drop(pending);
        self.inner.queue.lock().await.push_back(Queued { task, priority });
    }

    /// Spawns the consumer loop as a background task. The returned handle
    /// completes once [`Indexer::shutdown`] is called.
    #[must_use]
    pub fn spawn(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run().await })
    }

    /// Signals the consumer loop to stop after its current task.
    pub fn shutdown(&self) {
        self.inner.shutdown.notify_one();
    }

    /// Returns up to 10 relationship suggestions for `entity_id`, highest
    /// confidence first.
    pub async fn suggestions_for(&self, entity_id: i64) -> Vec<SimilarityMatch> {
        let entries = self.inner.entries.lock().await;
        let Some(entry) = entries.get(&entity_id) else {
            return Vec::new();
        };
        let mut matches = entry.suggested_relations.clone();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(SUGGESTION_LIMIT);
        matches
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.drain_one().await {
                        tracing::warn!(error = %err, "indexer task failed");
                    }
                }
                () = self.shutdown.notified() => {
                    tracing::debug!("indexer shutting down");
                    break;
                }
            }
        }
    }

    async fn pop_next(&self) -> Option<Queued> {
        let mut queue = self.queue.lock().await;
        let top_priority = queue.iter().map(|q| q.priority).max()?;
        let best = queue.iter().position(|q| q.priority == top_priority)?;
        let queued = queue.remove(best)?;
        drop(queue);
        self.pending.lock().await.remove(&queued.task.dedup_key());
        Some(queued)
    }

    async fn drain_one(self: &Arc<Self>) -> crate::Result<()> {
        let Some(queued) = self.pop_next().await else {
            return Ok(());
        };

        match queued.task {
            Task::IndexEntity { branch, entity_id } => self.index_entity(&branch, entity_id).await,
            Task::DetectRelationships { branch, entity_id } => {
                self.detect_relationships(&branch, entity_id).await
            }
            Task::CleanupStale => self.cleanup_stale().await,
        }
    }

    async fn index_entity(self: &Arc<Self>, branch: &str, entity_id: i64) -> crate::Result<()> {
        let store = Arc::clone(&self.store);
        let entity = tokio::task::spawn_blocking(move || store.get_entity_by_id(entity_id))
            .await
            .map_err(|e| crate::Error::BackgroundFailure(e.to_string()))??;

        let mut keywords: HashSet<String> = crate::text::tokenize(&entity.entity_type).into_iter().collect();
        keywords.extend(crate::text::tokenize(&entity.name));
        keywords.extend(crate::text::tokenize(&entity.joined_observations()));

        let mut entries = self.entries.lock().await;
        let entry = entries.entry(entity_id).or_default();
        entry.keywords = keywords;
        entry.last_indexed = crate::current_timestamp();
        drop(entries);

        self.enqueue_inner(
            Task::DetectRelationships {
                branch: branch.to_string(),
                entity_id,
            },
            Priority::Normal,
        )
        .await;

        tracing::debug!(entity_id, branch, "indexed entity");
        Ok(())
    }

    async fn detect_relationships(self: &Arc<Self>, branch: &str, entity_id: i64) -> crate::Result<()> {
        let store = Arc::clone(&self.store);
        let branch_owned = branch.to_string();
        let (target, candidates) = tokio::task::spawn_blocking(move || {
            let target = store.get_entity_by_id(entity_id)?;
            let mut candidates = store.list_entities_by_status(
                &branch_owned,
                &[EntityStatus::Active, EntityStatus::Draft],
            )?;
            candidates.truncate(OTHER_ENTITY_SAMPLE);
            crate::Result::Ok((target, candidates))
        })
        .await
        .map_err(|e| crate::Error::BackgroundFailure(e.to_string()))??;

        let suggestions: Vec<SimilarityMatch> = SimilarityEngine::detect_similar(&target, &candidates)
            .into_iter()
            .filter(|m| matches!(m.confidence, Confidence::High | Confidence::Medium))
            .collect();

        let mut entries = self.entries.lock().await;
        let entry = entries.entry(entity_id).or_default();
        entry.suggested_relations = suggestions;
        entry.last_indexed = crate::current_timestamp();
        drop(entries);

        tracing::debug!(entity_id, branch, "detected relationships");
        Ok(())
    }

    async fn cleanup_stale(self: &Arc<Self>) -> crate::Result<()> {
        let store = Arc::clone(&self.store);
        let branches = tokio::task::spawn_blocking(move || store.list_branches())
            .await
            .map_err(|e| crate::Error::BackgroundFailure(e.to_string()))??;

        for branch in branches {
            let store = Arc::clone(&self.store);
            let branch_name = branch.branch.name.clone();
            let entities: Vec<Entity> = tokio::task::spawn_blocking({
                let branch_name = branch_name.clone();
                move || {
                    store.list_entities_by_status(
                        &branch_name,
                        &[EntityStatus::Active, EntityStatus::Draft, EntityStatus::Deprecated],
                    )
                }
            })
            .await
            .map_err(|e| crate::Error::BackgroundFailure(e.to_string()))??;

            for entity in entities.into_iter().take(CLEANUP_BATCH) {
                self.enqueue_inner(
                    Task::IndexEntity {
                        branch: branch_name.clone(),
                        entity_id: entity.id,
                    },
                    Priority::Low,
                )
                .await;
            }
        }

        tracing::debug!("cleanup_stale enqueued re-indexing sweep");
        Ok(())
    }

    async fn enqueue_inner(self: &Arc<Self>, task: Task, priority: Priority) {
        let key = task.dedup_key();
        let mut pending = self.pending.lock().await;
        if !pending.insert(key) {
            return;
        }
        drop(pending);
        self.queue.lock().await.push_back(Queued { task, priority });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_dedups_equivalent_tasks() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let indexer = Indexer::new(store, Duration::from_millis(10));
        indexer
            .enqueue(
                Task::IndexEntity {
                    branch: "main".to_string(),
                    entity_id: 1,
                },
                Priority::Normal,
            )
            .await;
        indexer
            .enqueue(
                Task::IndexEntity {
                    branch: "main".to_string(),
                    entity_id: 1,
                },
                Priority::High,
            )
            .await;
        assert_eq!(indexer.inner.queue.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_suggestions_for_unknown_entity_is_empty() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let indexer = Indexer::new(store, Duration::from_millis(10));
        assert!(indexer.suggestions_for(999).await.is_empty());
    }

    #[tokio::test]
    async fn test_index_entity_populates_keywords() {
        use crate::models::EntityInput;

        let store = Arc::new(Store::open_in_memory().unwrap());
        let entity = store
            .create_entity(
                "main",
                &EntityInput::new("Auth Service", "service").with_observation("handles JWT tokens"),
                "handles JWT tokens",
                "handles JWT tokens",
                3,
                1.0,
                &[],
            )
            .unwrap();

        let indexer = Indexer::new(Arc::clone(&store), Duration::from_millis(10));
        indexer.inner.index_entity("main", entity.id).await.unwrap();

        let entries = indexer.inner.entries.lock().await;
        let entry = entries.get(&entity.id).unwrap();
        assert!(entry.keywords.contains("auth") || entry.keywords.contains("service"));
    }

    #[tokio::test]
    async fn test_shutdown_stops_run_loop() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let indexer = Indexer::new(store, Duration::from_millis(5));
        let handle = indexer.spawn();
        indexer.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
