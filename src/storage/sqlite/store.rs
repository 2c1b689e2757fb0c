//! The persistence layer: transactional CRUD over branches, entities,
//! observations, relations, keywords, and cross-references, backed by an
//! embedded `SQLite` database with an FTS5 shadow index.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::current_timestamp;
use crate::models::{
    is_valid_branch_name, Branch, BranchInfo, CrossReference, Entity, EntityInput, EntityStatus,
    Keyword, Observation, Relation, RelationInput, StatusFilter, MAIN_BRANCH,
};
use crate::{Error, Result};

use super::connection::{acquire_lock, configure_connection};
use super::schema::{SCHEMA, SEED_MAIN_BRANCH};
use super::sql::{contains_pattern, escape_like_wildcards};

/// The embedded store. Cheap to clone-by-reference (wraps a mutex around a
/// single connection); `SQLite`'s WAL mode and busy-timeout make this safe
/// under concurrent callers even without true connection pooling.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if absent) the database at `path`, applying schema
    /// migrations and seeding the `main` branch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be opened or the schema
    /// cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage {
                operation: "create_data_dir".to_string(),
                cause: e.to_string(),
            })?;
        }

        let conn = Connection::open(path)?;
        configure_connection(&conn)?;
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(SEED_MAIN_BRANCH)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory database. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure_connection(&conn)?;
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(SEED_MAIN_BRANCH)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // -- Branches ---------------------------------------------------------

    /// Resolves a branch name to its row, creating it implicitly if absent
    /// (per the data model: branches come into existence on first
    /// reference).
    fn ensure_branch(conn: &Connection, name: &str) -> Result<Branch> {
        if !is_valid_branch_name(name) {
            return Err(Error::Invalid(format!("invalid branch name '{name}'")));
        }

        if let Some(branch) = Self::find_branch(conn, name)? {
            return Ok(branch);
        }

        let now = current_timestamp();
        conn.execute(
            "INSERT INTO branches (name, purpose, created_at, updated_at) VALUES (?1, NULL, ?2, ?2)",
            params![name, now as i64],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Branch {
            id,
            name: name.to_string(),
            purpose: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn find_branch(conn: &Connection, name: &str) -> Result<Option<Branch>> {
        conn.query_row(
            "SELECT id, name, purpose, created_at, updated_at FROM branches WHERE name = ?1",
            params![name],
            Self::row_to_branch,
        )
        .optional()
        .map_err(Error::from)
    }

    fn row_to_branch(row: &rusqlite::Row<'_>) -> rusqlite::Result<Branch> {
        Ok(Branch {
            id: row.get(0)?,
            name: row.get(1)?,
            purpose: row.get(2)?,
            created_at: row.get::<_, i64>(3)? as u64,
            updated_at: row.get::<_, i64>(4)? as u64,
        })
    }

    /// Creates a branch explicitly with an optional purpose.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] if the name already exists, or
    /// [`Error::Invalid`] for a malformed name.
    pub fn create_branch(&self, name: &str, purpose: Option<&str>) -> Result<Branch> {
        if !is_valid_branch_name(name) {
            return Err(Error::Invalid(format!("invalid branch name '{name}'")));
        }
        let conn = acquire_lock(&self.conn);
        if Self::find_branch(&conn, name)?.is_some() {
            return Err(Error::Duplicate(format!("branch '{name}'")));
        }
        let now = current_timestamp();
        conn.execute(
            "INSERT INTO branches (name, purpose, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![name, purpose, now as i64],
        )?;
        Ok(Branch {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            purpose: purpose.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    /// Lists every branch with aggregated entity/relation counts, `main`
    /// first then lexicographic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on a query failure.
    pub fn list_branches(&self) -> Result<Vec<BranchInfo>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn.prepare(
            "SELECT b.id, b.name, b.purpose, b.created_at, b.updated_at,
                    (SELECT COUNT(*) FROM entities e WHERE e.branch_id = b.id) AS entity_count,
                    (SELECT COUNT(*) FROM relations r WHERE r.branch_id = b.id) AS relation_count
             FROM branches b
             ORDER BY CASE WHEN b.name = ?1 THEN 0 ELSE 1 END, b.name ASC",
        )?;
        let rows = stmt.query_map(params![MAIN_BRANCH], |row| {
            Ok(BranchInfo {
                branch: Branch {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    purpose: row.get(2)?,
                    created_at: row.get::<_, i64>(3)? as u64,
                    updated_at: row.get::<_, i64>(4)? as u64,
                },
                entity_count: row.get::<_, i64>(5)? as u64,
                relation_count: row.get::<_, i64>(6)? as u64,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Deletes a non-`main` branch; cascades through foreign keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CannotDeleteMain`] for `main`, or [`Error::NotFound`]
    /// if the branch does not exist.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        if name == MAIN_BRANCH {
            return Err(Error::CannotDeleteMain);
        }
        let conn = acquire_lock(&self.conn);
        let rows = conn.execute("DELETE FROM branches WHERE name = ?1", params![name])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("branch '{name}'")));
        }
        Ok(())
    }

    // -- Entities -----------------------------------------------------------

    /// Creates an entity (plus its observations, keywords, and
    /// cross-references) in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] if `(name, branch)` already exists.
    pub fn create_entity(
        &self,
        branch: &str,
        input: &EntityInput,
        original_content: &str,
        optimized_content: &str,
        token_count: usize,
        compression_ratio: f32,
        keywords: &[(String, f32)],
    ) -> Result<Entity> {
        if input.name.trim().is_empty() || input.entity_type.trim().is_empty() {
            return Err(Error::Invalid("entity name and type must be non-empty".to_string()));
        }

        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction()?;
        let branch_row = Self::ensure_branch(&tx, branch)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM entities WHERE branch_id = ?1 AND name = ?2",
                params![branch_row.id, input.name],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::Duplicate(format!(
                "entity '{}' in branch '{branch}'",
                input.name
            )));
        }

        let now = current_timestamp();
        let status = input.status.unwrap_or_default();
        tx.execute(
            "INSERT INTO entities (
                branch_id, name, entity_type, status, status_reason,
                original_content, optimized_content, token_count, compression_ratio,
                created_at, updated_at, last_accessed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, ?10)",
            params![
                branch_row.id,
                input.name,
                input.entity_type,
                status.as_str(),
                input.status_reason,
                original_content,
                optimized_content,
                token_count as i64,
                compression_ratio,
                now as i64,
            ],
        )?;
        let entity_id = tx.last_insert_rowid();

        let mut observations = Vec::new();
        let mut sequence_order: i64 = 0;
        for content in &input.observations {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                continue;
            }
            tx.execute(
                "INSERT INTO observations (entity_id, content, optimized_content, sequence_order, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![entity_id, trimmed, trimmed, sequence_order, now as i64],
            )?;
            observations.push(Observation {
                id: tx.last_insert_rowid(),
                entity_id,
                content: trimmed.to_string(),
                optimized_content: trimmed.to_string(),
                sequence_order,
                created_at: now,
            });
            sequence_order += 1;
        }

        for (term, weight) in keywords {
            tx.execute(
                "INSERT INTO keywords (entity_id, term, weight, context) VALUES (?1, ?2, ?3, ?4)",
                params![entity_id, term, weight, input.entity_type],
            )?;
        }

        for cross_ref in &input.cross_refs {
            for target_name in &cross_ref.entity_names {
                tx.execute(
                    "INSERT OR IGNORE INTO cross_references (entity_id, target_branch, target_entity_name, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![entity_id, cross_ref.target_branch, target_name, now as i64],
                )?;
            }
        }

        tx.execute(
            "UPDATE branches SET updated_at = ?1 WHERE id = ?2",
            params![now as i64, branch_row.id],
        )?;

        tx.commit()?;

        Ok(Entity {
            id: entity_id,
            name: input.name.clone(),
            entity_type: input.entity_type.clone(),
            branch_id: branch_row.id,
            status,
            status_reason: input.status_reason.clone(),
            original_content: original_content.to_string(),
            optimized_content: optimized_content.to_string(),
            token_count,
            compression_ratio,
            observations,
            created_at: now,
            updated_at: now,
            last_accessed: now,
        })
    }

    /// Fetches a single entity by name within a branch, including its
    /// observations. Does not update `last_accessed`; callers that read for
    /// display should call [`Self::touch_entity`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the branch or entity is absent.
    pub fn get_entity(&self, branch: &str, name: &str) -> Result<Entity> {
        let conn = acquire_lock(&self.conn);
        let branch_row = Self::find_branch(&conn, branch)?
            .ok_or_else(|| Error::NotFound(format!("branch '{branch}'")))?;
        Self::fetch_entity_by_name(&conn, branch_row.id, name)?
            .ok_or_else(|| Error::NotFound(format!("entity '{name}' in branch '{branch}'")))
    }

    fn fetch_entity_by_name(conn: &Connection, branch_id: i64, name: &str) -> Result<Option<Entity>> {
        let row: Option<(i64, String, String, Option<String>, String, String, String, i64, f32, i64, i64, i64)> = conn
            .query_row(
                "SELECT id, entity_type, status, status_reason, original_content, optimized_content,
                        name, token_count, compression_ratio, created_at, updated_at, last_accessed
                 FROM entities WHERE branch_id = ?1 AND name = ?2",
                params![branch_id, name],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                        row.get(10)?,
                        row.get(11)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, entity_type, status, status_reason, original_content, optimized_content, name, token_count, compression_ratio, created_at, updated_at, last_accessed)) = row else {
            return Ok(None);
        };

        let observations = Self::fetch_observations(conn, id)?;

        Ok(Some(Entity {
            id,
            name,
            entity_type,
            branch_id,
            status: EntityStatus::parse(&status).unwrap_or_default(),
            status_reason,
            original_content,
            optimized_content,
            token_count: token_count as usize,
            compression_ratio,
            observations,
            created_at: created_at as u64,
            updated_at: updated_at as u64,
            last_accessed: last_accessed as u64,
        }))
    }

    fn fetch_observations(conn: &Connection, entity_id: i64) -> Result<Vec<Observation>> {
        let mut stmt = conn.prepare(
            "SELECT id, content, optimized_content, sequence_order, created_at
             FROM observations WHERE entity_id = ?1 ORDER BY sequence_order ASC",
        )?;
        let rows = stmt.query_map(params![entity_id], |row| {
            Ok(Observation {
                id: row.get(0)?,
                entity_id,
                content: row.get(1)?,
                optimized_content: row.get(2)?,
                sequence_order: row.get(3)?,
                created_at: row.get::<_, i64>(4)? as u64,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Fetches an entity by raw row id, used internally by the search and
    /// similarity engines once candidate ids are known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id does not exist.
    pub fn get_entity_by_id(&self, id: i64) -> Result<Entity> {
        let conn = acquire_lock(&self.conn);
        let branch_id: i64 = conn.query_row(
            "SELECT branch_id FROM entities WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let name: String = conn.query_row(
            "SELECT name FROM entities WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Self::fetch_entity_by_name(&conn, branch_id, &name)?
            .ok_or_else(|| Error::NotFound(format!("entity id {id}")))
    }

    /// Updates `last_accessed` to now, used as the search tie-breaker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on a query failure.
    pub fn touch_entity(&self, id: i64) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "UPDATE entities SET last_accessed = ?1 WHERE id = ?2",
            params![current_timestamp() as i64, id],
        )?;
        Ok(())
    }

    /// Lists every active+draft entity in a branch (used by the
    /// auto-relation path of the orchestrator's write pipeline).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on a query failure.
    pub fn list_entities_by_status(&self, branch: &str, statuses: &[EntityStatus]) -> Result<Vec<Entity>> {
        let conn = acquire_lock(&self.conn);
        let Some(branch_row) = Self::find_branch(&conn, branch)? else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare("SELECT id FROM entities WHERE branch_id = ?1")?;
        let ids: Vec<i64> = stmt
            .query_map(params![branch_row.id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut result = Vec::new();
        for id in ids {
            if let Some(entity) = Self::fetch_entity_by_name_id(&conn, branch_row.id, id)? {
                if statuses.contains(&entity.status) {
                    result.push(entity);
                }
            }
        }
        Ok(result)
    }

    fn fetch_entity_by_name_id(conn: &Connection, branch_id: i64, id: i64) -> Result<Option<Entity>> {
        let name: Option<String> = conn
            .query_row("SELECT name FROM entities WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        match name {
            Some(name) => Self::fetch_entity_by_name(conn, branch_id, &name),
            None => Ok(None),
        }
    }

    /// Replaces an existing entity's type, status, reason, observations, and
    /// cross-references.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the entity is absent.
    pub fn update_entity(
        &self,
        branch: &str,
        name: &str,
        entity_type: Option<&str>,
        status: Option<EntityStatus>,
        status_reason: Option<&str>,
        observations: Option<&[String]>,
    ) -> Result<Entity> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction()?;
        let branch_row = Self::find_branch(&tx, branch)?
            .ok_or_else(|| Error::NotFound(format!("branch '{branch}'")))?;
        let entity_id: i64 = tx
            .query_row(
                "SELECT id FROM entities WHERE branch_id = ?1 AND name = ?2",
                params![branch_row.id, name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("entity '{name}' in branch '{branch}'")))?;

        let now = current_timestamp();

        if let Some(entity_type) = entity_type {
            tx.execute(
                "UPDATE entities SET entity_type = ?1, updated_at = ?2 WHERE id = ?3",
                params![entity_type, now as i64, entity_id],
            )?;
        }
        if let Some(status) = status {
            tx.execute(
                "UPDATE entities SET status = ?1, status_reason = ?2, updated_at = ?3 WHERE id = ?4",
                params![status.as_str(), status_reason, now as i64, entity_id],
            )?;
        }
        if let Some(observations) = observations {
            tx.execute("DELETE FROM observations WHERE entity_id = ?1", params![entity_id])?;
            let mut sequence_order: i64 = 0;
            for content in observations {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    continue;
                }
                tx.execute(
                    "INSERT INTO observations (entity_id, content, optimized_content, sequence_order, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![entity_id, trimmed, trimmed, sequence_order, now as i64],
                )?;
                sequence_order += 1;
            }
            tx.execute(
                "UPDATE entities SET updated_at = ?1 WHERE id = ?2",
                params![now as i64, entity_id],
            )?;
        }

        tx.execute(
            "UPDATE branches SET updated_at = ?1 WHERE id = ?2",
            params![now as i64, branch_row.id],
        )?;
        tx.commit()?;

        Self::fetch_entity_by_name(&acquire_lock(&self.conn), branch_row.id, name)?
            .ok_or_else(|| Error::NotFound(format!("entity '{name}' in branch '{branch}'")))
    }

    /// Deletes entities by name within a branch; cascades observations,
    /// keywords, cross-references, relations, and the FTS shadow row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on a query failure. Absent names are
    /// silently skipped.
    pub fn delete_entities(&self, branch: &str, names: &[String]) -> Result<usize> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction()?;
        let Some(branch_row) = Self::find_branch(&tx, branch)? else {
            return Ok(0);
        };

        let mut deleted = 0;
        for name in names {
            let rows = tx.execute(
                "DELETE FROM entities WHERE branch_id = ?1 AND name = ?2",
                params![branch_row.id, name],
            )?;
            deleted += rows;
        }
        if deleted > 0 {
            tx.execute(
                "UPDATE branches SET updated_at = ?1 WHERE id = ?2",
                params![current_timestamp() as i64, branch_row.id],
            )?;
        }
        tx.commit()?;
        Ok(deleted)
    }

    // -- Observations ---------------------------------------------------

    /// Appends observations after the current max `sequence_order`,
    /// skipping blanks, returning the content strings actually added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the entity is absent.
    pub fn add_observations(&self, branch: &str, entity_name: &str, contents: &[String]) -> Result<Vec<String>> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction()?;
        let branch_row = Self::find_branch(&tx, branch)?
            .ok_or_else(|| Error::NotFound(format!("branch '{branch}'")))?;
        let entity_id: i64 = tx
            .query_row(
                "SELECT id FROM entities WHERE branch_id = ?1 AND name = ?2",
                params![branch_row.id, entity_name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("entity '{entity_name}' in branch '{branch}'")))?;

        let mut next_order: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(sequence_order), -1) + 1 FROM observations WHERE entity_id = ?1",
                params![entity_id],
                |row| row.get(0),
            )?;

        let now = current_timestamp();
        let mut added = Vec::new();
        for content in contents {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                continue;
            }
            tx.execute(
                "INSERT INTO observations (entity_id, content, optimized_content, sequence_order, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![entity_id, trimmed, trimmed, next_order, now as i64],
            )?;
            added.push(trimmed.to_string());
            next_order += 1;
        }

        if !added.is_empty() {
            tx.execute(
                "UPDATE entities SET updated_at = ?1 WHERE id = ?2",
                params![now as i64, entity_id],
            )?;
        }

        tx.commit()?;
        Ok(added)
    }

    /// Deletes observations by exact (case-sensitive) content match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the entity is absent.
    pub fn delete_observations(&self, branch: &str, entity_name: &str, contents: &[String]) -> Result<usize> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction()?;
        let branch_row = Self::find_branch(&tx, branch)?
            .ok_or_else(|| Error::NotFound(format!("branch '{branch}'")))?;
        let entity_id: i64 = tx
            .query_row(
                "SELECT id FROM entities WHERE branch_id = ?1 AND name = ?2",
                params![branch_row.id, entity_name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("entity '{entity_name}' in branch '{branch}'")))?;

        let mut deleted = 0;
        for content in contents {
            deleted += tx.execute(
                "DELETE FROM observations WHERE entity_id = ?1 AND content = ?2",
                params![entity_id, content],
            )?;
        }
        tx.commit()?;
        Ok(deleted)
    }

    // -- Relations --------------------------------------------------------

    /// Creates relations by resolving both endpoints by name in `branch`;
    /// `INSERT OR IGNORE` on the uniqueness key. Returns only the relations
    /// that were actually created (both endpoints existed and the triple
    /// was not already present).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the branch does not exist.
    pub fn create_relations(
        &self,
        branch: &str,
        relations: &[RelationInput],
        auto_generated: bool,
    ) -> Result<Vec<Relation>> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction()?;
        let branch_row = Self::find_branch(&tx, branch)?
            .ok_or_else(|| Error::NotFound(format!("branch '{branch}'")))?;

        let mut created = Vec::new();
        let now = current_timestamp();
        for input in relations {
            let from_id: Option<i64> = tx
                .query_row(
                    "SELECT id FROM entities WHERE branch_id = ?1 AND name = ?2",
                    params![branch_row.id, input.from],
                    |row| row.get(0),
                )
                .optional()?;
            let to_id: Option<i64> = tx
                .query_row(
                    "SELECT id FROM entities WHERE branch_id = ?1 AND name = ?2",
                    params![branch_row.id, input.to],
                    |row| row.get(0),
                )
                .optional()?;
            let (Some(from_id), Some(to_id)) = (from_id, to_id) else {
                continue;
            };

            let rows = tx.execute(
                "INSERT OR IGNORE INTO relations (branch_id, from_entity_id, to_entity_id, relation_type, auto_generated, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![branch_row.id, from_id, to_id, input.relation_type, auto_generated, now as i64],
            )?;
            if rows > 0 {
                created.push(Relation {
                    id: tx.last_insert_rowid(),
                    branch_id: branch_row.id,
                    from_entity_id: from_id,
                    to_entity_id: to_id,
                    relation_type: input.relation_type.clone(),
                    auto_generated,
                    created_at: now,
                });
            }
        }

        tx.commit()?;
        Ok(created)
    }

    /// Deletes relations by key, no-op on absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the branch does not exist.
    pub fn delete_relations(&self, branch: &str, relations: &[RelationInput]) -> Result<usize> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction()?;
        let Some(branch_row) = Self::find_branch(&tx, branch)? else {
            return Ok(0);
        };

        let mut deleted = 0;
        for input in relations {
            deleted += tx.execute(
                "DELETE FROM relations WHERE branch_id = ?1
                 AND from_entity_id = (SELECT id FROM entities WHERE branch_id = ?1 AND name = ?2)
                 AND to_entity_id = (SELECT id FROM entities WHERE branch_id = ?1 AND name = ?3)
                 AND relation_type = ?4",
                params![branch_row.id, input.from, input.to, input.relation_type],
            )?;
        }
        tx.commit()?;
        Ok(deleted)
    }

    /// Fetches every relation whose endpoints both lie within `entity_ids`,
    /// scoped to `branch_id` when given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on a query failure.
    pub fn relations_among(&self, entity_ids: &[i64]) -> Result<Vec<Relation>> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = acquire_lock(&self.conn);
        let placeholders = entity_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT id, branch_id, from_entity_id, to_entity_id, relation_type, auto_generated, created_at
             FROM relations
             WHERE from_entity_id IN ({placeholders}) AND to_entity_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut all_params: Vec<&dyn rusqlite::ToSql> = Vec::new();
        for id in entity_ids {
            all_params.push(id);
        }
        for id in entity_ids {
            all_params.push(id);
        }
        let rows = stmt.query_map(all_params.as_slice(), |row| {
            Ok(Relation {
                id: row.get(0)?,
                branch_id: row.get(1)?,
                from_entity_id: row.get(2)?,
                to_entity_id: row.get(3)?,
                relation_type: row.get(4)?,
                auto_generated: row.get(5)?,
                created_at: row.get::<_, i64>(6)? as u64,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    // -- Cross references ---------------------------------------------------

    /// Creates cross-references from `entity_name` in `source_branch` to
    /// each of `target_names` in `target_branch`. `INSERT OR IGNORE` on the
    /// uniqueness key; targets are stored by name and resolved lazily, so
    /// missing targets (or a missing target branch) are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the source entity does not exist.
    pub fn create_cross_references(
        &self,
        source_branch: &str,
        entity_name: &str,
        target_branch: &str,
        target_names: &[String],
    ) -> Result<Vec<CrossReference>> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction()?;
        let branch_row = Self::find_branch(&tx, source_branch)?
            .ok_or_else(|| Error::NotFound(format!("branch '{source_branch}'")))?;
        let entity_id: i64 = tx
            .query_row(
                "SELECT id FROM entities WHERE branch_id = ?1 AND name = ?2",
                params![branch_row.id, entity_name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("entity '{entity_name}' in branch '{source_branch}'")))?;

        let now = current_timestamp();
        let mut created = Vec::new();
        for target_name in target_names {
            let rows = tx.execute(
                "INSERT OR IGNORE INTO cross_references (entity_id, target_branch, target_entity_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entity_id, target_branch, target_name, now as i64],
            )?;
            if rows > 0 {
                created.push(CrossReference {
                    id: tx.last_insert_rowid(),
                    entity_id,
                    target_branch: target_branch.to_string(),
                    target_entity_name: target_name.clone(),
                    created_at: now,
                });
            }
        }
        tx.commit()?;
        Ok(created)
    }

    /// Returns cross-references for an entity, grouped by target branch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the branch or entity is absent.
    pub fn get_cross_references(&self, branch: &str, entity_name: &str) -> Result<HashMap<String, Vec<String>>> {
        let conn = acquire_lock(&self.conn);
        let branch_row = Self::find_branch(&conn, branch)?
            .ok_or_else(|| Error::NotFound(format!("branch '{branch}'")))?;
        let entity_id: i64 = conn
            .query_row(
                "SELECT id FROM entities WHERE branch_id = ?1 AND name = ?2",
                params![branch_row.id, entity_name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("entity '{entity_name}' in branch '{branch}'")))?;

        let mut stmt = conn.prepare(
            "SELECT target_branch, target_entity_name FROM cross_references WHERE entity_id = ?1",
        )?;
        let rows = stmt.query_map(params![entity_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            let (target_branch, target_name) = row?;
            grouped.entry(target_branch).or_default().push(target_name);
        }
        Ok(grouped)
    }

    // -- Search-support primitives ------------------------------------------

    /// Candidate ids from the keyword strategy: entities with any keyword
    /// `LIKE %term%` for any of `terms`, plus the sum of matched-row counts
    /// and the max matched weight, per entity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on a query failure.
    pub fn keyword_strategy(
        &self,
        terms: &[String],
        branch_id: Option<i64>,
        status: StatusFilter,
    ) -> Result<HashMap<i64, (i64, f32)>> {
        let conn = acquire_lock(&self.conn);
        let mut matches: HashMap<i64, (i64, f32)> = HashMap::new();

        for term in terms {
            let pattern = contains_pattern(term);
            let mut sql = String::from(
                "SELECT k.entity_id, k.weight FROM keywords k
                 JOIN entities e ON e.id = k.entity_id
                 WHERE k.term LIKE ?1 ESCAPE '\\'",
            );
            if branch_id.is_some() {
                sql.push_str(" AND e.branch_id = ?2");
            }
            let mut stmt = conn.prepare(&sql)?;
            let rows: Vec<(i64, f32)> = if let Some(bid) = branch_id {
                stmt.query_map(params![pattern, bid], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                stmt.query_map(params![pattern], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };
            for (entity_id, weight) in rows {
                let entry = matches.entry(entity_id).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 = entry.1.max(weight);
            }
        }

        if matches!(status, StatusFilter::ActiveOnly | StatusFilter::Exactly(_)) {
            matches.retain(|id, _| self.entity_matches_status(&conn, *id, status).unwrap_or(false));
        }

        Ok(matches)
    }

    fn entity_matches_status(&self, conn: &Connection, entity_id: i64, filter: StatusFilter) -> Result<bool> {
        let status: String = conn.query_row(
            "SELECT status FROM entities WHERE id = ?1",
            params![entity_id],
            |row| row.get(0),
        )?;
        let status = EntityStatus::parse(&status).unwrap_or_default();
        Ok(filter.matches(status))
    }

    /// Candidate ids from the FTS strategy: OR-of-terms `MATCH` query
    /// against the shadow index, returning `bm25`-derived rank per entity.
    /// On a `MATCH` syntax error, returns [`Error::FtsUnavailable`] so the
    /// caller can skip this strategy and continue.
    pub fn fts_strategy(
        &self,
        terms: &[String],
        branch_id: Option<i64>,
        status: StatusFilter,
    ) -> Result<HashMap<i64, f32>> {
        let conn = acquire_lock(&self.conn);
        let match_query = terms
            .iter()
            .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" OR ");

        let mut stmt = conn
            .prepare(
                "SELECT entities_fts.rowid, bm25(entities_fts) FROM entities_fts
                 WHERE entities_fts MATCH ?1",
            )
            .map_err(|e| Error::FtsUnavailable(e.to_string()))?;

        let rows: Vec<(i64, f32)> = stmt
            .query_map(params![match_query], |row| {
                Ok((row.get(0)?, row.get::<_, f64>(1)? as f32))
            })
            .map_err(|e| Error::FtsUnavailable(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::FtsUnavailable(e.to_string()))?;

        let mut result = HashMap::new();
        for (id, rank) in rows {
            if let Some(bid) = branch_id {
                let row_branch: i64 = conn.query_row(
                    "SELECT branch_id FROM entities WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                if row_branch != bid {
                    continue;
                }
            }
            if matches!(status, StatusFilter::ActiveOnly | StatusFilter::Exactly(_))
                && !self.entity_matches_status(&conn, id, status)?
            {
                continue;
            }
            // bm25 is more-negative-is-better; invert for ascending "higher is better".
            result.insert(id, -rank);
        }
        Ok(result)
    }

    /// Candidate ids from the substring-LIKE strategy over name, type, and
    /// observation content, scored per the weights in the search pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on a query failure.
    pub fn like_strategy(
        &self,
        terms: &[String],
        branch_id: Option<i64>,
        status: StatusFilter,
    ) -> Result<HashMap<i64, f32>> {
        let conn = acquire_lock(&self.conn);
        let mut scores: HashMap<i64, f32> = HashMap::new();

        for term in terms {
            let pattern = contains_pattern(term);

            let mut sql = String::from(
                "SELECT id FROM entities WHERE (name LIKE ?1 ESCAPE '\\' OR entity_type LIKE ?1 ESCAPE '\\')",
            );
            if branch_id.is_some() {
                sql.push_str(" AND branch_id = ?2");
            }
            let mut stmt = conn.prepare(&sql)?;
            let ids: Vec<i64> = if let Some(bid) = branch_id {
                stmt.query_map(params![pattern, bid], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                stmt.query_map(params![pattern], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };
            for id in ids {
                *scores.entry(id).or_insert(0.0) += 10.0;
            }

            let mut type_sql = String::from("SELECT id FROM entities WHERE entity_type LIKE ?1 ESCAPE '\\'");
            if branch_id.is_some() {
                type_sql.push_str(" AND branch_id = ?2");
            }
            let mut stmt = conn.prepare(&type_sql)?;
            let ids: Vec<i64> = if let Some(bid) = branch_id {
                stmt.query_map(params![pattern, bid], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                stmt.query_map(params![pattern], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };
            for id in ids {
                *scores.entry(id).or_insert(0.0) += 8.0;
            }

            let mut obs_sql = String::from(
                "SELECT DISTINCT entity_id FROM observations WHERE content LIKE ?1 ESCAPE '\\'",
            );
            if branch_id.is_some() {
                obs_sql.push_str(
                    " AND entity_id IN (SELECT id FROM entities WHERE branch_id = ?2)",
                );
            }
            let mut stmt = conn.prepare(&obs_sql)?;
            let ids: Vec<i64> = if let Some(bid) = branch_id {
                stmt.query_map(params![pattern, bid], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            } else {
                stmt.query_map(params![pattern], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            };
            for id in ids {
                *scores.entry(id).or_insert(0.0) += 3.0;
            }
        }

        if matches!(status, StatusFilter::ActiveOnly | StatusFilter::Exactly(_)) {
            scores.retain(|id, _| self.entity_matches_status(&conn, *id, status).unwrap_or(false));
        }

        Ok(scores)
    }

    /// Resolves a branch name to its row id, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on a query failure.
    pub fn branch_id(&self, name: &str) -> Result<Option<i64>> {
        let conn = acquire_lock(&self.conn);
        Ok(Self::find_branch(&conn, name)?.map(|b| b.id))
    }

    /// Returns the escaped-LIKE helper for reuse by callers constructing
    /// their own patterns.
    #[must_use]
    pub fn escape_pattern(term: &str) -> String {
        escape_like_wildcards(term)
    }

    /// Fetches all keywords for an entity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on a query failure.
    pub fn keywords_for_entity(&self, entity_id: i64) -> Result<Vec<Keyword>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt =
            conn.prepare("SELECT id, entity_id, term, weight, context FROM keywords WHERE entity_id = ?1")?;
        let rows = stmt.query_map(params![entity_id], |row| {
            Ok(Keyword {
                id: row.get(0)?,
                entity_id: row.get(1)?,
                term: row.get(2)?,
                weight: row.get(3)?,
                context: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationInput;

    fn new_store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn sample_input(name: &str) -> EntityInput {
        EntityInput::new(name, "Service").with_observation("uses JWT tokens")
    }

    #[test]
    fn test_main_branch_seeded() {
        let store = new_store();
        let branches = store.list_branches().unwrap();
        assert_eq!(branches[0].branch.name, MAIN_BRANCH);
    }

    #[test]
    fn test_create_entity_and_get() {
        let store = new_store();
        let entity = store
            .create_entity("main", &sample_input("Auth"), "Auth:Service", "auth svc", 3, 0.8, &[("auth".to_string(), 2.0)])
            .unwrap();
        assert_eq!(entity.name, "Auth");
        assert_eq!(entity.observations.len(), 1);

        let fetched = store.get_entity("main", "Auth").unwrap();
        assert_eq!(fetched.id, entity.id);
    }

    #[test]
    fn test_create_entity_duplicate_fails() {
        let store = new_store();
        store
            .create_entity("main", &sample_input("Auth"), "c", "c", 1, 1.0, &[])
            .unwrap();
        let result = store.create_entity("main", &sample_input("Auth"), "c", "c", 1, 1.0, &[]);
        assert!(matches!(result, Err(Error::Duplicate(_))));
    }

    #[test]
    fn test_delete_branch_main_fails() {
        let store = new_store();
        assert!(matches!(store.delete_branch("main"), Err(Error::CannotDeleteMain)));
    }

    #[test]
    fn test_add_and_delete_observations() {
        let store = new_store();
        store
            .create_entity("main", &sample_input("Auth"), "c", "c", 1, 1.0, &[])
            .unwrap();
        let added = store
            .add_observations("main", "Auth", &["uses bcrypt".to_string(), "".to_string()])
            .unwrap();
        assert_eq!(added, vec!["uses bcrypt".to_string()]);

        let deleted = store
            .delete_observations("main", "Auth", &["uses bcrypt".to_string()])
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[test]
    fn test_create_relations_requires_both_endpoints() {
        let store = new_store();
        store.create_entity("main", &sample_input("Auth"), "c", "c", 1, 1.0, &[]).unwrap();
        let created = store
            .create_relations("main", &[RelationInput::new("Auth", "Missing", "depends_on")], false)
            .unwrap();
        assert!(created.is_empty());

        store.create_entity("main", &sample_input("Database"), "c", "c", 1, 1.0, &[]).unwrap();
        let created = store
            .create_relations("main", &[RelationInput::new("Auth", "Database", "depends_on")], false)
            .unwrap();
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn test_delete_entities_cascades_relations() {
        let store = new_store();
        store.create_entity("main", &sample_input("Auth"), "c", "c", 1, 1.0, &[]).unwrap();
        store.create_entity("main", &sample_input("Database"), "c", "c", 1, 1.0, &[]).unwrap();
        store
            .create_relations("main", &[RelationInput::new("Auth", "Database", "depends_on")], false)
            .unwrap();

        store.delete_entities("main", &["Auth".to_string()]).unwrap();

        let auth_id = store.branch_id("main").unwrap();
        assert!(auth_id.is_some());
        let remaining = store.relations_among(&[1, 2]).unwrap();
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_cross_references_lazy_target() {
        let store = new_store();
        store.create_entity("main", &sample_input("Auth"), "c", "c", 1, 1.0, &[]).unwrap();
        let created = store
            .create_cross_references("main", "Auth", "docs", &["AuthGuide".to_string()])
            .unwrap();
        assert_eq!(created.len(), 1);

        let grouped = store.get_cross_references("main", "Auth").unwrap();
        assert_eq!(grouped.get("docs").unwrap(), &vec!["AuthGuide".to_string()]);
    }
}
