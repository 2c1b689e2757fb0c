//! Pretty JSON export schema.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{Entity, Relation};

/// Entity/relation counts recorded alongside an export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportStats {
    /// Number of exported entities.
    #[serde(rename = "entityCount")]
    pub entity_count: usize,
    /// Number of exported relations.
    #[serde(rename = "relationCount")]
    pub relation_count: usize,
}

/// A full branch snapshot in the pretty-printed export schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchExport {
    /// The exported branch's name.
    pub branch: String,
    /// ISO8601 export timestamp.
    #[serde(rename = "exportedAt")]
    pub exported_at: String,
    /// Aggregate counts.
    pub stats: ExportStats,
    /// All entities in the branch, with observations inlined.
    pub entities: Vec<ExportedEntity>,
    /// All relations in the branch, by entity name.
    pub relations: Vec<ExportedRelation>,
}

/// An entity as it appears in an export (names, not ids).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedEntity {
    /// Entity name.
    pub name: String,
    /// Entity type.
    #[serde(rename = "entityType")]
    pub entity_type: String,
    /// Observation contents, in order.
    pub observations: Vec<String>,
    /// Lifecycle status.
    pub status: String,
}

/// A relation as it appears in an export (names, not ids).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedRelation {
    /// Source entity name.
    pub from: String,
    /// Target entity name.
    pub to: String,
    /// Relation type.
    #[serde(rename = "relationType")]
    pub relation_type: String,
}

/// Builds a [`BranchExport`] from entity and relation rows. Relation
/// endpoints are resolved to names via `id_to_name`.
#[must_use]
pub fn export_branch(
    branch: &str,
    entities: &[Entity],
    relations: &[Relation],
    id_to_name: impl Fn(i64) -> Option<String>,
) -> BranchExport {
    let exported_entities: Vec<ExportedEntity> = entities
        .iter()
        .map(|e| ExportedEntity {
            name: e.name.clone(),
            entity_type: e.entity_type.clone(),
            observations: e.observations.iter().map(|o| o.content.clone()).collect(),
            status: e.status.as_str().to_string(),
        })
        .collect();

    let exported_relations: Vec<ExportedRelation> = relations
        .iter()
        .filter_map(|r| {
            let from = id_to_name(r.from_entity_id)?;
            let to = id_to_name(r.to_entity_id)?;
            Some(ExportedRelation {
                from,
                to,
                relation_type: r.relation_type.clone(),
            })
        })
        .collect();

    BranchExport {
        branch: branch.to_string(),
        exported_at: Utc::now().to_rfc3339(),
        stats: ExportStats {
            entity_count: exported_entities.len(),
            relation_count: exported_relations.len(),
        },
        entities: exported_entities,
        relations: exported_relations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityStatus;

    fn entity(id: i64, name: &str) -> Entity {
        Entity {
            id,
            name: name.to_string(),
            entity_type: "Service".to_string(),
            branch_id: 1,
            status: EntityStatus::Active,
            status_reason: None,
            original_content: String::new(),
            optimized_content: String::new(),
            token_count: 0,
            compression_ratio: 1.0,
            observations: Vec::new(),
            created_at: 0,
            updated_at: 0,
            last_accessed: 0,
        }
    }

    #[test]
    fn test_export_branch_stats() {
        let entities = vec![entity(1, "Auth"), entity(2, "Database")];
        let relations = vec![Relation {
            id: 1,
            branch_id: 1,
            from_entity_id: 1,
            to_entity_id: 2,
            relation_type: "depends_on".to_string(),
            auto_generated: false,
            created_at: 0,
        }];
        let lookup = |id: i64| entities.iter().find(|e| e.id == id).map(|e| e.name.clone());
        let export = export_branch("main", &entities, &relations, lookup);
        assert_eq!(export.stats.entity_count, 2);
        assert_eq!(export.stats.relation_count, 1);
        assert_eq!(export.relations[0].from, "Auth");
    }
}
