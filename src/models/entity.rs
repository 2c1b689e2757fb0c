//! Entity and observation types.

use super::cross_reference::CrossReferenceInput;
use std::fmt;

/// Lifecycle status of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntityStatus {
    /// Active and searchable (the default).
    #[default]
    Active,
    /// Superseded or no longer current, but still retrievable on request.
    Deprecated,
    /// Retained for history but excluded from default searches.
    Archived,
    /// Not yet finalized.
    Draft,
}

impl EntityStatus {
    /// All known statuses, in a stable order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Active, Self::Deprecated, Self::Archived, Self::Draft]
    }

    /// Returns the status as its lowercase wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deprecated => "deprecated",
            Self::Archived => "archived",
            Self::Draft => "draft",
        }
    }

    /// Parses a status from its wire representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "deprecated" => Some(Self::Deprecated),
            "archived" => Some(Self::Archived),
            "draft" => Some(Self::Draft),
            _ => None,
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An append-only textual fact attached to an entity.
///
/// Identified for deletion by exact content match, not by id — the data
/// model's cross-cutting contract deletes observations by the string the
/// caller originally supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Row id.
    pub id: i64,
    /// The id of the owning entity.
    pub entity_id: i64,
    /// Original, uncompressed content.
    pub content: String,
    /// Aggressively-compressed content, used by FTS/keyword indexing.
    pub optimized_content: String,
    /// Monotonically increasing position within the entity, assigned as
    /// `max(existing) + 1` at append time.
    pub sequence_order: i64,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}

/// A named node scoped to a branch, with a type, ordered observations,
/// status, and derived keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Row id.
    pub id: i64,
    /// Name, unique within `branch_id` (not globally).
    pub name: String,
    /// Free-form type tag (e.g. `"Service"`, `"Component"`).
    pub entity_type: String,
    /// The branch this entity belongs to.
    pub branch_id: i64,
    /// Current lifecycle status.
    pub status: EntityStatus,
    /// Optional free-text reason for the current status.
    pub status_reason: Option<String>,
    /// Original, uncompressed rendering of the entity (JSON of name/type/observations).
    pub original_content: String,
    /// Aggressively-compressed rendering, used for keyword extraction.
    pub optimized_content: String,
    /// Token count of `optimized_content` (see [`crate::text::optimize`]).
    pub token_count: usize,
    /// `optimized_content` length / `original_content` length.
    pub compression_ratio: f32,
    /// Ordered observations, sorted by `sequence_order`.
    pub observations: Vec<Observation>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Last-write timestamp (Unix epoch seconds).
    pub updated_at: u64,
    /// Last-read timestamp (Unix epoch seconds), used as the search
    /// tie-breaker.
    pub last_accessed: u64,
}

impl Entity {
    /// Joins all observation contents with a single space, for similarity
    /// scoring and keyword extraction.
    #[must_use]
    pub fn joined_observations(&self) -> String {
        self.observations
            .iter()
            .map(|o| o.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Explicit input record for creating an entity.
///
/// Re-architected from a duck-typed payload (cross-references attached ad
/// hoc before calling the store) into a single structured type: `crossRefs`
/// here is the caller's *intent* (a target branch plus a list of target
/// entity names), distinct from the stored [`super::CrossReference`] rows
/// the store later materializes one-per-name.
#[derive(Debug, Clone, Default)]
pub struct EntityInput {
    /// Entity name.
    pub name: String,
    /// Entity type tag.
    pub entity_type: String,
    /// Initial observations (blank entries are dropped at ingest).
    pub observations: Vec<String>,
    /// Initial status; defaults to `Active`.
    pub status: Option<EntityStatus>,
    /// Optional reason accompanying a non-default status.
    pub status_reason: Option<String>,
    /// Cross-references to create alongside the entity, grouped by target
    /// branch.
    pub cross_refs: Vec<CrossReferenceInput>,
}

impl EntityInput {
    /// Creates a new input with the given name and type, active status, and
    /// no observations.
    #[must_use]
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
            status: None,
            status_reason: None,
            cross_refs: Vec::new(),
        }
    }

    /// Appends a single observation.
    #[must_use]
    pub fn with_observation(mut self, content: impl Into<String>) -> Self {
        self.observations.push(content.into());
        self
    }

    /// Sets the initial status and reason.
    #[must_use]
    pub fn with_status(mut self, status: EntityStatus, reason: impl Into<String>) -> Self {
        self.status = Some(status);
        self.status_reason = Some(reason.into());
        self
    }

    /// Adds a cross-reference intent to another branch's entities.
    #[must_use]
    pub fn with_cross_ref(mut self, cross_ref: CrossReferenceInput) -> Self {
        self.cross_refs.push(cross_ref);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in EntityStatus::all() {
            let s = status.as_str();
            assert_eq!(EntityStatus::parse(s), Some(*status));
        }
    }

    #[test]
    fn test_status_default_is_active() {
        assert_eq!(EntityStatus::default(), EntityStatus::Active);
    }

    #[test]
    fn test_status_parse_unknown() {
        assert_eq!(EntityStatus::parse("bogus"), None);
    }

    #[test]
    fn test_entity_input_builder() {
        let input = EntityInput::new("Auth", "Service")
            .with_observation("JWT tokens")
            .with_observation("bcrypt");
        assert_eq!(input.name, "Auth");
        assert_eq!(input.observations, vec!["JWT tokens", "bcrypt"]);
        assert_eq!(input.status, None);
    }
}
