//! # mindgraph
//!
//! A local, offline knowledge store for AI assistants: a branch-partitioned
//! graph of named entities and typed relations, queryable through a hybrid
//! keyword/full-text/substring search engine, with a background indexer that
//! continuously mines similarity across entities and proposes typed links.
//!
//! ## Architecture
//!
//! - [`storage`]: the persistence layer (`SQLite` + FTS5) — branches, entities,
//!   observations, relations, keywords, cross-references.
//! - [`text`]: pure text normalization, keyword extraction, and compression.
//! - [`search`]: multi-strategy ranked retrieval over the store.
//! - [`similarity`]: entity-to-entity scoring and relation-type inference.
//! - [`orchestrator`]: the public API that wires the above together with
//!   write-time policy (compression, keyword extraction, auto-relations).
//! - [`indexer`]: the background task queue that maintains relationship
//!   suggestions.
//! - [`io`]: line-delimited JSON export/import and legacy-JSON migration.
//!
//! ## Example
//!
//! ```no_run
//! use mindgraph::{Config, Orchestrator, EntityInput};
//!
//! # async fn run() -> mindgraph::Result<()> {
//! let config = Config::from_env();
//! let orchestrator = Orchestrator::open(config).await?;
//!
//! orchestrator
//!     .create_entities(
//!         "main",
//!         vec![EntityInput::new("Auth", "Service").with_observation("JWT tokens")],
//!         true,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

pub mod config;
pub mod indexer;
pub mod io;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod search;
pub mod similarity;
pub mod storage;
pub mod text;

pub use config::Config;
pub use indexer::Indexer;
pub use models::{
    Branch, BranchInfo, CrossReference, CrossReferenceInput, Entity, EntityInput, EntityStatus,
    Keyword, Observation, Relation, RelationInput,
};
pub use orchestrator::Orchestrator;
pub use similarity::SimilarityEngine;
pub use storage::Store;

/// Error type for mindgraph operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `NotFound` | Operating on a missing entity, branch, or relation endpoint |
/// | `Duplicate` | Entity name collision within the same branch, or duplicate branch name |
/// | `Invalid` | Empty name/type/content, unknown status, or a reserved branch name |
/// | `CannotDeleteMain` | Attempting to delete the `main` branch |
/// | `Storage` | Database I/O, integrity, or corrupt JSON line |
/// | `FtsUnavailable` | The FTS5 `MATCH` query failed to parse |
/// | `BackgroundFailure` | An indexer task failed (never surfaced to foreground callers directly) |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The requested entity, branch, or relation endpoint does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated (duplicate entity name or branch name).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// The input was structurally invalid (empty name, bad status, reserved name).
    #[error("invalid input: {0}")]
    Invalid(String),

    /// An attempt was made to delete the `main` branch.
    #[error("the main branch cannot be deleted")]
    CannotDeleteMain,

    /// A storage operation failed.
    #[error("storage operation '{operation}' failed: {cause}")]
    Storage {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The FTS5 strategy could not run (bad `MATCH` syntax); callers should
    /// fall back to the remaining search strategies rather than propagate this.
    #[error("full-text search unavailable: {0}")]
    FtsUnavailable(String),

    /// A background indexer task failed. Logged and swallowed; never
    /// propagated to foreground callers.
    #[error("background task failed: {0}")]
    BackgroundFailure(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage {
            operation: "sqlite".to_string(),
            cause: err.to_string(),
        }
    }
}

/// Result type alias for mindgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Centralizes timestamp generation so every component stamps `created_at`/
/// `updated_at` consistently.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("entity 'Auth'".to_string());
        assert_eq!(err.to_string(), "not found: entity 'Auth'");

        let err = Error::Storage {
            operation: "create_entity".to_string(),
            cause: "disk full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "storage operation 'create_entity' failed: disk full"
        );

        assert_eq!(
            Error::CannotDeleteMain.to_string(),
            "the main branch cannot be deleted"
        );
    }

    #[test]
    fn test_current_timestamp_is_reasonable() {
        let ts = current_timestamp();
        // Any timestamp after 2024-01-01 is "reasonable" for this crate's lifetime.
        assert!(ts > 1_700_000_000);
    }
}
