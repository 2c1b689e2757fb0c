//! Data model for the branched entity-relation graph.
//!
//! This module contains the core record types shared by [`crate::storage`],
//! [`crate::search`], [`crate::similarity`], and [`crate::orchestrator`].

mod branch;
mod cross_reference;
mod entity;
mod keyword;
mod relation;
mod search;
mod similarity;

pub use branch::{is_valid_branch_name, Branch, BranchInfo, MAIN_BRANCH};
pub use cross_reference::{CrossReference, CrossReferenceInput};
pub use entity::{Entity, EntityInput, EntityStatus, Observation};
pub use keyword::Keyword;
pub use relation::{Relation, RelationInput};
pub use search::{BranchScope, SearchOutcome, StatusFilter};
pub use similarity::{Confidence, SimilarityMatch};
