//! Storage layer: transactional `SQLite` persistence for the branched
//! entity-relation graph, with an FTS5 shadow index kept current by
//! triggers.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::manual_let_else)]

pub mod sqlite;

pub use sqlite::Store;
