//! `SQLite`-backed implementation of the [`super::Store`] contract.
//!
//! ## Module structure
//!
//! - [`connection`]: connection-mutex handling (lock acquisition, poison
//!   recovery, pragma configuration).
//! - [`schema`]: the `CREATE TABLE`/`CREATE TRIGGER` schema and FTS5 sync
//!   triggers.
//! - [`sql`]: small query-building helpers (`LIKE` escaping, status filter
//!   clauses).
//! - [`store`]: the [`Store`](super::Store) type itself.

mod connection;
mod schema;
mod sql;
mod store;

pub use connection::{acquire_lock, acquire_lock_with_timeout, configure_connection, MUTEX_LOCK_TIMEOUT};
pub use schema::{SCHEMA, SEED_MAIN_BRANCH};
pub use sql::{contains_pattern, escape_like_wildcards, status_clause};
pub use store::Store;
