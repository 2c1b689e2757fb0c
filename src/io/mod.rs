//! Line-delimited JSON export/import and legacy-JSON migration.

pub mod export;
pub mod jsonl;
pub mod migrate;

pub use export::{export_branch, BranchExport, ExportStats};
pub use jsonl::{parse_jsonl, write_jsonl, JsonlCrossReference, JsonlRecord, JsonlRelation};
pub use migrate::{backup_timestamp, discover_legacy_files, LegacyFile};
