//! Pure text normalization, keyword extraction, compression, and similarity
//! primitives.
//!
//! Every function in this module is a pure function of its inputs: no I/O,
//! no shared state, no clock reads. This keeps the text pipeline trivially
//! testable and lets the storage and indexer layers call it from any thread
//! without synchronization.

pub mod keywords;
pub mod optimize;
pub mod similarity;
pub mod stem;
pub mod tokenize;

pub use keywords::extract_keywords;
pub use optimize::{optimize, CompressionLevel, Optimized};
pub use similarity::{jaccard, levenshtein_normalized, name_pattern_score};
pub use tokenize::tokenize;
