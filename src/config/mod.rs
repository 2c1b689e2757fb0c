//! Configuration.
//!
//! A single [`Config`] record replaces scattered global state: it is built
//! once, by [`Config::from_env`] or [`Config::load`], and threaded through
//! [`crate::Orchestrator::open`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_AUTO_CREATE_RELATIONS: bool = true;
const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;
const DEFAULT_AUTO_RELATION_THRESHOLD: f32 = 0.78;
const DEFAULT_INDEXER_POLL_SECS: u64 = 2;
const DEFAULT_BACKUP_RETENTION: usize = 5;
const DEFAULT_MAX_SEARCH_RESULTS: usize = 50;

/// Log verbosity, mirroring the `LOG_LEVEL` environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Verbose diagnostic output.
    Debug,
    /// Normal operational output.
    #[default]
    Info,
    /// Recoverable problems only.
    Warn,
    /// Failures only.
    Error,
    /// Unrecoverable failures. Mapped onto `tracing::Level::ERROR`, since
    /// `tracing` has no distinct fatal level.
    Fatal,
}

impl LogLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// The `tracing` filter directive this level maps to.
    #[must_use]
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error | Self::Fatal => "error",
        }
    }
}

/// Optional `mindgraph.toml` override file, merged beneath environment
/// variables (file first, then env — matching the teacher's config loader
/// precedence).
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    memory_path: Option<PathBuf>,
    log_level: Option<String>,
    auto_create_relations: Option<bool>,
    similarity_threshold: Option<f32>,
    auto_relation_threshold: Option<f32>,
    indexer_poll_interval_secs: Option<u64>,
    backup_retention: Option<usize>,
    max_search_results: Option<usize>,
}

/// Explicit configuration record for a mindgraph instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding the `SQLite` database and `.memory/` sidecar.
    pub memory_path: PathBuf,
    /// Log verbosity passed to [`crate::observability::init`].
    pub log_level: LogLevel,
    /// Whether `Orchestrator::create_entities` auto-creates relations for
    /// high-confidence similarity matches.
    pub auto_create_relations: bool,
    /// Minimum composite score for `SimilarityEngine::detect_similar` to
    /// return a candidate.
    pub similarity_threshold: f32,
    /// Minimum score for the indexer to auto-create a suggested relation.
    pub auto_relation_threshold: f32,
    /// How often the background indexer polls its queue.
    pub indexer_poll_interval: Duration,
    /// Number of JSONL backup snapshots retained on `Orchestrator::close`.
    pub backup_retention: usize,
    /// Maximum entities returned by `SearchEngine::search`.
    pub max_search_results: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_path: default_memory_path(),
            log_level: LogLevel::Info,
            auto_create_relations: DEFAULT_AUTO_CREATE_RELATIONS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            auto_relation_threshold: DEFAULT_AUTO_RELATION_THRESHOLD,
            indexer_poll_interval: Duration::from_secs(DEFAULT_INDEXER_POLL_SECS),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
        }
    }
}

fn default_memory_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "mindgraph")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".mindgraph"))
}

impl Config {
    /// Builds a config from struct defaults, then applies `MEMORY_PATH`,
    /// `LOG_LEVEL`, and `MINDGRAPH_*`-prefixed environment overrides.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Loads `mindgraph.toml` at `base_dir` if present, then applies
    /// environment overrides on top (env takes precedence over file).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Invalid`] if the file exists but cannot be
    /// parsed.
    pub fn load(base_dir: &Path) -> crate::Result<Self> {
        let mut config = Self::default();
        let path = base_dir.join("mindgraph.toml");
        if path.is_file() {
            let contents = std::fs::read_to_string(&path).map_err(|e| crate::Error::Invalid(format!(
                "failed to read {}: {e}",
                path.display()
            )))?;
            let file: ConfigFile = toml::from_str(&contents)
                .map_err(|e| crate::Error::Invalid(format!("failed to parse {}: {e}", path.display())))?;
            config.apply_file(file);
        }
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.memory_path {
            self.memory_path = v;
        }
        if let Some(v) = file.log_level.as_deref().and_then(LogLevel::parse) {
            self.log_level = v;
        }
        if let Some(v) = file.auto_create_relations {
            self.auto_create_relations = v;
        }
        if let Some(v) = file.similarity_threshold {
            self.similarity_threshold = v;
        }
        if let Some(v) = file.auto_relation_threshold {
            self.auto_relation_threshold = v;
        }
        if let Some(v) = file.indexer_poll_interval_secs {
            self.indexer_poll_interval = Duration::from_secs(v);
        }
        if let Some(v) = file.backup_retention {
            self.backup_retention = v;
        }
        if let Some(v) = file.max_search_results {
            self.max_search_results = v;
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MEMORY_PATH") {
            self.memory_path = PathBuf::from(v);
        }
        if let Some(v) = std::env::var("LOG_LEVEL").ok().and_then(|v| LogLevel::parse(&v)) {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("MINDGRAPH_AUTO_CREATE_RELATIONS") {
            self.auto_create_relations = v.eq_ignore_ascii_case("true") || v == "1";
        }
        if let Ok(v) = std::env::var("MINDGRAPH_SIMILARITY_THRESHOLD") {
            if let Ok(threshold) = v.parse::<f32>() {
                self.similarity_threshold = threshold.clamp(0.0, 1.0);
            }
        }
        if let Ok(v) = std::env::var("MINDGRAPH_AUTO_RELATION_THRESHOLD") {
            if let Ok(threshold) = v.parse::<f32>() {
                self.auto_relation_threshold = threshold.clamp(0.0, 1.0);
            }
        }
        if let Ok(v) = std::env::var("MINDGRAPH_INDEXER_POLL_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.indexer_poll_interval = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("MINDGRAPH_BACKUP_RETENTION") {
            if let Ok(n) = v.parse::<usize>() {
                self.backup_retention = n;
            }
        }
        if let Ok(v) = std::env::var("MINDGRAPH_MAX_SEARCH_RESULTS") {
            if let Ok(n) = v.parse::<usize>() {
                self.max_search_results = n;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.auto_create_relations);
        assert!((config.similarity_threshold - 0.5).abs() < f32::EPSILON);
        assert!((config.auto_relation_threshold - 0.78).abs() < f32::EPSILON);
        assert_eq!(config.backup_retention, 5);
        assert_eq!(config.max_search_results, 50);
        assert_eq!(config.indexer_poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("fatal"), Some(LogLevel::Fatal));
        assert_eq!(LogLevel::parse("nonsense"), None);
        assert_eq!(LogLevel::Fatal.as_filter(), "error");
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.backup_retention, 5);
    }

    #[test]
    fn test_load_merges_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("mindgraph.toml"),
            "backup_retention = 9\nsimilarity_threshold = 0.6\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.backup_retention, 9);
        assert!((config.similarity_threshold - 0.6).abs() < f32::EPSILON);
    }
}
