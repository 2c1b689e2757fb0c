//! Structured logging.
//!
//! Installs a single process-wide `tracing` subscriber. Store transactions,
//! search strategy runs, and indexer tasks emit `tracing::debug!`/`warn!`
//! events; the pure Text Analyzer and Similarity Engine stay silent.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

static INIT: OnceLock<()> = OnceLock::new();

/// Installs a `tracing_subscriber::fmt` subscriber filtered at `level`,
/// honoring `RUST_LOG` if set. Safe to call more than once; only the first
/// call takes effect.
pub fn init(level: LogLevel) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(LogLevel::Debug);
        init(LogLevel::Error);
    }
}
