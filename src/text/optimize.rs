//! Text compression for storage and keyword-extraction input.

use super::keywords::extract_keywords;
use super::tokenize::{is_stop_word, tokenize};

/// Compression aggressiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Collapse internal whitespace and trim.
    Minimal,
    /// Minimal plus the fixed abbreviation table and light filler-word drop.
    Balanced,
    /// Balanced plus full stop-word removal and connective shorthand.
    Aggressive,
}

/// The fixed long-technical-word abbreviation table applied at `balanced`
/// and `aggressive` levels. Order matters: longer/more specific entries
/// should not be shadowed by shorter ones, so this list is matched whole-word.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("configuration", "config"),
    ("implementation", "impl"),
    ("application", "app"),
    ("environment", "env"),
    ("development", "dev"),
    ("production", "prod"),
    ("repository", "repo"),
    ("documentation", "docs"),
    ("requirements", "reqs"),
    ("specification", "spec"),
    ("performance", "perf"),
    ("optimization", "opt"),
    ("management", "mgmt"),
    ("information", "info"),
    ("technology", "tech"),
    ("framework", "fw"),
    ("library", "lib"),
    ("service", "svc"),
    ("server", "srv"),
    ("client", "cli"),
    ("request", "req"),
    ("response", "resp"),
    ("message", "msg"),
    ("session", "sess"),
    ("transaction", "txn"),
    ("operation", "op"),
    ("process", "proc"),
    ("system", "sys"),
    ("network", "net"),
    ("security", "sec"),
    ("encryption", "enc"),
    ("validation", "val"),
];

/// Connective-phrase shorthand applied only at `aggressive`.
const CONNECTIVES: &[(&str, &str)] = &[
    ("is ", "= "),
    ("has ", "> "),
    ("with ", "+ "),
    ("and ", "& "),
    ("that ", ": "),
    ("which ", ": "),
];

/// A term is "important" enough to survive filler-word dropping at
/// `balanced` if it contains a digit, contains an uppercase letter, or is
/// longer than 3 characters.
fn is_important(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_digit())
        || word.chars().any(char::is_uppercase)
        || word.len() > 3
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn apply_abbreviations(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let lower = word.to_lowercase();
            ABBREVIATIONS
                .iter()
                .find(|(long, _)| *long == lower)
                .map_or_else(|| word.to_string(), |(_, short)| (*short).to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn drop_filler_words(text: &str) -> String {
    text.split(' ')
        .filter(|word| is_important(word) || !is_stop_word(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn drop_all_stop_words(text: &str) -> String {
    text.split(' ')
        .filter(|word| !is_stop_word(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn apply_connectives(text: &str) -> String {
    let mut result = text.to_string();
    for (phrase, shorthand) in CONNECTIVES {
        result = result.replace(phrase, shorthand);
    }
    result
}

/// Result of [`optimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    /// The compressed text.
    pub optimized: String,
    /// Keywords extracted from the original text.
    pub keywords: Vec<(String, f32)>,
    /// Token count of `optimized`.
    pub token_count: usize,
    /// Token count of the original text.
    pub original_token_count: usize,
    /// `optimized.len() as f32 / original.len() as f32`, or `1.0` for empty input.
    pub compression_ratio: f32,
}

/// Compresses `text` at the given level and extracts up to 10 keywords from
/// the original (uncompressed) text.
///
/// Idempotent at each level: `optimize(optimize(text, level).optimized, level).optimized
/// == optimize(text, level).optimized`.
#[must_use]
pub fn optimize(text: &str, level: CompressionLevel) -> Optimized {
    let original_len = text.len();
    let original_token_count = tokenize(text).len();
    let keywords = extract_keywords(text, 10);

    let optimized = match level {
        CompressionLevel::Minimal => collapse_whitespace(text),
        CompressionLevel::Balanced => {
            let collapsed = collapse_whitespace(text);
            let abbreviated = apply_abbreviations(&collapsed);
            drop_filler_words(&abbreviated)
        }
        CompressionLevel::Aggressive => {
            let collapsed = collapse_whitespace(text);
            let abbreviated = apply_abbreviations(&collapsed);
            let stripped = drop_all_stop_words(&abbreviated);
            apply_connectives(&format!("{stripped} "))
                .trim_end()
                .to_string()
        }
    };

    let compression_ratio = if original_len == 0 {
        1.0
    } else {
        optimized.len() as f32 / original_len as f32
    };

    Optimized {
        token_count: tokenize(&optimized).len(),
        optimized,
        keywords,
        original_token_count,
        compression_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_collapses_whitespace() {
        let result = optimize("hello    world\n\tfoo", CompressionLevel::Minimal);
        assert_eq!(result.optimized, "hello world foo");
    }

    #[test]
    fn test_balanced_applies_abbreviations() {
        let result = optimize(
            "the configuration for the application server",
            CompressionLevel::Balanced,
        );
        assert!(result.optimized.contains("config"));
        assert!(result.optimized.contains("app"));
        assert!(result.optimized.contains("srv") || result.optimized.contains("server"));
    }

    #[test]
    fn test_aggressive_applies_connectives() {
        let result = optimize("the service is running and has errors", CompressionLevel::Aggressive);
        assert!(!result.optimized.contains(" is "));
        assert!(!result.optimized.contains(" and "));
    }

    #[test]
    fn test_idempotent_at_each_level() {
        for level in [
            CompressionLevel::Minimal,
            CompressionLevel::Balanced,
            CompressionLevel::Aggressive,
        ] {
            let text = "The Configuration Service has a Request with an Environment";
            let once = optimize(text, level);
            let twice = optimize(&once.optimized, level);
            assert_eq!(once.optimized, twice.optimized);
        }
    }

    #[test]
    fn test_compression_ratio_empty_text() {
        let result = optimize("", CompressionLevel::Aggressive);
        assert_eq!(result.compression_ratio, 1.0);
    }
}
