//! Frequency-based keyword extraction with bonuses for technical-looking
//! tokens and recognized patterns.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::tokenize::{is_stop_word, tokenize};

static FILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[\w.-]+/)+[\w.-]+").expect("valid regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
static SCOPED_PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[\w-]+/[\w.-]+").expect("valid regex"));
static UPPER_SNAKE_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9_]{2,}=\S+").expect("valid regex"));
static CALL_EXPR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z_]\w*\([^()]*\)").expect("valid regex"));
static CAPITALIZED_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:[A-Z][a-z]+\s*){2,}").expect("valid regex"));

const PATTERN_WEIGHT: f32 = 3.0;
const CAPITALIZED_WEIGHT: f32 = 1.5;

/// Extracts up to `max_k` keywords from `text`, scored by raw frequency plus
/// additive bonuses for camelCase/PascalCase tokens, tokens containing
/// digits, and recognized patterns (file paths, URLs, scoped packages,
/// `UPPER_SNAKE=value`, `call(args)`).
///
/// Results are ordered by descending score, then lexicographically for
/// ties, matching the determinism contract tested alongside [`super::optimize`].
#[must_use]
pub fn extract_keywords(text: &str, max_k: usize) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();

    for token in tokenize(text) {
        *scores.entry(token.clone()).or_insert(0.0) += 1.0;
        if is_technical_token(&token) {
            *scores.entry(token).or_insert(0.0) += PATTERN_WEIGHT;
        }
    }

    for pattern in [&*FILE_PATH, &*URL, &*SCOPED_PACKAGE, &*UPPER_SNAKE_ASSIGN, &*CALL_EXPR] {
        for m in pattern.find_iter(text) {
            let term = m.as_str().to_lowercase();
            if !term.is_empty() {
                *scores.entry(term).or_insert(0.0) += PATTERN_WEIGHT;
            }
        }
    }

    for m in CAPITALIZED_RUN.find_iter(text) {
        let term = m.as_str().to_lowercase();
        if !is_stop_word(&term) {
            *scores.entry(term).or_insert(0.0) += CAPITALIZED_WEIGHT;
        }
    }

    let mut ranked: Vec<(String, f32)> = scores.into_iter().collect();
    ranked.sort_by(|(term_a, score_a), (term_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| term_a.cmp(term_b))
    });
    ranked.truncate(max_k);
    ranked
}

/// True for tokens that look technical: camelCase/PascalCase, or containing
/// a digit.
fn is_technical_token(token: &str) -> bool {
    let has_mixed_case = token.chars().any(char::is_uppercase) && token.chars().any(char::is_lowercase);
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    has_mixed_case || has_digit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords_frequency() {
        let keywords = extract_keywords("auth auth auth service service database", 10);
        assert_eq!(keywords[0].0, "auth");
        assert!(keywords[0].1 > keywords.iter().find(|(t, _)| t == "database").unwrap().1);
    }

    #[test]
    fn test_extract_keywords_respects_max_k() {
        let keywords = extract_keywords("one two three four five six seven eight", 3);
        assert_eq!(keywords.len(), 3);
    }

    #[test]
    fn test_extract_keywords_recognizes_url() {
        let keywords = extract_keywords("see https://example.com/docs for details", 10);
        assert!(keywords.iter().any(|(t, _)| t.contains("example.com")));
    }

    #[test]
    fn test_extract_keywords_deterministic_ordering() {
        let a = extract_keywords("alpha beta gamma", 10);
        let b = extract_keywords("alpha beta gamma", 10);
        assert_eq!(a, b);
    }
}
