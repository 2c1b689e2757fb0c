//! Tokenization and stop-word filtering.

/// English stop words dropped by [`tokenize`] and by the `aggressive`
/// compression level.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "have", "has", "had", "will", "would", "can", "that", "this", "it",
    "its", "as", "be", "from", "he", "during", "including",
];

/// Returns true if `term` is in the stop-word list (case-insensitive).
#[must_use]
pub fn is_stop_word(term: &str) -> bool {
    let lower = term.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

/// Lowercases `text`, splits on runs of non-letter characters, and drops
/// terms of length <= 2 and stop words.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphabetic())
        .filter(|term| term.len() > 2)
        .filter(|term| !is_stop_word(term))
        .map(str::to_string)
        .collect()
}

/// Splits `query` on whitespace, hyphens, underscores, commas, periods, and
/// slashes, drops terms of length <= 1 and stop words, and deduplicates
/// while preserving first-occurrence order.
///
/// Used for search query preparation, which is intentionally less
/// aggressive than [`tokenize`] (keeps length-2 terms) since short query
/// terms like "ui" or "db" are common and meaningful.
#[must_use]
pub fn prepare_search_terms(query: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut terms = Vec::new();
    for term in query
        .to_lowercase()
        .split(|c: char| matches!(c, ' ' | '\t' | '\n' | '-' | '_' | ',' | '.' | '/'))
        .filter(|t| t.len() > 1)
        .filter(|t| !is_stop_word(t))
    {
        if seen.insert(term.to_string()) {
            terms.push(term.to_string());
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_short_and_stop_words() {
        let tokens = tokenize("The quick brown fox jumps over the lazy dog");
        assert_eq!(tokens, vec!["quick", "brown", "fox", "jumps", "over", "lazy", "dog"]);
    }

    #[test]
    fn test_tokenize_splits_on_non_letters() {
        let tokens = tokenize("auth-service_v2.config");
        assert_eq!(tokens, vec!["auth", "service", "config"]);
    }

    #[test]
    fn test_prepare_search_terms_dedup_and_order() {
        let terms = prepare_search_terms("Auth Service, auth-db");
        assert_eq!(terms, vec!["auth", "service", "db"]);
    }

    #[test]
    fn test_prepare_search_terms_keeps_two_letter_terms() {
        let terms = prepare_search_terms("ui db");
        assert_eq!(terms, vec!["ui", "db"]);
    }

    #[test]
    fn test_is_stop_word() {
        assert!(is_stop_word("the"));
        assert!(is_stop_word("AND"));
        assert!(!is_stop_word("service"));
    }
}
