//! Similarity primitives shared by the search and similarity engines.

use std::collections::HashSet;

/// Jaccard similarity of two token sets: `|A ∩ B| / |A ∪ B|`.
///
/// `jaccard(A, A) == 1.0`, `jaccard(A, ∅) == 0.0`, and the result is
/// symmetric in its arguments.
#[must_use]
pub fn jaccard(a: &[String], b: &[String]) -> f32 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Levenshtein edit distance between two strings, normalized to `[0, 1]`
/// where `1.0` means identical.
#[must_use]
pub fn levenshtein_normalized(a: &str, b: &str) -> f32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let max_len = a_chars.len().max(b_chars.len());

    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein_distance(&a_chars, &b_chars);
    1.0 - (distance as f32 / max_len as f32)
}

fn levenshtein_distance(a: &[char], b: &[char]) -> usize {
    let (n, m) = (a.len(), b.len());
    let mut row: Vec<usize> = (0..=m).collect();

    for i in 1..=n {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=m {
            let temp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j - 1])
            };
            prev_diag = temp;
        }
    }

    row[m]
}

/// Scores name-pattern overlap between two names: shared words weighted
/// 0.25 each, prefix/suffix overlap weighted 0.1 each, clamped to `1.0`.
#[must_use]
pub fn name_pattern_score(a: &str, b: &str) -> f32 {
    let words_a: HashSet<String> = super::tokenize::tokenize(a).into_iter().collect();
    let words_b: HashSet<String> = super::tokenize::tokenize(b).into_iter().collect();

    let shared = words_a.intersection(&words_b).count();
    let mut score = shared as f32 * 0.25;

    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    if !a_lower.is_empty() && !b_lower.is_empty() {
        if common_prefix_len(&a_lower, &b_lower) >= 3 {
            score += 0.1;
        }
        if common_suffix_len(&a_lower, &b_lower) >= 3 {
            score += 0.1;
        }
    }

    score.min(1.0)
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_jaccard_identity_and_empty() {
        let a = terms(&["auth", "service"]);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &[]), 0.0);
    }

    #[test]
    fn test_jaccard_symmetric() {
        let a = terms(&["auth", "service"]);
        let b = terms(&["auth", "database"]);
        assert_eq!(jaccard(&a, &b), jaccard(&b, &a));
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let a = terms(&["auth", "service", "login"]);
        let b = terms(&["auth", "service", "token"]);
        // intersection = 2, union = 4
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_levenshtein_normalized_identical() {
        assert_eq!(levenshtein_normalized("auth", "auth"), 1.0);
    }

    #[test]
    fn test_levenshtein_normalized_empty() {
        assert_eq!(levenshtein_normalized("", ""), 1.0);
    }

    #[test]
    fn test_name_pattern_score_shared_words() {
        let score = name_pattern_score("Dashboard Component Manager", "Dashboard Grid System");
        assert!(score > 0.0);
        assert!(score <= 1.0);
    }

    #[test]
    fn test_name_pattern_score_unrelated() {
        let score = name_pattern_score("User Authentication Service", "Database Connection Pool");
        assert_eq!(score, 0.0);
    }
}
