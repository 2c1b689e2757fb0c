//! A lightweight Porter-style stemmer.
//!
//! Not a full Porter implementation — just the common English suffix rules
//! that matter for matching related word forms in keyword/search scoring
//! (`"services"` / `"serviced"` / `"servicing"` → `"servic"`). Deterministic
//! and total: every input maps to exactly one output.

/// Strips common suffixes from `term`, in order of specificity. Case is
/// preserved; callers typically lowercase first via [`super::tokenize`].
#[must_use]
pub fn stem(term: &str) -> String {
    let lower = term.to_lowercase();

    if lower.len() <= 3 {
        return lower;
    }

    for (suffix, replacement) in SUFFIX_RULES {
        if lower.ends_with(suffix) && lower.len() > suffix.len() + 2 {
            let stem_len = lower.len() - suffix.len();
            return format!("{}{}", &lower[..stem_len], replacement);
        }
    }

    lower
}

const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("ization", "ize"),
    ("ousness", "ous"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ing", ""),
    ("edly", ""),
    ("ied", "i"),
    ("ies", "i"),
    ("ed", ""),
    ("es", ""),
    ("s", ""),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_common_suffixes() {
        assert_eq!(stem("services"), "servic");
        assert_eq!(stem("serviced"), "service");
        assert_eq!(stem("servicing"), "servic");
        assert_eq!(stem("running"), "runn");
    }

    #[test]
    fn test_stem_short_words_unchanged() {
        assert_eq!(stem("api"), "api");
        assert_eq!(stem("db"), "db");
    }

    #[test]
    fn test_stem_deterministic() {
        for term in ["authentication", "databases", "configured", "api"] {
            assert_eq!(stem(term), stem(term));
        }
    }
}
