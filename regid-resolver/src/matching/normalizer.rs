//! Text normalization for company-name matching
//!
//! - Lowercase
//! - Unicode NFD decomposition with combining marks removed (`ç` → `c`)
//! - Whitespace collapsed and trimmed
//!
//! Punctuation is kept by [`normalize`]; [`tokenize`] splits on it.

use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize text for comparison
///
/// ```
/// use regid_resolver::matching::normalizer::normalize;
///
/// assert_eq!(normalize("  ACME   Logística  "), "acme logistica");
/// assert_eq!(normalize("Participações S.A."), "participacoes s.a.");
/// ```
pub fn normalize(s: &str) -> String {
    let stripped: String = s
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text on non-alphanumeric characters
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Stop-word set compared in normalized form
///
/// Accented and unaccented spellings collapse to one entry.
#[derive(Debug, Clone, Default)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            words
                .into_iter()
                .map(|w| normalize(w.as_ref()))
                .filter(|w| !w.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }
}

/// Tokens that carry brand identity, in query order
///
/// Drops tokens shorter than `min_len` and stop words.
pub fn brand_tokens(tokens: &[String], stop_words: &StopWords, min_len: usize) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| t.chars().count() >= min_len && !stop_words.contains(t))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_diacritics_and_collapses() {
        assert_eq!(normalize("São  Paulo"), "sao paulo");
        assert_eq!(normalize("\tCOMÉRCIO\n de  Peças "), "comercio de pecas");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        assert_eq!(
            tokenize(&normalize("Fiorde Logística-Internacional S.A.")),
            vec!["fiorde", "logistica", "internacional", "s", "a"]
        );
    }

    #[test]
    fn test_brand_tokens_filters_stop_words_and_short_tokens() {
        let stop = StopWords::new(["ltda", "logística", "internacional", "sa"]);
        let tokens = tokenize(&normalize("Fiorde Logística Internacional X LTDA"));
        assert_eq!(brand_tokens(&tokens, &stop, 2), vec!["fiorde"]);

        let tokens = tokenize(&normalize("Padaria Bom Pão"));
        assert_eq!(brand_tokens(&tokens, &stop, 2), vec!["padaria", "bom", "pao"]);
    }

    #[test]
    fn test_stop_words_match_accent_insensitively() {
        let stop = StopWords::new(["Participações"]);
        assert!(stop.contains("participacoes"));
        assert!(!stop.contains("participações"));
    }
}
