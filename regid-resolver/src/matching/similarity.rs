//! Edit-distance similarity
//!
//! `ratio = 1 - levenshtein(a, b) / len(longer)`, measured in chars.
//! Two empty strings are identical (1.0); one empty string scores 0.0.

/// Levenshtein distance in chars
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Similarity ratio in [0.0, 1.0]
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Every token of `seq` appears in `text`, in order, without overlap
pub fn contains_in_order(text: &str, seq: &[String]) -> bool {
    let mut from = 0;
    for token in seq {
        match text[from..].find(token.as_str()) {
            Some(pos) => from += pos + token.len(),
            None => return false,
        }
    }
    true
}
