//! Merge keys for bancas and curriculum labels.

use crate::models::NO_BANCA;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Comparison key for a banca: trimmed and lowercased.
pub fn normalize_banca(banca: &str) -> String {
    banca.trim().to_lowercase()
}

/// Comparison key for a topic, subject or discipline label.
///
/// Lowercases, strips diacritics and punctuation, and collapses runs of
/// whitespace so that "Probabilidade " and "probabilidade." share a key.
pub fn normalize_topic(label: &str) -> String {
    let stripped: String = label
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Display label for a normalized banca key.
pub fn banca_label(key: &str) -> String {
    if key == NO_BANCA {
        "No banca".to_string()
    } else {
        key.to_uppercase()
    }
}
