//! Text normalization for multilingual search.
//!
//! Pure functions, deterministic for identical input, and infallible: the
//! worst case for malformed or empty input is an empty string. Raw OCR output
//! goes through `normalize_common` plus an optional script-specific pass
//! before it is stored for indexing.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Arabic tatweel (elongation) character.
const TATWEEL: char = '\u{0640}';

/// Canonicalize whitespace and control characters.
///
/// Unifies line endings to `\n`, composes to NFC, drops control characters
/// other than newline and tab, collapses runs of spaces within each line,
/// and trims each line and the whole result. Idempotent.
pub fn normalize_common(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }

    let unified = input.replace("\r\n", "\n").replace('\r', "\n");

    let composed: String = unified.nfc().collect();

    let kept: String = composed
        .chars()
        .filter(|&ch| !ch.is_control() || ch == '\n' || ch == '\t')
        .collect();

    let lines: Vec<String> = kept
        .split('\n')
        .map(|line| {
            line.split(' ')
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string()
        })
        .collect();

    lines.join("\n").trim().to_string()
}

/// Strip combining marks (general category Mn, Mc, Me) after canonical
/// decomposition, then recompose to NFC.
pub fn remove_diacritics(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    input
        .nfd()
        .filter(|&ch| !is_combining_mark(ch))
        .nfc()
        .collect()
}

/// Arabic-specific search normalization: tatweel removal, diacritic
/// stripping, and unification of Hamza-bearing Alif variants and Alif
/// Maqsura.
pub fn normalize_arabic_for_search(input: &str) -> String {
    let common = normalize_common(input);

    let without_tatweel: String = common.chars().filter(|&ch| ch != TATWEEL).collect();

    let stripped = remove_diacritics(&without_tatweel);

    stripped
        .chars()
        .map(|ch| match ch {
            'أ' | 'إ' | 'آ' => 'ا',
            'ى' => 'ي',
            other => other,
        })
        .collect()
}

/// Hebrew-specific search normalization: niqqud and cantillation are
/// combining marks, so diacritic stripping is all that is needed.
pub fn normalize_hebrew_for_search(input: &str) -> String {
    remove_diacritics(&normalize_common(input))
}

/// Prepare text for search indexing, applying script-specific rules keyed by
/// an optional ISO language hint. Unknown or absent hints get the common
/// normalization only.
pub fn normalize_for_search(input: &str, language: Option<&str>) -> String {
    match language.unwrap_or("unknown") {
        "ar" => normalize_arabic_for_search(input),
        "he" => normalize_hebrew_for_search(input),
        _ => normalize_common(input),
    }
}
