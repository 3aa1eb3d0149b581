//! Place-name normalization
//!
//! Folds user-typed place names into comparison keys so that "Lisboa",
//! " LISBOA " and "São Paulo"/"sao paulo" land on the same override entry and
//! compare equal during ranking.

use unicode_normalization::UnicodeNormalization;

/// Combining diacritical marks block (U+0300..=U+036F)
fn is_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Fold a raw place name into its comparison key.
///
/// Lower-cases, decomposes (NFD), drops combining diacritics and trims
/// surrounding whitespace. Lower-casing runs first because some upper-case
/// letters lower-case into a base letter plus a combining mark (`İ`), which
/// would otherwise survive the first pass and break idempotence.
///
/// ```
/// use airport_resolver::normalize::normalize_key;
///
/// assert_eq!(normalize_key("  São Paulo "), "sao paulo");
/// assert_eq!(normalize_key(""), "");
/// ```
pub fn normalize_key(raw: &str) -> String {
    raw.to_lowercase()
        .nfd()
        .filter(|c| !is_diacritic(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// True when the input is exactly three ASCII letters, i.e. already a location code
pub fn is_location_code(query: &str) -> bool {
    query.len() == 3 && query.chars().all(|c| c.is_ascii_alphabetic())
}
