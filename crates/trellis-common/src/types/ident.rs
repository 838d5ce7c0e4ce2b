//! SQL identifier normalisation.
//!
//! Unquoted identifiers are case-insensitive and stored upper-cased.
//! Identifiers wrapped in double quotes keep their case; the quotes are
//! stripped and doubled quotes inside are unescaped.

/// Normalises a column or table name.
///
/// ```rust
/// use trellis_common::types::normalize_identifier;
///
/// assert_eq!(normalize_identifier("artistId"), "ARTISTID");
/// assert_eq!(normalize_identifier("\"artistId\""), "artistId");
/// ```
#[must_use]
pub fn normalize_identifier(name: &str) -> String {
    let trimmed = name.trim();
    if is_quoted(trimmed) {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_ascii_uppercase()
    }
}

/// Renders a normalised identifier so that it normalises back to itself.
///
/// Plain upper-case identifiers are returned as-is, anything else is quoted.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');

    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn is_quoted(name: &str) -> bool {
    name.len() >= 2 && name.starts_with('"') && name.ends_with('"')
}
