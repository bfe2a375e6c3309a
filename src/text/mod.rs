use unicode_normalization::UnicodeNormalization;

/// Fallback shown for café names and locations the sheet left blank.
pub const NO_DATA: &str = "No data";

/// Fallback shown when a café has no roaster listed.
pub const NO_ROASTER: &str = "No roaster listed";

/// Canonical display form of a spreadsheet cell.
///
/// Missing cells, blank cells and the literal `nan` that spreadsheet exports
/// emit for empty numeric cells all collapse to `fallback`. Anything else is
/// returned trimmed.
pub fn normalize_display(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() && !text.eq_ignore_ascii_case("nan") => text.to_string(),
        _ => fallback.to_string(),
    }
}

/// Token form used for fuzzy matching.
///
/// Diacritics are folded to ASCII (`"Colón"` -> `"colon"`), everything outside
/// `[a-z0-9]` becomes a space and whitespace runs collapse to a single space.
pub fn normalize_for_match(value: Option<&str>) -> String {
    let display = normalize_display(value, "");
    let folded: String = display
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
