use serde::Serialize;
use std::collections::HashMap;

use crate::text::normalize_display;

const MISSING: &str = "-";

/// A coffee roaster from the shared roaster sheet.
///
/// Roasters have no coordinates and are never radius-filtered. Every field
/// defaults to `"-"` when the sheet leaves it blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoasterRecord {
    #[serde(rename = "TOSTADOR")]
    pub name: String,
    #[serde(rename = "VARIEDADES")]
    pub varieties: String,
    #[serde(rename = "DESCRIPCION")]
    pub description: String,
    #[serde(rename = "INSTAGRAM")]
    pub instagram: String,
    #[serde(rename = "CIUDAD")]
    pub city: String,
}

impl RoasterRecord {
    pub fn from_row(row: &HashMap<String, String>) -> Self {
        let field = |key: &str| normalize_display(row.get(key).map(String::as_str), MISSING);
        Self {
            name: field("TOSTADOR"),
            varieties: field("VARIEDADES"),
            description: field("DESCRIPCION"),
            instagram: field("INSTAGRAM"),
            city: field("CIUDAD"),
        }
    }

    /// Case-insensitive substring match on the roaster's city field.
    pub fn serves_city(&self, city: &str) -> bool {
        self.city.to_lowercase().contains(&city.to_lowercase())
    }
}
