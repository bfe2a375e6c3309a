use serde::Serialize;
use std::collections::HashMap;

use crate::text::{NO_DATA, NO_ROASTER, normalize_display, normalize_for_match};

/// A café that survived loading: both coordinates present and in range.
///
/// Field names on the wire follow the column vocabulary of the source sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CafeRecord {
    #[serde(rename = "CAFE")]
    pub name: String,
    #[serde(rename = "UBICACION")]
    pub location: String,
    #[serde(rename = "TOSTADOR")]
    pub roaster: String,
    #[serde(rename = "LAT")]
    pub lat: f64,
    #[serde(rename = "LONG")]
    pub lon: f64,
    #[serde(rename = "CIUDAD")]
    pub city: String,
    /// Distance to the query origin, only set by a radius query
    #[serde(rename = "DIST_KM", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(rename = "DISTANCIA", skip_serializing_if = "Option::is_none")]
    pub distance_label: Option<String>,
    #[serde(rename = "MAPS", skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
    /// Match-normalized location and name, computed from the raw cells
    #[serde(skip)]
    pub match_text: String,
}

impl CafeRecord {
    /// Build a record from a sheet row and already-cleaned coordinates.
    ///
    /// `city` is the city the row was loaded for; any city column in the
    /// sheet is ignored.
    pub fn from_row(row: &HashMap<String, String>, lat: f64, lon: f64, city: &str) -> Self {
        let cell = |key: &str| row.get(key).map(String::as_str);
        let match_text = format!(
            "{} {}",
            normalize_for_match(cell("UBICACION")),
            normalize_for_match(cell("CAFE"))
        );

        Self {
            name: normalize_display(cell("CAFE"), NO_DATA),
            location: normalize_display(cell("UBICACION"), NO_DATA),
            roaster: normalize_display(cell("TOSTADOR"), NO_ROASTER),
            lat,
            lon,
            city: city.to_string(),
            distance_km: None,
            distance_label: None,
            maps_url: None,
            match_text,
        }
    }

    /// (lat, lon) pair
    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    pub fn with_maps_link(mut self) -> Self {
        self.maps_url = Some(maps_link(self.lat, self.lon));
        self
    }
}

/// Google Maps search link pointing at a coordinate pair.
///
/// Coordinates keep their decimal point (`-38.0`, not `-38`).
pub fn maps_link(lat: f64, lon: f64) -> String {
    format!("https://www.google.com/maps/search/?api=1&query={:?},{:?}", lat, lon)
}
