use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::Geocoder;
use crate::domain::CafeRecord;
use crate::text::normalize_for_match;

/// Which tier produced the coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSource {
    /// Remote geocoding service
    Online,
    /// Token match against the city's own café table
    Local,
}

impl CoordinateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateSource::Online => "online",
            CoordinateSource::Local => "local",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// (lat, lon)
    pub coords: (f64, f64),
    pub source: CoordinateSource,
}

/// Two-tier address resolution: remote geocoder first, café table second.
pub struct AddressResolver {
    geocoder: Arc<dyn Geocoder>,
    country: String,
}

impl AddressResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, country: impl Into<String>) -> Self {
        Self {
            geocoder,
            country: country.into(),
        }
    }

    /// Resolve `address` in `city`, or `None` if neither tier finds it.
    ///
    /// Remote failures are logged and treated exactly like "not found".
    pub fn resolve_coordinates(
        &self,
        address: &str,
        city: &str,
        cafes: &[CafeRecord],
    ) -> Option<Resolution> {
        if address.trim().is_empty() {
            return None;
        }

        if let Some(coords) = self.geocode_online(address, city) {
            info!(address, city, ?coords, "address geocoded online");
            return Some(Resolution {
                coords,
                source: CoordinateSource::Online,
            });
        }

        let coords = geocode_from_cafes(address, cafes)?;
        info!(address, city, ?coords, "address matched against café table");
        Some(Resolution {
            coords,
            source: CoordinateSource::Local,
        })
    }

    fn geocode_online(&self, address: &str, city: &str) -> Option<(f64, f64)> {
        let query = format!("{}, {}, {}", address, city, self.country);
        match self.geocoder.geocode(&query) {
            Ok(Some(coords)) => Some(coords),
            Ok(None) => {
                debug!(%query, "geocoder found nothing");
                None
            }
            Err(e) => {
                warn!(%query, error = %e, "geocoder failed");
                None
            }
        }
    }
}

/// Query tokens for local matching.
///
/// Tokens shorter than three characters are ignored unless nothing longer is
/// left. Duplicates are removed, first occurrence kept.
pub fn match_tokens(address: &str) -> Vec<String> {
    let normalized = normalize_for_match(Some(address));
    let all: Vec<&str> = normalized.split_whitespace().collect();
    let long: Vec<&str> = all.iter().copied().filter(|t| t.len() >= 3).collect();
    let chosen = if long.is_empty() { all } else { long };

    let mut tokens: Vec<String> = Vec::with_capacity(chosen.len());
    for token in chosen {
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Number of tokens found as substrings of a café's location and name.
pub fn match_score(tokens: &[String], cafe: &CafeRecord) -> usize {
    tokens
        .iter()
        .filter(|token| cafe.match_text.contains(token.as_str()))
        .count()
}

/// Coordinates of the café whose location/name best overlaps the address.
///
/// The first café with the highest score wins. A best score of zero is no match.
pub fn geocode_from_cafes(address: &str, cafes: &[CafeRecord]) -> Option<(f64, f64)> {
    let tokens = match_tokens(address);
    if tokens.is_empty() {
        return None;
    }

    let mut best: Option<(&CafeRecord, usize)> = None;
    for cafe in cafes {
        let score = match_score(&tokens, cafe);
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((cafe, score));
        }
    }

    best.map(|(cafe, _)| cafe.coords())
}
