use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{DataLocation, FetchError, RawTable, TabularSource};
use crate::cache::{DatasetCache, Table};
use crate::config::{CityConfig, FileConfig};
use crate::domain::{CafeRecord, RoasterRecord};
use crate::error::{LocatorError, Result};

pub const LAT_COLUMN: &str = "LAT";
pub const LONG_COLUMN: &str = "LONG";

/// Loads café and roaster tables through the cache.
///
/// # Loading rules
/// - cafés: published sheet first, then the city's local CSV. If both fail the
///   caller gets `DataUnavailable` and nothing is cached, so the next call
///   tries again.
/// - roasters: published sheet only. A failure yields an empty table, which
///   is cached like any other.
/// - all cafés: every configured city, skipping the ones that fail.
pub struct DatasetLoader {
    config: Arc<FileConfig>,
    source: Arc<dyn TabularSource>,
    cache: Arc<DatasetCache>,
}

impl DatasetLoader {
    pub fn new(
        config: Arc<FileConfig>,
        source: Arc<dyn TabularSource>,
        cache: Arc<DatasetCache>,
    ) -> Self {
        Self {
            config,
            source,
            cache,
        }
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    pub fn load_cafes(&self, city: &str) -> Result<Table<CafeRecord>> {
        let city_config = self
            .config
            .city(city)
            .ok_or_else(|| LocatorError::InvalidCity(city.to_string()))?;

        if let Some(cached) = self.cache.fresh_cafes(city) {
            debug!(city, cafes = cached.len(), "café table served from cache");
            return Ok(cached);
        }

        let table = self.fetch_cafe_table(city_config)?;
        let cafes = clean_cafes(&table, city);
        info!(
            city,
            rows = table.rows.len(),
            kept = cafes.len(),
            "loaded café table"
        );

        Ok(self.cache.store_cafes(city, cafes))
    }

    pub fn load_roasters(&self) -> Table<RoasterRecord> {
        if let Some(cached) = self.cache.fresh_roasters() {
            debug!(roasters = cached.len(), "roaster table served from cache");
            return cached;
        }

        let location = self.config.roaster_source();
        let roasters = match self.source.fetch(&location) {
            Ok(table) => table.rows.iter().map(RoasterRecord::from_row).collect(),
            Err(e) => {
                warn!(%location, error = %e, "roaster sheet unavailable, serving an empty table");
                Vec::new()
            }
        };
        info!(roasters = roasters.len(), "loaded roaster table");

        self.cache.store_roasters(roasters)
    }

    pub fn load_all_cafes(&self) -> Table<CafeRecord> {
        if let Some(cached) = self.cache.fresh_all_cafes() {
            debug!(cafes = cached.len(), "combined café table served from cache");
            return cached;
        }

        let mut combined = Vec::new();
        for city in &self.config.cities {
            match self.load_cafes(&city.name) {
                Ok(cafes) => combined.extend(cafes.iter().cloned()),
                Err(e) => warn!(city = %city.name, error = %e, "skipping city in combined table"),
            }
        }
        info!(cafes = combined.len(), "built combined café table");

        self.cache.store_all_cafes(combined)
    }

    fn fetch_cafe_table(&self, city: &CityConfig) -> Result<RawTable> {
        let remote = self.config.cafe_source(city);
        let remote_err = match self.fetch_with_coordinates(&remote) {
            Ok(table) => return Ok(table),
            Err(e) => e,
        };
        warn!(city = %city.name, error = %remote_err, "published sheet failed, trying local file");

        let fallback = self.config.cafe_fallback(city);
        self.fetch_with_coordinates(&fallback)
            .map_err(|fallback_err| LocatorError::DataUnavailable {
                city: city.name.clone(),
                remote: remote_err,
                fallback: fallback_err,
            })
    }

    /// A café table without coordinate columns counts as a parse failure.
    fn fetch_with_coordinates(&self, location: &DataLocation) -> std::result::Result<RawTable, FetchError> {
        let table = self.source.fetch(location)?;
        table.require_columns(&[LAT_COLUMN, LONG_COLUMN])?;
        Ok(table)
    }
}

/// Parse one coordinate cell, accepting a decimal comma.
///
/// Returns `None` for missing or unparseable cells and for values outside
/// `[-limit, limit]` (NaN and infinities included).
pub fn clean_coordinate(raw: Option<&str>, limit: f64) -> Option<f64> {
    let value: f64 = raw?.trim().replace(',', ".").parse().ok()?;
    (-limit..=limit).contains(&value).then_some(value)
}

/// Turn raw sheet rows into café records for `city`, dropping rows whose
/// coordinates are missing, malformed or out of range.
pub fn clean_cafes(table: &RawTable, city: &str) -> Vec<CafeRecord> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let lat = clean_coordinate(row.get(LAT_COLUMN).map(String::as_str), 90.0)?;
            let lon = clean_coordinate(row.get(LONG_COLUMN).map(String::as_str), 180.0)?;
            Some(CafeRecord::from_row(row, lat, lon, city))
        })
        .collect()
}
