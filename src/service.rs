//! Request-level operations: everything a handler needs, one method each.

use anyhow::Context;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::api::{Geocoder, SheetClient, TabularSource, build_geocoder};
use crate::cache::DatasetCache;
use crate::config::FileConfig;
use crate::domain::{CafeRecord, RoasterRecord};
use crate::error::{LocatorError, Result};
use crate::geometry::{format_distance, sort_by_distance, within_radius};
use crate::loader::DatasetLoader;
use crate::resolver::{AddressResolver, CoordinateSource, Resolution};

pub const DEFAULT_RADIUS_KM: f64 = 2.0;
pub const MAX_RADIUS_KM: f64 = 10.0;
pub const RECOMMEND_RADIUS_KM: f64 = 0.75;

/// Roaster filter value meaning "any roaster".
pub const ANY_ROASTER: &str = "Todos";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub city: String,
    pub address: String,
    pub radius_km: f64,
    /// Exact roaster name; `None`, empty or `"Todos"` disables the filter
    pub roaster: Option<String>,
}

impl SearchQuery {
    pub fn new(city: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            address: address.into(),
            radius_km: DEFAULT_RADIUS_KM,
            roaster: None,
        }
    }

    pub fn with_radius(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn with_roaster(mut self, roaster: impl Into<String>) -> Self {
        self.roaster = Some(roaster.into());
        self
    }

    fn roaster_filter(&self) -> Option<&str> {
        self.roaster
            .as_deref()
            .filter(|r| !r.is_empty() && *r != ANY_ROASTER)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub cafe: CafeRecord,
    #[serde(rename = "fuente_geocoding")]
    pub source: CoordinateSource,
}

pub struct CafeLocator {
    loader: DatasetLoader,
    resolver: AddressResolver,
}

impl CafeLocator {
    pub fn new(loader: DatasetLoader, resolver: AddressResolver) -> Self {
        Self { loader, resolver }
    }

    /// Wire the locator from configuration: sheet client, configured
    /// geocoder, system-clock cache.
    pub fn from_config(config: FileConfig) -> anyhow::Result<Self> {
        let source: Arc<dyn TabularSource> =
            Arc::new(SheetClient::new().context("Failed to create sheet client")?);
        let geocoder: Arc<dyn Geocoder> = Arc::from(build_geocoder(&config.geocoder)?);
        Ok(Self::with_collaborators(config, source, geocoder))
    }

    pub fn with_collaborators(
        config: FileConfig,
        source: Arc<dyn TabularSource>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let cache = Arc::new(DatasetCache::with_ttl(config.cache_ttl_secs));
        Self::with_cache(config, source, geocoder, cache)
    }

    pub fn with_cache(
        config: FileConfig,
        source: Arc<dyn TabularSource>,
        geocoder: Arc<dyn Geocoder>,
        cache: Arc<DatasetCache>,
    ) -> Self {
        let resolver = AddressResolver::new(geocoder, config.geocoder.country.clone());
        let loader = DatasetLoader::new(Arc::new(config), source, cache);
        Self::new(loader, resolver)
    }

    pub fn cities(&self) -> Vec<String> {
        self.loader.config().city_names()
    }

    pub fn cafes(&self, city: &str) -> Result<Vec<CafeRecord>> {
        Ok(self.loader.load_cafes(city)?.to_vec())
    }

    pub fn roasters(&self, city: Option<&str>) -> Vec<RoasterRecord> {
        let roasters = self.loader.load_roasters();
        match city.filter(|c| !c.is_empty()) {
            Some(city) => roasters
                .iter()
                .filter(|r| r.serves_city(city))
                .cloned()
                .collect(),
            None => roasters.to_vec(),
        }
    }

    /// Cafés within the query radius, nearest first, with distance fields set.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<CafeRecord>> {
        if !(query.radius_km > 0.0 && query.radius_km <= MAX_RADIUS_KM) {
            return Err(LocatorError::InvalidRadius(query.radius_km));
        }

        let cafes = self.loader.load_cafes(&query.city)?;
        let resolution = self.resolve(&query.address, &query.city, &cafes)?;

        let mut found = within_radius(&cafes, resolution.coords, query.radius_km);
        sort_by_distance(&mut found);
        if let Some(roaster) = query.roaster_filter() {
            found.retain(|cafe| cafe.roaster == roaster);
        }
        info!(
            city = %query.city,
            radius_km = query.radius_km,
            source = resolution.source.as_str(),
            results = found.len(),
            "search finished"
        );

        Ok(found.into_iter().map(with_display_fields).collect())
    }

    pub fn recommend(&self, city: &str, address: &str) -> Result<Recommendation> {
        self.recommend_with_rng(city, address, &mut rand::rng())
    }

    /// One café picked uniformly at random within `RECOMMEND_RADIUS_KM`.
    pub fn recommend_with_rng<R: Rng + ?Sized>(
        &self,
        city: &str,
        address: &str,
        rng: &mut R,
    ) -> Result<Recommendation> {
        let cafes = self.loader.load_cafes(city)?;
        let resolution = self.resolve(address, city, &cafes)?;

        let candidates = within_radius(&cafes, resolution.coords, RECOMMEND_RADIUS_KM);
        let pick = candidates
            .choose(rng)
            .cloned()
            .ok_or(LocatorError::NoCandidates {
                radius_km: RECOMMEND_RADIUS_KM,
            })?;
        info!(city, candidates = candidates.len(), cafe = %pick.name, "recommended café");

        Ok(Recommendation {
            cafe: with_display_fields(pick),
            source: resolution.source,
        })
    }

    /// Exact-name matches across every configured city.
    pub fn lookup_by_name(&self, name: &str) -> Vec<CafeRecord> {
        self.loader
            .load_all_cafes()
            .iter()
            .filter(|cafe| cafe.name == name)
            .cloned()
            .map(CafeRecord::with_maps_link)
            .collect()
    }

    fn resolve(&self, address: &str, city: &str, cafes: &[CafeRecord]) -> Result<Resolution> {
        self.resolver
            .resolve_coordinates(address, city, cafes)
            .ok_or_else(|| LocatorError::GeocodeFailed {
                address: address.to_string(),
            })
    }
}

fn with_display_fields(cafe: CafeRecord) -> CafeRecord {
    let label = cafe.distance_km.map(format_distance);
    CafeRecord {
        distance_label: label,
        ..cafe.with_maps_link()
    }
}
