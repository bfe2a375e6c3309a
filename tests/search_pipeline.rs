use anyhow::anyhow;
use chrono::{Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cafemap::api::{
    DataLocation, FetchError, Geocoder, RawTable, SheetClient, TabularSource, parse_csv,
};
use cafemap::cache::{DatasetCache, ManualClock};
use cafemap::config::FileConfig;
use cafemap::geometry::great_circle_km;
use cafemap::resolver::CoordinateSource;
use cafemap::{CafeLocator, LocatorError, SearchQuery};

const MDP_CAFES: &str = "\
CAFE,UBICACION,TOSTADOR,LAT,LONG
Arenal,Av. Colón 1500,Puerto Blest,\"-38,0000\",\"-57,5500\"
Lo de Meli,Güemes 2900,Lab,-38.0090,-57.5500
Faro,Punta Mogotes,Puerto Blest,-38.1000,-57.5500
";

const ROSARIO_CAFES: &str = "\
CAFE,UBICACION,TOSTADOR,LAT,LONG
Arenal,Oroño 1200,Lab,-32.9500,-60.6500
Flora,Pellegrini 900,,-32.9550,-60.6450
";

const ROASTERS: &str = "\
TOSTADOR,VARIEDADES,DESCRIPCION,INSTAGRAM,CIUDAD
Puerto Blest,Colombia; Brasil,Tostador de la costa,@puertoblest,Mar del Plata
Lab,Etiopía,,@lab,Rosario / Buenos Aires
";

#[derive(Default)]
struct MemorySource {
    tables: HashMap<DataLocation, RawTable>,
    fetches: AtomicUsize,
}

impl MemorySource {
    fn with(mut self, location: DataLocation, csv: &str) -> Self {
        self.tables
            .insert(location, parse_csv(csv.as_bytes()).expect("fixture CSV parses"));
        self
    }
}

impl TabularSource for MemorySource {
    fn fetch(&self, location: &DataLocation) -> Result<RawTable, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.tables
            .get(location)
            .cloned()
            .ok_or(FetchError::Status(503))
    }
}

/// Geocoder that is always down.
struct Unreachable;

impl Geocoder for Unreachable {
    fn geocode(&self, _query: &str) -> anyhow::Result<Option<(f64, f64)>> {
        Err(anyhow!("connection refused"))
    }
}

/// Geocoder that resolves every query to one fixed point.
struct FixedPoint {
    coords: (f64, f64),
    queries: Mutex<Vec<String>>,
}

impl Geocoder for FixedPoint {
    fn geocode(&self, query: &str) -> anyhow::Result<Option<(f64, f64)>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(Some(self.coords))
    }
}

fn remote(config: &FileConfig, city: &str) -> DataLocation {
    config.cafe_source(config.city(city).unwrap())
}

fn standard_source(config: &FileConfig) -> MemorySource {
    MemorySource::default()
        .with(remote(config, "Mar del Plata"), MDP_CAFES)
        .with(remote(config, "Rosario"), ROSARIO_CAFES)
        .with(config.roaster_source(), ROASTERS)
}

fn offline_locator() -> (CafeLocator, Arc<MemorySource>) {
    let config = FileConfig::default();
    let source = Arc::new(standard_source(&config));
    let locator = CafeLocator::with_collaborators(config, source.clone(), Arc::new(Unreachable));
    (locator, source)
}

#[test]
fn search_falls_back_to_local_match_and_sorts_by_distance() {
    let (locator, _source) = offline_locator();

    let query = SearchQuery::new("Mar del Plata", "Av. Colón 1500").with_radius(2.0);
    let cafes = locator.search(&query).unwrap();

    let names: Vec<&str> = cafes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Arenal", "Lo de Meli"]);

    let origin = (-38.0, -57.55);
    let mut previous = 0.0;
    for cafe in &cafes {
        let d = cafe.distance_km.expect("distance set");
        assert!(d <= 2.0);
        assert!(d >= previous);
        assert!((d - great_circle_km(origin, cafe.coords())).abs() < 1e-9);
        assert!(cafe.distance_label.is_some());
        assert!(cafe.maps_url.is_some());
        previous = d;
    }
    assert_eq!(cafes[0].distance_label.as_deref(), Some("0 m"));

    let json = serde_json::to_value(&cafes).unwrap();
    assert!(json[1]["DISTANCIA"].as_str().unwrap().ends_with(" m"));
    assert!(json[1]["MAPS"].as_str().unwrap().contains("query=-38.009,-57.55"));
}

#[test]
fn search_filters_by_exact_roaster() {
    let (locator, _source) = offline_locator();
    let base = SearchQuery::new("Mar del Plata", "Av. Colón 1500").with_radius(10.0);

    let blest = locator.search(&base.clone().with_roaster("Puerto Blest")).unwrap();
    assert_eq!(blest.len(), 1);
    assert_eq!(blest[0].name, "Arenal");

    let any = locator.search(&base.clone().with_roaster("Todos")).unwrap();
    assert_eq!(any.len(), 2);

    let none = locator.search(&base.with_roaster("puerto blest")).unwrap();
    assert!(none.is_empty());
}

#[test]
fn search_with_nothing_in_range_is_an_empty_success() {
    let config = FileConfig::default();
    let source = Arc::new(standard_source(&config));
    let geocoder = Arc::new(FixedPoint {
        coords: (-38.5, -58.0),
        queries: Mutex::new(Vec::new()),
    });
    let locator = CafeLocator::with_collaborators(config, source, geocoder.clone());

    let cafes = locator
        .search(&SearchQuery::new("Mar del Plata", "Ruta 88 km 30"))
        .unwrap();
    assert!(cafes.is_empty());
    assert_eq!(
        *geocoder.queries.lock().unwrap(),
        vec!["Ruta 88 km 30, Mar del Plata, Argentina"]
    );
}

#[test]
fn search_rejects_bad_input() {
    let (locator, source) = offline_locator();

    let err = locator
        .search(&SearchQuery::new("Paris", "Rue de Rivoli"))
        .unwrap_err();
    assert!(matches!(err, LocatorError::InvalidCity(_)));
    assert_eq!(err.status_code(), 400);

    for radius in [0.0, -1.0, 10.5, f64::NAN] {
        let query = SearchQuery::new("Mar del Plata", "Av. Colón 1500").with_radius(radius);
        assert!(matches!(
            locator.search(&query).unwrap_err(),
            LocatorError::InvalidRadius(_)
        ));
    }
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);

    let edge = SearchQuery::new("Mar del Plata", "Av. Colón 1500").with_radius(10.0);
    assert!(locator.search(&edge).is_ok());
}

#[test]
fn search_reports_unresolvable_address() {
    let (locator, _source) = offline_locator();

    let err = locator
        .search(&SearchQuery::new("Mar del Plata", "Calle Inexistente 0"))
        .unwrap_err();
    assert!(matches!(err, LocatorError::GeocodeFailed { .. }));
    assert_eq!(err.status_code(), 404);
}

#[test]
fn recommend_without_candidates_fails_distinctly() {
    let config = FileConfig::default();
    let source = Arc::new(standard_source(&config));
    // ~1 km north of every Mar del Plata café
    let geocoder = Arc::new(FixedPoint {
        coords: (-37.9900, -57.5500),
        queries: Mutex::new(Vec::new()),
    });
    let locator = CafeLocator::with_collaborators(config, source, geocoder);

    let err = locator.recommend("Mar del Plata", "Av. Colón 1500").unwrap_err();
    assert!(matches!(err, LocatorError::NoCandidates { radius_km } if radius_km == 0.75));
    assert_eq!(err.status_code(), 404);
}

#[test]
fn recommend_picks_within_750_m_and_reports_source() {
    let (locator, _source) = offline_locator();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..10 {
        let pick = locator
            .recommend_with_rng("Mar del Plata", "Av. Colón 1500", &mut rng)
            .unwrap();
        assert_eq!(pick.cafe.name, "Arenal");
        assert_eq!(pick.source, CoordinateSource::Local);
        assert_eq!(pick.cafe.distance_label.as_deref(), Some("0 m"));
    }

    let json = serde_json::to_value(
        locator
            .recommend_with_rng("Mar del Plata", "Av. Colón 1500", &mut rng)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(json["fuente_geocoding"], "local");
    assert_eq!(json["cafe"]["CAFE"], "Arenal");
}

#[test]
fn recommend_reports_unresolvable_address() {
    let (locator, _source) = offline_locator();
    let err = locator.recommend("Rosario", "   ").unwrap_err();
    assert!(matches!(err, LocatorError::GeocodeFailed { .. }));
}

#[test]
fn lookup_by_name_spans_cities_and_skips_broken_ones() {
    let (locator, _source) = offline_locator();

    let found = locator.lookup_by_name("Arenal");
    let cities: Vec<&str> = found.iter().map(|c| c.city.as_str()).collect();
    assert_eq!(cities, vec!["Mar del Plata", "Rosario"]);
    assert!(found.iter().all(|c| c.maps_url.is_some()));
    assert!(found.iter().all(|c| c.distance_km.is_none()));

    assert!(locator.lookup_by_name("arenal").is_empty());
}

#[test]
fn cities_cafes_and_roasters() {
    let (locator, _source) = offline_locator();

    assert_eq!(locator.cities().len(), 5);
    assert_eq!(locator.cities()[0], "Mar del Plata");

    let cafes = locator.cafes("Rosario").unwrap();
    assert_eq!(cafes.len(), 2);
    assert_eq!(cafes[1].roaster, "No roaster listed");
    assert!(matches!(
        locator.cafes("Buenos Aires").unwrap_err(),
        LocatorError::DataUnavailable { .. }
    ));

    assert_eq!(locator.roasters(None).len(), 2);
    let in_ba = locator.roasters(Some("buenos aires"));
    assert_eq!(in_ba.len(), 1);
    assert_eq!(in_ba[0].name, "Lab");
    assert_eq!(in_ba[0].description, "-");
}

#[test]
fn repeated_requests_reuse_the_cache_until_ttl() {
    let config = FileConfig::default();
    let source = Arc::new(standard_source(&config));
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = Arc::new(DatasetCache::new(config.cache_ttl_secs, clock.clone()));
    let locator = CafeLocator::with_cache(config, source.clone(), Arc::new(Unreachable), cache);

    let query = SearchQuery::new("Mar del Plata", "Av. Colón 1500");
    locator.search(&query).unwrap();
    locator.recommend("Mar del Plata", "Av. Colón 1500").unwrap();
    locator.cafes("Mar del Plata").unwrap();
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

    clock.advance(Duration::seconds(600));
    locator.search(&query).unwrap();
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
}

#[test]
fn local_fallback_file_serves_the_city() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", MDP_CAFES).unwrap();

    let mut config = FileConfig::default();
    config.fallback_csv = file.path().to_path_buf();
    let source = Arc::new(LocalOnly(SheetClient::new().unwrap()));
    let locator = CafeLocator::with_collaborators(config, source, Arc::new(Unreachable));

    let cafes = locator.cafes("Mar del Plata").unwrap();
    assert_eq!(cafes.len(), 3);
    assert!(cafes.iter().all(|c| c.city == "Mar del Plata"));
}

/// Lets local reads through to the real client and fails remote ones without
/// touching the network.
struct LocalOnly(SheetClient);

impl TabularSource for LocalOnly {
    fn fetch(&self, location: &DataLocation) -> Result<RawTable, FetchError> {
        match location {
            DataLocation::Local(_) => self.0.fetch(location),
            DataLocation::Remote(_) => Err(FetchError::Status(404)),
        }
    }
}

#[test]
fn concurrent_searches_share_one_locator() {
    let (locator, _source) = offline_locator();
    let query = SearchQuery::new("Mar del Plata", "Av. Colón 1500");

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let cafes = locator.search(&query).unwrap();
                assert_eq!(cafes.len(), 2);
            });
        }
    });
}
