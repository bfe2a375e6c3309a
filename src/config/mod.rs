use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::{DataLocation, sheet_url};

/// Cache freshness window in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

fn default_spreadsheet_id() -> String {
    "10vUOhRr7IAXlRrkBphxEP4ApXYBgrnuxJq6G83GnfHI".to_string()
}
fn default_roaster_gid() -> String {
    "1590442133".to_string()
}
fn default_fallback_csv() -> PathBuf {
    PathBuf::from("Cafes.csv")
}
fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
fn default_verbose() -> bool {
    false
}
fn default_cities() -> Vec<CityConfig> {
    [
        ("Mar del Plata", "0"),
        ("Buenos Aires", "1296176686"),
        ("La Plata", "208452991"),
        ("Córdoba", "1250014567"),
        ("Rosario", "1691979590"),
    ]
    .into_iter()
    .map(|(name, gid)| CityConfig {
        name: name.to_string(),
        gid: gid.to_string(),
        fallback_csv: None,
    })
    .collect()
}

/// One supported city and the sheet tab holding its cafés.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CityConfig {
    pub name: String,
    pub gid: String,
    /// Overrides the global fallback CSV for this city
    #[serde(default)]
    pub fallback_csv: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderProvider {
    #[value(name = "arcgis")]
    ArcGis,
    Nominatim,
    Disabled,
}

fn default_provider() -> GeocoderProvider {
    GeocoderProvider::ArcGis
}
fn default_geocode_timeout_secs() -> u64 {
    10
}
fn default_country() -> String {
    "Argentina".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GeocoderConfig {
    #[serde(default = "default_provider")]
    pub provider: GeocoderProvider,
    #[serde(default = "default_geocode_timeout_secs")]
    pub timeout_secs: u64,
    /// Appended to every query after the city
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            timeout_secs: default_geocode_timeout_secs(),
            country: default_country(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FileConfig {
    #[serde(default = "default_spreadsheet_id")]
    pub spreadsheet_id: String,
    #[serde(default = "default_cities")]
    pub cities: Vec<CityConfig>,
    #[serde(default = "default_roaster_gid")]
    pub roaster_gid: String,
    #[serde(default = "default_fallback_csv")]
    pub fallback_csv: PathBuf,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: default_spreadsheet_id(),
            cities: default_cities(),
            roaster_gid: default_roaster_gid(),
            fallback_csv: default_fallback_csv(),
            cache_ttl_secs: default_cache_ttl_secs(),
            geocoder: GeocoderConfig::default(),
            verbose: default_verbose(),
        }
    }
}

/// A config file that was found but could not be parsed.
#[derive(Debug)]
pub struct RejectedConfig {
    pub path: PathBuf,
    pub error: toml::de::Error,
}

/// Outcome of walking the config search path.
#[derive(Debug, Default)]
pub struct ConfigSearch {
    pub config: Option<FileConfig>,
    pub rejected: Vec<RejectedConfig>,
}

impl ConfigSearch {
    pub fn config_or_default(&self) -> FileConfig {
        self.config.clone().unwrap_or_default()
    }
}

impl FileConfig {
    /// First parseable config file from the default search path.
    ///
    /// Files that exist but fail to parse are skipped and returned in
    /// `ConfigSearch::rejected`, so the caller can report them once logging
    /// is up.
    pub fn discover() -> ConfigSearch {
        Self::discover_in(&get_config_paths())
    }

    pub fn discover_in(paths: &[PathBuf]) -> ConfigSearch {
        let mut rejected = Vec::new();
        for path in paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => {
                        return ConfigSearch {
                            config: Some(config),
                            rejected,
                        };
                    }
                    Err(error) => rejected.push(RejectedConfig {
                        path: path.clone(),
                        error,
                    }),
                }
            }
        }
        ConfigSearch {
            config: None,
            rejected,
        }
    }

    /// Load an explicitly requested config file. Unlike `load`, a missing or
    /// malformed file is an error.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn city(&self, name: &str) -> Option<&CityConfig> {
        self.cities.iter().find(|c| c.name == name)
    }

    pub fn city_names(&self) -> Vec<String> {
        self.cities.iter().map(|c| c.name.clone()).collect()
    }

    /// Published CSV export of a city's café tab.
    pub fn cafe_source(&self, city: &CityConfig) -> DataLocation {
        DataLocation::Remote(sheet_url(&self.spreadsheet_id, &city.gid))
    }

    /// Local CSV tried when the published export cannot be read.
    pub fn cafe_fallback(&self, city: &CityConfig) -> DataLocation {
        let path = city
            .fallback_csv
            .clone()
            .unwrap_or_else(|| self.fallback_csv.clone());
        DataLocation::Local(path)
    }

    pub fn roaster_source(&self) -> DataLocation {
        DataLocation::Remote(sheet_url(&self.spreadsheet_id, &self.roaster_gid))
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("cafemap.toml"));
    paths.push(PathBuf::from(".cafemap.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("cafemap").join("config.toml"));
        paths.push(config_dir.join("cafemap.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".cafemap.toml"));
        paths.push(home.join(".config").join("cafemap").join("config.toml"));
    }

    paths
}
