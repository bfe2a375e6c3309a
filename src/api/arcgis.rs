use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::time::Duration;

use super::geocoder::Geocoder;

const ARCGIS_URL: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";
const USER_AGENT: &str = "cafemap/0.1.0";

#[derive(Debug, Deserialize)]
struct CandidatesResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    x: f64,
    y: f64,
}

/// ArcGIS World Geocoding Service, anonymous single-line search.
pub struct ArcGisGeocoder {
    client: reqwest::blocking::Client,
}

impl ArcGisGeocoder {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl Geocoder for ArcGisGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<(f64, f64)>> {
        let response = self
            .client
            .get(ARCGIS_URL)
            .query(&[("singleLine", query), ("f", "json"), ("maxLocations", "1")])
            .send()
            .context("Failed to send request to ArcGIS geocoder")?;

        if !response.status().is_success() {
            bail!("ArcGIS geocoder returned error status: {}", response.status());
        }

        let body: CandidatesResponse = response
            .json()
            .context("Failed to parse ArcGIS JSON response")?;

        Ok(first_location(body))
    }
}

/// (lat, lon) of the best candidate; ArcGIS reports x = lon, y = lat.
fn first_location(body: CandidatesResponse) -> Option<(f64, f64)> {
    body.candidates
        .into_iter()
        .next()
        .map(|c| (c.location.y, c.location.x))
}
