use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use super::geocoder::Geocoder;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const USER_AGENT: &str = "cafemap/0.1.0";

/// Nominatim usage policy: at most one request per second
const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
}

/// OpenStreetMap Nominatim search.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            last_request: Mutex::new(None),
        })
    }

    /// Sleep until a second has passed since the previous request.
    fn wait_for_turn(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < MIN_INTERVAL {
                thread::sleep(MIN_INTERVAL - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<(f64, f64)>> {
        self.wait_for_turn();

        let response = self
            .client
            .get(NOMINATIM_URL)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .context("Failed to send request to Nominatim API")?;

        if !response.status().is_success() {
            bail!("Nominatim API returned error status: {}", response.status());
        }

        let results: Vec<NominatimResult> = response
            .json()
            .context("Failed to parse Nominatim JSON response")?;

        results.into_iter().next().map(parse_result).transpose()
    }
}

fn parse_result(result: NominatimResult) -> Result<(f64, f64)> {
    let lat: f64 = result
        .lat
        .parse()
        .context("Failed to parse latitude from Nominatim response")?;
    let lon: f64 = result
        .lon
        .parse()
        .context("Failed to parse longitude from Nominatim response")?;
    Ok((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nominatim_response() {
        let json = r#"[{"lat":"-38.0054771","lon":"-57.5426106","display_name":"Mar del Plata, Argentina"}]"#;
        let results: Vec<NominatimResult> = serde_json::from_str(json).unwrap();

        assert_eq!(results.len(), 1);
        let (lat, lon) = parse_result(results.into_iter().next().unwrap()).unwrap();
        assert!((lat - -38.0054771).abs() < 1e-9);
        assert!((lon - -57.5426106).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_coordinates_are_errors() {
        let result = NominatimResult {
            lat: "north".to_string(),
            lon: "0".to_string(),
        };
        assert!(parse_result(result).is_err());
    }
}
