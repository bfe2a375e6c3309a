use anyhow::Result;

use super::arcgis::ArcGisGeocoder;
use super::nominatim::NominatimGeocoder;
use crate::config::{GeocoderConfig, GeocoderProvider};

/// Free-text address to coordinates.
///
/// `Ok(None)` means the provider answered but found nothing. Transport
/// failures and timeouts come back as `Err`; callers decide whether that is
/// fatal.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, query: &str) -> Result<Option<(f64, f64)>>;
}

/// Geocoder that never finds anything, for offline runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGeocoder;

impl Geocoder for DisabledGeocoder {
    fn geocode(&self, _query: &str) -> Result<Option<(f64, f64)>> {
        Ok(None)
    }
}

/// Build the configured provider.
pub fn build_geocoder(config: &GeocoderConfig) -> Result<Box<dyn Geocoder>> {
    let geocoder: Box<dyn Geocoder> = match config.provider {
        GeocoderProvider::ArcGis => Box::new(ArcGisGeocoder::new(config.timeout_secs)?),
        GeocoderProvider::Nominatim => Box::new(NominatimGeocoder::new(config.timeout_secs)?),
        GeocoderProvider::Disabled => Box::new(DisabledGeocoder),
    };
    Ok(geocoder)
}
