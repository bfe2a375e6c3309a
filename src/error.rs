use thiserror::Error;

use crate::api::FetchError;

/// Failures surfaced by the locator's public operations.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("invalid city: {0}")]
    InvalidCity(String),

    #[error("invalid radius {0} km: must be greater than 0 and at most 10")]
    InvalidRadius(f64),

    /// Both the published sheet and the local fallback file failed.
    #[error("café data for {city} is unavailable (remote: {remote}; fallback: {fallback})")]
    DataUnavailable {
        city: String,
        remote: FetchError,
        #[source]
        fallback: FetchError,
    },

    #[error("could not geocode address: {address}")]
    GeocodeFailed { address: String },

    #[error("no cafés within {radius_km} km to recommend")]
    NoCandidates { radius_km: f64 },
}

impl LocatorError {
    /// HTTP-style status for a request handler.
    pub fn status_code(&self) -> u16 {
        match self {
            LocatorError::InvalidCity(_) | LocatorError::InvalidRadius(_) => 400,
            LocatorError::GeocodeFailed { .. } | LocatorError::NoCandidates { .. } => 404,
            LocatorError::DataUnavailable { .. } => 503,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

pub type Result<T> = std::result::Result<T, LocatorError>;
