//! cafemap - find specialty cafés near an address
//!
//! Café and roaster tables come from a shared spreadsheet, cached in process.
//! Addresses resolve through a remote geocoder, falling back to fuzzy matching
//! against the city's own café list.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod resolver;
pub mod service;
pub mod text;

pub use error::{LocatorError, Result};
pub use service::{CafeLocator, Recommendation, SearchQuery};
