pub mod arcgis;
pub mod geocoder;
pub mod nominatim;
pub mod sheets;

pub use geocoder::{DisabledGeocoder, Geocoder, build_geocoder};
pub use sheets::{
    DataLocation, FetchError, RawTable, Row, SheetClient, TabularSource, parse_csv, sheet_url,
};
