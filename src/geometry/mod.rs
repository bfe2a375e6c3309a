pub mod distance;

pub use distance::{format_distance, great_circle_km, sort_by_distance, within_radius};
