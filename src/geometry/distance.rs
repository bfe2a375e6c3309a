use geo::{Distance, Geodesic, Point};

use crate::domain::CafeRecord;

/// Geodesic distance on the WGS84 ellipsoid, in kilometers.
///
/// Both arguments are (lat, lon) pairs in degrees.
pub fn great_circle_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat_a, lon_a) = a;
    let (lat_b, lon_b) = b;
    Geodesic::distance(Point::new(lon_a, lat_a), Point::new(lon_b, lat_b)) / 1000.0
}

/// Cafés no farther than `radius_km` from `origin`, each with `distance_km` set.
///
/// Table order is preserved; callers that need nearest-first sort afterwards.
pub fn within_radius(cafes: &[CafeRecord], origin: (f64, f64), radius_km: f64) -> Vec<CafeRecord> {
    cafes
        .iter()
        .filter_map(|cafe| {
            let distance = great_circle_km(origin, cafe.coords());
            (distance <= radius_km).then(|| CafeRecord {
                distance_km: Some(distance),
                ..cafe.clone()
            })
        })
        .collect()
}

/// Sort nearest-first by `distance_km`; rows without a distance go last.
pub fn sort_by_distance(cafes: &mut [CafeRecord]) {
    cafes.sort_by(|a, b| {
        let a = a.distance_km.unwrap_or(f64::INFINITY);
        let b = b.distance_km.unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });
}

/// Short human label: whole meters under 1 km (truncated), else km with two decimals.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0) as u64)
    } else {
        format!("{:.2} km", km)
    }
}
