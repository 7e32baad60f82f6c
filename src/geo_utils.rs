//! Geographic utilities: great-circle distance and bearing between positions.

use crate::Position;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two positions in kilometers (haversine formula).
///
/// Returns exactly `0.0` for coordinate-identical positions. Timestamps are ignored.
///
/// # Example
/// ```
/// use route_tracker::{Position, geo_utils::distance_km};
///
/// let a = Position::new(40.0, -75.0, 0);
/// let b = Position::new(40.001, -75.0, 10_000);
/// assert!((distance_km(&a, &b) - 0.111).abs() < 0.001);
/// ```
pub fn distance_km(a: &Position, b: &Position) -> f64 {
    if a.latitude == b.latitude && a.longitude == b.longitude {
        return 0.0;
    }

    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for near-antipodal points
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing from `a` towards `b`, in degrees clockwise from north, in `[0, 360)`.
pub fn bearing_degrees(a: &Position, b: &Position) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Total length of a track in kilometers, summed over consecutive positions.
pub fn route_distance_km(points: &[Position]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_km(&pair[0], &pair[1]))
        .sum()
}
