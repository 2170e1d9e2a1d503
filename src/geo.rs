//! Great-circle distance

use crate::models::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres, rounded to one decimal place.
///
/// Inputs are degrees and are not range-checked; non-finite input yields NaN.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    (EARTH_RADIUS_KM * c * 10.0).round() / 10.0
}

pub fn distance_between(a: GeoPoint, b: GeoPoint) -> f64 {
    distance_km(a.lat, a.lon, b.lat, b.lon)
}

/// Degree deltas enclosing a circle of `radius_km` around `center`.
///
/// Used to narrow roster queries before the exact distance check; the box is
/// always at least as large as the circle, including the rounding slack of
/// [`distance_km`].
pub fn bounding_box(center: GeoPoint, radius_km: f64) -> (f64, f64) {
    let angular = (radius_km + 0.05) / EARTH_RADIUS_KM;
    let lat_delta = angular.to_degrees();
    let cos_lat = center.lat.to_radians().cos().abs();
    let ratio = angular.sin() / cos_lat;
    let lon_delta = if cos_lat < 1e-9 || ratio >= 1.0 {
        180.0
    } else {
        ratio.asin().to_degrees()
    };
    (lat_delta, lon_delta)
}
