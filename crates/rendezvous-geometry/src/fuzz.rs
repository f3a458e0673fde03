//! Privacy fuzzing for displayed locations.
//!
//! A fuzzed point is only ever shown on a map. It must not be fed back into
//! [`centroid`](crate::centroid) or
//! [`minimum_enclosing_circle`](crate::minimum_enclosing_circle).

use rand::Rng;

use crate::LatLng;

/// Kilometers per degree of latitude, as used for the offset conversion.
const KM_PER_DEGREE: f64 = 111.0;

/// Offset a point by up to `radius_km` along each axis.
///
/// Longitude offsets are widened by `1 / cos(lat)` so the displacement is
/// roughly the same distance in every direction.
pub fn fuzz_point<R: Rng + ?Sized>(point: LatLng, radius_km: f64, rng: &mut R) -> LatLng {
    if radius_km <= 0.0 || !radius_km.is_finite() {
        return point;
    }
    let lat_span = radius_km / KM_PER_DEGREE;
    let lng_span = radius_km / (KM_PER_DEGREE * point.lat.to_radians().cos().abs().max(1e-6));

    let lat = point.lat + rng.gen_range(-1.0..=1.0) * lat_span;
    let lng = point.lng + rng.gen_range(-1.0..=1.0) * lng_span;
    LatLng::new(lat.clamp(-90.0, 90.0), lng)
}
