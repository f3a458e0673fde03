//! Great-circle distance.

use crate::EARTH_RADIUS_METERS;

/// Haversine distance between two lat/lng points in meters.
///
/// Symmetric, zero for identical points, and a true metric on the sphere.
pub fn haversine_distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);

    // Clamp guards asin against rounding just above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_METERS * c
}

/// Length of one degree of latitude in meters.
pub fn meters_per_degree() -> f64 {
    EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(haversine_distance_meters(37.77, -122.42, 37.77, -122.42), 0.0);
        assert_eq!(haversine_distance_meters(-89.9, 179.9, -89.9, 179.9), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_distance_meters(0.0, 0.0, 1.0, 0.0);
        assert!((d - meters_per_degree()).abs() < 1e-6);
        assert!((d - 111_195.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn city_scale_distance() {
        // Minneapolis to St Paul downtowns, ~15 km
        let d = haversine_distance_meters(44.9778, -93.2650, 44.9537, -93.0900);
        assert!(d > 10_000.0 && d < 20_000.0, "got {d}m");
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let d = haversine_distance_meters(0.0, 0.0, 0.0, 180.0);
        let half = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((d - half).abs() < 1e-3);
    }

    fn coord() -> impl Strategy<Value = (f64, f64)> {
        (-89.0..89.0f64, -179.0..179.0f64)
    }

    proptest! {
        #[test]
        fn distance_is_zero_on_the_diagonal((lat, lng) in coord()) {
            prop_assert_eq!(haversine_distance_meters(lat, lng, lat, lng), 0.0);
        }

        #[test]
        fn distance_is_symmetric(a in coord(), b in coord()) {
            let ab = haversine_distance_meters(a.0, a.1, b.0, b.1);
            let ba = haversine_distance_meters(b.0, b.1, a.0, a.1);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn triangle_inequality_holds(a in coord(), b in coord(), c in coord()) {
            let ab = haversine_distance_meters(a.0, a.1, b.0, b.1);
            let bc = haversine_distance_meters(b.0, b.1, c.0, c.1);
            let ac = haversine_distance_meters(a.0, a.1, c.0, c.1);
            prop_assert!(ac <= ab + bc + 1e-6);
        }
    }
}
