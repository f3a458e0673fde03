//! Geographic circles.

use crate::{LatLng, Located, EPSILON, METERS_PER_KM};

/// A circle on the map: planar center, great-circle radius in meters.
///
/// Invariant: `radius_meters >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Circle {
    pub center: LatLng,
    pub radius_meters: f64,
}

impl Circle {
    /// Create a circle. Negative or NaN radii are clamped to zero.
    pub fn new(center: LatLng, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters: if radius_meters > 0.0 { radius_meters } else { 0.0 },
        }
    }

    /// Zero-radius circle at a point.
    pub fn at(center: LatLng) -> Self {
        Self {
            center,
            radius_meters: 0.0,
        }
    }

    /// Circle with a radius given in kilometers.
    pub fn from_km(center: LatLng, radius_km: f64) -> Self {
        Self::new(center, radius_km * METERS_PER_KM)
    }

    /// Radius in kilometers.
    pub fn radius_km(&self) -> f64 {
        self.radius_meters / METERS_PER_KM
    }

    /// Great-circle distance from the center to a point, in meters.
    pub fn distance_from_center<P: Located>(&self, point: &P) -> f64 {
        self.center.distance_to(&point.lat_lng())
    }

    /// Strict membership: distance from the center is at most the radius.
    pub fn contains<P: Located>(&self, point: &P) -> bool {
        self.distance_from_center(point) <= self.radius_meters
    }

    /// Tolerant membership used to check covering results.
    ///
    /// Allows `EPSILON` relative slack plus a micrometer of absolute slack.
    pub fn covers<P: Located>(&self, point: &P) -> bool {
        self.distance_from_center(point) <= self.radius_meters * (1.0 + EPSILON) + 1e-6
    }
}

impl std::fmt::Display for Circle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} r={:.1}m", self.center, self.radius_meters)
    }
}

/// Scale a circle's radius by `1 + factor`, keeping its center.
///
/// Factors below -1 produce a zero radius. A non-finite factor leaves the
/// circle unchanged.
pub fn expand_circle(circle: &Circle, factor: f64) -> Circle {
    if !factor.is_finite() {
        return *circle;
    }
    Circle::new(circle.center, circle.radius_meters * (1.0 + factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoPoint;
    use proptest::prelude::*;

    #[test]
    fn negative_radius_is_clamped() {
        let c = Circle::new(LatLng::new(0.0, 0.0), -5.0);
        assert_eq!(c.radius_meters, 0.0);
        let c = Circle::new(LatLng::new(0.0, 0.0), f64::NAN);
        assert_eq!(c.radius_meters, 0.0);
    }

    #[test]
    fn km_conversion() {
        let c = Circle::from_km(LatLng::new(0.0, 0.0), 1.5);
        assert_eq!(c.radius_meters, 1_500.0);
        assert_eq!(c.radius_km(), 1.5);
    }

    #[test]
    fn contains_uses_great_circle_distance() {
        let c = Circle::new(LatLng::new(0.0, 0.0), 1_000.0);
        assert!(c.contains(&GeoPoint::new(0.0, 0.0)));
        assert!(c.contains(&GeoPoint::new(0.005, 0.0))); // ~556 m
        assert!(!c.contains(&GeoPoint::new(0.01, 0.0))); // ~1112 m
    }

    #[test]
    fn expand_by_ten_percent() {
        let c = Circle::new(LatLng::new(10.0, 10.0), 200.0);
        let e = expand_circle(&c, 0.1);
        assert_eq!(e.center, c.center);
        assert!((e.radius_meters - 220.0).abs() < 1e-9);
    }

    #[test]
    fn expand_edge_factors() {
        let c = Circle::new(LatLng::new(10.0, 10.0), 200.0);
        assert_eq!(expand_circle(&c, -1.0).radius_meters, 0.0);
        assert_eq!(expand_circle(&c, -3.0).radius_meters, 0.0);
        assert_eq!(expand_circle(&c, f64::NAN), c);
    }

    proptest! {
        #[test]
        fn expand_scales_radius(radius in 0.0..1e6f64, factor in -1.0..10.0f64) {
            let c = Circle::new(LatLng::new(48.85, 2.35), radius);
            let e = expand_circle(&c, factor);
            let expected = radius * (1.0 + factor);
            prop_assert!((e.radius_meters - expected).abs() <= 1e-9 * expected.max(1.0));
            prop_assert_eq!(e.center, c.center);
        }
    }
}
