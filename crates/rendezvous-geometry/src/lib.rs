//! Rendezvous Meeting-Point Geometry
//!
//! Pure functions that turn a set of participant locations into a fair
//! meeting area.
//!
//! # Model
//!
//! Points are latitude/longitude pairs in degrees. Two approximations are used
//! and both are accurate at neighborhood scale:
//!
//! - **Planar**: centroid and circle centers are computed on a local
//!   equirectangular projection (lat/lng treated as a flat plane).
//! - **Haversine**: every distance and every radius is a great-circle
//!   distance in meters on a sphere of radius [`EARTH_RADIUS_METERS`].
//!
//! # Minimum Enclosing Circle
//!
//! [`minimum_enclosing_circle`] runs the randomized incremental (Welzl-style)
//! algorithm with a fixed shuffle seed, so results are reproducible. Every
//! input point is covered by the returned circle.
//!
//! Nothing in this crate allocates beyond a copy of the input, performs I/O,
//! or logs.

mod circle;
mod distance;
mod error;
mod fuzz;
mod mec;
mod point;

pub use circle::{expand_circle, Circle};
pub use distance::{haversine_distance_meters, meters_per_degree};
pub use error::GeometryError;
pub use fuzz::fuzz_point;
pub use mec::{centroid, minimum_enclosing_circle};
pub use point::{GeoPoint, LatLng, Located};

/// Mean Earth radius used for every distance computation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Relative tolerance for "covered" and "on boundary" comparisons.
pub const EPSILON: f64 = 1e-9;

/// Meters per kilometer, for the km-facing parts of the API.
pub const METERS_PER_KM: f64 = 1_000.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_geometry() {
        let none: [GeoPoint; 0] = [];
        assert!(centroid(&none).is_none());
        assert!(minimum_enclosing_circle(&none).is_none());
    }

    #[test]
    fn right_triangle_matches_analytic_circumcircle() {
        let points = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 2.0),
            GeoPoint::new(2.0, 0.0),
        ];
        let circle = minimum_enclosing_circle(&points).unwrap();

        assert!((circle.center.lat - 1.0).abs() < 1e-9);
        assert!((circle.center.lng - 1.0).abs() < 1e-9);

        // sqrt(2) degrees expressed in meters (flat-earth approximation)
        let analytic = 2f64.sqrt() * meters_per_degree();
        let relative = (circle.radius_meters - analytic).abs() / analytic;
        assert!(relative < 1e-3, "radius {} vs {}", circle.radius_meters, analytic);

        for p in &points {
            assert!(circle.covers(p));
        }
    }
}
