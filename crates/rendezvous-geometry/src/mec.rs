//! Centroid and minimum enclosing circle.
//!
//! The circle center is found on a local equirectangular projection around
//! the mean latitude of the input, where `x = R·λ·cos φ₀` and `y = R·φ`
//! (meters). The projection is affine in (lat, lng), so planar midpoints map
//! back to lat/lng midpoints. The radius is then measured with haversine so
//! that [`Circle::covers`] holds for every input point.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{Circle, LatLng, Located, EARTH_RADIUS_METERS, EPSILON};

/// Fixed shuffle seed: randomized-incremental running time, reproducible output.
const SHUFFLE_SEED: u64 = 0x4d45_435f_5345_4544;

/// Determinant magnitude (m²) below which three points are treated as collinear.
const COLLINEAR_EPSILON: f64 = 1e-6;

/// Arithmetic mean of latitudes and longitudes.
///
/// Returns `None` for empty input.
pub fn centroid<P: Located>(points: &[P]) -> Option<LatLng> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat, lng) = points.iter().fold((0.0, 0.0), |(lat, lng), p| {
        let c = p.lat_lng();
        (lat + c.lat, lng + c.lng)
    });
    Some(LatLng::new(lat / n, lng / n))
}

/// Smallest circle covering every point.
///
/// - 0 points: `None`
/// - 1 point: that point, radius 0
/// - 2 points: the segment between them as diameter
/// - 3+ points: randomized incremental construction; collinear sets
///   degrade to the diameter of their two extremes
pub fn minimum_enclosing_circle<P: Located>(points: &[P]) -> Option<Circle> {
    match points {
        [] => None,
        [only] => Some(Circle::at(only.lat_lng())),
        [a, b] => {
            let (a, b) = (a.lat_lng(), b.lat_lng());
            Some(Circle::new(a.midpoint(&b), a.distance_to(&b) / 2.0))
        }
        _ => Some(incremental(points)),
    }
}

fn incremental<P: Located>(points: &[P]) -> Circle {
    let coords: Vec<LatLng> = points.iter().map(|p| p.lat_lng()).collect();
    let projection = Projection::around(&coords);

    let mut planar: Vec<Vec2> = coords.iter().map(|c| projection.forward(c)).collect();
    planar.shuffle(&mut StdRng::seed_from_u64(SHUFFLE_SEED));

    let disc = welzl(&planar);
    let center = projection.inverse(disc.center);

    // Boundary points sit on the planar circle; haversine may differ by a hair.
    let radius = coords
        .iter()
        .map(|c| center.distance_to(c))
        .fold(0.0_f64, f64::max);

    Circle::new(center, radius)
}

/// Iterative form of Welzl's algorithm: each uncovered point forces a
/// rebuild with that point on the boundary, backtracking over the prefix.
fn welzl(points: &[Vec2]) -> Disc {
    let mut disc = Disc::from_point(points[0]);
    for i in 1..points.len() {
        if disc.covers(points[i]) {
            continue;
        }
        disc = Disc::from_point(points[i]);
        for j in 0..i {
            if disc.covers(points[j]) {
                continue;
            }
            disc = Disc::from_two(points[i], points[j]);
            for k in 0..j {
                if !disc.covers(points[k]) {
                    disc = Disc::from_three(points[i], points[j], points[k]);
                }
            }
        }
    }
    disc
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vec2 {
    x: f64,
    y: f64,
}

impl Vec2 {
    fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Planar circle in projected meters.
#[derive(Debug, Clone, Copy)]
struct Disc {
    center: Vec2,
    radius: f64,
}

impl Disc {
    fn from_point(p: Vec2) -> Self {
        Self {
            center: p,
            radius: 0.0,
        }
    }

    fn from_two(a: Vec2, b: Vec2) -> Self {
        let center = a.midpoint(b);
        Self {
            center,
            radius: center.distance_squared(a).sqrt(),
        }
    }

    fn from_three(a: Vec2, b: Vec2, c: Vec2) -> Self {
        // Translate to `a` to keep the determinant well conditioned
        let (bx, by) = (b.x - a.x, b.y - a.y);
        let (cx, cy) = (c.x - a.x, c.y - a.y);
        let d = 2.0 * (bx * cy - by * cx);

        if d.abs() < COLLINEAR_EPSILON {
            return Self::widest_pair(a, b, c);
        }

        let b_sq = bx * bx + by * by;
        let c_sq = cx * cx + cy * cy;
        let ux = (cy * b_sq - by * c_sq) / d;
        let uy = (bx * c_sq - cx * b_sq) / d;

        let center = Vec2 {
            x: a.x + ux,
            y: a.y + uy,
        };
        let radius = [a, b, c]
            .iter()
            .map(|p| center.distance_squared(*p))
            .fold(0.0_f64, f64::max)
            .sqrt();
        Self { center, radius }
    }

    fn widest_pair(a: Vec2, b: Vec2, c: Vec2) -> Self {
        let ab = a.distance_squared(b);
        let ac = a.distance_squared(c);
        let bc = b.distance_squared(c);
        if ab >= ac && ab >= bc {
            Self::from_two(a, b)
        } else if ac >= bc {
            Self::from_two(a, c)
        } else {
            Self::from_two(b, c)
        }
    }

    fn covers(&self, p: Vec2) -> bool {
        let limit = self.radius * (1.0 + EPSILON) + EPSILON;
        self.center.distance_squared(p) <= limit * limit
    }
}

/// Local equirectangular projection.
#[derive(Debug, Clone, Copy)]
struct Projection {
    cos_lat: f64,
}

impl Projection {
    fn around(coords: &[LatLng]) -> Self {
        let mean_lat = coords.iter().map(|c| c.lat).sum::<f64>() / coords.len() as f64;
        // Keep the inverse finite at the poles
        Self {
            cos_lat: mean_lat.to_radians().cos().max(1e-9),
        }
    }

    fn forward(&self, c: &LatLng) -> Vec2 {
        Vec2 {
            x: EARTH_RADIUS_METERS * c.lng.to_radians() * self.cos_lat,
            y: EARTH_RADIUS_METERS * c.lat.to_radians(),
        }
    }

    fn inverse(&self, v: Vec2) -> LatLng {
        LatLng::new(
            (v.y / EARTH_RADIUS_METERS).to_degrees(),
            (v.x / (EARTH_RADIUS_METERS * self.cos_lat)).to_degrees(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoPoint;
    use proptest::prelude::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<GeoPoint> {
        raw.iter().map(|&(lat, lng)| GeoPoint::new(lat, lng)).collect()
    }

    #[test]
    fn centroid_is_arithmetic_mean() {
        let c = centroid(&pts(&[(0.0, 0.0), (2.0, 4.0), (4.0, 2.0)])).unwrap();
        assert!((c.lat - 2.0).abs() < 1e-12);
        assert!((c.lng - 2.0).abs() < 1e-12);
    }

    #[test]
    fn centroid_of_one_point_is_that_point() {
        let c = centroid(&pts(&[(37.7, -122.4)])).unwrap();
        assert_eq!(c, LatLng::new(37.7, -122.4));
    }

    #[test]
    fn single_point_has_zero_radius() {
        let c = minimum_enclosing_circle(&pts(&[(51.5, -0.12)])).unwrap();
        assert_eq!(c.center, LatLng::new(51.5, -0.12));
        assert_eq!(c.radius_meters, 0.0);
    }

    #[test]
    fn two_points_use_the_diameter() {
        let p = pts(&[(40.0, -74.0), (40.02, -73.98)]);
        let c = minimum_enclosing_circle(&p).unwrap();
        assert_eq!(c.center, LatLng::new(40.01, -73.99));
        let half = p[0].lat_lng().distance_to(&p[1].lat_lng()) / 2.0;
        assert_eq!(c.radius_meters, half);
    }

    #[test]
    fn duplicates_collapse() {
        let c = minimum_enclosing_circle(&pts(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)])).unwrap();
        assert_eq!(c.center, LatLng::new(1.0, 1.0));
        assert!(c.radius_meters < 1e-6);
    }

    #[test]
    fn collinear_points_use_the_extremes() {
        let p = pts(&[(0.0, 0.0), (0.0, 0.01), (0.0, 0.02), (0.0, 0.03)]);
        let c = minimum_enclosing_circle(&p).unwrap();
        assert!((c.center.lat).abs() < 1e-9);
        assert!((c.center.lng - 0.015).abs() < 1e-9);
        let half = p[0].lat_lng().distance_to(&p[3].lat_lng()) / 2.0;
        assert!((c.radius_meters - half).abs() < 1e-3);
    }

    #[test]
    fn interior_points_do_not_grow_the_circle() {
        let mut p = pts(&[(0.0, 0.0), (0.0, 0.02), (0.02, 0.0), (0.02, 0.02)]);
        let outer = minimum_enclosing_circle(&p).unwrap();
        p.push(GeoPoint::new(0.01, 0.01));
        p.push(GeoPoint::new(0.012, 0.008));
        let inner = minimum_enclosing_circle(&p).unwrap();
        assert!((outer.radius_meters - inner.radius_meters).abs() < 1e-6);
    }

    #[test]
    fn obtuse_triangle_uses_longest_side() {
        // The apex is inside the circle on the long side, so only two
        // points lie on the boundary.
        let p = pts(&[(0.0, 0.0), (0.0, 0.04), (0.002, 0.02)]);
        let c = minimum_enclosing_circle(&p).unwrap();
        assert!((c.center.lng - 0.02).abs() < 1e-9);
        assert!(c.center.lat.abs() < 1e-9);
    }

    #[test]
    fn result_is_deterministic() {
        let p = pts(&[
            (48.85, 2.35),
            (48.87, 2.30),
            (48.83, 2.39),
            (48.86, 2.41),
            (48.84, 2.28),
        ]);
        assert_eq!(minimum_enclosing_circle(&p), minimum_enclosing_circle(&p));
    }

    fn neighborhood() -> impl Strategy<Value = Vec<GeoPoint>> {
        // A few kilometers around a base point, anywhere off the poles
        (-70.0..70.0f64, -170.0..170.0f64).prop_flat_map(|(lat, lng)| {
            prop::collection::vec((-0.05..0.05f64, -0.05..0.05f64), 3..40).prop_map(move |offsets| {
                offsets
                    .into_iter()
                    .map(|(dlat, dlng)| GeoPoint::new(lat + dlat, lng + dlng))
                    .collect()
            })
        })
    }

    fn small_neighborhood() -> impl Strategy<Value = Vec<GeoPoint>> {
        (-60.0..60.0f64, -170.0..170.0f64).prop_flat_map(|(lat, lng)| {
            prop::collection::vec((-0.03..0.03f64, -0.03..0.03f64), 3..12).prop_map(move |offsets| {
                offsets
                    .into_iter()
                    .map(|(dlat, dlng)| GeoPoint::new(lat + dlat, lng + dlng))
                    .collect()
            })
        })
    }

    /// Smallest covering disc among every pair and triple boundary.
    fn brute_force_disc(points: &[Vec2]) -> Disc {
        let mut candidates = Vec::new();
        for i in 0..points.len() {
            for j in i + 1..points.len() {
                candidates.push(Disc::from_two(points[i], points[j]));
                for k in j + 1..points.len() {
                    candidates.push(Disc::from_three(points[i], points[j], points[k]));
                }
            }
        }
        candidates
            .into_iter()
            .filter(|d| points.iter().all(|p| d.covers(*p)))
            .min_by(|a, b| a.radius.total_cmp(&b.radius))
            .unwrap()
    }

    #[test]
    fn oversized_circle_is_not_minimal() {
        // Square corners: the MEC is the diagonal circle, not a wider one
        let planar = [
            Vec2 { x: 0.0, y: 0.0 },
            Vec2 { x: 100.0, y: 0.0 },
            Vec2 { x: 0.0, y: 100.0 },
            Vec2 { x: 100.0, y: 100.0 },
        ];
        let best = brute_force_disc(&planar);
        assert!((best.radius - 50.0 * 2f64.sqrt()).abs() < 1e-9);
        assert!((welzl(&planar).radius - best.radius).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn welzl_matches_brute_force_minimum(points in small_neighborhood()) {
            let coords: Vec<LatLng> = points.iter().map(|p| p.lat_lng()).collect();
            let projection = Projection::around(&coords);
            let planar: Vec<Vec2> = coords.iter().map(|c| projection.forward(c)).collect();

            let best = brute_force_disc(&planar);
            let found = welzl(&planar);
            prop_assert!(
                (found.radius - best.radius).abs() <= best.radius * 1e-7 + 1e-6,
                "welzl {} vs brute force {}", found.radius, best.radius
            );

            // The haversine radius stays within the projection error of it
            let circle = minimum_enclosing_circle(&points).unwrap();
            prop_assert!(circle.radius_meters <= best.radius * (1.0 + 5e-3) + 1e-3);
        }

        #[test]
        fn circle_covers_every_point(points in neighborhood()) {
            let circle = minimum_enclosing_circle(&points).unwrap();
            prop_assert!(circle.radius_meters >= 0.0);
            for p in &points {
                prop_assert!(circle.covers(p), "{} not covered by {}", p.lat_lng(), circle);
            }
        }

        #[test]
        fn circle_is_no_larger_than_the_farthest_pair(points in neighborhood()) {
            // MEC radius is bounded by the diameter of the set
            let circle = minimum_enclosing_circle(&points).unwrap();
            let diameter = points
                .iter()
                .flat_map(|a| points.iter().map(move |b| a.lat_lng().distance_to(&b.lat_lng())))
                .fold(0.0_f64, f64::max);
            prop_assert!(circle.radius_meters <= diameter * (1.0 + 1e-3) + 1e-3);
        }

        #[test]
        fn two_point_circle_is_the_midpoint(a in (-60.0..60.0f64, -170.0..170.0f64),
                                            d in (-0.05..0.05f64, -0.05..0.05f64)) {
            let p = vec![GeoPoint::new(a.0, a.1), GeoPoint::new(a.0 + d.0, a.1 + d.1)];
            let circle = minimum_enclosing_circle(&p).unwrap();
            prop_assert!((circle.center.lat - (a.0 + d.0 / 2.0)).abs() < 1e-9);
            prop_assert!((circle.center.lng - (a.1 + d.1 / 2.0)).abs() < 1e-9);
            let half = p[0].lat_lng().distance_to(&p[1].lat_lng()) / 2.0;
            prop_assert_eq!(circle.radius_meters, half);

            // The planar midpoint is not the great-circle midpoint, so the
            // diameter circle covers both ends only up to the flat-earth error.
            for q in &p {
                prop_assert!(circle.distance_from_center(q) <= half * 1.01 + 1e-6);
            }
        }

        #[test]
        fn single_point_property((lat, lng) in (-89.0..89.0f64, -179.0..179.0f64)) {
            let circle = minimum_enclosing_circle(&[GeoPoint::new(lat, lng)]).unwrap();
            prop_assert_eq!(circle.radius_meters, 0.0);
            prop_assert_eq!(circle.center, LatLng::new(lat, lng));
        }
    }
}
