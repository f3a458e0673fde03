//! Geographic points.
//!
//! [`LatLng`] is the bare coordinate pair used for centers and results.
//! [`GeoPoint`] optionally carries the identity of whoever contributed it.

use crate::GeometryError;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatLng {
    /// Latitude in degrees, positive north
    pub lat: f64,
    /// Longitude in degrees, positive east
    pub lng: f64,
}

impl LatLng {
    /// Create a new coordinate.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Create a coordinate, rejecting NaN/infinite or out-of-range values.
    pub fn try_new(lat: f64, lng: f64) -> Result<Self, GeometryError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(GeometryError::NonFinite { lat, lng });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeometryError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeometryError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Planar midpoint of two coordinates.
    pub fn midpoint(&self, other: &Self) -> Self {
        Self {
            lat: (self.lat + other.lat) / 2.0,
            lng: (self.lng + other.lng) / 2.0,
        }
    }

    /// Great-circle distance to another coordinate in meters.
    pub fn distance_to(&self, other: &Self) -> f64 {
        crate::haversine_distance_meters(self.lat, self.lng, other.lat, other.lng)
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// A point handed to the geometry functions.
///
/// The identity is optional and never influences the result.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub id: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Anonymous point.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { id: None, lat, lng }
    }

    /// Point tagged with the id of its contributor.
    pub fn with_id(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: Some(id.into()),
            lat,
            lng,
        }
    }
}

impl From<LatLng> for GeoPoint {
    fn from(c: LatLng) -> Self {
        Self::new(c.lat, c.lng)
    }
}

/// Anything with a position the geometry functions can read.
pub trait Located {
    fn lat_lng(&self) -> LatLng;
}

impl Located for LatLng {
    #[inline]
    fn lat_lng(&self) -> LatLng {
        *self
    }
}

impl Located for GeoPoint {
    #[inline]
    fn lat_lng(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

impl<T: Located + ?Sized> Located for &T {
    #[inline]
    fn lat_lng(&self) -> LatLng {
        (**self).lat_lng()
    }
}
