//! Venue-search request and response shapes exchanged with the search
//! collaborator.

use rendezvous_geometry::{Circle, LatLng};
use serde::{Deserialize, Serialize};

/// Parameters for a venue search.
///
/// The collaborator scales its own baseline (MEC) radius by
/// `radius_multiplier` instead of receiving an absolute radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
    pub radius_multiplier: f64,
    /// Host-supplied center, if any; otherwise the collaborator uses the MEC center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<LatLng>,
    #[serde(default)]
    pub only_in_circle: bool,
}

/// The search circle as confirmed by the search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchArea {
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_km: f64,
    /// Whether the collaborator moved the requested center (e.g. onto land).
    #[serde(default)]
    pub was_snapped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_center_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_center_lng: Option<f64>,
}

impl SearchArea {
    /// Area centered on `circle`, not snapped.
    pub fn from_circle(circle: &Circle) -> Self {
        Self {
            center_lat: circle.center.lat,
            center_lng: circle.center.lng,
            radius_km: circle.radius_km(),
            was_snapped: false,
            original_center_lat: None,
            original_center_lng: None,
        }
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lng)
    }

    /// The authoritative circle in meters.
    pub fn circle(&self) -> Circle {
        Circle::from_km(self.center(), self.radius_km)
    }
}

/// `radius_km / max(mec_radius_km, floor_km)`.
///
/// `radius_km` is expected to be already clamped to the slider range.
pub fn radius_multiplier(radius_km: f64, mec_radius_km: f64, floor_km: f64) -> f64 {
    radius_km / mec_radius_km.max(floor_km)
}
