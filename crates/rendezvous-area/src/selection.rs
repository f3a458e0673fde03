//! Circle-selection states and the inputs that drive them.

use rendezvous_geometry::{Circle, GeoPoint, LatLng};
use serde::Serialize;

use crate::SearchArea;

/// Which circle is currently in effect.
///
/// ```text
/// NoData ──debounce──▶ AutoPreview | CustomPreview ──search──▶ Authoritative
///   ▲                        ▲                                     │
///   │                        └──── location/center/radius change ──┘
///   └── zero points (from any state)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CircleSelection {
    /// No locations yet.
    #[default]
    NoData,
    /// Preview centered on the MEC.
    AutoPreview { circle: Circle },
    /// Preview centered on a host-chosen point.
    CustomPreview { circle: Circle, center: LatLng },
    /// Circle confirmed by the search collaborator.
    Authoritative { circle: Circle },
}

impl CircleSelection {
    /// The effective circle for search and display.
    pub fn circle(&self) -> Option<Circle> {
        match self {
            Self::NoData => None,
            Self::AutoPreview { circle }
            | Self::CustomPreview { circle, .. }
            | Self::Authoritative { circle } => Some(*circle),
        }
    }

    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Authoritative { .. })
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, Self::AutoPreview { .. } | Self::CustomPreview { .. })
    }
}

impl std::fmt::Display for CircleSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoData => write!(f, "NoData"),
            Self::AutoPreview { .. } => write!(f, "AutoPreview"),
            Self::CustomPreview { .. } => write!(f, "CustomPreview"),
            Self::Authoritative { .. } => write!(f, "Authoritative"),
        }
    }
}

/// Inputs to the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaEvent {
    /// The participant location set, actual (never fuzzy) coordinates.
    LocationsChanged(Vec<GeoPoint>),
    /// Host dragged the center.
    CustomCenterSet(LatLng),
    /// Host reverted to the automatic center.
    CustomCenterCleared,
    /// Host moved the radius slider (kilometers).
    RadiusSliderChanged(f64),
    /// A venue search returned its authoritative circle.
    SearchCompleted(SearchArea),
    /// The viewed event changed; drop everything.
    Reset,
}

/// Read-only view of the reconciler published to the rest of the app.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AreaSnapshot {
    pub selection: CircleSelection,
    pub centroid: Option<LatLng>,
    pub mec: Option<Circle>,
    pub custom_center: Option<LatLng>,
    pub radius_km: f64,
    pub radius_multiplier: f64,
    pub point_count: usize,
    /// Whether a debounced recomputation is waiting.
    pub recompute_pending: bool,
    /// Number of debounced recomputations run so far.
    pub recomputations: u64,
}

impl AreaSnapshot {
    pub fn effective_circle(&self) -> Option<Circle> {
        self.selection.circle()
    }

    /// A circle is showing and no recomputation is waiting.
    pub fn is_settled(&self) -> bool {
        !self.recompute_pending && self.effective_circle().is_some()
    }
}
