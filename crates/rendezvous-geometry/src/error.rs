//! Error types for rendezvous-geometry.

use thiserror::Error;

/// Rejected coordinate input.
///
/// The geometry functions themselves never fail; this is only raised when a
/// caller asks for validation with [`LatLng::try_new`](crate::LatLng::try_new).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("non-finite coordinate ({lat}, {lng})")]
    NonFinite { lat: f64, lng: f64 },

    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}
