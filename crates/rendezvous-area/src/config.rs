//! Reconciler configuration.

use std::time::Duration;

use crate::debounce::MAX_WINDOW;

/// Configuration for the meeting-area reconciler.
#[derive(Debug, Clone)]
pub struct AreaConfig {
    /// Quiet period after the last qualifying change before recomputing.
    pub debounce: Duration,

    /// Preview radius used until the host moves the slider.
    pub default_radius_km: f64,

    /// Lower bound of the radius slider.
    pub min_radius_km: f64,

    /// Upper bound of the radius slider.
    pub max_radius_km: f64,

    /// Floor applied to the MEC radius when deriving the search multiplier,
    /// so tightly clustered points do not blow the multiplier up.
    pub mec_floor_km: f64,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(2000),
            default_radius_km: 1.0,
            min_radius_km: 0.5,
            max_radius_km: 2.0,
            mec_floor_km: 1.0,
        }
    }
}

impl AreaConfig {
    /// Set the debounce window.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the initial preview radius.
    #[must_use]
    pub fn with_default_radius_km(mut self, radius_km: f64) -> Self {
        self.default_radius_km = radius_km;
        self
    }

    /// Set the slider bounds.
    #[must_use]
    pub fn with_radius_bounds_km(mut self, min: f64, max: f64) -> Self {
        self.min_radius_km = min;
        self.max_radius_km = max;
        self
    }

    /// Clamp a requested radius into the slider range.
    pub fn clamp_radius_km(&self, radius_km: f64) -> f64 {
        radius_km.clamp(self.min_radius_km, self.max_radius_km)
    }

    /// Read overrides from `RENDEZVOUS_DEBOUNCE_MS` and
    /// `RENDEZVOUS_RADIUS_KM`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = std::env::var("RENDEZVOUS_DEBOUNCE_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.debounce = Duration::from_millis(ms).min(MAX_WINDOW);
        }
        if let Some(km) = std::env::var("RENDEZVOUS_RADIUS_KM")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|km| km.is_finite())
        {
            config.default_radius_km = config.clamp_radius_km(km);
        }
        config
    }
}
