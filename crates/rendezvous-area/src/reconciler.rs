//! Meeting-area reconciler.
//!
//! Owns the circle-selection state and decides, for every input, whether the
//! effective circle changes now, after the debounce window, or not at all.
//!
//! # Rules
//!
//! - Zero locations clear everything immediately and cancel any pending
//!   recomputation.
//! - A location, center or radius change (re)starts the single debounce slot.
//!   Inputs that do not change anything are ignored.
//! - The same changes drop an authoritative circle, so the next
//!   recomputation falls back to a preview.
//! - A completed search installs its circle as authoritative at once.
//!
//! The reconciler never fails: input that cannot produce a circle leaves it
//! in [`CircleSelection::NoData`].

use std::cmp::Ordering;

use rendezvous_geometry::{centroid, minimum_enclosing_circle, Circle, GeoPoint, LatLng, METERS_PER_KM};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::debounce::{Debouncer, Ticket};
use crate::search::{radius_multiplier, SearchArea, SearchQuery};
use crate::selection::{AreaEvent, AreaSnapshot, CircleSelection};
use crate::AreaConfig;

/// The reconciler state machine.
#[derive(Debug)]
pub struct MeetingArea {
    config: AreaConfig,
    points: Vec<GeoPoint>,
    custom_center: Option<LatLng>,
    radius_km: f64,
    /// Confirmed search circle, dropped on any invalidating change.
    authoritative: Option<Circle>,
    selection: CircleSelection,
    mec: Option<Circle>,
    centroid: Option<LatLng>,
    debounce: Debouncer,
    recomputations: u64,
}

impl MeetingArea {
    pub fn new(config: AreaConfig) -> Self {
        let radius_km = config.clamp_radius_km(config.default_radius_km);
        let debounce = Debouncer::new(config.debounce);
        Self {
            config,
            points: Vec::new(),
            custom_center: None,
            radius_km,
            authoritative: None,
            selection: CircleSelection::NoData,
            mec: None,
            centroid: None,
            debounce,
            recomputations: 0,
        }
    }

    /// Apply one input. Returns the ticket if a recomputation was scheduled.
    pub fn handle(&mut self, event: AreaEvent, now: Instant) -> Option<Ticket> {
        match event {
            AreaEvent::LocationsChanged(points) => self.on_locations(points, now),
            AreaEvent::CustomCenterSet(center) => {
                if self.custom_center == Some(center) {
                    return None;
                }
                self.custom_center = Some(center);
                self.invalidate("custom center set");
                Some(self.debounce.schedule(now))
            }
            AreaEvent::CustomCenterCleared => {
                if self.custom_center.take().is_none() {
                    return None;
                }
                self.invalidate("custom center cleared");
                Some(self.debounce.schedule(now))
            }
            AreaEvent::RadiusSliderChanged(km) => {
                if !km.is_finite() {
                    return None;
                }
                let km = self.config.clamp_radius_km(km);
                if km == self.radius_km {
                    return None;
                }
                self.radius_km = km;
                self.invalidate("radius changed");
                Some(self.debounce.schedule(now))
            }
            AreaEvent::SearchCompleted(area) => {
                self.on_search_completed(&area);
                None
            }
            AreaEvent::Reset => {
                self.reset();
                None
            }
        }
    }

    fn on_locations(&mut self, points: Vec<GeoPoint>, now: Instant) -> Option<Ticket> {
        if points.is_empty() {
            self.clear();
            return None;
        }
        if same_point_set(&self.points, &points) {
            trace!(count = points.len(), "Location set unchanged");
            return None;
        }
        self.points = points;
        self.invalidate("locations changed");
        Some(self.debounce.schedule(now))
    }

    fn on_search_completed(&mut self, area: &SearchArea) {
        let circle = area.circle();
        info!(
            center = %circle.center,
            radius_m = circle.radius_meters,
            was_snapped = area.was_snapped,
            "Search circle is authoritative"
        );
        self.authoritative = Some(circle);
        self.selection = CircleSelection::Authoritative { circle };
    }

    fn invalidate(&mut self, reason: &'static str) {
        if self.authoritative.take().is_some() {
            debug!(reason, "Authoritative circle invalidated");
        }
    }

    fn clear(&mut self) {
        self.debounce.cancel();
        self.points.clear();
        self.authoritative = None;
        self.mec = None;
        self.centroid = None;
        self.selection = CircleSelection::NoData;
        debug!("No locations, circle cleared");
    }

    /// Drop all state, as when the viewed event changes.
    pub fn reset(&mut self) {
        self.clear();
        self.custom_center = None;
        self.radius_km = self.config.clamp_radius_km(self.config.default_radius_km);
    }

    /// When the pending recomputation is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Run the recomputation for `ticket`. Stale tickets are a no-op.
    pub fn fire(&mut self, ticket: Ticket) -> bool {
        if !self.debounce.fire(ticket) {
            return false;
        }
        self.recompute();
        true
    }

    /// Run the pending recomputation if it is due at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.debounce.take_due(now) {
            Some(_) => {
                self.recompute();
                true
            }
            None => false,
        }
    }

    fn recompute(&mut self) {
        self.recomputations += 1;
        self.mec = minimum_enclosing_circle(&self.points);
        self.centroid = centroid(&self.points);

        let Some(mec) = self.mec else {
            self.selection = CircleSelection::NoData;
            return;
        };

        self.selection = if let Some(circle) = self.authoritative {
            CircleSelection::Authoritative { circle }
        } else {
            let center = self.custom_center.unwrap_or(mec.center);
            let circle = Circle::new(center, self.radius_km * METERS_PER_KM);
            match self.custom_center {
                Some(center) => CircleSelection::CustomPreview { circle, center },
                None => CircleSelection::AutoPreview { circle },
            }
        };

        debug!(
            points = self.points.len(),
            mec_radius_m = mec.radius_meters,
            selection = %self.selection,
            recomputations = self.recomputations,
            "Meeting area recomputed"
        );
    }

    /// Current selection state.
    pub fn selection(&self) -> &CircleSelection {
        &self.selection
    }

    /// Circle used for search and display.
    pub fn effective_circle(&self) -> Option<Circle> {
        self.selection.circle()
    }

    pub fn centroid(&self) -> Option<LatLng> {
        self.centroid
    }

    pub fn custom_center(&self) -> Option<LatLng> {
        self.custom_center
    }

    /// Slider value in kilometers, already clamped.
    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Search multiplier derived from the slider and the current MEC.
    pub fn radius_multiplier(&self) -> f64 {
        let mec_km = minimum_enclosing_circle(&self.points)
            .map(|c| c.radius_km())
            .unwrap_or(0.0);
        radius_multiplier(self.radius_km, mec_km, self.config.mec_floor_km)
    }

    /// Build a search request for the collaborator.
    pub fn search_query(&self, keyword: impl Into<String>, only_in_circle: bool) -> SearchQuery {
        SearchQuery {
            keyword: keyword.into(),
            radius_multiplier: self.radius_multiplier(),
            center: self.custom_center,
            only_in_circle,
        }
    }

    /// Read-only copy of everything the presentation layer needs.
    pub fn snapshot(&self) -> AreaSnapshot {
        AreaSnapshot {
            selection: self.selection.clone(),
            centroid: self.centroid,
            mec: self.mec,
            custom_center: self.custom_center,
            radius_km: self.radius_km,
            radius_multiplier: self.radius_multiplier(),
            point_count: self.points.len(),
            recompute_pending: self.debounce.is_pending(),
            recomputations: self.recomputations,
        }
    }
}

impl Default for MeetingArea {
    fn default() -> Self {
        Self::new(AreaConfig::default())
    }
}

/// Order-insensitive comparison of two location sets by coordinates.
fn same_point_set(a: &[GeoPoint], b: &[GeoPoint]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let key = |p: &GeoPoint| (p.lat, p.lng);
    let cmp = |x: &(f64, f64), y: &(f64, f64)| -> Ordering {
        x.0.total_cmp(&y.0).then(x.1.total_cmp(&y.1))
    };
    let mut a: Vec<_> = a.iter().map(key).collect();
    let mut b: Vec<_> = b.iter().map(key).collect();
    a.sort_by(cmp);
    b.sort_by(cmp);
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const DEBOUNCE: Duration = Duration::from_millis(2000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn area() -> MeetingArea {
        MeetingArea::new(AreaConfig::default())
    }

    fn pts(raw: &[(f64, f64)]) -> Vec<GeoPoint> {
        raw.iter().map(|&(lat, lng)| GeoPoint::new(lat, lng)).collect()
    }

    fn authoritative_area(center: LatLng, radius_km: f64) -> SearchArea {
        SearchArea::from_circle(&Circle::from_km(center, radius_km))
    }

    #[test]
    fn starts_empty() {
        let a = area();
        assert_eq!(a.selection(), &CircleSelection::NoData);
        assert_eq!(a.radius_km(), 1.0);
        assert!(a.deadline().is_none());
    }

    #[test]
    fn locations_are_debounced() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(10.0, 10.0)])), t0);

        assert_eq!(a.deadline(), Some(t0 + DEBOUNCE));
        assert!(!a.poll(t0 + ms(1999)));
        assert_eq!(a.selection(), &CircleSelection::NoData);

        assert!(a.poll(t0 + DEBOUNCE));
        assert!(matches!(a.selection(), CircleSelection::AutoPreview { .. }));
    }

    #[test]
    fn burst_coalesces_into_one_recomputation() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0)])), t0);
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0), (0.0, 0.01)])), t0 + ms(500));
        let last = pts(&[(0.0, 0.0), (0.0, 0.01), (0.01, 0.0)]);
        a.handle(AreaEvent::LocationsChanged(last.clone()), t0 + ms(1000));

        // The first timer would have fired at t0+2000
        assert!(!a.poll(t0 + ms(2000)));
        assert!(a.poll(t0 + ms(3000)));
        assert!(!a.poll(t0 + ms(10_000)));

        assert_eq!(a.recomputations(), 1);
        assert_eq!(a.points(), last.as_slice());
        assert_eq!(a.snapshot().point_count, 3);
    }

    #[test]
    fn stale_ticket_is_a_no_op() {
        let t0 = Instant::now();
        let mut a = area();
        let first = a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0)])), t0).unwrap();
        let second = a
            .handle(AreaEvent::LocationsChanged(pts(&[(1.0, 1.0)])), t0 + ms(100))
            .unwrap();

        assert!(!a.fire(first));
        assert_eq!(a.recomputations(), 0);
        assert!(a.fire(second));
        assert_eq!(a.recomputations(), 1);
    }

    #[test]
    fn single_participant_uses_slider_radius() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(52.52, 13.40)])), t0);
        a.poll(t0 + DEBOUNCE);

        let circle = a.effective_circle().unwrap();
        assert_eq!(circle.radius_meters, 1_000.0);
        assert_eq!(circle.center, LatLng::new(52.52, 13.40));
        assert_eq!(a.snapshot().mec.unwrap().radius_meters, 0.0);
    }

    #[test]
    fn zero_points_clear_immediately() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0)])), t0);
        a.poll(t0 + DEBOUNCE);
        assert!(a.effective_circle().is_some());

        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0), (1.0, 1.0)])), t0 + ms(2500));
        assert_eq!(a.handle(AreaEvent::LocationsChanged(vec![]), t0 + ms(2600)), None);

        assert_eq!(a.selection(), &CircleSelection::NoData);
        assert!(a.deadline().is_none(), "pending recomputation must be cancelled");
        assert!(a.centroid().is_none());
    }

    #[test]
    fn custom_center_moves_the_preview() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0), (0.0, 0.02)])), t0);
        let center = LatLng::new(0.005, 0.005);
        a.handle(AreaEvent::CustomCenterSet(center), t0 + ms(10));
        a.poll(t0 + ms(10) + DEBOUNCE);

        match a.selection() {
            CircleSelection::CustomPreview { circle, center: c } => {
                assert_eq!(*c, center);
                assert_eq!(circle.center, center);
                assert_eq!(circle.radius_meters, 1_000.0);
            }
            other => panic!("expected custom preview, got {other}"),
        }

        a.handle(AreaEvent::CustomCenterCleared, t0 + ms(5000));
        a.poll(t0 + ms(5000) + DEBOUNCE);
        assert!(matches!(a.selection(), CircleSelection::AutoPreview { .. }));
        assert_eq!(a.effective_circle().unwrap().center, LatLng::new(0.0, 0.01));
    }

    #[test]
    fn slider_is_clamped() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::RadiusSliderChanged(5.0), t0);
        assert_eq!(a.radius_km(), 2.0);
        a.handle(AreaEvent::RadiusSliderChanged(0.1), t0);
        assert_eq!(a.radius_km(), 0.5);
        assert_eq!(a.handle(AreaEvent::RadiusSliderChanged(f64::NAN), t0), None);
        assert_eq!(a.radius_km(), 0.5);
    }

    #[test]
    fn search_completion_is_authoritative_immediately() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0), (0.0, 0.02)])), t0);
        a.poll(t0 + DEBOUNCE);

        let area = authoritative_area(LatLng::new(0.0, 0.011), 1.7);
        a.handle(AreaEvent::SearchCompleted(area.clone()), t0 + ms(3000));

        assert_eq!(
            a.selection(),
            &CircleSelection::Authoritative {
                circle: area.circle()
            }
        );
    }

    #[test]
    fn authoritative_survives_unchanged_reload() {
        let t0 = Instant::now();
        let mut a = area();
        let points = pts(&[(0.0, 0.0), (0.0, 0.02)]);
        a.handle(AreaEvent::LocationsChanged(points.clone()), t0);
        a.poll(t0 + DEBOUNCE);
        let area = authoritative_area(LatLng::new(0.0, 0.01), 1.2);
        a.handle(AreaEvent::SearchCompleted(area), t0 + ms(3000));

        // A reload delivering the same set, in another order
        let mut reordered = points;
        reordered.reverse();
        assert_eq!(a.handle(AreaEvent::LocationsChanged(reordered), t0 + ms(4000)), None);
        assert!(a.selection().is_authoritative());
    }

    #[test]
    fn new_participant_reverts_authoritative_to_preview() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0), (0.0, 0.02)])), t0);
        a.poll(t0 + DEBOUNCE);
        a.handle(
            AreaEvent::SearchCompleted(authoritative_area(LatLng::new(0.0, 0.01), 1.2)),
            t0 + ms(3000),
        );
        assert!(a.selection().is_authoritative());

        let joined = pts(&[(0.0, 0.0), (0.0, 0.02), (0.02, 0.01)]);
        a.handle(AreaEvent::LocationsChanged(joined), t0 + ms(4000));
        assert!(a.poll(t0 + ms(4000) + DEBOUNCE));

        assert!(a.selection().is_preview());
        assert_eq!(a.effective_circle().unwrap().radius_meters, 1_000.0);
    }

    #[test]
    fn shrinking_to_one_participant_invalidates_authoritative() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0), (0.0, 0.02)])), t0);
        a.poll(t0 + DEBOUNCE);
        a.handle(
            AreaEvent::SearchCompleted(authoritative_area(LatLng::new(0.0, 0.01), 1.2)),
            t0 + ms(3000),
        );

        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0)])), t0 + ms(4000));
        a.poll(t0 + ms(4000) + DEBOUNCE);

        assert_eq!(
            a.selection(),
            &CircleSelection::AutoPreview {
                circle: Circle::new(LatLng::new(0.0, 0.0), 1_000.0)
            }
        );
    }

    #[test]
    fn radius_change_invalidates_authoritative() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0)])), t0);
        a.poll(t0 + DEBOUNCE);
        a.handle(
            AreaEvent::SearchCompleted(authoritative_area(LatLng::new(0.0, 0.0), 1.0)),
            t0 + ms(3000),
        );

        a.handle(AreaEvent::RadiusSliderChanged(1.5), t0 + ms(4000));
        a.poll(t0 + ms(4000) + DEBOUNCE);
        assert_eq!(a.effective_circle().unwrap().radius_meters, 1_500.0);
        assert!(!a.selection().is_authoritative());
    }

    #[test]
    fn radius_multiplier_floors_mec_radius() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0)])), t0);
        a.handle(AreaEvent::RadiusSliderChanged(1.5), t0);
        assert_eq!(a.radius_multiplier(), 1.5);

        // ~4.4 km apart, MEC radius ~2.2 km
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0), (0.0, 0.04)])), t0);
        let mec_km = 0.04 * rendezvous_geometry::meters_per_degree() / 2.0 / METERS_PER_KM;
        assert!((a.radius_multiplier() - 1.5 / mec_km).abs() < 1e-3);
    }

    #[test]
    fn search_query_carries_custom_center() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0)])), t0);
        let q = a.search_query("coffee", true);
        assert_eq!(q.center, None);
        assert_eq!(q.keyword, "coffee");
        assert!(q.only_in_circle);

        a.handle(AreaEvent::CustomCenterSet(LatLng::new(0.1, 0.1)), t0);
        assert_eq!(a.search_query("coffee", false).center, Some(LatLng::new(0.1, 0.1)));
    }

    #[test]
    fn reset_restores_defaults() {
        let t0 = Instant::now();
        let mut a = area();
        a.handle(AreaEvent::LocationsChanged(pts(&[(0.0, 0.0)])), t0);
        a.handle(AreaEvent::CustomCenterSet(LatLng::new(1.0, 1.0)), t0);
        a.handle(AreaEvent::RadiusSliderChanged(2.0), t0);
        a.handle(AreaEvent::Reset, t0);

        assert_eq!(a.selection(), &CircleSelection::NoData);
        assert!(a.custom_center().is_none());
        assert_eq!(a.radius_km(), 1.0);
        assert!(a.deadline().is_none());
        assert!(a.points().is_empty());
    }

    #[test]
    fn point_set_comparison_ignores_order_and_ids() {
        let a = vec![GeoPoint::with_id("a", 1.0, 2.0), GeoPoint::with_id("b", 3.0, 4.0)];
        let b = vec![GeoPoint::new(3.0, 4.0), GeoPoint::new(1.0, 2.0)];
        assert!(same_point_set(&a, &b));
        assert!(!same_point_set(&a, &b[..1]));
    }
}
