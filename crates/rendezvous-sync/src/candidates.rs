//! Candidate ordering and circle membership.

use std::cmp::Ordering;
use std::str::FromStr;

use rendezvous_geometry::Circle;
use serde::{Deserialize, Serialize};

use crate::model::Candidate;

/// Presentation order for the candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Highest rating first.
    #[default]
    Rating,
    /// Closest to the circle center first.
    Distance,
    /// Most votes first.
    Votes,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rating" => Ok(SortMode::Rating),
            "distance" => Ok(SortMode::Distance),
            "votes" | "vote" => Ok(SortMode::Votes),
            other => Err(format!("unknown sort mode: {other}")),
        }
    }
}

/// Missing values sort after present ones regardless of direction.
fn missing_last(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.total_cmp(&a),
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort; ties keep their incoming order.
pub fn sort_candidates(candidates: &mut [Candidate], mode: SortMode) {
    match mode {
        SortMode::Rating => candidates.sort_by(|a, b| missing_last(a.rating, b.rating, true)),
        SortMode::Distance => candidates.sort_by(|a, b| {
            missing_last(a.distance_from_center, b.distance_from_center, false)
        }),
        SortMode::Votes => candidates.sort_by(|a, b| b.vote_count.cmp(&a.vote_count)),
    }
}

/// Fill `distance_from_center` (meters) and `in_circle` against `circle`.
pub fn annotate_candidates(candidates: &mut [Candidate], circle: &Circle) {
    for candidate in candidates.iter_mut() {
        let distance = circle.distance_from_center(&candidate.position());
        candidate.distance_from_center = Some(distance);
        candidate.in_circle = Some(distance <= circle.radius_meters);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateId;
    use rendezvous_geometry::LatLng;

    fn candidate(id: &str, rating: Option<f64>, distance: Option<f64>, votes: u32) -> Candidate {
        Candidate {
            id: CandidateId::new(id),
            place_id: format!("place_{id}"),
            name: id.to_owned(),
            address: None,
            lat: 0.0,
            lng: 0.0,
            rating,
            user_ratings_total: 0,
            distance_from_center: distance,
            in_circle: None,
            vote_count: votes,
            added_by: "system".into(),
            saved: false,
        }
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn rating_descending_missing_last() {
        let mut list = vec![
            candidate("a", None, None, 0),
            candidate("b", Some(3.9), None, 0),
            candidate("c", Some(4.8), None, 0),
            candidate("d", Some(3.9), None, 0),
        ];
        sort_candidates(&mut list, SortMode::Rating);
        assert_eq!(ids(&list), ["c", "b", "d", "a"]);
    }

    #[test]
    fn distance_ascending_missing_last() {
        let mut list = vec![
            candidate("a", None, None, 0),
            candidate("b", None, Some(900.0), 0),
            candidate("c", None, Some(120.0), 0),
        ];
        sort_candidates(&mut list, SortMode::Distance);
        assert_eq!(ids(&list), ["c", "b", "a"]);
    }

    #[test]
    fn votes_descending_stable() {
        let mut list = vec![
            candidate("a", None, None, 1),
            candidate("b", None, None, 4),
            candidate("c", None, None, 1),
        ];
        sort_candidates(&mut list, SortMode::Votes);
        assert_eq!(ids(&list), ["b", "a", "c"]);
    }

    #[test]
    fn parses_sort_modes() {
        assert_eq!("Rating".parse::<SortMode>(), Ok(SortMode::Rating));
        assert_eq!("vote".parse::<SortMode>(), Ok(SortMode::Votes));
        assert!("price".parse::<SortMode>().is_err());
    }

    #[test]
    fn annotates_membership() {
        let circle = Circle::new(LatLng::new(0.0, 0.0), 1_000.0);
        let mut inside = candidate("in", None, None, 0);
        inside.lat = 0.005;
        let mut outside = candidate("out", None, None, 0);
        outside.lat = 0.02;
        let mut list = vec![inside, outside];

        annotate_candidates(&mut list, &circle);
        assert_eq!(list[0].in_circle, Some(true));
        assert_eq!(list[1].in_circle, Some(false));
        assert!(list[1].distance_from_center.unwrap() > 2_000.0);
    }
}
