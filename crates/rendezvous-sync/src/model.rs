//! Mirrored data model: events, participants, candidates and votes.
//!
//! Field names match the collaborator JSON (`place_id`, `vote_count`, ...).

use std::fmt;

use rendezvous_geometry::{GeoPoint, LatLng};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a meeting event.
    EventId
);
string_id!(
    /// Identifier of a participant within an event.
    ParticipantId
);
string_id!(
    /// Identifier of a candidate venue within an event.
    CandidateId
);
string_id!(
    /// Server-assigned vote identifier.
    VoteId
);

/// Whether participant locations are shown exactly or blurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Show,
    #[default]
    Blur,
}

/// A meeting event as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub visibility: Visibility,
    pub allow_vote: bool,
    #[serde(default)]
    pub final_decision: Option<String>,
    #[serde(default)]
    pub custom_center_lat: Option<f64>,
    #[serde(default)]
    pub custom_center_lng: Option<f64>,
}

impl Event {
    /// Host-chosen center, if both coordinates are set.
    pub fn custom_center(&self) -> Option<LatLng> {
        match (self.custom_center_lat, self.custom_center_lng) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        }
    }

    /// A published event accepts no more votes.
    pub fn is_locked(&self) -> bool {
        self.final_decision.is_some()
    }
}

/// Fields for creating an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default = "default_true")]
    pub allow_vote: bool,
}

impl NewEvent {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            visibility: Visibility::default(),
            allow_vote: true,
        }
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

fn default_true() -> bool {
    true
}

/// Partial event update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_vote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_center: Option<LatLng>,
    /// Revert to the automatic center. Wins over `custom_center`.
    #[serde(default)]
    pub clear_custom_center: bool,
}

impl EventUpdate {
    pub fn custom_center(center: Option<LatLng>) -> Self {
        Self {
            custom_center: center,
            clear_custom_center: center.is_none(),
            ..Self::default()
        }
    }
}

/// A participant and their location.
///
/// `lat`/`lng` are the actual coordinates and the only ones used for
/// geometry. The fuzzy pair is a display-only privacy transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub fuzzy_lat: Option<f64>,
    #[serde(default)]
    pub fuzzy_lng: Option<f64>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl Participant {
    /// Actual location as a geometry input.
    pub fn geo_point(&self) -> GeoPoint {
        GeoPoint::with_id(self.id.as_str(), self.lat, self.lng)
    }

    /// Where to draw the participant on a map.
    pub fn display_position(&self) -> LatLng {
        match (self.visibility, self.fuzzy_lat, self.fuzzy_lng) {
            (Visibility::Blur, Some(lat), Some(lng)) => LatLng::new(lat, lng),
            _ => LatLng::new(self.lat, self.lng),
        }
    }
}

/// Join request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewParticipant {
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl NewParticipant {
    pub fn at(location: LatLng) -> Self {
        Self {
            name: None,
            lat: location.lat,
            lng: location.lng,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A candidate venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: u32,
    /// Meters from the effective circle's center.
    #[serde(default)]
    pub distance_from_center: Option<f64>,
    #[serde(default)]
    pub in_circle: Option<bool>,
    /// Server-maintained tally.
    #[serde(default)]
    pub vote_count: u32,
    pub added_by: String,
    #[serde(default)]
    pub saved: bool,
}

impl Candidate {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Manually added venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// One participant's vote for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub event_id: EventId,
    pub participant_id: ParticipantId,
    pub candidate_id: CandidateId,
}
