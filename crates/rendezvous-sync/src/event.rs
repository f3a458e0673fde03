//! Push-stream frames and the dispatch table that maps each named event to
//! the synchronizer's reaction.

use rendezvous_geometry::LatLng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One frame on the push stream: `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl StreamMessage {
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self {
            event: kind.name().to_owned(),
            data,
        }
    }

    /// Parse a JSON frame.
    pub fn parse(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Known event kind, or `None` for names this client does not handle.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_name(&self.event)
    }
}

/// Every named event the collaborator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    ParticipantJoined,
    ParticipantUpdated,
    ParticipantLeft,
    CandidateAdded,
    CandidatesAdded,
    CandidateSaved,
    CandidateUnsaved,
    CandidateRemoved,
    VoteCast,
    VoteRemoved,
    EventUpdated,
    EventPublished,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        EventKind::Connected,
        EventKind::ParticipantJoined,
        EventKind::ParticipantUpdated,
        EventKind::ParticipantLeft,
        EventKind::CandidateAdded,
        EventKind::CandidatesAdded,
        EventKind::CandidateSaved,
        EventKind::CandidateUnsaved,
        EventKind::CandidateRemoved,
        EventKind::VoteCast,
        EventKind::VoteRemoved,
        EventKind::EventUpdated,
        EventKind::EventPublished,
    ];

    /// Wire name.
    pub const fn name(self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::ParticipantJoined => "participant_joined",
            EventKind::ParticipantUpdated => "participant_updated",
            EventKind::ParticipantLeft => "participant_left",
            EventKind::CandidateAdded => "candidate_added",
            EventKind::CandidatesAdded => "candidates_added",
            EventKind::CandidateSaved => "candidate_saved",
            EventKind::CandidateUnsaved => "candidate_unsaved",
            EventKind::CandidateRemoved => "candidate_removed",
            EventKind::VoteCast => "vote_cast",
            EventKind::VoteRemoved => "vote_removed",
            EventKind::EventUpdated => "event_updated",
            EventKind::EventPublished => "event_published",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// What the synchronizer does when this event arrives.
    ///
    /// Every event reloads. `connected` reloads too, to catch up on anything
    /// missed while the stream was down.
    pub const fn reaction(self) -> Reaction {
        match self {
            EventKind::EventUpdated => Reaction {
                reload: true,
                fast_path: Some(FastPath::CustomCenter),
            },
            EventKind::Connected
            | EventKind::ParticipantJoined
            | EventKind::ParticipantUpdated
            | EventKind::ParticipantLeft
            | EventKind::CandidateAdded
            | EventKind::CandidatesAdded
            | EventKind::CandidateSaved
            | EventKind::CandidateUnsaved
            | EventKind::CandidateRemoved
            | EventKind::VoteCast
            | EventKind::VoteRemoved
            | EventKind::EventPublished => Reaction::RELOAD,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload-specific handling applied before the reload lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastPath {
    /// Forward `custom_center_lat/lng` straight to the reconciler.
    CustomCenter,
}

/// Handler entry in the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction {
    pub reload: bool,
    pub fast_path: Option<FastPath>,
}

impl Reaction {
    pub const RELOAD: Reaction = Reaction {
        reload: true,
        fast_path: None,
    };
}

#[derive(Debug, Deserialize)]
struct CenterPayload {
    #[serde(default)]
    custom_center_lat: Option<f64>,
    #[serde(default)]
    custom_center_lng: Option<f64>,
}

/// Custom center carried by an `event_updated` payload.
///
/// `Some(None)` means the payload explicitly has no custom center;
/// `None` means the payload could not be read.
pub fn custom_center_from(data: &Value) -> Option<Option<LatLng>> {
    let payload = CenterPayload::deserialize(data).ok()?;
    match (payload.custom_center_lat, payload.custom_center_lng) {
        (Some(lat), Some(lng)) => Some(Some(LatLng::new(lat, lng))),
        _ => Some(None),
    }
}
