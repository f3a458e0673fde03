//! Collaborator contracts: event store, venue search and push stream.

use async_trait::async_trait;
use futures::stream::BoxStream;
use rendezvous_area::{SearchArea, SearchQuery};
use rendezvous_geometry::LatLng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::StreamMessage;
use crate::model::{
    Candidate, CandidateId, Event, EventId, EventUpdate, NewCandidate, NewParticipant, Participant,
    ParticipantId, Vote, VoteId,
};

/// Live frames for one event. Ends or yields an error when the connection drops.
pub type EventStream = BoxStream<'static, Result<StreamMessage>>;

/// Source of truth for events, participants, candidates and votes.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn event(&self, event_id: &EventId) -> Result<Event>;

    async fn participants(&self, event_id: &EventId) -> Result<Vec<Participant>>;

    async fn candidates(&self, event_id: &EventId) -> Result<Vec<Candidate>>;

    /// Votes cast by one participant.
    async fn votes(&self, event_id: &EventId, participant_id: &ParticipantId) -> Result<Vec<Vote>>;

    async fn join(&self, event_id: &EventId, participant: NewParticipant) -> Result<Participant>;

    async fn update_location(
        &self,
        event_id: &EventId,
        participant_id: &ParticipantId,
        location: LatLng,
    ) -> Result<Participant>;

    async fn leave(&self, event_id: &EventId, participant_id: &ParticipantId) -> Result<()>;

    async fn add_candidate(
        &self,
        event_id: &EventId,
        candidate: NewCandidate,
        added_by: &str,
    ) -> Result<Candidate>;

    async fn remove_candidate(&self, event_id: &EventId, candidate_id: &CandidateId) -> Result<()>;

    async fn set_saved(
        &self,
        event_id: &EventId,
        candidate_id: &CandidateId,
        saved: bool,
    ) -> Result<Candidate>;

    async fn cast_vote(
        &self,
        event_id: &EventId,
        participant_id: &ParticipantId,
        candidate_id: &CandidateId,
    ) -> Result<Vote>;

    async fn remove_vote(
        &self,
        event_id: &EventId,
        participant_id: &ParticipantId,
        vote_id: &VoteId,
    ) -> Result<()>;

    async fn update_event(&self, event_id: &EventId, update: EventUpdate) -> Result<Event>;

    /// Record the final decision and lock voting.
    async fn publish(&self, event_id: &EventId, final_decision: &str) -> Result<Event>;

    /// Withdraw the final decision. Voting stays closed until re-enabled.
    async fn unpublish(&self, event_id: &EventId) -> Result<Event>;
}

/// Candidates found by a search plus the circle actually searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub candidates: Vec<Candidate>,
    pub search_area: SearchArea,
}

/// Venue search over an event's meeting area.
#[async_trait]
pub trait VenueSearch: Send + Sync {
    async fn search(&self, event_id: &EventId, query: &SearchQuery) -> Result<SearchResults>;
}

/// Opens the push stream for one event.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, event_id: &EventId) -> Result<EventStream>;
}
