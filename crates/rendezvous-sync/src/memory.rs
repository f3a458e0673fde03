//! In-process collaborator implementing the store, search and stream
//! contracts.
//!
//! Every mutation fans out the matching named event to all subscribers of the
//! event. Subscriber queues are bounded by `HubConfig::subscriber_capacity`;
//! a subscriber that falls further behind gets a stream error and has to
//! reconnect.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rendezvous_area::{SearchArea, SearchQuery};
use rendezvous_geometry::{fuzz_point, minimum_enclosing_circle, Circle, GeoPoint, LatLng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, trace};

use crate::config::HubConfig;
use crate::error::{Error, Result};
use crate::event::{EventKind, StreamMessage};
use crate::model::{
    Candidate, CandidateId, Event, EventId, EventUpdate, NewCandidate, NewEvent, NewParticipant,
    Participant, ParticipantId, Vote, VoteId,
};
use crate::store::{EventStore, EventStream, SearchResults, StreamConnector, VenueSearch};

/// Floor applied to the MEC radius before scaling by the multiplier.
const MEC_FLOOR_KM: f64 = 1.0;

/// How far past the search circle a nearby lookup still returns venues.
const NEARBY_FACTOR: f64 = 2.0;

/// Length of the place id prefix used in candidate ids.
const PLACE_PREFIX_LEN: usize = 12;

/// A venue in the hub's searchable catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
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
    /// Extra search terms (cuisine, category, ...).
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Venue {
    fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        keyword.is_empty()
            || self.name.to_lowercase().contains(&keyword)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&keyword))
    }

    fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

struct EventRecord {
    event: Event,
    participants: Vec<Participant>,
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
    tx: broadcast::Sender<StreamMessage>,
}

impl EventRecord {
    fn broadcast(&self, kind: EventKind, data: Value) {
        let receivers = self.tx.send(StreamMessage::new(kind, data)).unwrap_or(0);
        trace!(event_id = %self.event.id, %kind, receivers, "Broadcast");
    }

    fn vote_count(&self, candidate_id: &CandidateId) -> u32 {
        self.votes
            .iter()
            .filter(|v| &v.candidate_id == candidate_id)
            .count() as u32
    }

    fn participant_view(&self, participant: &Participant) -> Participant {
        Participant {
            visibility: self.event.visibility,
            ..participant.clone()
        }
    }

    fn candidate_view(&self, candidate: &Candidate) -> Candidate {
        Candidate {
            vote_count: self.vote_count(&candidate.id),
            ..candidate.clone()
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    failing_votes: u32,
    vote_delay: Option<Duration>,
}

struct HubState {
    events: HashMap<EventId, EventRecord>,
    venues: Vec<Venue>,
    next_id: u64,
    rng: StdRng,
    faults: Faults,
}

impl HubState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }

    fn record(&self, event_id: &EventId) -> Result<&EventRecord> {
        self.events
            .get(event_id)
            .ok_or_else(|| Error::NotFound(format!("event {event_id}")))
    }

    fn record_mut(&mut self, event_id: &EventId) -> Result<&mut EventRecord> {
        self.events
            .get_mut(event_id)
            .ok_or_else(|| Error::NotFound(format!("event {event_id}")))
    }

    /// Consume one injected vote failure, or return the configured delay.
    fn vote_fault(&mut self) -> Result<Option<Duration>> {
        if self.faults.failing_votes > 0 {
            self.faults.failing_votes -= 1;
            return Err(Error::Transport("injected vote failure".into()));
        }
        Ok(self.faults.vote_delay)
    }
}

/// In-memory event hub.
pub struct MemoryHub {
    config: HubConfig,
    state: RwLock<HubState>,
}

impl MemoryHub {
    pub fn new(config: HubConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            state: RwLock::new(HubState {
                events: HashMap::new(),
                venues: Vec::new(),
                next_id: 0,
                rng,
                faults: Faults::default(),
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub async fn create_event(&self, new: NewEvent) -> Event {
        let mut state = self.state.write().await;
        let id = EventId::new(state.next_id("evt"));
        let event = Event {
            id: id.clone(),
            title: new.title,
            visibility: new.visibility,
            allow_vote: new.allow_vote && self.config.allow_vote,
            final_decision: None,
            custom_center_lat: None,
            custom_center_lng: None,
        };
        let (tx, _) = broadcast::channel(self.config.subscriber_capacity);
        state.events.insert(
            id.clone(),
            EventRecord {
                event: event.clone(),
                participants: Vec::new(),
                candidates: Vec::new(),
                votes: Vec::new(),
                tx,
            },
        );
        info!(event_id = %id, title = %event.title, "Event created");
        event
    }

    /// Add venues to the searchable catalog.
    pub async fn add_venues(&self, venues: impl IntoIterator<Item = Venue>) {
        self.state.write().await.venues.extend(venues);
    }

    /// Make the next `count` vote mutations fail with a transport error.
    pub async fn fail_next_votes(&self, count: u32) {
        self.state.write().await.faults.failing_votes = count;
    }

    /// Hold every vote mutation for `delay` before applying it.
    pub async fn delay_votes(&self, delay: Option<Duration>) {
        self.state.write().await.faults.vote_delay = delay;
    }

    /// Drop every open stream of `event_id`. Returns how many were open.
    pub async fn sever(&self, event_id: &EventId) -> Result<usize> {
        let mut state = self.state.write().await;
        let record = state.record_mut(event_id)?;
        let (tx, _) = broadcast::channel(self.config.subscriber_capacity);
        let old = std::mem::replace(&mut record.tx, tx);
        let dropped = old.receiver_count();
        info!(event_id = %event_id, dropped, "Streams severed");
        Ok(dropped)
    }

    /// Number of open streams for `event_id`.
    pub async fn subscriber_count(&self, event_id: &EventId) -> usize {
        let state = self.state.read().await;
        state
            .events
            .get(event_id)
            .map_or(0, |r| r.tx.receiver_count())
    }

    /// Vote tallies, highest first; ties by candidate id.
    pub async fn tally(&self, event_id: &EventId) -> Result<Vec<(CandidateId, u32)>> {
        let state = self.state.read().await;
        let record = state.record(event_id)?;
        let mut tally: Vec<_> = record
            .candidates
            .iter()
            .map(|c| (c.id.clone(), record.vote_count(&c.id)))
            .collect();
        tally.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(tally)
    }

    fn fuzz(&self, location: LatLng, rng: &mut StdRng) -> (f64, f64) {
        let fuzzy = fuzz_point(location, self.config.fuzz_radius_km, rng);
        (fuzzy.lat, fuzzy.lng)
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

fn checked_location(lat: f64, lng: f64) -> Result<LatLng> {
    LatLng::try_new(lat, lng).map_err(|e| Error::Rejected(e.to_string()))
}

fn candidate_id(event_id: &EventId, place_id: &str) -> CandidateId {
    let prefix: String = place_id.chars().take(PLACE_PREFIX_LEN).collect();
    CandidateId::new(format!("cand_{event_id}_{prefix}"))
}

#[async_trait]
impl EventStore for MemoryHub {
    async fn event(&self, event_id: &EventId) -> Result<Event> {
        let state = self.state.read().await;
        Ok(state.record(event_id)?.event.clone())
    }

    async fn participants(&self, event_id: &EventId) -> Result<Vec<Participant>> {
        let state = self.state.read().await;
        let record = state.record(event_id)?;
        Ok(record
            .participants
            .iter()
            .map(|p| record.participant_view(p))
            .collect())
    }

    async fn candidates(&self, event_id: &EventId) -> Result<Vec<Candidate>> {
        let state = self.state.read().await;
        let record = state.record(event_id)?;
        Ok(record
            .candidates
            .iter()
            .map(|c| record.candidate_view(c))
            .collect())
    }

    async fn votes(&self, event_id: &EventId, participant_id: &ParticipantId) -> Result<Vec<Vote>> {
        let state = self.state.read().await;
        Ok(state
            .record(event_id)?
            .votes
            .iter()
            .filter(|v| &v.participant_id == participant_id)
            .cloned()
            .collect())
    }

    async fn join(&self, event_id: &EventId, participant: NewParticipant) -> Result<Participant> {
        let location = checked_location(participant.lat, participant.lng)?;
        let mut state = self.state.write().await;
        if state.record(event_id)?.event.is_locked() {
            return Err(Error::Rejected("Event is locked".into()));
        }

        let id = ParticipantId::new(state.next_id("p"));
        let (fuzzy_lat, fuzzy_lng) = self.fuzz(location, &mut state.rng);
        let record = state.record_mut(event_id)?;
        let stored = Participant {
            id: id.clone(),
            name: participant.name,
            lat: location.lat,
            lng: location.lng,
            fuzzy_lat: Some(fuzzy_lat),
            fuzzy_lng: Some(fuzzy_lng),
            visibility: record.event.visibility,
        };
        record.participants.push(stored.clone());
        record.broadcast(
            EventKind::ParticipantJoined,
            json!({ "participant_id": id, "name": stored.name }),
        );
        debug!(event_id = %event_id, participant_id = %id, "Participant joined");
        Ok(stored)
    }

    async fn update_location(
        &self,
        event_id: &EventId,
        participant_id: &ParticipantId,
        location: LatLng,
    ) -> Result<Participant> {
        let location = checked_location(location.lat, location.lng)?;
        let mut state = self.state.write().await;
        state.record(event_id)?;
        let (fuzzy_lat, fuzzy_lng) = self.fuzz(location, &mut state.rng);
        let record = state.record_mut(event_id)?;

        let participant = record
            .participants
            .iter_mut()
            .find(|p| &p.id == participant_id)
            .ok_or_else(|| Error::NotFound(format!("participant {participant_id}")))?;
        participant.lat = location.lat;
        participant.lng = location.lng;
        participant.fuzzy_lat = Some(fuzzy_lat);
        participant.fuzzy_lng = Some(fuzzy_lng);
        let updated = participant.clone();

        record.broadcast(
            EventKind::ParticipantUpdated,
            json!({ "participant_id": participant_id }),
        );
        Ok(record.participant_view(&updated))
    }

    async fn leave(&self, event_id: &EventId, participant_id: &ParticipantId) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state.record_mut(event_id)?;
        let before = record.participants.len();
        record.participants.retain(|p| &p.id != participant_id);
        if record.participants.len() == before {
            return Err(Error::NotFound(format!("participant {participant_id}")));
        }
        record.votes.retain(|v| &v.participant_id != participant_id);
        record.broadcast(
            EventKind::ParticipantLeft,
            json!({ "participant_id": participant_id }),
        );
        debug!(event_id = %event_id, participant_id = %participant_id, "Participant left");
        Ok(())
    }

    async fn add_candidate(
        &self,
        event_id: &EventId,
        candidate: NewCandidate,
        added_by: &str,
    ) -> Result<Candidate> {
        checked_location(candidate.lat, candidate.lng)?;
        let mut state = self.state.write().await;
        let record = state.record_mut(event_id)?;
        let id = candidate_id(event_id, &candidate.place_id);
        if record
            .candidates
            .iter()
            .any(|c| c.place_id == candidate.place_id || c.id == id)
        {
            return Err(Error::Rejected("Candidate already exists".into()));
        }

        let stored = Candidate {
            id: id.clone(),
            place_id: candidate.place_id,
            name: candidate.name,
            address: candidate.address,
            lat: candidate.lat,
            lng: candidate.lng,
            rating: candidate.rating,
            user_ratings_total: 0,
            distance_from_center: None,
            in_circle: None,
            vote_count: 0,
            added_by: added_by.to_owned(),
            saved: false,
        };
        record.candidates.push(stored.clone());
        record.broadcast(EventKind::CandidateAdded, json!({ "candidate_id": id }));
        Ok(stored)
    }

    async fn remove_candidate(&self, event_id: &EventId, candidate_id: &CandidateId) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state.record_mut(event_id)?;
        let before = record.candidates.len();
        record.candidates.retain(|c| &c.id != candidate_id);
        if record.candidates.len() == before {
            return Err(Error::NotFound(format!("candidate {candidate_id}")));
        }
        record.votes.retain(|v| &v.candidate_id != candidate_id);
        record.broadcast(
            EventKind::CandidateRemoved,
            json!({ "candidate_id": candidate_id }),
        );
        Ok(())
    }

    async fn set_saved(
        &self,
        event_id: &EventId,
        candidate_id: &CandidateId,
        saved: bool,
    ) -> Result<Candidate> {
        let mut state = self.state.write().await;
        let record = state.record_mut(event_id)?;
        let candidate = record
            .candidates
            .iter_mut()
            .find(|c| &c.id == candidate_id)
            .ok_or_else(|| Error::NotFound(format!("candidate {candidate_id}")))?;
        candidate.saved = saved;
        let updated = candidate.clone();

        let kind = if saved {
            EventKind::CandidateSaved
        } else {
            EventKind::CandidateUnsaved
        };
        record.broadcast(kind, json!({ "candidate_id": candidate_id }));
        Ok(record.candidate_view(&updated))
    }

    async fn cast_vote(
        &self,
        event_id: &EventId,
        participant_id: &ParticipantId,
        candidate_id: &CandidateId,
    ) -> Result<Vote> {
        let delay = self.state.write().await.vote_fault()?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        let vote_id = VoteId::new(state.next_id("v"));
        let record = state.record_mut(event_id)?;

        if !record.event.allow_vote {
            return Err(Error::Rejected("Voting is not allowed for this event".into()));
        }
        if record.event.is_locked() {
            return Err(Error::Rejected("Event is locked".into()));
        }
        if !record.participants.iter().any(|p| &p.id == participant_id) {
            return Err(Error::NotFound(format!("participant {participant_id}")));
        }
        if !record.candidates.iter().any(|c| &c.id == candidate_id) {
            return Err(Error::NotFound(format!("candidate {candidate_id}")));
        }
        if record
            .votes
            .iter()
            .any(|v| &v.participant_id == participant_id && &v.candidate_id == candidate_id)
        {
            return Err(Error::Rejected("Already voted for this candidate".into()));
        }

        let vote = Vote {
            id: vote_id,
            event_id: event_id.clone(),
            participant_id: participant_id.clone(),
            candidate_id: candidate_id.clone(),
        };
        record.votes.push(vote.clone());
        record.broadcast(
            EventKind::VoteCast,
            json!({ "candidate_id": candidate_id, "vote_count": record.vote_count(candidate_id) }),
        );
        Ok(vote)
    }

    async fn remove_vote(
        &self,
        event_id: &EventId,
        participant_id: &ParticipantId,
        vote_id: &VoteId,
    ) -> Result<()> {
        let delay = self.state.write().await.vote_fault()?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        let record = state.record_mut(event_id)?;
        let index = record
            .votes
            .iter()
            .position(|v| &v.id == vote_id && &v.participant_id == participant_id)
            .ok_or_else(|| Error::NotFound(format!("vote {vote_id}")))?;
        let vote = record.votes.remove(index);
        record.broadcast(
            EventKind::VoteRemoved,
            json!({
                "candidate_id": vote.candidate_id,
                "vote_count": record.vote_count(&vote.candidate_id),
            }),
        );
        Ok(())
    }

    async fn update_event(&self, event_id: &EventId, update: EventUpdate) -> Result<Event> {
        if let Some(center) = update.custom_center {
            checked_location(center.lat, center.lng)?;
        }
        let mut state = self.state.write().await;
        let record = state.record_mut(event_id)?;
        let event = &mut record.event;

        if let Some(title) = update.title {
            event.title = title;
        }
        if let Some(visibility) = update.visibility {
            event.visibility = visibility;
        }
        if let Some(allow_vote) = update.allow_vote {
            event.allow_vote = allow_vote;
        }
        if update.clear_custom_center {
            event.custom_center_lat = None;
            event.custom_center_lng = None;
        } else if let Some(center) = update.custom_center {
            event.custom_center_lat = Some(center.lat);
            event.custom_center_lng = Some(center.lng);
        }

        let event = event.clone();
        record.broadcast(
            EventKind::EventUpdated,
            json!({
                "event_id": event_id,
                "visibility": event.visibility,
                "allow_vote": event.allow_vote,
                "custom_center_lat": event.custom_center_lat,
                "custom_center_lng": event.custom_center_lng,
            }),
        );
        Ok(event)
    }

    async fn publish(&self, event_id: &EventId, final_decision: &str) -> Result<Event> {
        if final_decision.trim().is_empty() {
            return Err(Error::Rejected("Final decision must not be empty".into()));
        }
        let mut state = self.state.write().await;
        let record = state.record_mut(event_id)?;
        record.event.final_decision = Some(final_decision.to_owned());
        record.event.allow_vote = false;
        record.broadcast(
            EventKind::EventPublished,
            json!({ "event_id": event_id, "final_decision": final_decision }),
        );
        info!(event_id = %event_id, final_decision, "Event published");
        Ok(record.event.clone())
    }

    async fn unpublish(&self, event_id: &EventId) -> Result<Event> {
        let mut state = self.state.write().await;
        let record = state.record_mut(event_id)?;
        if record.event.final_decision.take().is_none() {
            return Err(Error::Rejected("Event has no final decision".into()));
        }
        let event = record.event.clone();
        record.broadcast(
            EventKind::EventUpdated,
            json!({
                "event_id": event_id,
                "final_decision": null,
                "allow_vote": event.allow_vote,
                "custom_center_lat": event.custom_center_lat,
                "custom_center_lng": event.custom_center_lng,
            }),
        );
        info!(event_id = %event_id, "Final decision withdrawn");
        Ok(event)
    }
}

#[async_trait]
impl VenueSearch for MemoryHub {
    async fn search(&self, event_id: &EventId, query: &SearchQuery) -> Result<SearchResults> {
        if !query.radius_multiplier.is_finite() || query.radius_multiplier <= 0.0 {
            return Err(Error::Rejected(format!(
                "invalid radius multiplier {}",
                query.radius_multiplier
            )));
        }

        let mut state = self.state.write().await;
        let HubState { events, venues, .. } = &mut *state;
        let record = events
            .get_mut(event_id)
            .ok_or_else(|| Error::NotFound(format!("event {event_id}")))?;

        let points: Vec<GeoPoint> = record.participants.iter().map(Participant::geo_point).collect();
        let mec = minimum_enclosing_circle(&points)
            .ok_or_else(|| Error::Rejected("Need at least one participant to search".into()))?;

        let center = query.center.unwrap_or(mec.center);
        let radius_km = mec.radius_km().max(MEC_FLOOR_KM) * query.radius_multiplier;
        let circle = Circle::from_km(center, radius_km);
        let nearby = circle.radius_meters * NEARBY_FACTOR;

        let mut found = Vec::new();
        for venue in venues.iter().filter(|v| v.matches(&query.keyword)) {
            let distance = circle.distance_from_center(&venue.position());
            if distance > nearby {
                continue;
            }
            let in_circle = distance <= circle.radius_meters;
            if query.only_in_circle && !in_circle {
                continue;
            }
            let id = candidate_id(event_id, &venue.place_id);
            if record
                .candidates
                .iter()
                .chain(found.iter())
                .any(|c: &Candidate| c.place_id == venue.place_id || c.id == id)
            {
                continue;
            }
            found.push(Candidate {
                id,
                place_id: venue.place_id.clone(),
                name: venue.name.clone(),
                address: venue.address.clone(),
                lat: venue.lat,
                lng: venue.lng,
                rating: venue.rating,
                user_ratings_total: venue.user_ratings_total,
                distance_from_center: Some(distance),
                in_circle: Some(in_circle),
                vote_count: 0,
                added_by: "system".into(),
                saved: false,
            });
        }

        record.candidates.extend(found.iter().cloned());
        record.broadcast(
            EventKind::CandidatesAdded,
            json!({ "count": found.len(), "keyword": query.keyword }),
        );
        info!(
            event_id = %event_id,
            keyword = %query.keyword,
            radius_km,
            found = found.len(),
            "Venue search"
        );

        Ok(SearchResults {
            candidates: found,
            search_area: SearchArea::from_circle(&circle),
        })
    }
}

#[async_trait]
impl StreamConnector for MemoryHub {
    async fn connect(&self, event_id: &EventId) -> Result<EventStream> {
        let rx = {
            let state = self.state.read().await;
            state.record(event_id)?.tx.subscribe()
        };
        debug!(event_id = %event_id, "Stream opened");

        let connected = StreamMessage::new(EventKind::Connected, json!({ "event_id": event_id }));
        let live = stream::unfold(Some(rx), |rx| async move {
            let Some(mut rx) = rx else {
                return None;
            };
            match rx.recv().await {
                Ok(msg) => Some((Ok(msg), Some(rx))),
                Err(broadcast::error::RecvError::Lagged(skipped)) => Some((
                    Err(Error::Transport(format!("subscriber lagged by {skipped} messages"))),
                    None,
                )),
                Err(broadcast::error::RecvError::Closed) => None,
            }
        });
        Ok(stream::once(async move { Ok(connected) }).chain(live).boxed())
    }
}
