//! Collaborative state synchronizer.
//!
//! Mirrors one event's participants, candidates and the local participant's
//! votes. The mirror is refreshed by a full reload after every push event and
//! after every successful mutation. Votes are toggled optimistically through
//! the [`VoteLedger`] and rolled back when the collaborator refuses them.
//!
//! # Push stream
//!
//! ```text
//! enter(session) ──▶ connect ──▶ frame ──▶ dispatch table ──▶ reload
//!                       ▲           │
//!                       │      error / end
//!                       └── sleep(reconnect_delay)
//! ```
//!
//! At most one subscription task runs per synchronizer. Reconnects happen
//! inside that task, one after another, so there is never more than one
//! pending. Entering another event aborts the task before opening a new one.
//!
//! Reloads are not serialized against each other or against in-flight votes:
//! whichever reload finishes last defines the mirror.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use rendezvous_area::{AreaHandle, SearchQuery};
use rendezvous_geometry::{Circle, GeoPoint, LatLng};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::candidates::{annotate_candidates, sort_candidates, SortMode};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::event::{custom_center_from, FastPath, StreamMessage};
use crate::ledger::{VoteLedger, VoteMutation};
use crate::model::{
    Candidate, CandidateId, Event, EventId, EventUpdate, NewCandidate, NewParticipant, Participant,
    ParticipantId, VoteId,
};
use crate::session::{Role, SessionContext};
use crate::store::{EventStore, SearchResults, StreamConnector, VenueSearch};

/// The external services a synchronizer talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn EventStore>,
    pub search: Arc<dyn VenueSearch>,
    pub streams: Arc<dyn StreamConnector>,
}

impl Collaborators {
    pub fn new(
        store: Arc<dyn EventStore>,
        search: Arc<dyn VenueSearch>,
        streams: Arc<dyn StreamConnector>,
    ) -> Self {
        Self {
            store,
            search,
            streams,
        }
    }

    /// Use one value for all three roles.
    pub fn shared<T>(collaborator: Arc<T>) -> Self
    where
        T: EventStore + VenueSearch + StreamConnector + 'static,
    {
        Self {
            store: collaborator.clone(),
            search: collaborator.clone(),
            streams: collaborator,
        }
    }
}

/// User-visible, non-fatal notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A vote toggle was refused and rolled back.
    VoteFailed {
        candidate_id: CandidateId,
        reason: String,
    },
    /// A non-vote action failed; nothing local changed.
    ActionFailed { action: String, reason: String },
    /// A reload failed; the mirror keeps its previous contents.
    ReloadFailed { reason: String },
    /// The host published a final decision.
    Published { final_decision: String },
}

/// Result of a successful vote toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Cast(VoteId),
    Removed,
}

/// Local copy of one event's collaborative state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Mirror {
    pub event: Option<Event>,
    pub participants: Vec<Participant>,
    pub candidates: Vec<Candidate>,
    pub votes: VoteLedger,
}

impl Mirror {
    /// Actual participant locations, for geometry.
    pub fn participant_points(&self) -> Vec<GeoPoint> {
        self.participants.iter().map(Participant::geo_point).collect()
    }

    pub fn custom_center(&self) -> Option<LatLng> {
        self.event.as_ref().and_then(Event::custom_center)
    }

    /// Candidates in presentation order. When `circle` is given, distance
    /// and membership are measured against it instead of the search circle.
    pub fn sorted_candidates(&self, mode: SortMode, circle: Option<&Circle>) -> Vec<Candidate> {
        let mut candidates = self.candidates.clone();
        if let Some(circle) = circle {
            annotate_candidates(&mut candidates, circle);
        }
        sort_candidates(&mut candidates, mode);
        candidates
    }
}

struct Inner {
    config: SyncConfig,
    collaborators: Collaborators,
    area: Option<AreaHandle>,
    session: RwLock<Option<SessionContext>>,
    mirror: RwLock<Mirror>,
    notices: broadcast::Sender<Notice>,
    reloads: AtomicU64,
    connections: AtomicU64,
}

/// Keeps one client's view of an event in step with the collaborators.
pub struct Synchronizer {
    inner: Arc<Inner>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl Synchronizer {
    /// Create a synchronizer. When `area` is given, every reload forwards the
    /// actual participant locations and the custom center to it.
    pub fn new(collaborators: Collaborators, config: SyncConfig, area: Option<AreaHandle>) -> Self {
        let (notices, _) = broadcast::channel(config.notice_capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                collaborators,
                area,
                session: RwLock::new(None),
                mirror: RwLock::new(Mirror::default()),
                notices,
                reloads: AtomicU64::new(0),
                connections: AtomicU64::new(0),
            }),
            subscription: Mutex::new(None),
        }
    }

    /// Start viewing an event: reset local state, open the push stream and
    /// load everything.
    pub async fn enter(&self, session: SessionContext) -> Result<()> {
        self.close_subscription().await;
        let event_id = session.event_id.clone();
        info!(event_id = %event_id, role = ?session.role, "Entering event");

        *self.inner.session.write().await = Some(session);
        *self.inner.mirror.write().await = Mirror::default();
        self.inner.reset_area().await;

        self.open_subscription(event_id).await;
        self.inner.reload().await
    }

    /// Stop viewing the current event and drop the session.
    pub async fn leave(&self) {
        self.close_subscription().await;
        if let Some(session) = self.inner.session.write().await.take() {
            info!(event_id = %session.event_id, "Left event");
        }
        *self.inner.mirror.write().await = Mirror::default();
        self.inner.reset_area().await;
    }

    pub async fn session(&self) -> Option<SessionContext> {
        self.inner.session.read().await.clone()
    }

    /// Copy of the current mirror.
    pub async fn mirror(&self) -> Mirror {
        self.inner.mirror.read().await.clone()
    }

    pub async fn votes(&self) -> VoteLedger {
        self.inner.mirror.read().await.votes.clone()
    }

    /// Sorted candidates, annotated against the reconciler's effective
    /// circle when one is attached and showing.
    pub async fn candidates(&self, mode: SortMode) -> Vec<Candidate> {
        let circle = self
            .inner
            .area
            .as_ref()
            .and_then(|area| area.snapshot().effective_circle());
        self.inner
            .mirror
            .read()
            .await
            .sorted_candidates(mode, circle.as_ref())
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    /// Completed reloads so far.
    pub fn reload_count(&self) -> u64 {
        self.inner.reloads.load(Ordering::Relaxed)
    }

    /// Successful stream connections so far, reconnects included.
    pub fn connection_count(&self) -> u64 {
        self.inner.connections.load(Ordering::Relaxed)
    }

    /// Fetch participants, candidates and votes from the store.
    pub async fn reload(&self) -> Result<()> {
        self.inner.reload().await
    }

    /// Join the current event and remember the participant id.
    pub async fn join(&self, participant: NewParticipant) -> Result<Participant> {
        let session = self.inner.current_session().await?;
        let store = &self.inner.collaborators.store;
        let joined = self
            .inner
            .mutate("join", store.join(&session.event_id, participant))
            .await?;

        if let Some(current) = self.inner.session.write().await.as_mut() {
            if current.event_id == session.event_id {
                current.participant_id = Some(joined.id.clone());
            }
        }
        self.inner.reload_logged().await;
        Ok(joined)
    }

    /// Move the local participant.
    pub async fn update_location(&self, location: LatLng) -> Result<Participant> {
        let session = self.inner.current_session().await?;
        let participant = session.participant_id.ok_or(Error::NoParticipant)?;
        let store = &self.inner.collaborators.store;
        let updated = self
            .inner
            .mutate(
                "update_location",
                store.update_location(&session.event_id, &participant, location),
            )
            .await?;
        self.inner.reload_logged().await;
        Ok(updated)
    }

    /// Withdraw the local participant from the event. The session stays open.
    pub async fn withdraw(&self) -> Result<()> {
        let session = self.inner.current_session().await?;
        let participant = session.participant_id.ok_or(Error::NoParticipant)?;
        let store = &self.inner.collaborators.store;
        self.inner
            .mutate("leave", store.leave(&session.event_id, &participant))
            .await?;

        if let Some(current) = self.inner.session.write().await.as_mut() {
            if current.event_id == session.event_id {
                current.participant_id = None;
            }
        }
        self.inner.reload_logged().await;
        Ok(())
    }

    /// Remove any participant from the event. Host only.
    pub async fn remove_participant(&self, participant: &ParticipantId) -> Result<()> {
        let session = self.inner.current_session().await?;
        if !session.is_host() {
            return Err(Error::NotHost("remove participants"));
        }
        let store = &self.inner.collaborators.store;
        self.inner
            .mutate(
                "remove_participant",
                store.leave(&session.event_id, participant),
            )
            .await?;
        info!(event_id = %session.event_id, participant_id = %participant, "Participant removed");

        if let Some(current) = self.inner.session.write().await.as_mut() {
            if current.event_id == session.event_id
                && current.participant_id.as_ref() == Some(participant)
            {
                current.participant_id = None;
            }
        }
        self.inner.reload_logged().await;
        Ok(())
    }

    /// Build the search request from the reconciler when one is attached.
    async fn search_query(&self, keyword: &str, only_in_circle: bool) -> SearchQuery {
        if let Some(area) = &self.inner.area {
            match area.search_query(keyword, only_in_circle).await {
                Ok(query) => return query,
                Err(e) => warn!(error = %e, "Area reconciler unavailable for search"),
            }
        }
        SearchQuery {
            keyword: keyword.to_owned(),
            radius_multiplier: 1.0,
            center: self.inner.mirror.read().await.custom_center(),
            only_in_circle,
        }
    }

    /// Search venues around the effective circle and install the returned
    /// circle as authoritative.
    pub async fn search(&self, keyword: &str, only_in_circle: bool) -> Result<SearchResults> {
        let session = self.inner.current_session().await?;
        let query = self.search_query(keyword, only_in_circle).await;
        debug!(keyword, multiplier = query.radius_multiplier, "Searching venues");

        let search = &self.inner.collaborators.search;
        let results = self
            .inner
            .mutate("search", search.search(&session.event_id, &query))
            .await?;

        if let Some(area) = &self.inner.area {
            if let Err(e) = area.search_completed(results.search_area.clone()).await {
                warn!(error = %e, "Area reconciler unavailable");
            }
        }
        self.inner.reload_logged().await;
        Ok(results)
    }

    pub async fn add_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let session = self.inner.current_session().await?;
        let added_by = match session.role {
            Role::Host => "organizer",
            Role::Participant => "participant",
        };
        let store = &self.inner.collaborators.store;
        let added = self
            .inner
            .mutate(
                "add_candidate",
                store.add_candidate(&session.event_id, candidate, added_by),
            )
            .await?;
        self.inner.reload_logged().await;
        Ok(added)
    }

    pub async fn remove_candidate(&self, candidate: &CandidateId) -> Result<()> {
        let session = self.inner.current_session().await?;
        let store = &self.inner.collaborators.store;
        self.inner
            .mutate(
                "remove_candidate",
                store.remove_candidate(&session.event_id, candidate),
            )
            .await?;
        self.inner.reload_logged().await;
        Ok(())
    }

    /// Save or unsave a candidate.
    pub async fn set_saved(&self, candidate: &CandidateId, saved: bool) -> Result<Candidate> {
        let session = self.inner.current_session().await?;
        let store = &self.inner.collaborators.store;
        let updated = self
            .inner
            .mutate(
                "set_saved",
                store.set_saved(&session.event_id, candidate, saved),
            )
            .await?;
        self.inner.reload_logged().await;
        Ok(updated)
    }

    /// Apply a host edit to the event.
    pub async fn update_event(&self, update: EventUpdate) -> Result<Event> {
        let session = self.inner.current_session().await?;
        let store = &self.inner.collaborators.store;
        let event = self
            .inner
            .mutate("update_event", store.update_event(&session.event_id, update))
            .await?;
        self.inner.reload_logged().await;
        Ok(event)
    }

    /// Set or clear the host-chosen center.
    pub async fn set_custom_center(&self, center: Option<LatLng>) -> Result<Event> {
        self.update_event(EventUpdate::custom_center(center)).await
    }

    /// Publish the final decision, locking votes.
    pub async fn publish(&self, final_decision: &str) -> Result<Event> {
        let session = self.inner.current_session().await?;
        let store = &self.inner.collaborators.store;
        let event = self
            .inner
            .mutate("publish", store.publish(&session.event_id, final_decision))
            .await?;
        self.inner.reload_logged().await;
        Ok(event)
    }

    /// Withdraw a published decision.
    pub async fn unpublish(&self) -> Result<Event> {
        let session = self.inner.current_session().await?;
        let store = &self.inner.collaborators.store;
        let event = self
            .inner
            .mutate("unpublish", store.unpublish(&session.event_id))
            .await?;
        self.inner.reload_logged().await;
        Ok(event)
    }

    /// Flip the local participant's vote for `candidate`.
    ///
    /// The ledger changes before the network call. On success a reload
    /// follows; on failure the ledger is restored exactly, a
    /// [`Notice::VoteFailed`] is sent and no reload happens.
    pub async fn toggle_vote(&self, candidate: &CandidateId) -> Result<VoteOutcome> {
        let session = self.inner.current_session().await?;
        let participant = session.participant_id.clone().ok_or(Error::NoParticipant)?;
        let op = self.inner.mirror.write().await.votes.apply(candidate)?;

        let store = &self.inner.collaborators.store;
        let result = match op.mutation() {
            VoteMutation::Cast => store
                .cast_vote(&session.event_id, &participant, candidate)
                .await
                .map(|vote| Some(vote.id)),
            VoteMutation::Remove(vote_id) => store
                .remove_vote(&session.event_id, &participant, vote_id)
                .await
                .map(|()| None),
        };

        if !self.inner.is_current(&session.event_id).await {
            // The ledger belongs to another event now
            debug!(candidate = %candidate, "Vote settled after leaving event");
            drop(op);
            return result.map(|id| id.map_or(VoteOutcome::Removed, VoteOutcome::Cast));
        }

        match result {
            Ok(vote_id) => {
                let outcome = vote_id
                    .clone()
                    .map_or(VoteOutcome::Removed, VoteOutcome::Cast);
                self.inner.mirror.write().await.votes.commit(op, vote_id);
                debug!(candidate = %candidate, ?outcome, "Vote committed");
                self.inner.reload_logged().await;
                Ok(outcome)
            }
            Err(e) => {
                self.inner.mirror.write().await.votes.rollback(op);
                warn!(candidate = %candidate, error = %e, "Vote failed, rolled back");
                self.inner.notify(Notice::VoteFailed {
                    candidate_id: candidate.clone(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn open_subscription(&self, event_id: EventId) {
        let mut slot = self.subscription.lock().await;
        if let Some(previous) = slot.take() {
            stop(previous).await;
        }
        let inner = Arc::clone(&self.inner);
        *slot = Some(tokio::spawn(async move { inner.subscribe(event_id).await }));
    }

    async fn close_subscription(&self) {
        let task = self.subscription.lock().await.take();
        if let Some(task) = task {
            stop(task).await;
            debug!("Subscription closed");
        }
    }
}

/// Abort a subscription task and wait until its stream has been dropped.
async fn stop(task: JoinHandle<()>) {
    task.abort();
    match task.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => {}
        Err(e) => warn!(error = %e, "Subscription task failed"),
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.subscription.try_lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

impl Inner {
    async fn current_session(&self) -> Result<SessionContext> {
        self.session.read().await.clone().ok_or(Error::NoSession)
    }

    async fn is_current(&self, event_id: &EventId) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|s| &s.event_id == event_id)
    }

    fn notify(&self, notice: Notice) {
        // No receivers is fine
        let _ = self.notices.send(notice);
    }

    /// Await a collaborator call; report failure without touching the mirror.
    async fn mutate<T, F>(&self, action: &'static str, call: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        match call.await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(action, error = %e, "Action failed");
                self.notify(Notice::ActionFailed {
                    action: action.to_owned(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn reload(&self) -> Result<()> {
        let session = self.current_session().await?;
        let event_id = &session.event_id;
        let store = &self.collaborators.store;

        let votes = async {
            match &session.participant_id {
                Some(participant) => store.votes(event_id, participant).await,
                None => Ok(Vec::new()),
            }
        };
        let (event, participants, candidates, votes) = tokio::try_join!(
            store.event(event_id),
            store.participants(event_id),
            store.candidates(event_id),
            votes,
        )?;

        if !self.is_current(event_id).await {
            debug!(event_id = %event_id, "Discarding reload for a previous event");
            return Ok(());
        }

        let published = {
            let mut mirror = self.mirror.write().await;
            let was_locked = mirror.event.as_ref().is_some_and(Event::is_locked);
            let published = match &event.final_decision {
                Some(decision) if !was_locked => Some(decision.clone()),
                _ => None,
            };
            mirror.event = Some(event);
            mirror.participants = participants;
            mirror.candidates = candidates;
            mirror.votes.replace(&votes);
            published
        };

        let count = self.reloads.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(event_id = %event_id, reloads = count, "Mirror reloaded");

        if let Some(final_decision) = published {
            info!(event_id = %event_id, %final_decision, "Final decision published");
            self.notify(Notice::Published { final_decision });
        }
        self.forward_to_area().await;
        Ok(())
    }

    async fn reload_logged(&self) {
        if let Err(e) = self.reload().await {
            warn!(error = %e, "Reload failed");
            self.notify(Notice::ReloadFailed {
                reason: e.to_string(),
            });
        }
    }

    async fn forward_to_area(&self) {
        let Some(area) = &self.area else {
            return;
        };
        let (points, center) = {
            let mirror = self.mirror.read().await;
            (mirror.participant_points(), mirror.custom_center())
        };
        let forwarded = async {
            area.set_locations(points).await?;
            area.set_custom_center(center).await
        };
        if let Err(e) = forwarded.await {
            warn!(error = %e, "Area reconciler unavailable");
        }
    }

    async fn reset_area(&self) {
        if let Some(area) = &self.area {
            if let Err(e) = area.reset().await {
                warn!(error = %e, "Area reconciler unavailable");
            }
        }
    }

    /// Stream loop: connect, dispatch frames, and after any error or end of
    /// stream wait the fixed delay before connecting again.
    async fn subscribe(self: Arc<Self>, event_id: EventId) {
        loop {
            match self.collaborators.streams.connect(&event_id).await {
                Ok(mut stream) => {
                    let n = self.connections.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(event_id = %event_id, connections = n, "Stream connected");
                    while let Some(frame) = stream.next().await {
                        match frame {
                            Ok(message) => self.dispatch(message).await,
                            Err(e) => {
                                warn!(event_id = %event_id, error = %e, "Stream error");
                                break;
                            }
                        }
                    }
                }
                Err(e) => warn!(event_id = %event_id, error = %e, "Stream connect failed"),
            }

            warn!(
                event_id = %event_id,
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Stream lost, reconnecting"
            );
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    async fn dispatch(&self, message: StreamMessage) {
        let Some(kind) = message.kind() else {
            debug!(event = %message.event, "Ignoring unknown stream event");
            return;
        };
        let reaction = kind.reaction();
        trace!(%kind, "Stream event");

        if let Some(FastPath::CustomCenter) = reaction.fast_path {
            if let (Some(area), Some(center)) = (&self.area, custom_center_from(&message.data)) {
                if let Err(e) = area.set_custom_center(center).await {
                    warn!(error = %e, "Area reconciler unavailable");
                }
            }
        }
        if reaction.reload {
            self.reload_logged().await;
        }
    }
}
