//! Collaborative state synchronizer.
//!
//! Keeps many clients' views of one meeting event consistent:
//!
//! - [`Synchronizer`]: local mirror of participants, candidates and the
//!   participant's own votes, refreshed by full reloads on every push event
//! - [`VoteLedger`]: voted-candidate set plus candidate to vote-id map,
//!   changed only through optimistic toggles with commit/rollback
//! - [`EventStore`], [`VenueSearch`], [`StreamConnector`]: collaborator
//!   contracts
//! - [`MemoryHub`]: in-process implementation of all three
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rendezvous_sync::{
//!     Collaborators, MemoryHub, NewEvent, NewParticipant, SessionContext, SyncConfig,
//!     Synchronizer,
//! };
//! use rendezvous_geometry::LatLng;
//!
//! # async fn demo() -> rendezvous_sync::Result<()> {
//! let hub = Arc::new(MemoryHub::default());
//! let event = hub.create_event(NewEvent::new("Friday dinner")).await;
//!
//! let client = Synchronizer::new(Collaborators::shared(hub), SyncConfig::default(), None);
//! client.enter(SessionContext::participant(event.id, None)).await?;
//! client.join(NewParticipant::at(LatLng::new(51.5, -0.12))).await?;
//! # Ok(())
//! # }
//! ```

mod candidates;
mod config;
mod error;
mod event;
mod ledger;
mod memory;
mod model;
mod session;
mod store;
mod synchronizer;

pub use candidates::{annotate_candidates, sort_candidates, SortMode};
pub use config::{HubConfig, SyncConfig};
pub use error::{Error, Result};
pub use event::{custom_center_from, EventKind, FastPath, Reaction, StreamMessage};
pub use ledger::{Optimistic, VoteLedger, VoteMutation};
pub use memory::{MemoryHub, Venue};
pub use model::{
    Candidate, CandidateId, Event, EventId, EventUpdate, NewCandidate, NewEvent, NewParticipant,
    Participant, ParticipantId, Visibility, Vote, VoteId,
};
pub use session::{Role, SessionContext};
pub use store::{EventStore, EventStream, SearchResults, StreamConnector, VenueSearch};
pub use synchronizer::{Collaborators, Mirror, Notice, Synchronizer, VoteOutcome};
