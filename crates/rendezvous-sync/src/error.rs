//! Error types for the synchronizer and its collaborators.

use thiserror::Error;

use crate::model::CandidateId;

/// Result type for synchronizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the synchronizer or returned by collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Event, participant, candidate or vote does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The collaborator refused the request (voting closed, locked, duplicate)
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Network or stream failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// No event session is open
    #[error("No active session")]
    NoSession,

    /// The session has no participant id yet
    #[error("Session has no participant")]
    NoParticipant,

    /// The action needs the host role
    #[error("Only the host can {0}")]
    NotHost(&'static str),

    /// A vote toggle for this candidate has not settled yet
    #[error("Vote toggle already in flight for {0}")]
    VoteInFlight(CandidateId),

    /// Marked as voted but the server vote id is unknown
    #[error("No vote id known for {0}")]
    UnknownVote(CandidateId),

    /// Malformed stream frame
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
