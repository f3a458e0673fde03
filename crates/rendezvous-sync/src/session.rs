//! Explicit per-event session context.

use serde::{Deserialize, Serialize};

use crate::model::{EventId, ParticipantId};

/// Role of the local user in the viewed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Participant,
}

/// Who is looking at which event.
///
/// Created on event entry and dropped on exit. The participant id is filled
/// in once the user joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub event_id: EventId,
    pub participant_id: Option<ParticipantId>,
    pub role: Role,
}

impl SessionContext {
    pub fn host(event_id: impl Into<EventId>) -> Self {
        Self {
            event_id: event_id.into(),
            participant_id: None,
            role: Role::Host,
        }
    }

    pub fn participant(event_id: impl Into<EventId>, participant_id: Option<ParticipantId>) -> Self {
        Self {
            event_id: event_id.into(),
            participant_id,
            role: Role::Participant,
        }
    }

    #[must_use]
    pub fn with_participant(mut self, participant_id: ParticipantId) -> Self {
        self.participant_id = Some(participant_id);
        self
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }
}
