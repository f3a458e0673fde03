//! Client-side vote ledger.
//!
//! Tracks which candidates the local participant has voted for and the
//! server vote id behind each. Mutated only through [`VoteLedger::apply`],
//! which flips membership optimistically and hands back an [`Optimistic`]
//! token that must be settled with [`VoteLedger::commit`] or
//! [`VoteLedger::rollback`].
//!
//! At rest every voted candidate has a vote id. The one exception is a cast
//! still in flight, whose id is only known once the server confirms it.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{CandidateId, Vote, VoteId};

/// Network call implied by a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteMutation {
    Cast,
    Remove(VoteId),
}

/// Pending optimistic toggle. Holds the prior state needed to undo it.
#[derive(Debug)]
#[must_use = "an optimistic toggle must be committed or rolled back"]
pub struct Optimistic {
    candidate: CandidateId,
    mutation: VoteMutation,
    prior_vote_id: Option<VoteId>,
    prior_voted: bool,
}

impl Optimistic {
    pub fn candidate(&self) -> &CandidateId {
        &self.candidate
    }

    pub fn mutation(&self) -> &VoteMutation {
        &self.mutation
    }
}

/// Voted candidate ids plus the candidate to vote-id map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VoteLedger {
    voted: HashSet<CandidateId>,
    vote_ids: HashMap<CandidateId, VoteId>,
    #[serde(skip)]
    in_flight: HashSet<CandidateId>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_voted(&self, candidate: &CandidateId) -> bool {
        self.voted.contains(candidate)
    }

    pub fn vote_id(&self, candidate: &CandidateId) -> Option<&VoteId> {
        self.vote_ids.get(candidate)
    }

    pub fn voted(&self) -> &HashSet<CandidateId> {
        &self.voted
    }

    pub fn vote_ids(&self) -> &HashMap<CandidateId, VoteId> {
        &self.vote_ids
    }

    pub fn is_in_flight(&self, candidate: &CandidateId) -> bool {
        self.in_flight.contains(candidate)
    }

    pub fn len(&self) -> usize {
        self.voted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voted.is_empty()
    }

    /// Flip `candidate` locally and return the mutation to send.
    ///
    /// Refuses a second toggle for the same candidate until the first one
    /// settles, so two casts can never be issued back to back.
    pub fn apply(&mut self, candidate: &CandidateId) -> Result<Optimistic> {
        if self.in_flight.contains(candidate) {
            return Err(Error::VoteInFlight(candidate.clone()));
        }

        let prior_voted = self.voted.contains(candidate);
        let prior_vote_id = self.vote_ids.get(candidate).cloned();

        let mutation = if prior_voted {
            let vote_id = prior_vote_id
                .clone()
                .ok_or_else(|| Error::UnknownVote(candidate.clone()))?;
            self.voted.remove(candidate);
            self.vote_ids.remove(candidate);
            VoteMutation::Remove(vote_id)
        } else {
            // The vote id arrives with the server's confirmation
            self.voted.insert(candidate.clone());
            VoteMutation::Cast
        };

        self.in_flight.insert(candidate.clone());
        debug!(candidate = %candidate, ?mutation, "Optimistic vote toggle");

        Ok(Optimistic {
            candidate: candidate.clone(),
            mutation,
            prior_vote_id,
            prior_voted,
        })
    }

    /// Settle a toggle the server accepted. `vote_id` is the id of a new cast.
    pub fn commit(&mut self, op: Optimistic, vote_id: Option<VoteId>) {
        self.in_flight.remove(&op.candidate);
        match op.mutation {
            VoteMutation::Cast => {
                self.voted.insert(op.candidate.clone());
                if let Some(vote_id) = vote_id {
                    self.vote_ids.insert(op.candidate, vote_id);
                }
            }
            VoteMutation::Remove(_) => {
                self.voted.remove(&op.candidate);
                self.vote_ids.remove(&op.candidate);
            }
        }
    }

    /// Undo a toggle the server refused, restoring the exact prior entry.
    pub fn rollback(&mut self, op: Optimistic) {
        self.in_flight.remove(&op.candidate);
        if op.prior_voted {
            self.voted.insert(op.candidate.clone());
        } else {
            self.voted.remove(&op.candidate);
        }
        match op.prior_vote_id {
            Some(vote_id) => {
                self.vote_ids.insert(op.candidate, vote_id);
            }
            None => {
                self.vote_ids.remove(&op.candidate);
            }
        }
    }

    /// Replace the ledger with the server's view. Pending toggles stay
    /// pending; the latest reload wins over their optimistic flips.
    pub fn replace(&mut self, votes: &[Vote]) {
        self.voted = votes.iter().map(|v| v.candidate_id.clone()).collect();
        self.vote_ids = votes
            .iter()
            .map(|v| (v.candidate_id.clone(), v.id.clone()))
            .collect();
    }

    /// Forget everything, including pending toggles.
    pub fn clear(&mut self) {
        self.voted.clear();
        self.vote_ids.clear();
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventId, ParticipantId};

    fn cand(id: &str) -> CandidateId {
        CandidateId::new(id)
    }

    fn vote(id: &str, candidate: &str) -> Vote {
        Vote {
            id: VoteId::new(id),
            event_id: EventId::new("e1"),
            participant_id: ParticipantId::new("p1"),
            candidate_id: cand(candidate),
        }
    }

    #[test]
    fn cast_then_commit_records_vote_id() {
        let mut ledger = VoteLedger::new();
        let op = ledger.apply(&cand("c1")).unwrap();
        assert_eq!(op.mutation(), &VoteMutation::Cast);
        assert!(ledger.has_voted(&cand("c1")));
        assert!(ledger.vote_id(&cand("c1")).is_none());

        ledger.commit(op, Some(VoteId::new("v1")));
        assert_eq!(ledger.vote_id(&cand("c1")), Some(&VoteId::new("v1")));
        assert!(!ledger.is_in_flight(&cand("c1")));
    }

    #[test]
    fn vote_then_unvote_restores_prior_state() {
        let mut ledger = VoteLedger::new();
        ledger.replace(&[vote("v9", "other")]);
        let before = ledger.clone();

        let op = ledger.apply(&cand("c1")).unwrap();
        ledger.commit(op, Some(VoteId::new("v1")));
        let op = ledger.apply(&cand("c1")).unwrap();
        assert_eq!(op.mutation(), &VoteMutation::Remove(VoteId::new("v1")));
        ledger.commit(op, None);

        assert_eq!(ledger, before);
    }

    #[test]
    fn rollback_restores_exact_prior_state() {
        let mut ledger = VoteLedger::new();
        ledger.replace(&[vote("v1", "c1"), vote("v2", "c2")]);
        let before = ledger.clone();

        let unvote = ledger.apply(&cand("c1")).unwrap();
        let cast = ledger.apply(&cand("c3")).unwrap();
        assert!(!ledger.has_voted(&cand("c1")));
        assert!(ledger.has_voted(&cand("c3")));

        ledger.rollback(unvote);
        ledger.rollback(cast);
        assert_eq!(ledger, before);
    }

    #[test]
    fn second_toggle_waits_for_first() {
        let mut ledger = VoteLedger::new();
        let op = ledger.apply(&cand("c1")).unwrap();
        assert!(matches!(
            ledger.apply(&cand("c1")),
            Err(Error::VoteInFlight(c)) if c == cand("c1")
        ));
        ledger.commit(op, Some(VoteId::new("v1")));
        assert!(ledger.apply(&cand("c1")).is_ok());
    }

    #[test]
    fn unvote_without_id_is_refused_untouched() {
        let mut ledger = VoteLedger::new();
        let op = ledger.apply(&cand("c1")).unwrap();
        // Server accepted but returned no id
        ledger.commit(op, None);
        let before = ledger.clone();

        assert!(matches!(ledger.apply(&cand("c1")), Err(Error::UnknownVote(_))));
        assert_eq!(ledger, before);
    }

    #[test]
    fn reload_overrides_pending_flip() {
        let mut ledger = VoteLedger::new();
        let op = ledger.apply(&cand("c1")).unwrap();
        ledger.replace(&[]);
        assert!(!ledger.has_voted(&cand("c1")));
        assert!(ledger.is_in_flight(&cand("c1")));

        ledger.commit(op, Some(VoteId::new("v1")));
        assert!(ledger.has_voted(&cand("c1")));
    }

    #[test]
    fn set_and_map_agree_after_reload() {
        let mut ledger = VoteLedger::new();
        ledger.replace(&[vote("v1", "c1"), vote("v2", "c2")]);
        assert_eq!(ledger.len(), 2);
        for candidate in ledger.voted() {
            assert!(ledger.vote_ids().contains_key(candidate));
        }
    }
}
