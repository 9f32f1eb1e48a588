//! Optimistic vote bookkeeping.
//!
//! A vote shows up immediately; the overlay shadows the server's numbers for
//! that entity until a refresh replaces them or the request fails and the
//! prior value is restored.

use std::collections::HashMap;
use std::hash::Hash;

use crate::types::VoteTally;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    /// The API accepted the vote and returned these totals.
    Confirmed(VoteTally),
    /// Sent, no answer yet. `prior` is what the server last said.
    PendingOptimistic { prior: VoteTally, shown: VoteTally },
}

impl VoteState {
    fn shown(&self) -> VoteTally {
        match *self {
            VoteState::Confirmed(t) => t,
            VoteState::PendingOptimistic { shown, .. } => shown,
        }
    }
}

/// Clicking the current vote again clears it.
pub fn toggle(base: VoteTally, vote: i8) -> VoteTally {
    let vote = vote.signum();
    if vote == 0 || base.my_vote == vote {
        VoteTally {
            score: base.score - i64::from(base.my_vote),
            my_vote: 0,
        }
    } else {
        VoteTally {
            score: base.score - i64::from(base.my_vote) + i64::from(vote),
            my_vote: vote,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoteOverlay<K> {
    entries: HashMap<K, VoteState>,
}

impl<K: Eq + Hash> VoteOverlay<K> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// What to display for `id`, given the server's last known tally.
    pub fn view(&self, id: &K, server: VoteTally) -> VoteTally {
        self.entries.get(id).map(VoteState::shown).unwrap_or(server)
    }

    pub fn state(&self, id: &K) -> Option<VoteState> {
        self.entries.get(id).copied()
    }

    pub fn is_pending(&self, id: &K) -> bool {
        matches!(self.entries.get(id), Some(VoteState::PendingOptimistic { .. }))
    }

    /// Record a vote before the API answers; returns the tally to show.
    /// A second vote while one is pending keeps the original prior.
    pub fn apply_optimistic(&mut self, id: K, server: VoteTally, vote: i8) -> VoteTally {
        let (prior, base) = match self.entries.get(&id) {
            Some(VoteState::PendingOptimistic { prior, shown }) => (*prior, *shown),
            Some(VoteState::Confirmed(t)) => (*t, *t),
            None => (server, server),
        };
        let shown = toggle(base, vote);
        self.entries
            .insert(id, VoteState::PendingOptimistic { prior, shown });
        shown
    }

    /// The API answered with new totals.
    pub fn confirm(&mut self, id: K, tally: VoteTally) {
        self.entries.insert(id, VoteState::Confirmed(tally));
    }

    /// The API failed: drop the overlay and return the tally to fall back to.
    pub fn rollback(&mut self, id: &K) -> Option<VoteTally> {
        match self.entries.remove(id)? {
            VoteState::PendingOptimistic { prior, .. } => Some(prior),
            VoteState::Confirmed(t) => Some(t),
        }
    }

    /// A full refresh arrived; server values are authoritative again.
    pub fn settle(&mut self, id: &K) {
        if !self.is_pending(id) {
            self.entries.remove(id);
        }
    }

    pub fn clear(&mut self) {
        self.entries.retain(|_, s| matches!(s, VoteState::PendingOptimistic { .. }));
    }
}

impl<K: Eq + Hash> Default for VoteOverlay<K> {
    fn default() -> Self {
        Self::new()
    }
}
