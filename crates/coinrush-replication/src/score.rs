//! The canonical score ledger.
//!
//! Only the authority holds a [`ScoreReplicator`]. Observers receive the
//! full ordered ledger after every committed mutation and replace their
//! copy wholesale, so they never have to merge deltas.

use coinrush_protocol::{PlayerId, PlayerRecord};
use tracing::{debug, trace};

use crate::observer::{Observers, SubscriptionId};

/// Result of [`ScoreReplicator::winner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    /// The ledger is empty.
    NoPlayers,
    Player(PlayerRecord),
}

impl Winner {
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Self::NoPlayers => None,
            Self::Player(record) => Some(record.player_id),
        }
    }
}

/// Server-owned list of per-player score records, in connection order.
#[derive(Debug, Default)]
pub struct ScoreReplicator {
    records: Vec<PlayerRecord>,
    observers: Observers<[PlayerRecord]>,
}

impl ScoreReplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a zero-score record. Returns `false` (and changes nothing)
    /// if the player already has one.
    pub fn add_player(&mut self, player_id: PlayerId) -> bool {
        if self.contains(player_id) {
            trace!(%player_id, "duplicate add_player ignored");
            return false;
        }
        self.records.push(PlayerRecord::new(player_id));
        debug!(%player_id, players = self.records.len(), "score record added");
        self.observers.notify(&self.records);
        true
    }

    /// Adds `delta` to a player's score, saturating at `u32::MAX`.
    ///
    /// Returns the new score, or `None` when `delta` is zero or the player
    /// has no record. Observers are only notified on success.
    pub fn increase_score(&mut self, player_id: PlayerId, delta: u32) -> Option<u32> {
        if delta == 0 {
            return None;
        }
        let record = self
            .records
            .iter_mut()
            .find(|record| record.player_id == player_id)?;
        record.score = record.score.saturating_add(delta);
        let score = record.score;
        debug!(%player_id, delta, score, "score increased");
        self.observers.notify(&self.records);
        Some(score)
    }

    /// The highest score. Ties go to the record inserted first.
    pub fn winner(&self) -> Winner {
        let mut best: Option<&PlayerRecord> = None;
        for record in &self.records {
            match best {
                Some(current) if record.score <= current.score => {}
                _ => best = Some(record),
            }
        }
        best.map_or(Winner::NoPlayers, |record| Winner::Player(*record))
    }

    pub fn score_of(&self, player_id: PlayerId) -> Option<u32> {
        self.records
            .iter()
            .find(|record| record.player_id == player_id)
            .map(|record| record.score)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.records.iter().any(|record| record.player_id == player_id)
    }

    pub fn records(&self) -> &[PlayerRecord] {
        &self.records
    }

    /// An owned copy of the ledger, suitable for a broadcast.
    pub fn snapshot(&self) -> Vec<PlayerRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registers a callback that receives the full ledger after every
    /// committed mutation.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&[PlayerRecord]) + Send + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}
