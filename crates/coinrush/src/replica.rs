//! The observer side: a local mirror of the authority's state.
//!
//! An [`ObserverReplica`] never decides anything. It applies the events it
//! is sent, re-renders through a [`PresentationSink`] and tells the caller
//! which requests to send back (only the owner's display-name write).
//! Events carry whole values, so a replica that joins late or misses some
//! events converges as soon as the next one arrives.

use std::collections::BTreeMap;

use coinrush_protocol::{
    ClientRequest, DisplayName, EntityId, PlayerId, PlayerRecord, ServerEvent, SessionPhase, Vec2,
    WorldSnapshot,
};
use coinrush_replication::{IdentityReplicator, NameLookup};

/// Session text shown before the session starts.
pub const IDLE_TEXT: &str = "Press Enter To Start!";

/// Session text shown after the end, until the winner is announced.
pub const GAME_OVER_TEXT: &str = "Game Over!";

/// One scoreboard row, name already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreLine {
    pub player_id: PlayerId,
    pub name: DisplayName,
    pub score: u32,
}

/// Where an observer draws its UI.
pub trait PresentationSink {
    /// Redraws the whole scoreboard, in ledger order.
    fn render(&mut self, scoreboard: &[ScoreLine]);

    fn render_session_text(&mut self, text: &str);
}

/// A [`PresentationSink`] that writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl PresentationSink for TracingSink {
    fn render(&mut self, scoreboard: &[ScoreLine]) {
        for line in scoreboard {
            tracing::info!(player_id = %line.player_id, name = %line.name, score = line.score, "scoreboard");
        }
    }

    fn render_session_text(&mut self, text: &str) {
        tracing::info!(text, "session");
    }
}

/// An observer's view of the world.
#[derive(Debug)]
pub struct ObserverReplica<P: PresentationSink> {
    local: Option<PlayerId>,
    host: bool,
    local_input_name: String,
    phase: SessionPhase,
    remaining_time: f32,
    winner_text: Option<String>,
    scores: Vec<PlayerRecord>,
    identities: BTreeMap<PlayerId, IdentityReplicator>,
    collectibles: BTreeMap<EntityId, Vec2>,
    sink: P,
}

impl<P: PresentationSink> ObserverReplica<P> {
    /// `local_input_name` is the name this observer's player typed in. It
    /// is written once, when the authority tells us who we are.
    pub fn new(local_input_name: impl Into<String>, sink: P) -> Self {
        Self {
            local: None,
            host: false,
            local_input_name: local_input_name.into(),
            phase: SessionPhase::Idle,
            remaining_time: 0.0,
            winner_text: None,
            scores: Vec::new(),
            identities: BTreeMap::new(),
            collectibles: BTreeMap::new(),
            sink,
        }
    }

    /// Applies one event from the authority and returns the requests the
    /// observer must send in response.
    pub fn apply(&mut self, event: &ServerEvent) -> Vec<ClientRequest> {
        let mut requests = Vec::new();

        match event {
            ServerEvent::Welcome { player_id, host } => {
                self.local = Some(*player_id);
                self.host = *host;
                let name = self.local_input_name.clone();
                requests.extend(self.identity_entry(*player_id).initialize(&name));
            }
            ServerEvent::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            ServerEvent::SessionStateChanged {
                active,
                remaining_time,
            } => {
                // The only inactive broadcast is the end of the session.
                self.phase = if *active {
                    SessionPhase::Active
                } else {
                    SessionPhase::Ended
                };
                self.remaining_time = *remaining_time;
                self.render_session_text();
            }
            ServerEvent::ScoresChanged { records } => {
                self.scores.clone_from(records);
                self.render_scoreboard();
            }
            ServerEvent::CollectibleSpawned {
                entity_id,
                position,
            } => {
                self.collectibles.insert(*entity_id, *position);
            }
            ServerEvent::CollectibleRemoved { entity_id, .. } => {
                self.collectibles.remove(entity_id);
            }
            ServerEvent::WinnerAnnounced { text, .. } => {
                self.phase = SessionPhase::Ended;
                self.winner_text = Some(text.clone());
                self.render_session_text();
            }
            ServerEvent::DisplayNameChanged { player_id, name } => {
                self.identity_entry(*player_id).receive(name.clone());
                self.render_scoreboard();
            }
            ServerEvent::PlayerDisconnected { player_id } => {
                self.identities.remove(player_id);
                self.render_scoreboard();
            }
            ServerEvent::HostChanged { player_id } => {
                self.host = self.local == Some(*player_id);
            }
            ServerEvent::Error { code, message } => {
                tracing::warn!(code, %message, "authority reported an error");
            }
        }

        requests
    }

    /// Replaces everything with the authority's full state.
    fn apply_snapshot(&mut self, snapshot: &WorldSnapshot) {
        self.phase = snapshot.phase;
        self.remaining_time = snapshot.remaining_time;
        self.winner_text.clone_from(&snapshot.winner_text);
        self.scores.clone_from(&snapshot.scores);
        self.collectibles = snapshot
            .collectibles
            .iter()
            .map(|c| (c.entity_id, c.position))
            .collect();

        let local = self.local;
        self.identities.retain(|id, _| {
            Some(*id) == local || snapshot.names.iter().any(|n| n.player_id == *id)
        });
        for entry in &snapshot.names {
            // Our own name is authored locally; the snapshot may predate
            // the authority receiving it.
            if Some(entry.player_id) == local {
                continue;
            }
            self.identity_entry(entry.player_id).receive(entry.name.clone());
        }

        self.render_scoreboard();
        self.render_session_text();
    }

    /// The identity for `player_id`, created and initialized on first use.
    fn identity_entry(&mut self, player_id: PlayerId) -> &mut IdentityReplicator {
        let local = self.local;
        let local_input_name = &self.local_input_name;
        self.identities.entry(player_id).or_insert_with(|| {
            let mut identity = match local {
                Some(local) => IdentityReplicator::replica(player_id, local),
                None => IdentityReplicator::authoritative(player_id),
            };
            if !identity.is_owner() {
                identity.initialize(local_input_name);
            }
            identity
        })
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// The scoreboard as currently known. Players whose connection is gone
    /// are shown as `"Unknown"`.
    pub fn scoreboard(&self) -> Vec<ScoreLine> {
        self.scores
            .iter()
            .map(|r| ScoreLine {
                player_id: r.player_id,
                name: self.resolve(r.player_id),
                score: r.score,
            })
            .collect()
    }

    pub fn session_text(&self) -> String {
        match self.phase {
            SessionPhase::Idle => IDLE_TEXT.to_string(),
            SessionPhase::Active => format!("{:.1}", self.remaining_time),
            SessionPhase::Ended => self
                .winner_text
                .clone()
                .unwrap_or_else(|| GAME_OVER_TEXT.to_string()),
        }
    }

    fn render_scoreboard(&mut self) {
        let scoreboard = self.scoreboard();
        self.sink.render(&scoreboard);
    }

    fn render_session_text(&mut self) {
        let text = self.session_text();
        self.sink.render_session_text(&text);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Our own connection, once welcomed.
    pub fn player_id(&self) -> Option<PlayerId> {
        self.local
    }

    pub fn is_host(&self) -> bool {
        self.host
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn remaining_time(&self) -> f32 {
        self.remaining_time
    }

    pub fn winner_text(&self) -> Option<&str> {
        self.winner_text.as_deref()
    }

    pub fn scores(&self) -> &[PlayerRecord] {
        &self.scores
    }

    pub fn collectibles(&self) -> impl Iterator<Item = (EntityId, Vec2)> + '_ {
        self.collectibles.iter().map(|(id, pos)| (*id, *pos))
    }

    pub fn identity(&self, player_id: PlayerId) -> Option<&IdentityReplicator> {
        self.identities.get(&player_id)
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }
}

impl<P: PresentationSink> NameLookup for ObserverReplica<P> {
    fn lookup(&self, player_id: PlayerId) -> Option<DisplayName> {
        self.identities
            .get(&player_id)
            .map(|identity| identity.display_name().clone())
    }
}
