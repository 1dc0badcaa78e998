//! The session state machine.
//!
//! ```text
//! Idle ──start_session──▶ Active ──timer reaches 0 / end_session──▶ Ended
//! ```
//!
//! [`SessionController`] owns every piece of authoritative state: the
//! score ledger, the live collectibles and the identity directory. Each
//! operation returns the events the caller must deliver, paired with a
//! [`Recipient`], and never does any I/O itself.

use std::time::Duration;

use coinrush_protocol::{
    Collectible, DisplayName, EntityId, PlayerId, Recipient, ServerEvent, SessionPhase,
    WorldSnapshot,
};
use coinrush_replication::{
    IdentityDirectory, NameLookup, ReplicationError, ScoreReplicator, Winner,
};
use coinrush_tick::Cadence;
use tracing::{debug, info};

use crate::{CollectibleService, PickupOutcome, SessionConfig, SessionError};

/// Events produced by one controller operation, in delivery order.
pub type Outbound = Vec<(Recipient, ServerEvent)>;

/// Text announced when the ledger is empty.
pub const NO_PLAYERS_TEXT: &str = "No Players";

/// Text announced when the winner's connection is gone.
pub const UNKNOWN_WINNER_TEXT: &str = "Unknown player won!";

/// Renders the winner announcement.
pub fn winner_text(winner: &Winner, names: &impl NameLookup) -> String {
    match winner {
        Winner::NoPlayers => NO_PLAYERS_TEXT.to_string(),
        Winner::Player(record) => match names.lookup(record.player_id) {
            Some(name) => format!("{name} won!"),
            None => UNKNOWN_WINNER_TEXT.to_string(),
        },
    }
}

/// The authoritative session.
#[derive(Debug)]
pub struct SessionController {
    config: SessionConfig,
    phase: SessionPhase,
    remaining_time: f32,
    /// Last countdown value broadcast, in tenths of a second.
    shown_tenths: Option<i64>,
    cadence: Cadence,
    scores: ScoreReplicator,
    collectibles: CollectibleService,
    identities: IdentityDirectory,
    winner_text: Option<String>,
}

impl SessionController {
    /// Builds a controller around existing collaborators.
    ///
    /// The config is not checked here; [`start_session`](Self::start_session)
    /// does that, so a bad config leaves the server up with the session
    /// `Idle`.
    pub fn new(
        config: SessionConfig,
        scores: ScoreReplicator,
        collectibles: CollectibleService,
        identities: IdentityDirectory,
    ) -> Self {
        Self {
            config,
            phase: SessionPhase::Idle,
            remaining_time: 0.0,
            shown_tenths: None,
            cadence: Cadence::new(Duration::ZERO),
            scores,
            collectibles,
            identities,
            winner_text: None,
        }
    }

    /// Builds a controller with fresh collaborators.
    pub fn from_config(config: SessionConfig) -> Self {
        let collectibles = CollectibleService::new(config.rng_seed);
        Self::new(
            config,
            ScoreReplicator::new(),
            collectibles,
            IdentityDirectory::new(),
        )
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Starts the session.
    ///
    /// A no-op outside `Idle`. On success the countdown is broadcast and
    /// the first collectible spawns immediately.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if the config cannot run a session.
    /// The phase is left untouched.
    pub fn start_session(&mut self) -> Result<Outbound, SessionError> {
        if self.phase != SessionPhase::Idle {
            debug!(phase = %self.phase, "start_session ignored");
            return Ok(Vec::new());
        }
        self.config.validate()?;

        self.phase = SessionPhase::Active;
        self.remaining_time = self.config.duration_secs;
        self.cadence = Cadence::new(self.config.spawn_interval());
        info!(
            duration_secs = self.config.duration_secs,
            spawn_interval_secs = self.config.spawn_interval_secs,
            players = self.scores.len(),
            "session started"
        );

        let mut out = vec![self.countdown_event()];
        let due = self.cadence.start();
        self.spawn(due, &mut out);
        Ok(out)
    }

    /// Advances the session by `dt`.
    ///
    /// Ends the session once the timer reaches zero; otherwise spawns one
    /// collectible per cadence firing. The countdown is only broadcast when
    /// its one-decimal display changes.
    pub fn tick(&mut self, dt: Duration) -> Outbound {
        if !self.phase.is_active() {
            return Vec::new();
        }

        self.remaining_time -= dt.as_secs_f32();
        if self.remaining_time <= 0.0 {
            self.remaining_time = 0.0;
            return self.end_session();
        }

        let mut out = Vec::new();
        if Some(tenths(self.remaining_time)) != self.shown_tenths {
            out.push(self.countdown_event());
        }
        let due = self.cadence.advance(dt);
        self.spawn(due, &mut out);
        out
    }

    /// Ends the session: stops spawning, sweeps the live collectibles
    /// without credit and announces the winner.
    ///
    /// Idempotent. Ending an `Idle` session does nothing.
    pub fn end_session(&mut self) -> Outbound {
        if !self.phase.is_active() {
            debug!(phase = %self.phase, "end_session ignored");
            return Vec::new();
        }

        self.phase = SessionPhase::Ended;
        self.remaining_time = 0.0;
        self.cadence.cancel();

        let mut out = vec![(
            Recipient::All,
            ServerEvent::SessionStateChanged {
                active: false,
                remaining_time: 0.0,
            },
        )];
        out.extend(
            self.collectibles
                .force_destroy_all()
                .into_iter()
                .map(|c| (Recipient::All, removed(c))),
        );

        let winner = self.scores.winner();
        let text = winner_text(&winner, &self.identities);
        info!(winner = ?winner.player_id(), %text, "session ended");
        self.winner_text = Some(text.clone());
        out.push((
            Recipient::All,
            ServerEvent::WinnerAnnounced {
                winner: winner.player_id(),
                text,
            },
        ));
        out
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Registers a new connection and its score record.
    pub fn player_connected(&mut self, player_id: PlayerId) -> Outbound {
        self.identities.connect(player_id);
        if !self.scores.add_player(player_id) {
            return Vec::new();
        }
        vec![(Recipient::All, self.scores_event())]
    }

    /// Forgets a connection's identity. The score record is kept, so a
    /// disconnected player can still win.
    ///
    /// When the host leaves, the next earliest connection is announced as
    /// the new host.
    pub fn player_disconnected(&mut self, player_id: PlayerId) -> Outbound {
        let previous_host = self.identities.host();
        if !self.identities.disconnect(player_id) {
            return Vec::new();
        }

        let mut out = vec![(Recipient::All, ServerEvent::PlayerDisconnected { player_id })];
        if let Some(host) = self.identities.host().filter(|h| Some(*h) != previous_host) {
            info!(%host, "host changed");
            out.push((Recipient::All, ServerEvent::HostChanged { player_id: host }));
        }
        out
    }

    /// Applies a display-name write sent by connection `source`.
    ///
    /// # Errors
    /// Returns the [`ReplicationError`] when `source` does not own
    /// `target`'s name or `target` is gone. Nothing is broadcast then.
    pub fn write_display_name(
        &mut self,
        source: PlayerId,
        target: PlayerId,
        name: DisplayName,
    ) -> Result<Outbound, ReplicationError> {
        self.identities.write(source, target, name.clone())?;
        Ok(vec![(
            Recipient::All,
            ServerEvent::DisplayNameChanged {
                player_id: target,
                name,
            },
        )])
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    /// Handles a pickup request. Stale requests produce no events.
    pub fn request_pickup(&mut self, entity_id: EntityId, player_id: PlayerId) -> Outbound {
        match self
            .collectibles
            .request_pickup(entity_id, player_id, &mut self.scores)
        {
            PickupOutcome::Stale => Vec::new(),
            PickupOutcome::Collected {
                collectible,
                credited,
            } => {
                let mut out = Vec::with_capacity(2);
                if credited {
                    out.push((Recipient::All, self.scores_event()));
                }
                out.push((Recipient::All, removed(collectible)));
                out
            }
        }
    }

    /// Adds `delta` to a score. Zero deltas and unknown players produce no
    /// events.
    pub fn increase_score(&mut self, player_id: PlayerId, delta: u32) -> Outbound {
        match self.scores.increase_score(player_id, delta) {
            Some(_) => vec![(Recipient::All, self.scores_event())],
            None => Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn remaining_time(&self) -> f32 {
        self.remaining_time
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scores(&self) -> &ScoreReplicator {
        &self.scores
    }

    /// Mutable access, for registering observers.
    pub fn scores_mut(&mut self) -> &mut ScoreReplicator {
        &mut self.scores
    }

    pub fn collectibles(&self) -> &CollectibleService {
        &self.collectibles
    }

    pub fn identities(&self) -> &IdentityDirectory {
        &self.identities
    }

    pub fn identities_mut(&mut self) -> &mut IdentityDirectory {
        &mut self.identities
    }

    pub fn is_spawning(&self) -> bool {
        self.cadence.is_running()
    }

    /// The announcement, once the session has ended.
    pub fn winner_text(&self) -> Option<&str> {
        self.winner_text.as_deref()
    }

    /// Everything a late joiner needs to converge.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            phase: self.phase,
            remaining_time: self.remaining_time,
            scores: self.scores.snapshot(),
            names: self.identities.names(),
            collectibles: self.collectibles.live().copied().collect(),
            winner_text: self.winner_text.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn spawn(&mut self, count: u32, out: &mut Outbound) {
        for _ in 0..count {
            let c = self.collectibles.spawn_one(&self.config.spawn_area);
            out.push((
                Recipient::All,
                ServerEvent::CollectibleSpawned {
                    entity_id: c.entity_id,
                    position: c.position,
                },
            ));
        }
    }

    fn countdown_event(&mut self) -> (Recipient, ServerEvent) {
        self.shown_tenths = Some(tenths(self.remaining_time));
        (
            Recipient::All,
            ServerEvent::SessionStateChanged {
                active: true,
                remaining_time: self.remaining_time,
            },
        )
    }

    fn scores_event(&self) -> ServerEvent {
        ServerEvent::ScoresChanged {
            records: self.scores.snapshot(),
        }
    }
}

fn removed(c: Collectible) -> ServerEvent {
    ServerEvent::CollectibleRemoved {
        entity_id: c.entity_id,
        position: c.position,
    }
}

/// The countdown as displayed with one decimal, in tenths.
fn tenths(secs: f32) -> i64 {
    (secs * 10.0).round() as i64
}
