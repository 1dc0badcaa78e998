//! Messages exchanged between the authority and its observers.
//!
//! Observers never mutate shared state directly. They submit a
//! [`ClientRequest`] and the authority answers, to everyone, with
//! [`ServerEvent`]s describing what actually changed. Every event is an
//! idempotent render of the latest value, so an observer that misses an
//! intermediate event still converges once the next one arrives.

use serde::{Deserialize, Serialize};

use crate::types::{
    Collectible, DisplayName, EntityId, NameEntry, PlayerId, PlayerRecord, SessionPhase, Vec2,
};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// ClientRequest: observer → authority
// ---------------------------------------------------------------------------

/// A request from an observer. None of these are trusted: the authority
/// re-validates each one against its own state before acting.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
///   `{ "type": "RequestPickup", "entity_id": 3, "player_id": 1 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Host → authority: start the session.
    StartSession,

    /// "I touched this collectible." Effective at most once per entity.
    RequestPickup {
        entity_id: EntityId,
        player_id: PlayerId,
    },

    /// Ask the authority to add `delta` to a score.
    RequestScoreIncrease { player_id: PlayerId, delta: u32 },

    /// Owner → authority: replace the replicated display name.
    DisplayNameWrite { player_id: PlayerId, name: DisplayName },
}

// ---------------------------------------------------------------------------
// ServerEvent: authority → observers
// ---------------------------------------------------------------------------

/// Everything an observer needs to rebuild the authority's view.
///
/// Sent once to each newly joined connection so late joiners converge
/// without having seen the events that came before them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub phase: SessionPhase,
    pub remaining_time: f32,
    pub scores: Vec<PlayerRecord>,
    pub names: Vec<NameEntry>,
    pub collectibles: Vec<Collectible>,
    /// Set once the winner has been announced.
    pub winner_text: Option<String>,
}

/// A state change broadcast by the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Sent to a connection right after its handshake.
    Welcome { player_id: PlayerId, host: bool },

    /// Full state, sent to a newly joined connection.
    Snapshot(WorldSnapshot),

    /// Replaces the prior known session state.
    SessionStateChanged { active: bool, remaining_time: f32 },

    /// Full ordered score ledger. Always a replace, never a delta.
    ScoresChanged { records: Vec<PlayerRecord> },

    CollectibleSpawned { entity_id: EntityId, position: Vec2 },

    CollectibleRemoved { entity_id: EntityId, position: Vec2 },

    /// Sent exactly once per session.
    WinnerAnnounced {
        winner: Option<PlayerId>,
        text: String,
    },

    DisplayNameChanged { player_id: PlayerId, name: DisplayName },

    /// The connection is gone; its name no longer resolves.
    PlayerDisconnected { player_id: PlayerId },

    /// The host left and `player_id` is now the earliest connection, so
    /// it may start the session.
    HostChanged { player_id: PlayerId },

    /// A request could not be honoured. `code` follows HTTP conventions.
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// The content of a frame.
///
/// `#[serde(tag = "type", content = "data")]` produces adjacently tagged
/// JSON, e.g. `{ "type": "Request", "data": { "type": "StartSession" } }`,
/// which lets the reader dispatch on the outer tag before looking inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Client → server, first frame on every connection.
    Handshake { version: u32 },
    Request(ClientRequest),
    Event(ServerEvent),
}

/// The top-level wire frame.
///
/// ```text
/// ┌──────────────────────────────┐
/// │ seq: 42                      │  ← per-sender ordering
/// │ timestamp: 15000             │  ← ms since the sender started
/// │ ┌──────────────────────────┐ │
/// │ │ payload: Event(...)      │ │
/// │ └──────────────────────────┘ │
/// └──────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    pub timestamp: u64,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(seq: u64, timestamp: u64, payload: Payload) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}
