//! Core domain types shared by the authority and its observers.
//!
//! Everything here travels on the wire at some point, either inside a
//! request, an event, or a full world snapshot. Identifiers are newtypes
//! so a `PlayerId` can never be passed where an `EntityId` is expected,
//! even though both are `u64` underneath.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of a player connection.
///
/// Assigned by the server from a monotonically increasing counter, so
/// ordering by `PlayerId` is the same as ordering by connection time.
///
/// `#[serde(transparent)]` keeps the JSON form a plain number: `PlayerId(42)`
/// becomes `42`, not `{ "0": 42 }`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier of a spawned collectible. Never reused within a process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point in the 2D play field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// DisplayName
// ---------------------------------------------------------------------------

/// A bounded, replicated player name.
///
/// The bound matches the usable capacity of a 32-byte fixed string
/// (29 bytes of UTF-8). Longer input is truncated on a character boundary
/// rather than rejected, so a long name never blocks a player from joining.
///
/// Deserialization goes through [`DisplayName::new`] as well, which means
/// a peer cannot smuggle an over-long name past the bound by hand-crafting
/// JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Maximum length of a name in bytes.
    pub const MAX_BYTES: usize = 29;

    /// The value every name holds before its owner writes one, and the
    /// fallback used when a player cannot be resolved.
    pub const UNKNOWN: &'static str = "Unknown";

    /// Creates a name, truncating to [`Self::MAX_BYTES`] if needed.
    pub fn new(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.len() > Self::MAX_BYTES {
            let mut end = Self::MAX_BYTES;
            while !name.is_char_boundary(end) {
                end -= 1;
            }
            name.truncate(end);
        }
        Self(name)
    }

    /// The `"Unknown"` placeholder.
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DisplayName {
    fn default() -> Self {
        Self::unknown()
    }
}

impl From<String> for DisplayName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for DisplayName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<DisplayName> for String {
    fn from(name: DisplayName) -> Self {
        name.0
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One row of the score ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player_id: PlayerId,
    pub score: u32,
}

impl PlayerRecord {
    /// A fresh record with a score of zero.
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            score: 0,
        }
    }
}

/// A live collectible as seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub entity_id: EntityId,
    pub position: Vec2,
}

/// A player's name as carried in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub player_id: PlayerId,
    pub name: DisplayName,
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Lifecycle of the single game session a server runs.
///
/// ```text
/// Idle → Active → Ended
/// ```
///
/// There is no edge out of `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    Ended,
}

impl SessionPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Active => write!(f, "Active"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who an outbound event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every connected observer.
    All,
    /// One specific connection.
    Player(PlayerId),
}
