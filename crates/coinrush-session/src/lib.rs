//! Session lifecycle for Coinrush.
//!
//! [`SessionController`] is the single owner of authoritative game state.
//! It drives the countdown and spawn cadence, routes pickups through
//! [`CollectibleService`] into the score ledger, and announces the winner
//! exactly once when the session ends.

mod collectible;
mod config;
mod controller;
mod error;

pub use collectible::{CollectibleService, PickupOutcome};
pub use config::{SessionConfig, SpawnArea};
pub use controller::{
    NO_PLAYERS_TEXT, Outbound, SessionController, UNKNOWN_WINNER_TEXT, winner_text,
};
pub use error::SessionError;
