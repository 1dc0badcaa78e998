//! Wire protocol for Coinrush.
//!
//! This crate defines the "language" the authority and its observers speak:
//!
//! - **Types** ([`PlayerId`], [`EntityId`], [`DisplayName`],
//!   [`PlayerRecord`], [`SessionPhase`], ...): the domain values that
//!   get replicated.
//! - **Messages** ([`ClientRequest`], [`ServerEvent`], [`Envelope`]):
//!   what travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Authority (requests / events)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    ClientRequest, Envelope, PROTOCOL_VERSION, Payload, ServerEvent, WorldSnapshot,
};
pub use types::{
    Collectible, DisplayName, EntityId, NameEntry, PlayerId, PlayerRecord, Recipient,
    SessionPhase, Vec2,
};
