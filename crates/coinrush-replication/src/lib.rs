//! Replicated state held by the Coinrush authority.
//!
//! - [`ScoreReplicator`]: the canonical score ledger.
//! - [`IdentityReplicator`] / [`IdentityDirectory`]: owner-gated display
//!   names and the connection registry.
//! - [`ReplicatedField`]: the single-writer value both are built from.
//! - [`Observers`]: synchronous, ordered change callbacks.

mod error;
mod field;
mod identity;
mod observer;
mod score;

pub use error::ReplicationError;
pub use field::ReplicatedField;
pub use identity::{IdentityDirectory, IdentityReplicator, NameLookup};
pub use observer::{Observers, SubscriptionId};
pub use score::{ScoreReplicator, Winner};
