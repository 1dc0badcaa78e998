//! Error types for the replication layer.

use coinrush_protocol::PlayerId;

/// Errors raised when a write is refused at the replication boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicationError {
    /// The writer does not own the field. Nothing was written.
    #[error("{writer} may not write a field owned by {owner}")]
    NotOwner { writer: PlayerId, owner: PlayerId },

    /// The target player has no live connection.
    #[error("player {0} is not connected")]
    UnknownPlayer(PlayerId),
}
