//! Unified error type for Coinrush.

use coinrush_protocol::ProtocolError;
use coinrush_replication::ReplicationError;
use coinrush_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CoinrushError {
    /// Encode, decode, or protocol-rule violation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session could not start.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A replicated write was refused.
    #[error(transparent)]
    Replication(#[from] ReplicationError),

    /// Socket bind, accept, or file I/O failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The WebSocket layer failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server configuration is unusable.
    #[error("invalid config: {0}")]
    Config(String),

    /// The authority actor has stopped.
    #[error("authority is unavailable")]
    Unavailable,
}
