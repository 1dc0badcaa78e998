//! Error types for the session layer.

/// Errors that can occur during session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The configuration cannot run a session. Raised by
    /// `SessionController::start_session`; the session stays `Idle`.
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
}
