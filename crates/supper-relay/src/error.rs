//! Error types for the relay.

use thiserror::Error;

/// Relay transport errors. These only ever drive the relay's own
/// reconnect loop; they are never surfaced to request handling.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The LISTEN connection failed or dropped.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection was lost mid-session.
    #[error("connection lost")]
    ConnectionLost,
}

impl From<sqlx::Error> for RelayError {
    fn from(err: sqlx::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
