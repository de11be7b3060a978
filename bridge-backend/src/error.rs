use thiserror::Error;

use crate::link::PlaylistLink;

/// Errors reported by a [`crate::SessionBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// A well-formed link that the backend cannot resolve to a playlist.
    #[error("playlist not found: {0}")]
    PlaylistNotFound(PlaylistLink),

    /// A query that requires a loaded playlist hit an unloaded one.
    #[error("playlist not loaded: {0}")]
    NotLoaded(PlaylistLink),

    /// A fatal session-level error. The session is a process-wide singleton,
    /// so this terminates event processing rather than a single request.
    #[error("session error: {0}")]
    Session(String),

    /// Login did not succeed.
    #[error("login failed: {0}")]
    LoginFailed(String),
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
