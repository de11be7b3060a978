use thiserror::Error;
use warp::http::StatusCode;

use bridge_backend::BackendError;

/// Terminal request failures, each mapped to one HTTP error reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Malformed client input: path shape, method on the playlist route,
    /// identifier syntax, or a link of the wrong kind.
    #[error("{0}")]
    BadRequest(String),

    /// A well-formed identifier the backend cannot resolve.
    #[error("{0}")]
    NotFound(String),

    /// Any HTTP method other than GET.
    #[error("Not Implemented")]
    NotImplemented,

    /// The session reported an error; carries the backend's message text.
    #[error("{0}")]
    Backend(String),

    /// Serialization or invariant failure on our side.
    #[error("internal error")]
    Internal,

    /// The playlist did not finish loading within the wait bound.
    #[error("playlist load timed out")]
    LoadTimeout,
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            RequestError::Backend(_) | RequestError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RequestError::LoadTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// The text placed in the `{"message": ...}` error body.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<BackendError> for RequestError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::PlaylistNotFound(_) => {
                RequestError::NotFound("Playlist not found".to_string())
            }
            // A snapshot of an unloaded playlist means our state machine let
            // a request through early; that is on us, not the client.
            BackendError::NotLoaded(_) => RequestError::Internal,
            BackendError::Session(message) | BackendError::LoginFailed(message) => {
                RequestError::Backend(message)
            }
        }
    }
}

/// Failures while standing the HTTP listener up.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listen socket: {0}")]
    Bind(#[source] warp::Error),
}
