//! Request dispatch: path parsing and playlist resolution.

use std::sync::Arc;

use warp::http::Method;

use bridge_backend::{BackendError, LinkParseError, PlaylistHandle, PlaylistLink, SessionBackend};

use crate::error::RequestError;

/// What the caller should do with one inbound request.
#[derive(Debug)]
pub enum Action {
    /// The playlist is loaded; serialize and reply now.
    Serialize(PlaylistHandle),
    /// The playlist is still loading; register with the pending-load
    /// registry and reply when it completes.
    Defer(PlaylistHandle),
    /// Terminal: convert to an HTTP error reply immediately.
    Reject(RequestError),
}

/// Parse an inbound request and resolve its playlist.
///
/// Accepts only `GET /playlist/<identifier>`. Anything else is rejected:
/// other methods with 501, malformed paths (missing identifier, duplicate
/// slashes, trailing segments, wrong kind segment) and non-playlist or
/// unparsable identifiers with 400, well-formed identifiers the backend
/// cannot resolve with 404.
///
/// Idempotent per (connection, path): a duplicate invocation opens an
/// independent, refcounted handle to the same underlying playlist and is
/// harmless.
pub fn dispatch(method: &Method, path: &str, backend: &Arc<dyn SessionBackend>) -> Action {
    if method != Method::GET {
        return Action::Reject(RequestError::NotImplemented);
    }

    let link = match parse_path(path) {
        Ok(link) => link,
        Err(error) => return Action::Reject(error),
    };

    let handle = match PlaylistHandle::open(Arc::clone(backend), &link) {
        Ok(handle) => handle,
        Err(BackendError::PlaylistNotFound(_)) => {
            return Action::Reject(RequestError::NotFound("Playlist not found".to_string()));
        }
        Err(error) => return Action::Reject(RequestError::from(error)),
    };

    if handle.is_loaded() {
        Action::Serialize(handle)
    } else {
        Action::Defer(handle)
    }
}

/// Parse `/playlist/<identifier>` into a playlist link.
fn parse_path(path: &str) -> Result<PlaylistLink, RequestError> {
    let bad_request = || RequestError::BadRequest("Bad Request".to_string());

    let rest = path.strip_prefix('/').ok_or_else(bad_request)?;
    let mut segments = rest.split('/');

    // Exactly two segments, and the kind is case-sensitive. A duplicate
    // slash shows up as an empty segment and fails here.
    match (segments.next(), segments.next(), segments.next()) {
        (Some("playlist"), Some(identifier), None) if !identifier.is_empty() => {
            // Clients may percent-encode the colons in the identifier.
            let identifier = urlencoding::decode(identifier).map_err(|_| bad_request())?;
            PlaylistLink::parse(&identifier).map_err(|error| match error {
                LinkParseError::WrongKind(_) => {
                    RequestError::BadRequest("Not a playlist link".to_string())
                }
                LinkParseError::NotALink(_) | LinkParseError::InvalidId(_) => bad_request(),
            })
        }
        _ => Err(bad_request()),
    }
}
