//! Scoped ownership of an opened playlist reference.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::link::PlaylistLink;
use crate::model::PlaylistSnapshot;
use crate::session::{PlaylistRef, SessionBackend};

/// An opened playlist, released exactly once when the handle drops.
///
/// Every exit path of a request — reply sent, error, timeout, connection
/// closed — ends with the handle dropping, so the open/release balance holds
/// without per-path bookkeeping.
pub struct PlaylistHandle {
    backend: Arc<dyn SessionBackend>,
    link: PlaylistLink,
    reference: Option<PlaylistRef>,
}

impl PlaylistHandle {
    /// Open the playlist behind `link` on the given session.
    pub fn open(backend: Arc<dyn SessionBackend>, link: &PlaylistLink) -> Result<Self> {
        let reference = backend.open_playlist(link)?;
        Ok(Self {
            backend,
            link: link.clone(),
            reference: Some(reference),
        })
    }

    pub fn link(&self) -> &PlaylistLink {
        &self.link
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_loaded(&self.link)
    }

    /// Capture the playlist's queryable fields. Fails with
    /// [`crate::BackendError::NotLoaded`] if called before the playlist has
    /// loaded; callers guard this via [`is_loaded`](Self::is_loaded) or the
    /// pending-load registry.
    pub fn snapshot(&self) -> Result<PlaylistSnapshot> {
        self.backend.snapshot(&self.link)
    }
}

impl Drop for PlaylistHandle {
    fn drop(&mut self) {
        if let Some(reference) = self.reference.take() {
            self.backend.release_playlist(reference);
        }
    }
}

impl fmt::Debug for PlaylistHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaylistHandle")
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}
