//! The opaque session seam between the bridge and a streaming backend.

use std::time::Duration;

use crate::error::Result;
use crate::link::PlaylistLink;
use crate::model::PlaylistSnapshot;

/// Account credentials consumed at login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A callback notification delivered by [`SessionBackend::process_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login completed.
    LoggedIn,
    /// Login was rejected; carries the backend's message text.
    LoginFailed(String),
    /// The session ended, either from [`SessionBackend::logout`] or from the
    /// backend side.
    LoggedOut,
    /// A playlist's state changed. Fired repeatedly during progressive load;
    /// receivers must re-check the loaded state rather than assume it.
    PlaylistStateChanged(PlaylistLink),
}

/// The outcome of one `process_events` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    /// Callback notifications that fired during the call, in delivery order.
    pub events: Vec<SessionEvent>,
    /// How long the backend wants to wait before the next call. Zero means
    /// more work is pending and the caller should re-invoke immediately.
    pub next_wakeup: Duration,
}

/// A reference to one opened playlist.
///
/// Move-only on purpose: [`SessionBackend::release_playlist`] consumes the
/// reference by value, so a reference cannot be released twice and an
/// unreleased one is visible as a leak in backend counters. Application code
/// should hold references through [`crate::PlaylistHandle`], which releases
/// on drop.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PlaylistRef {
    link: PlaylistLink,
    serial: u64,
}

impl PlaylistRef {
    /// Create a reference. Only backend implementations should call this.
    pub fn new(link: PlaylistLink, serial: u64) -> Self {
        Self { link, serial }
    }

    pub fn link(&self) -> &PlaylistLink {
        &self.link
    }

    /// Backend-assigned serial, unique per open within a session.
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// The opaque session handle to an external streaming backend.
///
/// One session exists per process, shared by all requests. The bridge calls
/// into it from a single reactor task; implementations may use internal
/// threads for I/O but must deliver all callbacks through the return value
/// of [`process_events`](Self::process_events), waking the reactor via the
/// `Notify` they were constructed with when new work arrives.
pub trait SessionBackend: Send + Sync {
    /// Begin logging in. The outcome arrives later as
    /// [`SessionEvent::LoggedIn`] or [`SessionEvent::LoginFailed`].
    fn login(&self, credentials: &Credentials);

    /// Begin logging out. [`SessionEvent::LoggedOut`] arrives once the
    /// session has ended.
    fn logout(&self);

    /// Drain the session's internal event queue.
    ///
    /// This is the only place callback notifications are delivered. A fatal
    /// session error is returned as `Err` and ends event processing for the
    /// whole process.
    fn process_events(&self) -> Result<Processed>;

    /// Resolve a link to a playlist reference, creating the underlying
    /// object on first open. Identical links resolve to the same underlying
    /// playlist; each open returns an independent reference.
    fn open_playlist(&self, link: &PlaylistLink) -> Result<PlaylistRef>;

    /// Release a reference obtained from [`open_playlist`](Self::open_playlist).
    fn release_playlist(&self, reference: PlaylistRef);

    /// Whether the playlist behind `link` has loaded enough to be queried.
    /// Unknown links report `false`.
    fn is_loaded(&self, link: &PlaylistLink) -> bool;

    /// Capture the queryable fields of a loaded playlist.
    fn snapshot(&self, link: &PlaylistLink) -> Result<PlaylistSnapshot>;
}
