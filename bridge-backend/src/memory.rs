//! In-memory reference backend with simulated progressive loading.
//!
//! `MemoryBackend` serves a catalog of playlists held in memory. Entries can
//! be inserted already loaded, or with a load delay; delayed entries are
//! promoted to loaded inside [`process_events`](SessionBackend::process_events),
//! which emits [`SessionEvent::PlaylistStateChanged`] and reports the time
//! until the next due entry as its wakeup delay. That reproduces the real
//! backend's contract in miniature: callbacks only fire during event
//! processing, and the caller owns the timer.
//!
//! The backend also counts opens and releases so tests can assert that every
//! reference is balanced by exactly one release.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{BackendError, Result};
use crate::link::PlaylistLink;
use crate::model::PlaylistSnapshot;
use crate::session::{Credentials, PlaylistRef, Processed, SessionBackend, SessionEvent};

/// Events delivered per `process_events` call; a longer queue reports a zero
/// wakeup so the pump drains the rest immediately.
const MAX_EVENT_BATCH: usize = 8;

/// Wakeup delay reported when nothing is scheduled.
const IDLE_WAKEUP: Duration = Duration::from_millis(250);

struct Entry {
    snapshot: PlaylistSnapshot,
    loaded: bool,
    load_at: Option<Instant>,
}

#[derive(Default)]
struct Inner {
    playlists: HashMap<PlaylistLink, Entry>,
    events: VecDeque<SessionEvent>,
    fatal: Option<String>,
    logged_in: bool,
    next_serial: u64,
}

/// An in-memory [`SessionBackend`] over a fixed catalog of playlists.
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    waker: Arc<Notify>,
    opened: AtomicU64,
    released: AtomicU64,
}

impl MemoryBackend {
    /// Create a backend that signals "needs processing" through `waker`.
    pub fn new(waker: Arc<Notify>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            waker,
            opened: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// Insert a playlist that is loaded from the start.
    pub fn insert_playlist(&self, link: PlaylistLink, snapshot: PlaylistSnapshot) {
        let mut inner = self.inner.lock();
        inner.playlists.insert(
            link,
            Entry {
                snapshot,
                loaded: true,
                load_at: None,
            },
        );
    }

    /// Insert a playlist that finishes loading `delay` from now.
    ///
    /// The entry resolves immediately (opens succeed) but reports unloaded
    /// until a `process_events` call at or after the deadline promotes it.
    pub fn insert_loading(&self, link: PlaylistLink, snapshot: PlaylistSnapshot, delay: Duration) {
        {
            let mut inner = self.inner.lock();
            inner.playlists.insert(
                link,
                Entry {
                    snapshot,
                    loaded: false,
                    load_at: Some(Instant::now() + delay),
                },
            );
        }
        // The pump may be sleeping on a longer deadline.
        self.waker.notify_one();
    }

    /// Mark a playlist loaded now and queue its state-change notification.
    pub fn finish_loading(&self, link: &PlaylistLink) {
        {
            let mut inner = self.inner.lock();
            if let Some(entry) = inner.playlists.get_mut(link) {
                entry.loaded = true;
                entry.load_at = None;
            }
            inner
                .events
                .push_back(SessionEvent::PlaylistStateChanged(link.clone()));
        }
        self.waker.notify_one();
    }

    /// Queue a state-change notification without changing the loaded state.
    ///
    /// The real backend fires these repeatedly during a progressive load;
    /// receivers must tolerate notifications that do not mean "loaded".
    pub fn emit_state_change(&self, link: &PlaylistLink) {
        {
            let mut inner = self.inner.lock();
            inner
                .events
                .push_back(SessionEvent::PlaylistStateChanged(link.clone()));
        }
        self.waker.notify_one();
    }

    /// Make the next `process_events` call fail with a fatal session error.
    pub fn fail_session(&self, message: &str) {
        {
            let mut inner = self.inner.lock();
            inner.fatal = Some(message.to_string());
        }
        self.waker.notify_one();
    }

    /// Total playlist references handed out.
    pub fn open_count(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Total playlist references released.
    pub fn release_count(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// References currently outstanding.
    pub fn outstanding_refs(&self) -> u64 {
        self.open_count() - self.release_count()
    }
}

impl SessionBackend for MemoryBackend {
    fn login(&self, credentials: &Credentials) {
        {
            let mut inner = self.inner.lock();
            if credentials.username.is_empty() {
                inner
                    .events
                    .push_back(SessionEvent::LoginFailed("empty username".to_string()));
            } else {
                inner.logged_in = true;
                inner.events.push_back(SessionEvent::LoggedIn);
            }
        }
        self.waker.notify_one();
    }

    fn logout(&self) {
        {
            let mut inner = self.inner.lock();
            inner.logged_in = false;
            inner.events.push_back(SessionEvent::LoggedOut);
        }
        self.waker.notify_one();
    }

    fn process_events(&self) -> Result<Processed> {
        let mut inner = self.inner.lock();

        if let Some(message) = inner.fatal.take() {
            return Err(BackendError::Session(message));
        }

        // Promote entries whose load deadline has passed.
        let now = Instant::now();
        let mut promoted = Vec::new();
        for (link, entry) in inner.playlists.iter_mut() {
            if let Some(load_at) = entry.load_at {
                if load_at <= now {
                    entry.loaded = true;
                    entry.load_at = None;
                    promoted.push(link.clone());
                }
            }
        }
        for link in promoted {
            tracing::debug!(playlist = %link, "playlist finished loading");
            inner
                .events
                .push_back(SessionEvent::PlaylistStateChanged(link));
        }

        let batch = inner.events.len().min(MAX_EVENT_BATCH);
        let events: Vec<SessionEvent> = inner.events.drain(..batch).collect();

        let next_wakeup = if inner.events.is_empty() {
            inner
                .playlists
                .values()
                .filter_map(|entry| entry.load_at)
                .map(|load_at| load_at.saturating_duration_since(now))
                .min()
                .unwrap_or(IDLE_WAKEUP)
        } else {
            // More queued than one batch carries; ask to be called right back.
            Duration::ZERO
        };

        Ok(Processed {
            events,
            next_wakeup,
        })
    }

    fn open_playlist(&self, link: &PlaylistLink) -> Result<PlaylistRef> {
        let mut inner = self.inner.lock();
        if !inner.playlists.contains_key(link) {
            return Err(BackendError::PlaylistNotFound(link.clone()));
        }

        inner.next_serial += 1;
        let serial = inner.next_serial;
        self.opened.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(playlist = %link, serial, "opened playlist reference");
        Ok(PlaylistRef::new(link.clone(), serial))
    }

    fn release_playlist(&self, reference: PlaylistRef) {
        self.released.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(
            playlist = %reference.link(),
            serial = reference.serial(),
            "released playlist reference"
        );
    }

    fn is_loaded(&self, link: &PlaylistLink) -> bool {
        self.inner
            .lock()
            .playlists
            .get(link)
            .map(|entry| entry.loaded)
            .unwrap_or(false)
    }

    fn snapshot(&self, link: &PlaylistLink) -> Result<PlaylistSnapshot> {
        let inner = self.inner.lock();
        let entry = inner
            .playlists
            .get(link)
            .ok_or_else(|| BackendError::PlaylistNotFound(link.clone()))?;

        if !entry.loaded {
            return Err(BackendError::NotLoaded(link.clone()));
        }

        Ok(entry.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (Arc<MemoryBackend>, Arc<Notify>) {
        let waker = Arc::new(Notify::new());
        (Arc::new(MemoryBackend::new(waker.clone())), waker)
    }

    fn link(s: &str) -> PlaylistLink {
        PlaylistLink::parse(s).unwrap()
    }

    fn snapshot(uri: &str) -> PlaylistSnapshot {
        PlaylistSnapshot {
            creator: "tester".to_string(),
            uri: uri.to_string(),
            title: "Memory test".to_string(),
            collaborative: false,
            description: None,
            subscriber_count: 3,
            track_count: 0,
            tracks: vec![],
        }
    }

    #[test]
    fn login_queues_logged_in_event() {
        let (backend, _) = backend();
        backend.login(&Credentials {
            username: "user".to_string(),
            password: "pass".to_string(),
        });

        let processed = backend.process_events().unwrap();
        assert_eq!(processed.events, vec![SessionEvent::LoggedIn]);
    }

    #[test]
    fn empty_username_fails_login() {
        let (backend, _) = backend();
        backend.login(&Credentials {
            username: String::new(),
            password: String::new(),
        });

        let processed = backend.process_events().unwrap();
        assert!(matches!(
            processed.events.as_slice(),
            [SessionEvent::LoginFailed(_)]
        ));
    }

    #[test]
    fn unknown_link_does_not_resolve() {
        let (backend, _) = backend();
        let result = backend.open_playlist(&link("spotify:playlist:doesNotExist1"));
        assert!(matches!(result, Err(BackendError::PlaylistNotFound(_))));
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn delayed_entry_promotes_after_deadline() {
        let (backend, _) = backend();
        let l = link("spotify:playlist:slowPlaylist1");
        backend.insert_loading(l.clone(), snapshot(l.as_str()), Duration::from_millis(10));

        assert!(!backend.is_loaded(&l));
        assert!(matches!(
            backend.snapshot(&l),
            Err(BackendError::NotLoaded(_))
        ));

        // Before the deadline: no notification, wakeup points at the deadline.
        let processed = backend.process_events().unwrap();
        assert!(processed.events.is_empty());
        assert!(processed.next_wakeup <= Duration::from_millis(10));

        std::thread::sleep(Duration::from_millis(15));
        let processed = backend.process_events().unwrap();
        assert_eq!(
            processed.events,
            vec![SessionEvent::PlaylistStateChanged(l.clone())]
        );
        assert!(backend.is_loaded(&l));
        assert!(backend.snapshot(&l).is_ok());
    }

    #[test]
    fn long_event_queue_reports_zero_wakeup() {
        let (backend, _) = backend();
        let l = link("spotify:playlist:busyPlaylist1");
        backend.insert_playlist(l.clone(), snapshot(l.as_str()));

        for _ in 0..(MAX_EVENT_BATCH + 3) {
            backend.emit_state_change(&l);
        }

        let first = backend.process_events().unwrap();
        assert_eq!(first.events.len(), MAX_EVENT_BATCH);
        assert_eq!(first.next_wakeup, Duration::ZERO);

        let second = backend.process_events().unwrap();
        assert_eq!(second.events.len(), 3);
        assert!(second.next_wakeup > Duration::ZERO);
    }

    #[test]
    fn fatal_error_surfaces_once() {
        let (backend, _) = backend();
        backend.fail_session("connection reset");

        let err = backend.process_events().unwrap_err();
        assert_eq!(err, BackendError::Session("connection reset".to_string()));

        // The failure is consumed; a later call processes normally.
        assert!(backend.process_events().is_ok());
    }

    #[tokio::test]
    async fn mutations_wake_the_reactor() {
        let (backend, waker) = backend();
        let l = link("spotify:playlist:wakePlaylist1");
        backend.insert_playlist(l.clone(), snapshot(l.as_str()));

        let notified = waker.notified();
        tokio::pin!(notified);
        backend.emit_state_change(&l);
        notified.await;
    }
}
