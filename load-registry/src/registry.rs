//! Registration bookkeeping keyed by playlist link.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::oneshot;

use bridge_backend::PlaylistLink;

/// Unique identifier for one pending registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wait-{}", self.0)
    }
}

/// The outcome of waiting on a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The playlist finished loading; the caller may serialize it.
    Completed,
    /// The wait bound elapsed first. The registration is aborted when the
    /// value returns (the `Registration` has been consumed and dropped).
    TimedOut,
}

struct Waiter {
    id: RegistrationId,
    completion: oneshot::Sender<()>,
    registered_at: Instant,
}

struct Shared {
    waiters: DashMap<PlaylistLink, Vec<Waiter>>,
    next_id: AtomicU64,
}

/// Maps playlist links to the requests awaiting their loaded transition.
///
/// Cheap to clone; clones share the same underlying map.
#[derive(Clone)]
pub struct PendingLoadRegistry {
    shared: Arc<Shared>,
}

impl PendingLoadRegistry {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                waiters: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Record a request waiting on `link` and return its registration.
    ///
    /// Callers should re-check the playlist's loaded state once after
    /// registering: a load that completed between the caller's first check
    /// and this call would otherwise wait out the full bound.
    pub fn register(&self, link: &PlaylistLink) -> Registration {
        let id = RegistrationId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (completion, receiver) = oneshot::channel();
        let registered_at = Instant::now();

        self.shared
            .waiters
            .entry(link.clone())
            .or_default()
            .push(Waiter {
                id,
                completion,
                registered_at,
            });

        tracing::debug!(playlist = %link, registration = %id, "request awaiting playlist load");

        Registration {
            link: link.clone(),
            id,
            shared: Arc::clone(&self.shared),
            receiver,
        }
    }

    /// Handle one state-change notification for `link`.
    ///
    /// `loaded` is the caller's fresh query of the playlist's state; the
    /// notification itself only means "something changed". Returns the number
    /// of waiters completed. Idempotent: notifications for links with no
    /// waiters, or repeated notifications after completion, return 0.
    pub fn playlist_state_changed(&self, link: &PlaylistLink, loaded: bool) -> usize {
        if !loaded {
            tracing::trace!(playlist = %link, "state changed but still loading");
            return 0;
        }

        // Remove the waiter list before firing any completion, so a second
        // notification from the same batch cannot observe the waiters again.
        let Some((_, waiters)) = self.shared.waiters.remove(link) else {
            return 0;
        };

        let count = waiters.len();
        for waiter in waiters {
            let waited = waiter.registered_at.elapsed();
            // A closed receiver means the request went away concurrently;
            // that request counts as aborted, not completed.
            if waiter.completion.send(()).is_ok() {
                tracing::debug!(
                    playlist = %link,
                    registration = %waiter.id,
                    waited_ms = waited.as_millis() as u64,
                    "playlist loaded, completing request"
                );
            }
        }
        count
    }

    /// Number of links that currently have at least one waiter.
    pub fn pending_links(&self) -> usize {
        self.shared.waiters.len()
    }

    /// Number of waiters registered for `link`.
    pub fn waiters_for(&self, link: &PlaylistLink) -> usize {
        self.shared
            .waiters
            .get(link)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

impl Default for PendingLoadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// One request's pending registration.
///
/// Lives exactly as long as the request is waiting: completing consumes it,
/// and dropping it on any other path (timeout, connection closed, handler
/// error) removes the waiter so no completion can fire afterwards.
pub struct Registration {
    link: PlaylistLink,
    id: RegistrationId,
    shared: Arc<Shared>,
    receiver: oneshot::Receiver<()>,
}

impl Registration {
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn link(&self) -> &PlaylistLink {
        &self.link
    }

    /// Wait for the playlist to finish loading, up to `bound`.
    pub async fn wait(mut self, bound: Duration) -> WaitOutcome {
        match tokio::time::timeout(bound, &mut self.receiver).await {
            Ok(Ok(())) => WaitOutcome::Completed,
            // Sender dropped without completing; treat like an expired wait.
            Ok(Err(_)) => WaitOutcome::TimedOut,
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut removed = false;
        if let Some(mut entry) = self.shared.waiters.get_mut(&self.link) {
            let before = entry.len();
            entry.retain(|waiter| waiter.id != self.id);
            removed = entry.len() != before;
        }
        if removed {
            tracing::debug!(
                playlist = %self.link,
                registration = %self.id,
                "registration aborted before playlist loaded"
            );
            self.shared
                .waiters
                .remove_if(&self.link, |_, waiters| waiters.is_empty());
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("link", &self.link)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
