//! Draining the backend's event queue.

use std::sync::Arc;
use std::time::Duration;

use bridge_backend::{BackendError, SessionBackend, SessionEvent};
use load_registry::PendingLoadRegistry;

/// What a completed drain means for the reactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpTurn {
    /// Keep running; call back after this delay (the backend's own timeout).
    Continue(Duration),
    /// The session ended normally; the reactor should stop.
    LoggedOut,
}

/// Drives the backend's `process_events` and dispatches what it delivers.
///
/// This is the only legal caller of `process_events`; the reactor invokes
/// [`drain`](Self::drain) from its single task, so no two drains ever run
/// concurrently.
pub struct SessionPump {
    backend: Arc<dyn SessionBackend>,
    registry: PendingLoadRegistry,
}

impl SessionPump {
    pub fn new(backend: Arc<dyn SessionBackend>, registry: PendingLoadRegistry) -> Self {
        Self { backend, registry }
    }

    /// Drain the backend until it reports a non-zero delay.
    ///
    /// A zero delay means the backend has more queued work; re-invoking
    /// immediately flushes a notification burst without busy-waiting in the
    /// reactor. Fatal session errors propagate as `Err` and are terminal for
    /// the whole process, not for any single request.
    pub fn drain(&self) -> Result<PumpTurn, BackendError> {
        loop {
            let processed = self.backend.process_events()?;
            let mut logged_out = false;

            for event in processed.events {
                match event {
                    SessionEvent::LoggedIn => {
                        tracing::info!("logged in to streaming backend");
                    }
                    SessionEvent::LoginFailed(message) => {
                        tracing::error!(%message, "login rejected");
                        return Err(BackendError::LoginFailed(message));
                    }
                    SessionEvent::LoggedOut => {
                        tracing::info!("logged out from streaming backend");
                        logged_out = true;
                    }
                    SessionEvent::PlaylistStateChanged(link) => {
                        // The notification only says "changed"; query the
                        // current state before touching the registry.
                        let loaded = self.backend.is_loaded(&link);
                        let completed = self.registry.playlist_state_changed(&link, loaded);
                        if completed > 0 {
                            tracing::debug!(
                                playlist = %link,
                                completed,
                                "completed pending requests"
                            );
                        }
                    }
                }
            }

            if logged_out {
                return Ok(PumpTurn::LoggedOut);
            }
            if !processed.next_wakeup.is_zero() {
                return Ok(PumpTurn::Continue(processed.next_wakeup));
            }
        }
    }
}
