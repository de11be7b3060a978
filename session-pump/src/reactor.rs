//! The single-threaded run loop.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::time::Instant;

use bridge_backend::{BackendError, SessionBackend};

use crate::pump::{PumpTurn, SessionPump};

/// Handle for stopping a running [`Reactor`] from another task.
#[derive(Clone)]
pub struct ReactorHandle {
    stop: Arc<Notify>,
}

impl ReactorHandle {
    /// Make [`Reactor::run`] return. Safe to call before `run` starts or
    /// more than once.
    pub fn stop(&self) {
        self.stop.notify_one();
    }
}

/// Multiplexes the bridge's event sources on one task.
///
/// Sources: the backend's cross-thread wakeup signal, the timer the backend
/// schedules through its reported delay, SIGINT, and [`ReactorHandle::stop`].
/// Every wakeup runs one [`SessionPump::drain`]; nothing else in the process
/// touches `process_events`. Once `run` returns, the timer and wakeup are no
/// longer polled, so no stale callback can fire after shutdown begins.
pub struct Reactor {
    backend: Arc<dyn SessionBackend>,
    pump: SessionPump,
    waker: Arc<Notify>,
    stop: Arc<Notify>,
}

impl Reactor {
    /// `waker` must be the same `Notify` the backend signals when it needs
    /// processing.
    pub fn new(backend: Arc<dyn SessionBackend>, pump: SessionPump, waker: Arc<Notify>) -> Self {
        Self {
            backend,
            pump,
            waker,
            stop: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> ReactorHandle {
        ReactorHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    /// Run until the session logs out, [`ReactorHandle::stop`] is called, or
    /// a fatal session error occurs.
    ///
    /// SIGINT does not stop the loop directly: it triggers a logout, and the
    /// backend's `LoggedOut` event ends the loop once the session has
    /// actually wound down — the same path the original interrupt handling
    /// takes.
    pub async fn run(&self) -> Result<(), BackendError> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut interrupted = false;

        // Drain immediately on entry; login events may already be queued.
        let mut deadline = Instant::now();

        loop {
            tokio::select! {
                _ = self.stop.notified() => {
                    tracing::info!("reactor stop requested");
                    break;
                }
                result = &mut ctrl_c, if !interrupted => {
                    interrupted = true;
                    match result {
                        Ok(()) => {
                            tracing::info!("interrupt received, logging out");
                            self.backend.logout();
                        }
                        Err(error) => {
                            tracing::warn!(%error, "interrupt handler unavailable");
                        }
                    }
                    continue;
                }
                _ = self.waker.notified() => {}
                _ = tokio::time::sleep_until(deadline) => {}
            }

            match self.pump.drain() {
                Ok(PumpTurn::Continue(delay)) => {
                    deadline = Instant::now() + delay;
                }
                Ok(PumpTurn::LoggedOut) => {
                    tracing::info!("session ended, leaving reactor");
                    break;
                }
                Err(error) => {
                    tracing::error!(%error, "fatal session error, shutting down");
                    self.backend.logout();
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}
