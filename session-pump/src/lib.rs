//! Session event pump and reactor for the playlist bridge.
//!
//! The external backend delivers callback notifications only while its
//! `process_events` routine runs, and it tells the caller when to call back.
//! This crate owns both halves of that contract:
//!
//! - [`SessionPump`]: the only code path in the process that calls
//!   `process_events`. One [`drain`](SessionPump::drain) keeps re-invoking
//!   it while the backend reports a zero delay (a notification burst), then
//!   hands the final delay back for the timer. Each delivered event is
//!   dispatched from here: playlist state changes re-check the loaded state
//!   and notify the pending-load registry, login/logout events steer the
//!   session lifecycle.
//! - [`Reactor`]: the single-threaded run loop. It multiplexes the backend's
//!   cross-thread wakeup signal, the backend-scheduled timer, SIGINT and an
//!   explicit stop handle, and runs one drain per wakeup. SIGINT triggers a
//!   logout; the resulting `LoggedOut` event ends the loop cleanly. A fatal
//!   session error logs out and propagates, so the process can exit
//!   non-zero.
//!
//! Everything here runs inside one task; nothing in this crate spawns.

mod pump;
mod reactor;

pub use pump::{PumpTurn, SessionPump};
pub use reactor::{Reactor, ReactorHandle};
