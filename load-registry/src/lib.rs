//! Pending-load registry for the playlist bridge.
//!
//! An HTTP request that arrives before its playlist has loaded cannot be
//! answered yet; it also must not be answered more than once, no matter how
//! many state-change notifications the backend fires while the playlist
//! loads. This crate owns that bookkeeping:
//!
//! - [`PendingLoadRegistry::register`] records a waiting request and hands
//!   back a [`Registration`].
//! - [`PendingLoadRegistry::playlist_state_changed`] is called by the
//!   session pump on every state-change notification. It re-checks nothing
//!   itself — the caller passes the freshly queried loaded state — and only
//!   a `loaded == true` notification completes waiters. Waiters are removed
//!   from the map *before* any completion fires, so a second notification in
//!   the same batch finds nothing to deliver.
//! - Dropping a [`Registration`] aborts it: the waiter disappears from the
//!   map and no completion ever fires. Connection close and timeout both
//!   reduce to dropping the registration.
//!
//! Completion delivery is a oneshot send, so a waiter structurally cannot
//! complete twice, and no application code runs inside the registry while it
//! delivers (nothing can re-enter the map mid-notification).

mod registry;

pub use registry::{PendingLoadRegistry, Registration, RegistrationId, WaitOutcome};
