//! Streaming backend session abstraction for the playlist bridge.
//!
//! The external streaming backend only delivers playlist data asynchronously,
//! through callback notifications fired while its event-processing routine
//! runs. This crate models that seam without depending on any concrete
//! backend:
//!
//! - [`SessionBackend`]: the opaque session handle. It exposes `login`,
//!   `logout`, `process_events` and loaded-state queries, and nothing about
//!   the underlying protocol.
//! - [`PlaylistLink`]: a parsed, validated playlist address
//!   (`spotify:playlist:<id>`).
//! - [`PlaylistSnapshot`] / [`TrackSnapshot`]: the queryable fields of a
//!   loaded playlist, captured as plain data.
//! - [`PlaylistHandle`]: a scoped guard around an opened playlist reference
//!   that releases it exactly once, on every exit path.
//! - [`MemoryBackend`]: an in-memory reference implementation with simulated
//!   progressive loading, used by the bundled binary and the test suites.
//!
//! # Event delivery contract
//!
//! `process_events` is the only place where session callbacks are delivered:
//! it returns the batch of [`SessionEvent`]s that fired plus the delay after
//! which it wants to be called again. A zero delay means "more work pending,
//! call again immediately". Backends that do work on internal threads signal
//! "needs processing" through the shared [`tokio::sync::Notify`] they were
//! constructed with; they never call into application code directly.

pub mod error;
pub mod handle;
pub mod link;
pub mod memory;
pub mod model;
pub mod session;

pub use error::{BackendError, Result};
pub use handle::PlaylistHandle;
pub use link::{LinkParseError, PlaylistLink};
pub use memory::MemoryBackend;
pub use model::{PlaylistSnapshot, TrackSnapshot};
pub use session::{Credentials, PlaylistRef, Processed, SessionBackend, SessionEvent};
