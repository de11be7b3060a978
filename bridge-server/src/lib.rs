//! HTTP surface of the playlist bridge.
//!
//! Inbound requests meet the asynchronous backend here:
//!
//! 1. [`dispatch`] parses the request into an [`Action`]: reject it,
//!    serialize an already-loaded playlist, or defer until the playlist
//!    finishes loading.
//! 2. Deferred requests register with the pending-load registry and await
//!    their completion, bounded by [`DEFAULT_LOAD_WAIT`]. If the connection
//!    closes first, the dropped handler tears the registration and the
//!    playlist handle down.
//! 3. [`json::playlist_document`] turns the loaded playlist's snapshot into
//!    the fixed JSON schema.
//!
//! [`BridgeServer`] owns the socket: it binds, serves with graceful
//! shutdown, and stamps every reply with the fixed `Server` and
//! `Content-Type` headers. Exactly one reply leaves per request; a dropped
//! connection produces none.

pub mod dispatch;
pub mod error;
pub mod json;
mod server;

pub use dispatch::{dispatch, Action};
pub use error::{RequestError, ServerError};
pub use server::{BridgeContext, BridgeServer, DEFAULT_LOAD_WAIT, SERVER_IDENT};
