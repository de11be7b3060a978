//! HTTP listener and reply construction.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use warp::http::header::{HeaderValue, CONTENT_TYPE, SERVER};
use warp::http::{Method, StatusCode};
use warp::hyper::Body;
use warp::Filter;

use bridge_backend::{PlaylistHandle, SessionBackend};
use load_registry::{PendingLoadRegistry, WaitOutcome};

use crate::dispatch::{dispatch, Action};
use crate::error::{RequestError, ServerError};
use crate::json::playlist_document;

/// Fixed identifying string sent in the `Server` header of every reply.
pub const SERVER_IDENT: &str = "Spotify API";

/// How long a deferred request waits for its playlist to load before it is
/// aborted and answered with 504.
pub const DEFAULT_LOAD_WAIT: Duration = Duration::from_secs(10);

/// Process-scoped collaborators every request handler needs.
///
/// Passed explicitly instead of living in a global: the session backend is a
/// per-process singleton, but only by construction in `main`.
#[derive(Clone)]
pub struct BridgeContext {
    backend: Arc<dyn SessionBackend>,
    registry: PendingLoadRegistry,
    load_wait: Duration,
}

impl BridgeContext {
    pub fn new(backend: Arc<dyn SessionBackend>, registry: PendingLoadRegistry) -> Self {
        Self {
            backend,
            registry,
            load_wait: DEFAULT_LOAD_WAIT,
        }
    }

    /// Override the deferred-load wait bound (tests use short bounds).
    pub fn with_load_wait(mut self, load_wait: Duration) -> Self {
        self.load_wait = load_wait;
        self
    }
}

/// The playlist bridge's HTTP server.
///
/// Binds on construction, serves until [`shutdown`](Self::shutdown), and
/// routes every request through [`dispatch`].
pub struct BridgeServer {
    addr: SocketAddr,
    shutdown_tx: Option<mpsc::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl BridgeServer {
    /// Bind `addr` and start serving. Port 0 picks a free port; the chosen
    /// address is available from [`addr`](Self::addr).
    pub async fn bind(addr: SocketAddr, context: BridgeContext) -> Result<Self, ServerError> {
        let route = warp::method()
            .and(warp::path::full())
            .and_then(move |method: Method, path: warp::path::FullPath| {
                let context = context.clone();
                async move {
                    Ok::<_, Infallible>(handle_request(context, method, path.as_str()).await)
                }
            });

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let (bound_addr, server) = warp::serve(route)
            .try_bind_with_graceful_shutdown(addr, async move {
                shutdown_rx.recv().await;
            })
            .map_err(ServerError::Bind)?;

        tracing::info!(addr = %bound_addr, "playlist bridge listening");
        let server_handle = tokio::spawn(server);

        Ok(Self {
            addr: bound_addr,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// The bound listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
    }
}

/// Handle one request end to end. Every path out of this function produces
/// exactly one reply; if the connection drops, this future is dropped and
/// its registration and playlist handle unwind with it.
async fn handle_request(context: BridgeContext, method: Method, path: &str) -> warp::reply::Response {
    tracing::debug!(%method, path, "inbound request");

    match dispatch(&method, path, &context.backend) {
        Action::Reject(error) => {
            tracing::debug!(%method, path, status = %error.status(), "request rejected");
            error_reply(&error)
        }
        Action::Serialize(handle) => serialize_reply(&handle),
        Action::Defer(handle) => {
            let registration = context.registry.register(handle.link());

            // The playlist may have finished loading between dispatch and
            // registration; re-check once so such a request is not stuck
            // waiting for a notification that already fired.
            if handle.is_loaded() {
                drop(registration);
                return serialize_reply(&handle);
            }

            match registration.wait(context.load_wait).await {
                WaitOutcome::Completed => serialize_reply(&handle),
                WaitOutcome::TimedOut => {
                    tracing::debug!(playlist = %handle.link(), "load wait expired");
                    error_reply(&RequestError::LoadTimeout)
                }
            }
        }
    }
}

fn serialize_reply(handle: &PlaylistHandle) -> warp::reply::Response {
    match handle.snapshot() {
        Ok(snapshot) => {
            let document = playlist_document(&snapshot);
            json_reply(StatusCode::OK, &document)
        }
        Err(error) => {
            tracing::warn!(playlist = %handle.link(), %error, "snapshot failed");
            error_reply(&RequestError::from(error))
        }
    }
}

fn error_reply(error: &RequestError) -> warp::reply::Response {
    let body = serde_json::json!({ "message": error.message() });
    json_reply(error.status(), &body)
}

fn json_reply(status: StatusCode, document: &serde_json::Value) -> warp::reply::Response {
    let mut response = warp::reply::Response::new(Body::from(document.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=UTF-8"),
    );
    response
        .headers_mut()
        .insert(SERVER, HeaderValue::from_static(SERVER_IDENT));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_replies_carry_fixed_headers_and_body() {
        let response = error_reply(&RequestError::BadRequest("Bad Request".to_string()));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json; charset=UTF-8"
        );
        assert_eq!(response.headers().get(SERVER).unwrap(), SERVER_IDENT);
    }

    #[test]
    fn status_mapping_matches_the_taxonomy() {
        let cases = [
            (
                RequestError::BadRequest("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (RequestError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (RequestError::NotImplemented, StatusCode::NOT_IMPLEMENTED),
            (
                RequestError::Backend("x".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (RequestError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
            (RequestError::LoadTimeout, StatusCode::GATEWAY_TIMEOUT),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error:?}");
        }
    }
}
