//! End-to-end tests for the playlist bridge.
//!
//! These wire the full stack together — in-memory backend, session pump,
//! reactor, pending-load registry and HTTP server — bind a real port, and
//! talk to it over HTTP.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use bridge_backend::{
    BackendError, MemoryBackend, PlaylistLink, PlaylistSnapshot, TrackSnapshot,
};
use bridge_server::{BridgeContext, BridgeServer, SERVER_IDENT};
use load_registry::PendingLoadRegistry;
use session_pump::{Reactor, ReactorHandle, SessionPump};

struct TestBridge {
    backend: Arc<MemoryBackend>,
    registry: PendingLoadRegistry,
    reactor_handle: ReactorHandle,
    reactor_task: tokio::task::JoinHandle<Result<(), BackendError>>,
    server: Option<BridgeServer>,
    client: reqwest::Client,
    base_url: String,
}

impl TestBridge {
    async fn start(load_wait: Duration) -> Self {
        let waker = Arc::new(Notify::new());
        let backend = Arc::new(MemoryBackend::new(waker.clone()));
        let registry = PendingLoadRegistry::new();

        let pump = SessionPump::new(backend.clone(), registry.clone());
        let reactor = Arc::new(Reactor::new(backend.clone(), pump, waker));
        let reactor_handle = reactor.handle();
        let reactor_task = tokio::spawn({
            let reactor = reactor.clone();
            async move { reactor.run().await }
        });

        let context =
            BridgeContext::new(backend.clone(), registry.clone()).with_load_wait(load_wait);
        let server = BridgeServer::bind(([127, 0, 0, 1], 0).into(), context)
            .await
            .expect("failed to bind test server");
        let base_url = format!("http://127.0.0.1:{}", server.port());

        Self {
            backend,
            registry,
            reactor_handle,
            reactor_task,
            server: Some(server),
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn stop(mut self) {
        self.reactor_handle.stop();
        let _ = self.reactor_task.await;
        if let Some(server) = self.server.take() {
            server.shutdown().await;
        }
    }
}

fn link(s: &str) -> PlaylistLink {
    PlaylistLink::parse(s).unwrap()
}

fn rich_playlist(uri: &str) -> PlaylistSnapshot {
    PlaylistSnapshot {
        creator: "liesen".to_string(),
        uri: uri.to_string(),
        title: "Road trip".to_string(),
        collaborative: false,
        description: None,
        subscriber_count: 7,
        track_count: 5,
        tracks: vec![
            TrackSnapshot {
                loaded: true,
                uri: "spotify:track:t1aaaaaaaaaaaaaaaaaaaa".to_string(),
                title: Some("First".to_string()),
                album: Some("Album A".to_string()),
                artists: vec!["Artist A".to_string(), "Artist B".to_string()],
                duration_ms: 210_000,
                popularity: 55,
            },
            TrackSnapshot {
                loaded: false,
                uri: "spotify:track:t2aaaaaaaaaaaaaaaaaaaa".to_string(),
                title: None,
                album: None,
                artists: vec![],
                duration_ms: 0,
                popularity: 0,
            },
            TrackSnapshot {
                loaded: true,
                uri: "spotify:track:t3aaaaaaaaaaaaaaaaaaaa".to_string(),
                title: Some("Third".to_string()),
                album: None,
                artists: vec!["Artist C".to_string()],
                duration_ms: 0,
                popularity: 0,
            },
            TrackSnapshot {
                loaded: false,
                uri: "spotify:track:t4aaaaaaaaaaaaaaaaaaaa".to_string(),
                title: None,
                album: None,
                artists: vec![],
                duration_ms: 0,
                popularity: 0,
            },
            TrackSnapshot {
                loaded: true,
                uri: "spotify:track:t5aaaaaaaaaaaaaaaaaaaa".to_string(),
                title: Some("Fifth".to_string()),
                album: Some("Album B".to_string()),
                artists: vec!["Artist A".to_string()],
                duration_ms: 185_000,
                popularity: 12,
            },
        ],
    }
}

#[tokio::test]
async fn invalid_identifier_is_bad_request() {
    let bridge = TestBridge::start(Duration::from_secs(5)).await;

    let response = bridge
        .client
        .get(bridge.url("/playlist/badid"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].is_string());

    bridge.stop().await;
}

#[tokio::test]
async fn unresolvable_identifier_is_not_found() {
    let bridge = TestBridge::start(Duration::from_secs(5)).await;

    let response = bridge
        .client
        .get(bridge.url("/playlist/spotify:playlist:validButUnresolvable"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Playlist not found");

    bridge.stop().await;
}

#[tokio::test]
async fn loaded_playlist_replies_immediately() {
    let bridge = TestBridge::start(Duration::from_secs(5)).await;
    let uri = "spotify:playlist:roadTrip12345";
    bridge
        .backend
        .insert_playlist(link(uri), rich_playlist(uri));

    let response = bridge
        .client
        .get(bridge.url(&format!("/playlist/{uri}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=UTF-8"
    );
    assert_eq!(response.headers()["server"], SERVER_IDENT);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["creator"], "liesen");
    assert_eq!(body["uri"], uri);
    assert_eq!(body["title"], "Road trip");
    assert_eq!(body["collaborative"], false);
    assert_eq!(body["subscriberCount"], 7);
    // Backend-reported total versus loaded-only array.
    assert_eq!(body["trackCount"], 5);
    assert_eq!(body["tracks"].as_array().unwrap().len(), 3);
    // No description was set, so the key is absent.
    assert!(body.get("description").is_none());

    // References balance once the request is done.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.backend.outstanding_refs(), 0);

    bridge.stop().await;
}

#[tokio::test]
async fn percent_encoded_identifier_resolves() {
    let bridge = TestBridge::start(Duration::from_secs(5)).await;
    let uri = "spotify:playlist:roadTrip12345";
    bridge
        .backend
        .insert_playlist(link(uri), rich_playlist(uri));

    let response = bridge
        .client
        .get(bridge.url("/playlist/spotify%3Aplaylist%3AroadTrip12345"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["uri"], uri);

    bridge.stop().await;
}

#[tokio::test]
async fn non_get_method_is_not_implemented() {
    let bridge = TestBridge::start(Duration::from_secs(5)).await;

    let response = bridge
        .client
        .post(bridge.url("/playlist/spotify:playlist:whatever12345"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 501);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Not Implemented");

    bridge.stop().await;
}

#[tokio::test]
async fn deferred_request_completes_after_repeated_notifications() {
    let bridge = TestBridge::start(Duration::from_secs(5)).await;
    let uri = "spotify:playlist:slowLoader123";
    let l = link(uri);
    // Resolves but stays loading until we say otherwise.
    bridge
        .backend
        .insert_loading(l.clone(), rich_playlist(uri), Duration::from_secs(3600));

    let request = tokio::spawn({
        let client = bridge.client.clone();
        let url = bridge.url(&format!("/playlist/{uri}"));
        async move { client.get(url).send().await.unwrap() }
    });

    // Let the request reach the registry.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.registry.waiters_for(&l), 1);

    // Two state changes during the progressive load: not done yet.
    bridge.backend.emit_state_change(&l);
    bridge.backend.emit_state_change(&l);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.registry.waiters_for(&l), 1);

    // Third notification carries the loaded transition.
    bridge.backend.finish_loading(&l);

    let response = tokio::time::timeout(Duration::from_secs(2), request)
        .await
        .expect("deferred request never completed")
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["trackCount"], 5);

    // Exactly one completion happened; nothing is left behind.
    assert_eq!(bridge.registry.waiters_for(&l), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.backend.outstanding_refs(), 0);

    bridge.stop().await;
}

#[tokio::test]
async fn concurrent_waiters_each_get_one_reply() {
    let bridge = TestBridge::start(Duration::from_secs(5)).await;
    let uri = "spotify:playlist:sharedLoader1";
    let l = link(uri);
    bridge
        .backend
        .insert_loading(l.clone(), rich_playlist(uri), Duration::from_secs(3600));

    let spawn_get = |bridge: &TestBridge| {
        tokio::spawn({
            let client = bridge.client.clone();
            let url = bridge.url(&format!("/playlist/{uri}"));
            async move { client.get(url).send().await.unwrap() }
        })
    };
    let first = spawn_get(&bridge);
    let second = spawn_get(&bridge);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.registry.waiters_for(&l), 2);

    bridge.backend.finish_loading(&l);

    for request in [first, second] {
        let response = tokio::time::timeout(Duration::from_secs(2), request)
            .await
            .expect("waiter never completed")
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.backend.outstanding_refs(), 0);

    bridge.stop().await;
}

#[tokio::test]
async fn load_wait_expiry_answers_with_timeout() {
    let bridge = TestBridge::start(Duration::from_millis(150)).await;
    let uri = "spotify:playlist:neverLoads123";
    let l = link(uri);
    bridge
        .backend
        .insert_loading(l.clone(), rich_playlist(uri), Duration::from_secs(3600));

    let response = bridge
        .client
        .get(bridge.url(&format!("/playlist/{uri}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 504);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "playlist load timed out");

    // The registration was aborted and the handle released.
    assert_eq!(bridge.registry.waiters_for(&l), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.backend.outstanding_refs(), 0);

    // A load that finishes afterwards completes nobody.
    bridge.backend.finish_loading(&l);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.registry.pending_links(), 0);

    bridge.stop().await;
}

#[tokio::test]
async fn dropped_connection_aborts_the_registration() {
    let bridge = TestBridge::start(Duration::from_secs(10)).await;
    let uri = "spotify:playlist:abandonedLoad";
    let l = link(uri);
    bridge
        .backend
        .insert_loading(l.clone(), rich_playlist(uri), Duration::from_secs(3600));

    // A client that gives up (and closes the connection) after 100ms.
    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let result = impatient
        .get(bridge.url(&format!("/playlist/{uri}")))
        .send()
        .await;
    assert!(result.is_err(), "expected the client-side timeout to fire");

    // The dropped handler future unwound its registration and handle.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(bridge.registry.waiters_for(&l), 0);
    assert_eq!(bridge.backend.outstanding_refs(), 0);

    bridge.stop().await;
}

#[tokio::test]
async fn unknown_routes_are_bad_requests() {
    let bridge = TestBridge::start(Duration::from_secs(5)).await;

    for path in ["/", "/playlist", "/playlist/", "/album/spotify:album:a1"] {
        let response = bridge.client.get(bridge.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 400, "path {path:?}");
    }

    bridge.stop().await;
}
