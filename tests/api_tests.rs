//! API integration tests
//!
//! Each test serves the router on an ephemeral local port backed by the
//! in-memory store and talks to it over real HTTP.

use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use user_stream::store::MemoryUserStore;
use user_stream::{AppState, Config};

fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: None,
        database_max_connections: 1,
        events_buffer_capacity: 16,
        events_keep_alive: Duration::from_secs(30),
    }
}

/// Start a server and return its base URL with the state behind it
async fn spawn_server() -> (String, AppState) {
    let state = AppState::with_store(Arc::new(MemoryUserStore::new()), test_config());
    let app = state.router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

/// Splits an SSE response body into `data:` payloads
struct EventReader {
    resp: Response,
    buf: String,
}

impl EventReader {
    fn new(resp: Response) -> Self {
        Self {
            resp,
            buf: String::new(),
        }
    }

    /// Next event payload, or None if nothing arrives within two seconds
    async fn next(&mut self) -> Option<Value> {
        loop {
            if let Some(end) = self.buf.find("\n\n") {
                let frame: String = self.buf.drain(..end + 2).collect();
                if let Some(data) = frame.trim().strip_prefix("data:") {
                    return Some(serde_json::from_str(data.trim()).unwrap());
                }
                // keep-alive comment
                continue;
            }
            let chunk = tokio::time::timeout(Duration::from_secs(2), self.resp.chunk())
                .await
                .ok()?
                .unwrap()?;
            self.buf.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    /// True if no bytes arrive within `wait`
    async fn is_quiet(&mut self, wait: Duration) -> bool {
        self.buf.is_empty() && tokio::time::timeout(wait, self.resp.chunk()).await.is_err()
    }
}

/// Open `/users/stream`
async fn open_stream(client: &Client, base: &str) -> EventReader {
    let resp = client
        .get(format!("{}/users/stream", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    EventReader::new(resp)
}

/// Wait until the hub reports `n` live subscribers
async fn wait_for_subscribers(state: &AppState, n: usize) {
    for _ in 0..100 {
        if state.users.hub().subscriber_count() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} subscribers, found {}",
        n,
        state.users.hub().subscriber_count()
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let (base, _state) = spawn_server().await;
    let client = Client::new();

    let resp = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_alice_scenario() {
    let (base, state) = spawn_server().await;
    let client = Client::new();

    let mut stream = open_stream(&client, &base).await;
    assert!(stream.resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    wait_for_subscribers(&state, 1).await;

    // Create
    let created: Value = client
        .post(format!("{}/users", base))
        .json(&json!({"name": "Alice", "email": "a@x.com"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().expect("generated id");
    assert_eq!(created["name"], "Alice");

    let event = stream.next().await.expect("created user on stream");
    assert_eq!(event, created);

    // Update
    let resp = client
        .put(format!("{}/users/{}", base, id))
        .json(&json!({"name": "Alice", "email": "b@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["id"], id);
    assert_eq!(updated["email"], "b@x.com");

    // Nothing more on the stream
    assert!(stream.is_quiet(Duration::from_millis(200)).await);

    // Read back and delete
    let fetched: Value = client
        .get(format!("{}/users/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, updated);

    let resp = client
        .delete(format!("{}/users/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{}/users/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_late_subscriber_gets_only_later_users() {
    let (base, state) = spawn_server().await;
    let client = Client::new();

    client
        .post(format!("{}/users", base))
        .json(&json!({"name": "Early", "email": "e@x.com"}))
        .send()
        .await
        .unwrap();

    let mut stream = open_stream(&client, &base).await;
    wait_for_subscribers(&state, 1).await;

    client
        .post(format!("{}/users", base))
        .json(&json!({"name": "Late", "email": "l@x.com"}))
        .send()
        .await
        .unwrap();

    let event = stream.next().await.unwrap();
    assert_eq!(event["name"], "Late");
}

#[tokio::test]
async fn test_two_streams_receive_all_creates_in_order() {
    let (base, state) = spawn_server().await;
    let client = Client::new();

    let mut s1 = open_stream(&client, &base).await;
    let mut s2 = open_stream(&client, &base).await;
    wait_for_subscribers(&state, 2).await;

    for name in ["one", "two", "three"] {
        client
            .post(format!("{}/users", base))
            .json(&json!({"name": name, "email": "n@x.com"}))
            .send()
            .await
            .unwrap();
    }

    for stream in [&mut s1, &mut s2] {
        let mut names = Vec::new();
        while names.len() < 3 {
            let event = stream.next().await.expect("event");
            names.push(event["name"].as_str().unwrap().to_string());
        }
        assert_eq!(names, ["one", "two", "three"]);
    }
}

#[tokio::test]
async fn test_disconnect_releases_subscription() {
    let (base, state) = spawn_server().await;
    let client = Client::new();

    let stream = open_stream(&client, &base).await;
    wait_for_subscribers(&state, 1).await;

    drop(stream);

    // The server notices the closed connection when a write to it fails
    for i in 0..50 {
        let resp = client
            .post(format!("{}/users", base))
            .json(&json!({"name": format!("u{}", i), "email": "u@x.com"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        if state.users.hub().subscriber_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state.users.hub().subscriber_count(), 0);
}

#[tokio::test]
async fn test_create_with_many_idle_streams() {
    let (base, state) = spawn_server().await;
    let client = Client::new();

    let mut streams = Vec::new();
    for _ in 0..100 {
        streams.push(open_stream(&client, &base).await);
    }
    wait_for_subscribers(&state, 100).await;

    let started = std::time::Instant::now();
    let resp = client
        .post(format!("{}/users", base))
        .json(&json!({"name": "Crowd", "email": "c@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(state.users.hub().stats().delivered, 100);
}
