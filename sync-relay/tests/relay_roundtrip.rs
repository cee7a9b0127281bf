//! End-to-end tests: a fake KOSync server, the relay, and the real client.
//!
//! Every test binds ephemeral ports on 127.0.0.1, so they run without any
//! external service.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use kosync_relay::{serve, Config, RelayServer};
use serde_json::{json, Value};
use sync_client::{
    ClientConfig, DirectOptions, HttpRequest, KoSyncClient, RelayTransport, ReqwestTransport,
    Transport,
};
use sync_core::DocumentIdentity;
use sync_types::{ChecksumMethod, DeviceId};
use tokio::net::TcpListener;

// ============================================================================
// Fake KOSync server
// ============================================================================

#[derive(Default)]
struct FakeKosync {
    users: HashMap<String, String>,
    progress: HashMap<(String, String), Value>,
    accept_headers: Vec<String>,
}

type Shared = Arc<Mutex<FakeKosync>>;
type Reply = (StatusCode, Json<Value>);

fn authorized(state: &FakeKosync, headers: &HeaderMap) -> Option<String> {
    let user = headers.get("x-auth-user")?.to_str().ok()?;
    let key = headers.get("x-auth-key")?.to_str().ok()?;
    (state.users.get(user).map(String::as_str) == Some(key)).then(|| user.to_string())
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"code": 2001, "message": "Unauthorized"})),
    )
}

async fn auth(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut state = state.lock().unwrap();
    if let Some(accept) = headers.get("accept").and_then(|v| v.to_str().ok()) {
        state.accept_headers.push(accept.to_string());
    }
    match authorized(&state, &headers) {
        Some(_) => (StatusCode::OK, Json(json!({"authorized": "OK"}))),
        None => unauthorized(),
    }
}

async fn create(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut state = state.lock().unwrap();
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    if username.is_empty() || state.users.contains_key(&username) {
        return (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({"code": 2002, "message": "Username is already registered."})),
        );
    }
    state.users.insert(username.clone(), password);
    (StatusCode::CREATED, Json(json!({"username": username})))
}

async fn get_progress(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(digest): Path<String>,
) -> Reply {
    let state = state.lock().unwrap();
    let Some(user) = authorized(&state, &headers) else {
        return unauthorized();
    };
    let record = state
        .progress
        .get(&(user, digest))
        .cloned()
        .unwrap_or_else(|| json!({}));
    (StatusCode::OK, Json(record))
}

async fn put_progress(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Reply {
    let mut state = state.lock().unwrap();
    let Some(user) = authorized(&state, &headers) else {
        return unauthorized();
    };
    let digest = body["document"].as_str().unwrap_or_default().to_string();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    body["timestamp"] = json!(timestamp);
    state.progress.insert((user, digest.clone()), body);
    (
        StatusCode::OK,
        Json(json!({"document": digest, "timestamp": timestamp})),
    )
}

async fn maintenance() -> Html<&'static str> {
    Html("<html><body>Down for maintenance</body></html>")
}

async fn spawn_kosync() -> (String, Shared) {
    let state = Shared::default();
    let app = Router::new()
        .route("/users/auth", get(auth))
        .route("/users/create", post(create))
        .route("/syncs/progress/:digest", get(get_progress))
        .route("/syncs/progress", put(put_progress))
        .route("/maintenance", get(maintenance))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

async fn spawn_relay() -> (String, Arc<RelayServer>) {
    let relay = Arc::new(RelayServer::new(Config::default()).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(
        relay.clone(),
        listener,
        std::future::pending::<()>(),
    ));
    (format!("http://{addr}"), relay)
}

// ============================================================================
// Helpers
// ============================================================================

fn client_config(server_url: &str) -> ClientConfig {
    ClientConfig {
        server_url: server_url.to_string(),
        username: String::new(),
        userkey: None,
        checksum_method: ChecksumMethod::Binary,
        device_id: DeviceId::random(),
        device_name: "Test Device".into(),
    }
}

fn direct(server_url: &str) -> ReqwestTransport {
    ReqwestTransport::new(server_url, DirectOptions::default()).unwrap()
}

fn via_relay(relay_url: &str, server_url: &str) -> RelayTransport<ReqwestTransport> {
    RelayTransport::new(direct(relay_url), &format!("{server_url}/"), "/api/kosync")
}

fn dune() -> DocumentIdentity {
    DocumentIdentity::titled("Dune").with_content_hash("0123456789abcdef0123456789abcdef")
}

async fn exercise<T: Transport>(client: &mut KoSyncClient<T>) {
    let outcome = client.connect("alice", "secret").await;
    assert!(outcome.success, "connect failed: {}", outcome.message);
    assert_eq!(outcome.message, "Registration successful.");

    assert!(client.get_progress(&dune()).await.is_none());
    assert!(client.update_progress(&dune(), "42", 0.42).await);

    let record = client.get_progress(&dune()).await.unwrap();
    assert_eq!(record.progress.as_deref(), Some("42"));
    assert_eq!(record.percentage, Some(0.42));
    assert_eq!(record.device.as_deref(), Some("Test Device"));
    assert!(record.is_usable());
}

// ============================================================================
// Round Trip Tests
// ============================================================================

#[tokio::test]
async fn full_flow_direct() {
    let (server, _state) = spawn_kosync().await;
    let mut client = KoSyncClient::new(client_config(&server), direct(&server));

    exercise(&mut client).await;
}

#[tokio::test]
async fn full_flow_through_relay() {
    let (server, _state) = spawn_kosync().await;
    let (relay_url, relay) = spawn_relay().await;
    let mut client = KoSyncClient::new(client_config(&server), via_relay(&relay_url, &server));

    exercise(&mut client).await;

    // auth, create, get, put, get
    let metrics = relay.metrics();
    assert_eq!(metrics.requests_total.load(Ordering::Relaxed), 5);
    assert_eq!(metrics.relayed_total.load(Ordering::Relaxed), 5);
    assert_eq!(metrics.upstream_errors_total.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn login_after_registration_through_relay() {
    let (server, _state) = spawn_kosync().await;
    let (relay_url, _relay) = spawn_relay().await;

    let mut first = KoSyncClient::new(client_config(&server), direct(&server));
    assert!(first.connect("alice", "secret").await.success);

    let mut second = KoSyncClient::new(client_config(&server), via_relay(&relay_url, &server));
    let outcome = second.connect("alice", "secret").await;
    assert!(outcome.success);
    assert_eq!(outcome.message, "Login successful.");

    // Progress written by one device is visible to the other
    assert!(first.update_progress(&dune(), "7", 0.07).await);
    let record = second.get_progress(&dune()).await.unwrap();
    assert_eq!(record.progress.as_deref(), Some("7"));
}

#[tokio::test]
async fn statuses_are_mirrored_through_relay() {
    let (server, _state) = spawn_kosync().await;
    let (relay_url, _relay) = spawn_relay().await;

    let mut owner = KoSyncClient::new(client_config(&server), direct(&server));
    assert!(owner.connect("alice", "secret").await.success);

    let mut intruder = KoSyncClient::new(client_config(&server), via_relay(&relay_url, &server));
    let outcome = intruder.connect("alice", "wrong").await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "Invalid credentials.");
}

#[tokio::test]
async fn relay_sends_koreader_accept_header() {
    let (server, state) = spawn_kosync().await;
    let (relay_url, _relay) = spawn_relay().await;
    let transport = via_relay(&relay_url, &server);

    let response = transport
        .execute(HttpRequest::get("/users/auth").header("Accept", "text/html"))
        .await
        .unwrap();
    assert_eq!(response.status, 401);

    let seen = state.lock().unwrap().accept_headers.clone();
    assert_eq!(seen, vec!["application/vnd.koreader.v1+json".to_string()]);
}

// ============================================================================
// Relay Failure Tests
// ============================================================================

#[tokio::test]
async fn non_json_upstream_is_rejected() {
    let (server, _state) = spawn_kosync().await;
    let (relay_url, relay) = spawn_relay().await;
    let transport = via_relay(&relay_url, &server);

    let response = transport
        .execute(HttpRequest::get("/maintenance"))
        .await
        .unwrap();

    assert_eq!(response.status, 500);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["error"], "Proxy request failed");
    assert_eq!(
        body["details"],
        "Invalid sync server response: Unexpected Content-Type."
    );
    assert_eq!(
        relay.metrics().upstream_errors_total.load(Ordering::Relaxed),
        1
    );
}

#[tokio::test]
async fn unreachable_server_through_relay_fails_softly() {
    let (relay_url, _relay) = spawn_relay().await;
    let mut client = KoSyncClient::new(
        client_config("http://127.0.0.1:9"),
        via_relay(&relay_url, "http://127.0.0.1:9"),
    );

    let outcome = client.connect("alice", "secret").await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "Authorization failed with status: 500");
}
