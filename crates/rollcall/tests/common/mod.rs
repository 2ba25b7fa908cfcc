//! In-process ledger server for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use rollcall::Config;

/// Shared state of the stub server.
#[derive(Debug, Default)]
pub struct Ledger {
    pub members: Vec<String>,
    pub records: Mutex<Vec<Value>>,
    /// Status returned by `POST /api/checkin`; 200 when unset.
    pub checkin_status: Option<StatusCode>,
    pub checkins: Mutex<Vec<Value>>,
    pub events: Mutex<Vec<Value>>,
    /// Frames sent to every push client right after it connects.
    pub push_frames: Vec<String>,
    /// Close push connections after sending `push_frames`.
    pub close_after_push: bool,
    pub push_connections: AtomicUsize,
}

impl Ledger {
    pub fn push_connections(&self) -> usize {
        self.push_connections.load(Ordering::SeqCst)
    }
}

/// A running stub server.
#[derive(Debug)]
pub struct StubServer {
    pub addr: SocketAddr,
    pub ledger: Arc<Ledger>,
}

impl StubServer {
    pub async fn start(ledger: Ledger) -> Self {
        let ledger = Arc::new(ledger);
        let app = Router::new()
            .route("/api/members", get(members))
            .route("/api/records", get(records))
            .route("/api/checkin", post(checkin))
            .route("/api/events", post(events))
            .route("/ws/records", get(push))
            .with_state(Arc::clone(&ledger));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });

        Self { addr, ledger }
    }

    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Development config pointing at this server.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.api.development_origin = self.origin();
        config
    }
}

/// A `new_checkin` envelope.
pub fn new_checkin(name: &str, category: &str, timestamp: &str) -> String {
    json!({
        "type": "new_checkin",
        "data": { "name": name, "type": category, "timestamp": timestamp },
    })
    .to_string()
}

async fn members(State(ledger): State<Arc<Ledger>>) -> Json<Value> {
    Json(json!({ "members": ledger.members }))
}

async fn records(State(ledger): State<Arc<Ledger>>) -> Json<Value> {
    let records = ledger.records.lock().expect("lock").clone();
    Json(json!({ "records": records }))
}

async fn checkin(State(ledger): State<Arc<Ledger>>, Json(body): Json<Value>) -> StatusCode {
    let status = ledger.checkin_status.unwrap_or(StatusCode::OK);
    if status.is_success() {
        ledger.checkins.lock().expect("lock").push(body);
    }
    status
}

async fn events(State(ledger): State<Arc<Ledger>>, Json(body): Json<Value>) -> StatusCode {
    ledger.events.lock().expect("lock").push(body);
    StatusCode::CREATED
}

async fn push(ws: WebSocketUpgrade, State(ledger): State<Arc<Ledger>>) -> axum::response::Response {
    ws.on_upgrade(move |socket| serve_push(socket, ledger))
}

async fn serve_push(mut socket: WebSocket, ledger: Arc<Ledger>) {
    ledger.push_connections.fetch_add(1, Ordering::SeqCst);

    for frame in &ledger.push_frames {
        if socket.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }

    if ledger.close_after_push {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    // Hold the connection until the client goes away.
    while let Some(Ok(msg)) = socket.recv().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }
}
