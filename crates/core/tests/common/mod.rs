//! In-process fake waiting room for HTTP-level tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;

/// What the fake answers to a ticket or check-in call.
#[derive(Debug, Clone)]
pub enum Reply {
    Ticket(Value),
    Status(u16),
    Problem { status: u16, detail: String },
}

/// One request the fake received.
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
    pub cookie: Option<String>,
}

#[derive(Debug, Default)]
pub struct RoomState {
    pub ticket_replies: VecDeque<Reply>,
    pub check_in_replies: VecDeque<Reply>,
    pub hits: Vec<Hit>,
}

pub type SharedRoom = Arc<Mutex<RoomState>>;

pub fn queued(id: &str, nonce: &str, check_in_after: i64) -> Value {
    json!({
        "id": id,
        "room": "main",
        "nonce": nonce,
        "createdTime": check_in_after - 30,
        "checkInAfter": check_in_after,
        "tokenExpires": 0,
        "queuePosition": 5,
        "status": "Queued"
    })
}

pub fn processed(id: &str, token: &str) -> Value {
    json!({
        "id": id,
        "room": "main",
        "nonce": format!("{}-final", id),
        "checkInAfter": 0,
        "tokenExpires": 4102444800i64,
        "queuePosition": 0,
        "status": "Processed",
        "token": token
    })
}

fn respond(reply: Option<Reply>) -> Response {
    match reply {
        Some(Reply::Ticket(body)) => Json(body).into_response(),
        Some(Reply::Status(status)) => status_code(status).into_response(),
        Some(Reply::Problem { status, detail }) => (
            status_code(status),
            [(header::CONTENT_TYPE, "application/problem+json")],
            json!({ "title": "Ticket rejected", "status": status, "detail": detail }).to_string(),
        )
            .into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn request_ticket(
    State(room): State<SharedRoom>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut state = room.lock().await;
    state.hits.push(Hit {
        method: Method::POST,
        path: "/Ticket".to_string(),
        query,
        body: None,
        cookie: cookie(&headers),
    });
    let reply = state.ticket_replies.pop_front();
    respond(reply)
}

async fn release_ticket(State(room): State<SharedRoom>, Json(body): Json<Value>) -> Response {
    room.lock().await.hits.push(Hit {
        method: Method::DELETE,
        path: "/Ticket".to_string(),
        query: HashMap::new(),
        body: Some(body),
        cookie: None,
    });
    StatusCode::OK.into_response()
}

async fn check_in(State(room): State<SharedRoom>, Json(body): Json<Value>) -> Response {
    let mut state = room.lock().await;
    state.hits.push(Hit {
        method: Method::PUT,
        path: "/Ticket/check-in".to_string(),
        query: HashMap::new(),
        body: Some(body),
        cookie: None,
    });
    let reply = state.check_in_replies.pop_front();
    respond(reply)
}

async fn page(State(room): State<SharedRoom>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    room.lock().await.hits.push(Hit {
        method,
        path: uri.path().to_string(),
        query: HashMap::new(),
        body: None,
        cookie: cookie(&headers),
    });
    if uri.path() == "/missing.js" {
        return StatusCode::NOT_FOUND.into_response();
    }
    "<html>ok</html>".into_response()
}

/// Start the fake on an ephemeral port. Returns its base URL.
pub async fn spawn_room(room: SharedRoom) -> String {
    let router = Router::new()
        .route("/Ticket", post(request_ticket).delete(release_ticket))
        .route("/Ticket/check-in", axum::routing::put(check_in))
        .fallback(page)
        .with_state(room);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            panic!("fake waiting room error: {err}");
        }
    });

    format!("http://{}", addr)
}

pub async fn hits(room: &SharedRoom) -> Vec<Hit> {
    room.lock().await.hits.clone()
}
