use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures::Stream;
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, warn};

use super::dispatch::ToolServer;
use super::session::{SessionGuard, SessionTable};
use crate::error::ToolError;
use crate::mcp::types::{JsonRpcRequest, JsonRpcResponse, RequestId, JSONRPC_VERSION};

pub const SSE_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages/";

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<ToolServer>,
    pub sessions: Arc<SessionTable>,
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(server: Arc<ToolServer>, keep_alive: Duration) -> Self {
        Self {
            server,
            sessions: Arc::new(SessionTable::new()),
            keep_alive,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(SSE_PATH, get(handle_sse))
        .route(MESSAGES_PATH, post(handle_message))
        .layer(cors)
        .with_state(state)
}

async fn handle_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session_id, mut rx) = state.sessions.create_session().await;
    let endpoint = format!("{}?session_id={}", MESSAGES_PATH, session_id);
    let guard = SessionGuard {
        sessions: state.sessions.clone(),
        session_id,
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint));
        while let Some(msg) = rx.recv().await {
            yield Ok::<_, Infallible>(Event::default().event("message").data(msg));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive))
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(session_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };

    let Some(sender) = state.sessions.sender(&session_id).await else {
        return (StatusCode::NOT_FOUND, "Session not found").into_response();
    };

    let message: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(session_id = %session_id, "Failed to parse JSON: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)).into_response();
        }
    };

    let request = match parse_request(message) {
        Ok(request) => request,
        Err(Some(response)) => {
            // Malformed request that still carries an id: answer on the stream
            push_response(&sender, &session_id, response).await;
            return StatusCode::ACCEPTED.into_response();
        }
        Err(None) => {
            return (StatusCode::BAD_REQUEST, "Invalid JSON-RPC message").into_response();
        }
    };

    let server = state.server.clone();
    tokio::spawn(async move {
        if let Some(response) = server.handle_request(request).await {
            push_response(&sender, &session_id, response).await;
        }
    });

    StatusCode::ACCEPTED.into_response()
}

fn parse_request(message: Value) -> Result<JsonRpcRequest, Option<JsonRpcResponse>> {
    let id = message
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

    let reject = |reason: String| {
        id.clone()
            .map(|id| JsonRpcResponse::failure(id, ToolError::validation(reason)))
    };

    let request = serde_json::from_value::<JsonRpcRequest>(message)
        .map_err(|e| reject(format!("Invalid JSON-RPC request: {}", e)))?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(reject(format!(
            "Unsupported JSON-RPC version '{}', expected '{}'",
            request.jsonrpc, JSONRPC_VERSION
        )));
    }
    Ok(request)
}

async fn push_response(
    sender: &tokio::sync::mpsc::Sender<String>,
    session_id: &str,
    response: JsonRpcResponse,
) {
    let payload = match serde_json::to_string(&response) {
        Ok(payload) => payload,
        Err(e) => {
            error!(session_id = %session_id, "Failed to encode response: {}", e);
            return;
        }
    };
    if sender.send(payload).await.is_err() {
        debug!(session_id = %session_id, id = %response.id, "Session closed before response was delivered");
    }
}
