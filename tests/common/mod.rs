#![allow(dead_code)]

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use tool_sse::mcp::{McpClient, TransportOptions};
use tool_sse::server::{self, ToolServer};
use tool_sse::tools::ToolRegistry;

pub struct TestServer {
    pub url: String,
    pub base: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub async fn start(registry: ToolRegistry) -> Self {
        Self::start_with_timeout(registry, Duration::from_secs(30)).await
    }

    pub async fn start_with_timeout(registry: ToolRegistry, tool_timeout: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(ToolServer::new(registry, tool_timeout));
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(server::serve(
            listener,
            server,
            Duration::from_secs(15),
            async move {
                let _ = rx.await;
            },
        ));

        Self {
            url: format!("http://{}/sse", addr),
            base: format!("http://{}", addr),
            shutdown: Some(tx),
            handle,
        }
    }

    pub async fn connect(&self) -> McpClient {
        McpClient::connect(&self.url, options(Duration::from_secs(10)))
            .await
            .expect("client should connect")
    }

    /// Triggers graceful shutdown and waits for the server task to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(10), &mut self.handle)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
    }
}

pub fn options(request_timeout: Duration) -> TransportOptions {
    TransportOptions {
        connect_timeout: Duration::from_secs(5),
        request_timeout,
    }
}

pub fn greet_registry() -> ToolRegistry {
    ToolRegistry::with_builtin_tools().unwrap()
}

/// What the scripted server does with a request that carries an id.
pub enum StubReply {
    /// Push a success response on the event stream.
    Result(Value),
    /// Answer the POST with this status and push nothing.
    Status(StatusCode),
    /// Accept the POST and never answer.
    Silent,
}

type Framer = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;
type Responder = Arc<dyn Fn(&Value) -> StubReply + Send + Sync>;

#[derive(Clone)]
struct StubState {
    frame: Framer,
    respond: Responder,
    stream: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

/// A scripted SSE server that writes hand-built event frames, for wire
/// details the real server never produces. `frame(event, data)` renders
/// each outgoing event; `initialize` is answered automatically.
pub struct StubServer {
    pub url: String,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start<F, R>(frame: F, respond: R) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
        R: Fn(&Value) -> StubReply + Send + Sync + 'static,
    {
        let state = StubState {
            frame: Arc::new(frame),
            respond: Arc::new(respond),
            stream: Arc::new(Mutex::new(None)),
        };
        let app = Router::new()
            .route("/sse", get(stub_stream))
            .route("/messages/", post(stub_message))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/sse", addr),
            handle,
        }
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn stub_stream(State(state): State<StubState>) -> Response {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tx.send((state.frame)("endpoint", "/messages/?session_id=stub"))
        .unwrap();
    *state.stream.lock().unwrap() = Some(tx);

    let body = Body::from_stream(async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield Ok::<_, Infallible>(chunk);
        }
    });
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .unwrap()
}

async fn stub_message(State(state): State<StubState>, Json(message): Json<Value>) -> StatusCode {
    let Some(id) = message.get("id").cloned() else {
        return StatusCode::ACCEPTED;
    };

    let reply = if message["method"] == "initialize" {
        StubReply::Result(json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": { "name": "stub", "version": "0" },
            "capabilities": {}
        }))
    } else {
        (state.respond)(&message)
    };

    match reply {
        StubReply::Result(result) => {
            let data = json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string();
            if let Some(tx) = state.stream.lock().unwrap().as_ref() {
                let _ = tx.send((state.frame)("message", &data));
            }
            StatusCode::ACCEPTED
        }
        StubReply::Status(status) => status,
        StubReply::Silent => StatusCode::ACCEPTED,
    }
}
