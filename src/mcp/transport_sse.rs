// SSE (Server-Sent Events) transport for MCP-style tool servers.
//
// The client holds one GET stream open. The server's first event names the
// endpoint requests are POSTed to; responses come back on the stream and are
// routed to their waiter by request id.

use futures::StreamExt;
use reqwest::header::CACHE_CONTROL;
use reqwest::Url;
use reqwest_eventsource::retry::Never;
use reqwest_eventsource::{Event, EventSource};
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::types::{JsonRpcRequest, JsonRpcResponse};
use crate::config::defaults::{default_connect_timeout, default_request_timeout};
use crate::error::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(default_connect_timeout()),
            request_timeout: Duration::from_secs(default_request_timeout()),
        }
    }
}

type EventStream = Pin<Box<EventSource>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, ToolError>>>>>;

pub struct SseTransport {
    url: Url,
    endpoint: Url,
    session_id: Option<String>,
    http: reqwest::Client,
    pending: PendingMap,
    next_id: AtomicU64,
    state: Arc<watch::Sender<ConnectionState>>,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
    request_timeout: Duration,
}

impl SseTransport {
    /// Opens the event stream and waits for the server to announce its
    /// message endpoint.
    pub async fn connect(url: &str, options: TransportOptions) -> Result<Self, ToolError> {
        let url = Url::parse(url)
            .map_err(|e| ToolError::transport(format!("Invalid server URL '{}': {}", url, e)))?;

        let state = Arc::new(watch::Sender::new(ConnectionState::Connecting));

        let http = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| ToolError::transport(format!("Failed to build HTTP client: {}", e)))?;

        let request = http.get(url.clone()).header(CACHE_CONTROL, "no-cache");
        let mut source = EventSource::new(request)
            .map_err(|e| ToolError::transport(format!("Failed to open SSE stream: {}", e)))?;
        // No reconnect: a dropped stream ends the connection
        source.set_retry_policy(Box::new(Never));
        let mut source: EventStream = Box::pin(source);

        let endpoint =
            match timeout(options.connect_timeout, open_stream(&mut source, &url)).await {
                Ok(Ok(endpoint)) => endpoint,
                Ok(Err(e)) => {
                    state.send_replace(ConnectionState::Disconnected);
                    return Err(e);
                }
                Err(_) => {
                    state.send_replace(ConnectionState::Disconnected);
                    return Err(ToolError::transport(format!(
                        "Timed out after {} seconds waiting for the server endpoint",
                        options.connect_timeout.as_secs()
                    )));
                }
            };

        let session_id = endpoint
            .query_pairs()
            .find(|(key, _)| key == "session_id")
            .map(|(_, value)| value.into_owned());
        debug!(endpoint = %endpoint, "SSE endpoint announced");

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        state.send_replace(ConnectionState::Connected);
        let reader = tokio::spawn(read_events(source, pending.clone(), state.clone()));

        Ok(Self {
            url,
            endpoint,
            session_id,
            http,
            pending,
            next_id: AtomicU64::new(1),
            state,
            reader: std::sync::Mutex::new(Some(reader)),
            request_timeout: options.request_timeout,
        })
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub async fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value, ToolError> {
        if self.state() != ConnectionState::Connected {
            return Err(ToolError::transport("Not connected"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        // close() flips the state before draining, so a request registered
        // after the drain is caught here
        if self.state() != ConnectionState::Connected {
            self.pending.lock().await.remove(&id);
            return Err(ToolError::cancelled("Connection closed"));
        }

        if let Err(e) = self.post(&request).await {
            self.pending.lock().await.remove(&id);
            warn!(id, method, "Request could not be delivered, closing connection: {}", e);
            self.close().await;
            return Err(e);
        }

        match timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ToolError::cancelled(
                "Connection closed before a response arrived",
            )),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(ToolError::cancelled(format!(
                    "Request '{}' timed out after {} seconds",
                    method,
                    self.request_timeout.as_secs()
                )))
            }
        }
    }

    pub async fn send_notification(&self, method: &str) -> Result<(), ToolError> {
        if self.state() != ConnectionState::Connected {
            return Err(ToolError::transport("Not connected"));
        }
        self.post(&JsonRpcRequest::notification(method)).await
    }

    async fn post(&self, message: &JsonRpcRequest) -> Result<(), ToolError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.request_timeout)
            .json(message)
            .send()
            .await
            .map_err(|e| ToolError::transport(format!("Failed to send message: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::transport(format!(
                "Server rejected message (status {}): {}",
                status, text
            )));
        }
        Ok(())
    }

    /// Stops the reader and resolves every outstanding request as cancelled.
    /// Safe to call more than once.
    pub async fn close(&self) {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = reader {
            handle.abort();
            debug!(url = %self.url, "SSE connection closed");
        }
        self.state.send_replace(ConnectionState::Disconnected);
        fail_pending(&self.pending, ToolError::cancelled("Connection closed")).await;
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        let reader = self
            .reader
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = reader {
            handle.abort();
        }
    }
}

/// Reads until the server names its message endpoint. Anything arriving
/// before that is ignored.
async fn open_stream(source: &mut EventStream, url: &Url) -> Result<Url, ToolError> {
    while let Some(event) = source.next().await {
        match event {
            Ok(Event::Open) => debug!(url = %url, "SSE stream opened"),
            Ok(Event::Message(message)) if message.event == "endpoint" => {
                return url.join(message.data.trim()).map_err(|e| {
                    ToolError::transport(format!("Invalid endpoint '{}': {}", message.data, e))
                });
            }
            Ok(Event::Message(message)) => {
                debug!(event = %message.event, "Ignoring event before endpoint");
            }
            Err(reqwest_eventsource::Error::InvalidStatusCode(status, _)) => {
                return Err(ToolError::transport(format!(
                    "SSE connection to {} failed with status {}",
                    url, status
                )));
            }
            Err(reqwest_eventsource::Error::StreamEnded) => break,
            Err(e) => {
                return Err(ToolError::transport(format!(
                    "Failed to connect to {}: {}",
                    url, e
                )));
            }
        }
    }

    Err(ToolError::transport(
        "Event stream ended before the server announced an endpoint",
    ))
}

async fn read_events(
    mut source: EventStream,
    pending: PendingMap,
    state: Arc<watch::Sender<ConnectionState>>,
) {
    let reason = loop {
        match source.next().await {
            Some(Ok(Event::Message(message))) => {
                route_event(&pending, &message.event, &message.data).await
            }
            Some(Ok(Event::Open)) => {}
            Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                break "Server closed the event stream".to_string()
            }
            Some(Err(e)) => break format!("SSE stream error: {}", e),
        }
    };

    debug!("{}", reason);
    state.send_replace(ConnectionState::Disconnected);
    fail_pending(&pending, ToolError::cancelled(reason)).await;
}

async fn route_event(pending: &PendingMap, event: &str, data: &str) {
    if event != "message" {
        debug!(event, "Ignoring SSE event");
        return;
    }

    let response: JsonRpcResponse = match serde_json::from_str(data) {
        Ok(response) => response,
        Err(e) => {
            warn!("Discarding malformed message: {}", e);
            return;
        }
    };

    let Some(id) = response.id.as_u64() else {
        debug!(id = %response.id, "Response id does not match any request");
        return;
    };

    match pending.lock().await.remove(&id) {
        Some(tx) => {
            let _ = tx.send(response.into_result());
        }
        None => debug!(id, "No request waiting for response"),
    }
}

async fn fail_pending(pending: &PendingMap, error: ToolError) {
    let waiters: Vec<_> = pending.lock().await.drain().collect();
    for (_, tx) in waiters {
        let _ = tx.send(Err(error.clone()));
    }
}
