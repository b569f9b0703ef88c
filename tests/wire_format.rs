mod common;

use axum::http::StatusCode;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

use common::{greet_registry, options, StubReply, StubServer, TestServer};
use tool_sse::error::ErrorKind;
use tool_sse::mcp::{ConnectionState, McpClient, McpToolCall};

fn lf_frame(event: &str, data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}

/// Responses carry an empty `event:` field, which names the default type.
fn unnamed_message_frame(event: &str, data: &str) -> String {
    if event == "message" {
        format!("event:\ndata: {}\n\n", data)
    } else {
        lf_frame(event, data)
    }
}

fn cr_frame(event: &str, data: &str) -> String {
    // A lone CR may still be half of a CRLF, so the trailing comment line
    // lets the blank line complete
    format!("event: {}\rdata: {}\r\r:\r", event, data)
}

fn crlf_frame(event: &str, data: &str) -> String {
    format!("event: {}\r\ndata: {}\r\n\r\n", event, data)
}

fn list_one_tool(message: &Value) -> StubReply {
    match message["method"].as_str() {
        Some("tools/list") => StubReply::Result(json!({
            "tools": [{ "name": "echo", "description": "Echo", "inputSchema": { "type": "object" } }]
        })),
        _ => StubReply::Result(json!({})),
    }
}

async fn connect(url: &str) -> McpClient {
    timeout(
        Duration::from_secs(10),
        McpClient::connect(url, options(Duration::from_secs(5))),
    )
    .await
    .expect("connect should not hang")
    .expect("client should connect")
}

#[tokio::test]
async fn test_empty_event_field_is_delivered_as_message() {
    let stub = StubServer::start(unnamed_message_frame, list_one_tool).await;
    let client = connect(&stub.url).await;
    assert_eq!(client.server_info().name, "stub");

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "echo");

    client.ping().await.unwrap();
    client.close().await;
}

#[tokio::test]
async fn test_cr_and_crlf_line_endings() {
    for frame in [cr_frame as fn(&str, &str) -> String, crlf_frame] {
        let stub = StubServer::start(frame, list_one_tool).await;
        let client = connect(&stub.url).await;
        assert_eq!(client.session_id(), Some("stub"));

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools[0].name, "echo");

        client.close().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejected_post_closes_connection_and_cancels_others() {
    let parked = Arc::new(Notify::new());
    let signal = parked.clone();
    let stub = StubServer::start(lf_frame, move |message| match message["method"].as_str() {
        Some("ping") => {
            signal.notify_one();
            StubReply::Silent
        }
        _ => StubReply::Status(StatusCode::INTERNAL_SERVER_ERROR),
    })
    .await;

    let client = Arc::new(connect(&stub.url).await);
    let pinger = client.clone();
    let outstanding = tokio::spawn(async move { pinger.ping().await });

    timeout(Duration::from_secs(5), parked.notified())
        .await
        .expect("ping should reach the server");

    let err = client
        .call_tool(&McpToolCall {
            name: "greet".to_string(),
            arguments: json!({}),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransportError);
    assert!(err.message.contains("500"));
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let result = timeout(Duration::from_secs(5), outstanding)
        .await
        .expect("outstanding request should resolve")
        .unwrap();
    assert_eq!(result.unwrap_err().kind, ErrorKind::Cancelled);
}

type Stream = Pin<Box<EventSource>>;

/// Opens a session by hand and returns the stream with its message URL.
async fn open_session(server: &TestServer) -> (Stream, String) {
    let mut source: Stream =
        Box::pin(EventSource::new(reqwest::Client::new().get(&server.url)).unwrap());
    loop {
        match timeout(Duration::from_secs(5), source.next()).await.unwrap() {
            Some(Ok(Event::Open)) => continue,
            Some(Ok(Event::Message(message))) if message.event == "endpoint" => {
                return (source, format!("{}{}", server.base, message.data));
            }
            other => panic!("unexpected event before endpoint: {:?}", other),
        }
    }
}

async fn next_message(source: &mut Stream) -> Value {
    loop {
        match timeout(Duration::from_secs(5), source.next()).await.unwrap() {
            Some(Ok(Event::Message(message))) if message.event == "message" => {
                return serde_json::from_str(&message.data).unwrap();
            }
            Some(Ok(_)) => continue,
            other => panic!("unexpected stream item: {:?}", other),
        }
    }
}

async fn post(endpoint: &str, body: Value) -> reqwest::StatusCode {
    reqwest::Client::new()
        .post(endpoint)
        .json(&body)
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_malformed_request_with_id_is_answered_on_stream() {
    let server = TestServer::start(greet_registry()).await;
    let (mut source, endpoint) = open_session(&server).await;

    let status = post(&endpoint, json!({ "jsonrpc": "2.0", "id": 9, "method": 5 })).await;
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let response = next_message(&mut source).await;
    assert_eq!(response["id"], json!(9));
    assert_eq!(response["error"]["kind"], "ValidationError");
    assert!(response.get("result").is_none());

    let status = post(&endpoint, json!({ "jsonrpc": "1.0", "id": 10, "method": "ping" })).await;
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let response = next_message(&mut source).await;
    assert_eq!(response["id"], json!(10));
    assert_eq!(response["error"]["kind"], "ValidationError");
    assert!(response["error"]["message"].as_str().unwrap().contains("1.0"));

    drop(source);
    server.stop().await;
}

#[tokio::test]
async fn test_negative_and_fractional_ids_are_echoed() {
    let server = TestServer::start(greet_registry()).await;
    let (mut source, endpoint) = open_session(&server).await;

    for id in [json!(-1), json!(2.5)] {
        let status = post(&endpoint, json!({ "jsonrpc": "2.0", "id": id, "method": "ping" })).await;
        assert_eq!(status, reqwest::StatusCode::ACCEPTED);

        let response = next_message(&mut source).await;
        assert_eq!(response["id"], id);
        assert!(response.get("error").is_none());
    }

    drop(source);
    server.stop().await;
}
