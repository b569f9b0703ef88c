use serde_json::{json, Value};

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8020
}

pub fn default_url() -> String {
    "http://localhost:8020/sse".to_string()
}

pub fn default_tool_timeout() -> u64 {
    30
}

pub fn default_keep_alive() -> u64 {
    15
}

pub fn default_request_timeout() -> u64 {
    30
}

pub fn default_connect_timeout() -> u64 {
    10
}

pub fn default_call_name() -> String {
    "greet".to_string()
}

pub fn default_call_arguments() -> Value {
    json!({ "name": "Ford" })
}
