//! Shared helpers for end-to-end tests
#![allow(dead_code)]

use serde_json::{Value, json};

use dedukt_lsp::config::ServerConfig;
use dedukt_lsp::lsp::server::{Server, default_dispatcher};

/// Frames a raw body with a Content-Length header.
pub fn frame(body: &str) -> Vec<u8> {
    format!("Content-Length: {}\r\n\r\n{}", body.len(), body).into_bytes()
}

pub fn create_request(id: i64, method: &str, params: Value) -> Vec<u8> {
    let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
    frame(&body.to_string())
}

pub fn create_notification(method: &str, params: Value) -> Vec<u8> {
    let body = json!({ "jsonrpc": "2.0", "method": method, "params": params });
    frame(&body.to_string())
}

pub fn create_initialize_request(id: i64) -> Vec<u8> {
    create_request(
        id,
        "initialize",
        json!({ "processId": null, "rootUri": null, "capabilities": {} }),
    )
}

pub fn create_initialized_notification() -> Vec<u8> {
    create_notification("initialized", json!({}))
}

pub fn create_did_open_notification(uri: &str, language_id: &str, text: &str) -> Vec<u8> {
    create_notification(
        "textDocument/didOpen",
        json!({
            "textDocument": { "uri": uri, "languageId": language_id, "version": 1, "text": text }
        }),
    )
}

pub fn create_hover_request(id: i64, uri: &str, line: u32, character: u32) -> Vec<u8> {
    create_request(
        id,
        "textDocument/hover",
        json!({
            "textDocument": { "uri": uri },
            "position": { "line": line, "character": character }
        }),
    )
}

/// Concatenates frames into one input stream.
pub fn session(frames: &[Vec<u8>]) -> Vec<u8> {
    frames.concat()
}

/// Runs a server with default configuration over `input` until it stops,
/// returning everything it wrote.
pub async fn run_session(input: &[u8]) -> Vec<u8> {
    run_session_with(input, ServerConfig::default()).await
}

/// Runs a server with `config` over `input`, returning everything it wrote.
pub async fn run_session_with(input: &[u8], config: ServerConfig) -> Vec<u8> {
    let mut server = Server::new(input, Vec::new(), config.reader_limits, default_dispatcher(&config));
    server.serve().await.expect("server loop failed");
    server.into_writer()
}

/// Splits server output into message bodies, checking every Content-Length
/// against the byte length of its body.
pub fn parse_frames(mut output: &[u8]) -> Vec<Value> {
    let mut messages = Vec::new();
    while !output.is_empty() {
        let separator = output
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .expect("frame without header terminator");
        let header = std::str::from_utf8(&output[..separator]).unwrap();
        let length: usize = header
            .strip_prefix("Content-Length: ")
            .expect("frame without Content-Length")
            .parse()
            .unwrap();

        let body_start = separator + 4;
        let body = &output[body_start..body_start + length];
        messages.push(serde_json::from_slice(body).expect("frame body is not JSON"));
        output = &output[body_start + length..];
    }
    messages
}

/// Runs a session and returns the decoded output messages.
pub async fn exchange(frames: &[Vec<u8>]) -> Vec<Value> {
    parse_frames(&run_session(&session(frames)).await)
}

pub fn error_code(message: &Value) -> Option<i64> {
    message["error"]["code"].as_i64()
}
