// crates/l10n-sync-providers/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Scripted HTTP server for provider client tests.
// Purpose: Serve canned replies and record the requests clients send.
// Dependencies: tiny_http
// ============================================================================

//! ## Overview
//! [`serve`] starts a `tiny_http` server on an ephemeral port that answers a
//! fixed sequence of replies, then returns the requests it saw when joined.

#![allow(
    dead_code,
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::io::Read;
use std::thread;
use std::thread::JoinHandle;

use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Reply served for one request.
#[derive(Debug, Clone)]
pub struct Canned {
    /// HTTP status.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Extra response headers.
    pub headers: Vec<(String, String)>,
}

impl Canned {
    /// JSON reply with the given status.
    pub fn json(status: u16, body: &str) -> Self {
        Self { status, body: body.to_string(), headers: vec![("Content-Type".to_string(), "application/json".to_string())] }
    }

    /// Adds a response header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Request as seen by the server.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// HTTP method.
    pub method: String,
    /// Path and query.
    pub url: String,
    /// Request body.
    pub body: String,
    /// Request headers, names lowercased.
    pub headers: Vec<(String, String)>,
}

impl Recorded {
    /// Returns the value of a request header.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Serves `replies` in order and returns the base URL plus a handle that
/// yields the recorded requests.
pub fn serve(replies: Vec<Canned>) -> (String, JoinHandle<Vec<Recorded>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut recorded = Vec::new();
        for reply in replies {
            let Ok(mut request) = server.recv() else {
                break;
            };
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            recorded.push(Recorded {
                method: request.method().to_string(),
                url: request.url().to_string(),
                body,
                headers: request
                    .headers()
                    .iter()
                    .map(|header| (header.field.to_string().to_ascii_lowercase(), header.value.to_string()))
                    .collect(),
            });
            let mut response = Response::from_string(reply.body).with_status_code(reply.status);
            for (name, value) in &reply.headers {
                response = response.with_header(Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap());
            }
            request.respond(response).unwrap();
        }
        recorded
    });
    (format!("http://{addr}"), handle)
}
