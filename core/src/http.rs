//! HTTP request and response types exchanged with a `Transport`.
//!
//! # Design
//! Requests and responses are plain data. The client builds an `HttpRequest`
//! with an endpoint path relative to the account domain; the transport owns
//! the base URL and the session cookie and hands back the raw
//! `HttpResponse`. The client then decodes it into an `ApiResponse`, which is
//! what the status guard and the parsers look at.

use serde_json::Value;
use tracing::debug;

/// HTTP method for a request. amoCRM's leads and tasks API only needs two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Endpoint path, possibly with a fixed query (`/private/api/auth.php?type=json`).
    pub path: String,
    /// Already-encoded query string for GET requests.
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    /// JSON text for POST requests.
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(path: &str, query: String) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.to_string(),
            query: Some(query),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(path: &str, body: &Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            method: HttpMethod::Post,
            path: path.to_string(),
            query: None,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(serde_json::to_string(body)?),
        })
    }

    /// Path and query joined the way they go on the wire.
    pub fn target(&self) -> String {
        match &self.query {
            None => self.path.clone(),
            Some(q) if self.path.contains('?') => format!("{}&{q}", self.path),
            Some(q) => format!("{}?{q}", self.path),
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// A response with its body decoded as JSON.
///
/// `body` is `None` when the server sent nothing (amoCRM answers `204` for an
/// empty result) or sent something that is not JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// The `_embedded.items` collection of a read response, empty when absent.
    pub fn embedded_items(&self) -> &[Value] {
        self.body
            .as_ref()
            .and_then(|b| b.pointer("/_embedded/items"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A field of the `response` envelope amoCRM wraps auth and error replies in.
    pub fn envelope_field(&self, field: &str) -> Option<&Value> {
        self.body.as_ref()?.get("response")?.get(field)
    }
}

impl From<HttpResponse> for ApiResponse {
    fn from(response: HttpResponse) -> Self {
        let body = if response.body.trim().is_empty() {
            None
        } else {
            match serde_json::from_str(&response.body) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(status = response.status, error = %e, "response body is not JSON");
                    None
                }
            }
        };
        ApiResponse {
            status: response.status,
            body,
        }
    }
}
