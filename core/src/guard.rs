//! Post-request status check.
//!
//! A response body is only trusted once its status is exactly 200 or 204.
//! Failures carry the server's `response.error` / `response.error_code` when
//! the body has them, otherwise a generic message and the raw HTTP status.

use serde_json::Value;
use tracing::warn;

use crate::error::RequestError;
use crate::http::ApiResponse;

const GENERIC_FAILURE: &str = "request failed";

pub fn is_success_status(status: u16) -> bool {
    status == 200 || status == 204
}

pub fn check(response: &ApiResponse) -> Result<(), RequestError> {
    if is_success_status(response.status) {
        return Ok(());
    }
    let (message, code) = server_error(response, GENERIC_FAILURE);
    warn!(status = response.status, %code, %message, "request rejected");
    Err(RequestError::Failed {
        message,
        code,
        status: response.status,
    })
}

/// Server-supplied error message and code, falling back to `fallback` and the
/// HTTP status.
pub(crate) fn server_error(response: &ApiResponse, fallback: &str) -> (String, String) {
    let message = response
        .envelope_field("error")
        .and_then(scalar_text)
        .unwrap_or_else(|| fallback.to_string());
    let code = response
        .envelope_field("error_code")
        .and_then(scalar_text)
        .unwrap_or_else(|| response.status.to_string());
    (message, code)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
