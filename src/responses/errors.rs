use crate::errors::ServerError;
use astra::{Body, Response, ResponseBuilder};
use serde_json::json;
use tracing::error;

/// Convert a ServerError into a JSON error response
pub fn error_to_response(err: ServerError) -> Response {
    let status = err.status();
    if status >= 500 {
        error!(error = %err, "request failed");
    }
    json_error_response(status, &err.to_string(), err.offset())
}

/// Build a `{"error": ..., "offset": ...}` body. `offset` is omitted when absent.
pub fn json_error_response(status: u16, message: &str, offset: Option<usize>) -> Response {
    let body = match offset {
        Some(offset) => json!({ "error": message, "offset": offset }),
        None => json!({ "error": message }),
    };

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
