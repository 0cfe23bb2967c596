//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::Error;

/// Header carrying the correlation id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Error body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Correlation id for the request: the caller's `x-request-id`, else the
/// Lambda invocation id, else a fresh one.
pub fn request_id(event: &Request) -> String {
    event
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .or_else(|| event.lambda_context_ref().map(|ctx| ctx.request_id.clone()))
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Request path without the REST API stage prefix or a trailing slash.
pub fn route_path(raw_path: &str) -> &str {
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
    request_id: &str,
) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header(REQUEST_ID_HEADER, request_id)
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Log the error with the correlation id and render it as a taxonomy body.
pub fn error_response(
    err: &Error,
    request_id: &str,
    verbose: bool,
) -> Result<Response<Body>, lambda_http::Error> {
    let status = err.status_code();
    match status {
        s if s >= 500 => error!(request_id = %request_id, code = err.code(), error = %err, "Request failed"),
        401 | 403 => warn!(request_id = %request_id, code = err.code(), error = %err, "Request rejected"),
        _ => info!(request_id = %request_id, code = err.code(), error = %err, "Request rejected"),
    }

    json_response(
        status,
        &ErrorBody {
            error: err.code(),
            message: err.public_message(verbose),
        },
        request_id,
    )
}

/// Render a handler outcome: the success payload with its status, or the
/// error body.
pub fn respond<T: Serialize>(
    outcome: crate::Result<(u16, T)>,
    request_id: &str,
    verbose: bool,
) -> Result<Response<Body>, lambda_http::Error> {
    match outcome {
        Ok((status, data)) => json_response(status, &data, request_id),
        Err(err) => error_response(&err, request_id, verbose),
    }
}

/// Parse request body as JSON. An empty body parses as `{}`.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> crate::Result<T> {
    let bytes: &[u8] = body.as_ref();
    let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        bytes
    };
    serde_json::from_slice(bytes).map_err(|e| Error::bad_request(format!("Invalid request body: {}", e)))
}

/// Path parameter at `index` parsed as a UUID.
pub fn parse_id(parts: &[&str], index: usize, what: &str) -> crate::Result<Uuid> {
    parts
        .get(index)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| Error::bad_request(format!("invalid {}", what)))
}
