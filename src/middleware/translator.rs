//! Rewrite transport-level error responses into envelopes with HTTP 200.
//!
//! | status | code | message |
//! |---|---|---|
//! | 400 | -1 invalid parameter | incoming `message` |
//! | 401 | -2 unauthorized | "authentication information invalid" |
//! | 403 | -2 unauthorized | incoming `message` |
//! | 404 | -4 not found | "requested object does not exist" |
//!
//! Only JSON objects in the transport error shape (carrying a `status` key) are
//! rewritten. Other bodies, oversized bodies and other statuses (405, 5xx) pass through
//! unchanged. A translated response is 200 and is never touched again.

use crate::code::ResponseCode;
use crate::response::Envelope;
use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

pub const UNAUTHENTICATED_MESSAGE: &str = "authentication information invalid";
pub const NOT_FOUND_MESSAGE: &str = "requested object does not exist";

/// Error bodies above this size are left alone.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

pub async fn translate_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    translate_response(response).await
}

/// Taxonomy code and fixed message (if any) for a translatable status.
fn mapping(status: StatusCode) -> Option<(ResponseCode, Option<&'static str>)> {
    match status {
        StatusCode::BAD_REQUEST => Some((ResponseCode::InvalidParam, None)),
        StatusCode::UNAUTHORIZED => Some((ResponseCode::Unauthorized, Some(UNAUTHENTICATED_MESSAGE))),
        StatusCode::FORBIDDEN => Some((ResponseCode::Unauthorized, None)),
        StatusCode::NOT_FOUND => Some((ResponseCode::NotExist, Some(NOT_FOUND_MESSAGE))),
        _ => None,
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.starts_with("application/json") || ct.contains("+json")
        })
        .unwrap_or(false)
}

pub async fn translate_response(response: Response) -> Response {
    let status = response.status();
    let Some((code, fixed_message)) = mapping(status) else {
        return response;
    };
    if !is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let within_limit = body
        .size_hint()
        .upper()
        .map(|n| n <= MAX_ERROR_BODY_BYTES as u64)
        .unwrap_or(false);
    if !within_limit {
        tracing::debug!(status = status.as_u16(), "error body too large or unsized, not translated");
        return Response::from_parts(parts, body);
    }
    let bytes = match to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(status = status.as_u16(), error = %e, "unreadable error body");
            return Response::from_parts(parts, Body::empty());
        }
    };
    let incoming = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) if map.contains_key("status") => map,
        _ => return Response::from_parts(parts, Body::from(bytes)),
    };

    let message = match fixed_message {
        Some(fixed) => Some(fixed.to_string()),
        None => incoming.get("message").and_then(Value::as_str).map(str::to_string),
    };
    let envelope = Envelope::build(code, message, None);
    let encoded = match serde_json::to_vec(&envelope) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode translated envelope");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };
    tracing::info!(status = status.as_u16(), code = code.as_i32(), "translated error response");

    parts.status = StatusCode::OK;
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(encoded))
}
