//! Standard response envelope: `{ code, message, data? }`.
//!
//! Every API answer, success or failure, is one of these and travels with HTTP 200.
//! Clients branch on `code` alone.

use crate::code::ResponseCode;
use crate::service::ValidationErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message used for list results.
pub const QUERY_SUCCESS_MESSAGE: &str = "query succeeded";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: ResponseCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Envelope {
    /// Builds an envelope in one step. An empty or missing message falls back to the
    /// code's default message; an empty `data` map is dropped.
    pub fn build(code: ResponseCode, message: Option<String>, data: Option<Map<String, Value>>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| code.default_message().to_string());
        Envelope {
            code,
            message,
            data: data.filter(|d| !d.is_empty()),
        }
    }

    pub fn success(data: Option<Map<String, Value>>) -> Self {
        Self::build(ResponseCode::Success, None, data)
    }

    pub fn success_with_message(message: &str) -> Self {
        Self::build(ResponseCode::Success, Some(message.to_string()), None)
    }

    pub fn success_with_data(data: Map<String, Value>, message: Option<&str>) -> Self {
        Self::build(ResponseCode::Success, message.map(str::to_string), Some(data))
    }

    /// Older clients expect a single record under `data.object`.
    pub fn success_with_object(object: Value) -> Self {
        Self::success(Some(single("object", object)))
    }

    /// `{ count, <key>: [...] }` under `data`. The list is never the bare payload.
    pub fn collection(key: &str, items: Vec<Value>) -> Self {
        let mut data = Map::new();
        data.insert("count".into(), Value::from(items.len() as u64));
        data.insert(key.to_string(), Value::Array(items));
        Self::build(ResponseCode::Success, Some(QUERY_SUCCESS_MESSAGE.into()), Some(data))
    }

    pub fn failed_with_wrong_param(context: Option<&str>) -> Self {
        Self::build(ResponseCode::InvalidParam, context.map(str::to_string), None)
    }

    pub fn failed_with_privilege(context: Option<&str>) -> Self {
        Self::build(ResponseCode::Unauthorized, context.map(str::to_string), None)
    }

    pub fn failed_with_not_exist() -> Self {
        Self::build(ResponseCode::NotExist, None, None)
    }

    pub fn failed_with_exceed_limit(context: Option<&str>) -> Self {
        let message = merge_message(Some(ResponseCode::ExceedLimit.default_message()), context);
        Self::build(ResponseCode::ExceedLimit, Some(message), None)
    }

    /// Free-form failure. `code` defaults to internal error.
    pub fn failed_with_reason(reason: &str, code: Option<ResponseCode>) -> Self {
        Self::build(
            code.unwrap_or(ResponseCode::InternalError),
            Some(reason.to_string()),
            None,
        )
    }

    /// Validation failure reporting the first error found.
    pub fn failed_with_validation(errors: &ValidationErrors) -> Self {
        Self::build(
            ResponseCode::ValidationFailed,
            errors.first_error_message().map(str::to_string),
            None,
        )
    }

    pub fn failed_when_save(type_name: &str, context: Option<&str>, summary: Option<&str>) -> Self {
        let category = format!("save {} object", type_name);
        let message = merge_message(Some(&category), Some(context.unwrap_or("save failed: ")));
        Self::build(
            ResponseCode::InternalError,
            Some(format!("{}{}", message, summary.unwrap_or_default())),
            None,
        )
    }

    pub fn failed_when_delete(type_name: &str, context: Option<&str>, summary: Option<&str>) -> Self {
        let category = format!("delete {} object", type_name);
        let message = merge_message(Some(&category), Some(context.unwrap_or("delete failed: ")));
        Self::build(
            ResponseCode::InternalError,
            Some(format!("{}{}", message, summary.unwrap_or_default())),
            None,
        )
    }

    /// Internal error with upstream detail (e.g. a third-party service's reply) under `data.data`.
    pub fn failed_with_error_data(error: &str, detail: Value) -> Self {
        Self::build(
            ResponseCode::InternalError,
            Some(error.to_string()),
            Some(single("data", detail)),
        )
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Joins a category label and a context string as `"{category} -> {context}"`.
/// Either side alone is returned as is; neither gives an empty string.
pub fn merge_message(category: Option<&str>, context: Option<&str>) -> String {
    let category = category.filter(|s| !s.is_empty());
    let context = context.filter(|s| !s.is_empty());
    match (category, context) {
        (Some(cat), Some(ctx)) => format!("{} -> {}", cat, ctx),
        (Some(cat), None) => cat.to_string(),
        (None, Some(ctx)) => ctx.to_string(),
        (None, None) => String::new(),
    }
}

/// True when a raw JSON body carries the success code.
pub fn is_success_value(value: &Value) -> bool {
    value.get("code").and_then(Value::as_i64) == Some(ResponseCode::Success.as_i32() as i64)
}

/// One-entry data map.
pub fn single(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}
