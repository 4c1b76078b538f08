//! Request parameters: query string and body as mutable maps.
//!
//! Handlers read identifiers from here and may inject derived parameters (for example a
//! resolved `clerkId`) before the write happens.

use crate::error::{AppError, TransportError};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Query, Request},
    http::{header::CONTENT_TYPE, Method},
    Form, Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct RequestParams {
    method: Method,
    query: Map<String, Value>,
    body: Map<String, Value>,
}

impl RequestParams {
    pub fn new(method: Method, query: Map<String, Value>, body: Map<String, Value>) -> Self {
        RequestParams { method, query, body }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// POST, PUT and PATCH carry their parameters in the body.
    pub fn uses_body(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
    }

    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn get_query(&self, key: &str) -> Option<&Value> {
        self.query.get(key)
    }

    pub fn get_body(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Body parameter for POST/PUT/PATCH, query parameter otherwise.
    pub fn param(&self, key: &str) -> Option<&Value> {
        if self.uses_body() {
            self.get_body(key)
        } else {
            self.get_query(key)
        }
    }

    /// Parameter as an identifier string. JSON null counts as absent; numbers are stringified.
    pub fn param_str(&self, key: &str) -> Option<String> {
        self.param(key).and_then(as_identifier)
    }

    /// Query parameter that must be present and non-empty.
    pub fn require_query(&self, key: &str) -> Result<String, AppError> {
        self.get_query(key)
            .and_then(as_identifier)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::MissingParam(format!("[GET] missing {} parameter", key)))
    }

    /// Body parameter that must be present and non-empty.
    pub fn require_body(&self, key: &str) -> Result<String, AppError> {
        self.get_body(key)
            .and_then(as_identifier)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::MissingParam(format!("[POST] missing {} parameter", key)))
    }

    pub fn merge_query(&mut self, params: Map<String, Value>) {
        merge_into(&mut self.query, params);
    }

    pub fn merge_body(&mut self, params: Map<String, Value>) {
        merge_into(&mut self.body, params);
    }

    /// Merge into the body for POST/PUT/PATCH, into the query otherwise.
    pub fn update_params(&mut self, params: Map<String, Value>) {
        if self.uses_body() {
            self.merge_body(params);
        } else {
            self.merge_query(params);
        }
    }
}

fn as_identifier(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Recursive merge: nested objects merge, everything else is overwritten.
fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (k, v) in source {
        match (target.get_mut(&k), v) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge_into(existing, incoming),
            (Some(slot), v) => *slot = v,
            (None, v) => {
                target.insert(k, v);
            }
        }
    }
}

fn string_map(pairs: HashMap<String, String>) -> Map<String, Value> {
    pairs.into_iter().map(|(k, v)| (k, Value::String(v))).collect()
}

async fn read_body<S>(req: Request, state: &S) -> Result<Map<String, Value>, TransportError>
where
    S: Send + Sync,
{
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<HashMap<String, String>>::from_request(req, state)
            .await
            .map_err(|rejection| TransportError::bad_request(rejection.body_text()))?;
        return Ok(string_map(pairs));
    }

    let value = if content_type.starts_with("application/json") {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| TransportError::bad_request(rejection.body_text()))?;
        value
    } else {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| TransportError::bad_request(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| TransportError::bad_request(format!("unsupported request body: {}", e)))?
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(TransportError::bad_request("request body must be a JSON object")),
    }
}

#[async_trait]
impl<S> FromRequest<S> for RequestParams
where
    S: Send + Sync,
{
    type Rejection = TransportError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let Query(pairs) = Query::<HashMap<String, String>>::try_from_uri(req.uri())
            .map_err(|rejection| TransportError::bad_request(rejection.body_text()))?;
        let query = string_map(pairs);
        let body = if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
            read_body(req, state).await?
        } else {
            Map::new()
        };
        Ok(RequestParams::new(method, query, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn param_follows_method() {
        let get = RequestParams::new(Method::GET, map(json!({ "id": "1" })), map(json!({ "id": "2" })));
        assert_eq!(get.param_str("id").as_deref(), Some("1"));
        let put = RequestParams::new(Method::PUT, map(json!({ "id": "1" })), map(json!({ "id": 2 })));
        assert_eq!(put.param_str("id").as_deref(), Some("2"));
        let post = RequestParams::new(Method::POST, Map::new(), map(json!({ "id": null })));
        assert_eq!(post.param_str("id"), None);
    }

    #[test]
    fn strict_accessors_report_missing() {
        let p = RequestParams::new(Method::GET, map(json!({ "page": "" })), Map::new());
        let err = p.require_query("page").unwrap_err();
        assert_eq!(err.to_string(), "[GET] missing page parameter");
        let err = p.require_body("name").unwrap_err();
        assert!(matches!(err, AppError::MissingParam(m) if m == "[POST] missing name parameter"));
        let p = RequestParams::new(Method::GET, map(json!({ "page": "0" })), Map::new());
        assert_eq!(p.require_query("page").unwrap(), "0");
    }

    #[test]
    fn update_params_merges_recursively_into_the_right_side() {
        let mut p = RequestParams::new(Method::PATCH, Map::new(), map(json!({ "meta": { "a": 1 }, "x": 1 })));
        p.update_params(map(json!({ "meta": { "b": 2 }, "x": 5 })));
        assert_eq!(Value::Object(p.body().clone()), json!({ "meta": { "a": 1, "b": 2 }, "x": 5 }));
        assert!(p.query().is_empty());

        let mut p = RequestParams::new(Method::DELETE, Map::new(), Map::new());
        p.update_params(map(json!({ "clerkId": 3 })));
        assert_eq!(p.get_query("clerkId"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn extracts_query_and_json_body() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/orders?expand=items")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"clerkSid":"abc"}"#))
            .unwrap();
        let p = RequestParams::from_request(req, &()).await.unwrap();
        assert_eq!(p.get_query("expand"), Some(&json!("items")));
        assert_eq!(p.param_str("clerkSid").as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn extracts_form_body() {
        let req = Request::builder()
            .method(Method::PUT)
            .uri("/orders/1")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=box&count=3"))
            .unwrap();
        let p = RequestParams::from_request(req, &()).await.unwrap();
        assert_eq!(p.get_body("count"), Some(&json!("3")));
    }

    #[tokio::test]
    async fn rejects_non_object_body() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/orders")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("[1,2]"))
            .unwrap();
        let err = RequestParams::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
