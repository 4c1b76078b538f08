//! Typed errors and their HTTP mapping.
//!
//! `AppError` is converted to an envelope at the dispatch boundary and always answers
//! with HTTP 200. `TransportError` is the framework-level shape (real HTTP status,
//! `{status, message}` body) that the translator middleware rewrites.

use crate::code::ResponseCode;
use crate::response::Envelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate entity type: {0}")]
    DuplicateType(String),
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("entity {entity} references unknown type '{reference}'")]
    UnknownReference { entity: String, reference: String },
    #[error("entity {entity}: unknown operation '{operation}'")]
    UnknownOperation { entity: String, operation: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("invalid setting {key}: {message}")]
    Setting { key: &'static str, message: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A strictly required request parameter is missing.
    #[error("{0}")]
    MissingParam(String),
    #[error("{0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("internal: {0}")]
    Internal(String),
    /// Rejected below the envelope layer; rendered with its own status.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AppError {
    pub fn code(&self) -> ResponseCode {
        match self {
            AppError::MissingParam(_) => ResponseCode::InvalidParam,
            AppError::Validation(_) => ResponseCode::ValidationFailed,
            AppError::Config(_) | AppError::Db(_) | AppError::Internal(_) => ResponseCode::InternalError,
            AppError::Transport(t) => match t.status {
                StatusCode::BAD_REQUEST => ResponseCode::InvalidParam,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ResponseCode::Unauthorized,
                StatusCode::NOT_FOUND => ResponseCode::NotExist,
                _ => ResponseCode::InternalError,
            },
        }
    }
}

impl From<AppError> for Envelope {
    fn from(err: AppError) -> Self {
        let code = err.code();
        if code == ResponseCode::InternalError {
            tracing::error!(error = %err, "request failed");
        }
        Envelope::failed_with_reason(&err.to_string(), Some(code))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Transport(t) => t.into_response(),
            other => Envelope::from(other).into_response(),
        }
    }
}

/// Error body produced below the envelope layer (routing, auth, body parsing).
#[derive(Error, Clone, Debug, Serialize)]
#[error("{status}: {message}")]
pub struct TransportError {
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusCode,
    pub message: String,
}

fn serialize_status<S: serde::Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

impl TransportError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        TransportError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message)
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_param_renders_invalid_param_envelope() {
        let response = AppError::MissingParam("[GET] missing page parameter".into()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["code"], -1);
        assert_eq!(body["message"], "[GET] missing page parameter");
    }

    #[tokio::test]
    async fn internal_error_has_description_only() {
        let response = AppError::Internal("store poisoned".into()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["code"], -100);
        assert_eq!(body["message"], "internal: store poisoned");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn transport_error_keeps_status() {
        let response = TransportError::not_found("no route").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({ "status": 404, "message": "no route" }));
    }

    #[tokio::test]
    async fn wrapped_transport_error_is_not_enveloped() {
        let err: AppError = TransportError::method_not_allowed("delete not allowed on reports").into();
        assert_eq!(err.code(), ResponseCode::InternalError);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(response).await["status"], 405);
    }

    #[test]
    fn validation_maps_to_validation_failed() {
        assert_eq!(AppError::Validation("x".into()).code(), ResponseCode::ValidationFailed);
        assert_eq!(AppError::Db(sqlx::Error::RowNotFound).code(), ResponseCode::InternalError);
    }
}
