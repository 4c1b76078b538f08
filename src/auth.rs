//! HTTP Basic authentication.
//!
//! `require_basic_auth` checks `Authorization: Basic <base64(user:password)>` against an
//! [`Authenticator`] and puts the user id into request extensions as [`AuthUser`].
//! Failures are transport-level 401s; the translator turns them into envelopes.

use crate::config::{Settings, UserConfig};
use crate::error::{AppError, TransportError};
use crate::extractors::AuthUser;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const REALM: &str = "Basic realm=\"api\"";
/// Header carrying the shared secret checked by [`require_access_secret`].
pub const ACCESS_SECRET_HEADER: &str = "x-access-secret";

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// User id for valid credentials, `None` otherwise.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<i64>, AppError>;
}

/// Fixed user table from the entity config file.
#[derive(Clone, Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, (String, i64)>,
}

impl std::fmt::Debug for StaticAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAuthenticator")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StaticAuthenticator {
    pub fn new(users: &[UserConfig]) -> Self {
        StaticAuthenticator {
            users: users
                .iter()
                .map(|u| (u.username.clone(), (u.password.clone(), u.user_id)))
                .collect(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<i64>, AppError> {
        Ok(self
            .users
            .get(username)
            .filter(|(expected, _)| constant_time_eq(password, expected))
            .map(|(_, id)| *id))
    }
}

fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Shared-secret check. An unset secret never matches.
pub fn check_secret(configured: Option<&str>, supplied: &str) -> bool {
    match configured {
        Some(secret) if !secret.is_empty() => constant_time_eq(supplied, secret),
        _ => false,
    }
}

/// `(username, password)` from a `Basic` authorization header value.
pub fn parse_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

fn unauthorized(message: &str) -> Response {
    let mut response = TransportError::new(StatusCode::UNAUTHORIZED, message).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
    response
}

pub async fn require_basic_auth(
    State(authenticator): State<Arc<dyn Authenticator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let credentials = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(parse_basic_credentials);

    let (username, password) = match credentials {
        Some(Some(pair)) => pair,
        Some(None) => {
            tracing::warn!("authentication failed: malformed basic credentials");
            return unauthorized("malformed authorization header");
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            return unauthorized("missing authorization header");
        }
    };

    match authenticator.authenticate(&username, &password).await {
        Ok(Some(user_id)) => {
            request.extensions_mut().insert(AuthUser(user_id));
            next.run(request).await
        }
        Ok(None) => {
            tracing::warn!(username = %username, "authentication failed: bad credentials");
            unauthorized("invalid credentials")
        }
        Err(e) => e.into_response(),
    }
}

/// Rejects requests whose `x-access-secret` header does not match `Settings::access_secret`
/// with a 403. With no secret configured every request is rejected.
pub async fn require_access_secret(State(settings): State<Arc<Settings>>, request: Request, next: Next) -> Response {
    let supplied = request
        .headers()
        .get(ACCESS_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !check_secret(settings.access_secret.as_deref(), supplied) {
        tracing::warn!(path = %request.uri().path(), "access secret rejected");
        return TransportError::new(StatusCode::FORBIDDEN, "access secret invalid").into_response();
    }
    next.run(request).await
}
