//! Router composition.

mod common;
mod entity;

pub use common::common_routes;
pub use entity::entity_routes;

use crate::error::TransportError;
use crate::middleware::translate_errors;
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, http::Uri, middleware::from_fn, Router};
use tower_http::limit::RequestBodyLimitLayer;

async fn fallback(uri: Uri) -> TransportError {
    TransportError::not_found(format!("no route for {}", uri.path()))
}

/// Full application: common and entity routes, JSON 404 fallback, body limit, and the
/// error translator outermost so every transport error leaves as an envelope.
pub fn app(state: AppState) -> Router {
    let max_body_bytes = state.settings.max_body_bytes;
    Router::new()
        .merge(common_routes())
        .merge(entity_routes(state))
        .fallback(fallback)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(from_fn(translate_errors))
}
