//! Entity CRUD routes. The path segment selects the entity; handlers look it up in the registry.

use crate::auth::require_basic_auth;
use crate::handlers::entity::{create, delete as delete_handler, index, update, view};
use crate::state::AppState;
use axum::{middleware::from_fn_with_state, routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(index).post(create))
        .route(
            "/:path_segment/:id",
            get(view).put(update).patch(update).delete(delete_handler),
        )
        .route_layer(from_fn_with_state(state.authenticator.clone(), require_basic_auth))
        .with_state(state)
}
