//! Shared application state for all routes. Built once at startup, read-only afterwards.

use crate::auth::Authenticator;
use crate::config::{EntityRegistry, Settings};
use crate::store::EntityStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub registry: Arc<EntityRegistry>,
    pub authenticator: Arc<dyn Authenticator>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EntityStore>,
        registry: EntityRegistry,
        authenticator: Arc<dyn Authenticator>,
        settings: Settings,
    ) -> Self {
        AppState {
            store,
            registry: Arc::new(registry),
            authenticator,
            settings: Arc::new(settings),
        }
    }
}
