//! Example consumer: serves the entities declared in `ENTITY_CONFIG_PATH`.
//!
//! Run from repo root: `ENTITY_CONFIG_PATH=example_consumer/entities.json cargo run -p example-consumer`
//! Without `DATABASE_URL` the data lives in memory.

use envelope_sdk::{
    app, init_tracing, load_from_path, resolve, AppState, Authenticator, EntityStore, MemoryStore, PgStore, Settings,
    StaticAuthenticator,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("envelope_sdk=info,example_consumer=info");

    let settings = Settings::load()?;
    let config = load_from_path(&settings.entity_config_path).await?;
    let registry = resolve(&config)?;
    tracing::info!(entities = registry.len(), "entity config loaded");

    let store: Arc<dyn EntityStore> = match &settings.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    let authenticator: Arc<dyn Authenticator> = Arc::new(StaticAuthenticator::new(&config.users));

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    let state = AppState::new(store, registry, authenticator, settings);
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
