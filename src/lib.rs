//! Envelope SDK: REST convention layer with a uniform `{code, message, data}` response
//! envelope, a fixed response-code table, id-or-alias entity lookup and an error
//! translator that keeps every API answer at HTTP 200.

pub mod auth;
pub mod case;
pub mod code;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod naming;
pub mod resolver;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod telemetry;

pub use auth::{check_secret, require_access_secret, require_basic_auth, Authenticator, StaticAuthenticator};
pub use code::ResponseCode;
pub use config::{load_from_path, resolve, EntityDescriptor, EntityRegistry, Settings};
pub use error::{AppError, ConfigError, TransportError};
pub use extractors::{AuthUser, RequestParams};
pub use middleware::{translate_errors, translate_response};
pub use naming::EntityNames;
pub use resolver::{EntityResolver, LookupStrategy, Resolution};
pub use response::{merge_message, Envelope};
pub use routes::{app, common_routes, entity_routes};
pub use state::AppState;
pub use store::{EntityStore, MemoryStore, PgStore};
pub use telemetry::init_tracing;
