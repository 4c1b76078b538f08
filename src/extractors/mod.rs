//! Request extractors: parameters and the authenticated user.

pub mod auth;
pub mod params;

pub use auth::AuthUser;
pub use params::RequestParams;
