//! Edge middleware. [`translator`] rewrites transport-level error responses into envelopes.

pub mod translator;

pub use translator::{translate_errors, translate_response};
