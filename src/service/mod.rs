//! Attribute validation used by the write actions.

mod validation;
pub use validation::{AttributeValidator, ValidationErrors};
