//! Dynamic forms: definitions stored per tenant and the submission validator.

pub mod definitions;
pub mod engine;

pub use definitions::resolve_variant;
pub use engine::{validate_submission, FieldSpec};
