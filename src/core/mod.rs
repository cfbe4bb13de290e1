//! Core module wiring: integer bases, errors, and shared types.

pub mod error;
pub mod matrix;
pub mod types;

// `crate::core::*` brings in the basis type, the error type and the backend tags.
pub use error::*;
pub use matrix::*;
pub use types::*;
