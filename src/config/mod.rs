//! Configuration module.
//!
//! Loads and validates Guildhall deployment files: the served guild,
//! workflow channels, permission lists, and per-workflow limits.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{DEFAULT_MAX_CONFIG_SIZE, MAX_CONFIG_SIZE_ENV, load_config};
pub use schema::*;
pub use validation::validate;
