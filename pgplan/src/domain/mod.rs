//! Domain model for pgplan
//!
//! Core domain types and errors:
//! - Decoded record kinds and PostgreSQL enumerations
//! - Structured error handling

pub mod errors;
pub mod types;

pub use types::{EventKind, JoinType, Pid};

pub use errors::{ConfigError, TracerError};
