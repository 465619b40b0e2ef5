//! Error types for subscription request validation.
//! These are detected at construction time and fail the `open` call before
//! any subscription is established.
use thiserror::Error;

/// Represents a malformed subscription request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("filter query must not be empty")]
    EmptyFilterQuery,
    #[error("invalid table spec: {0}")]
    InvalidTableSpec(String),
    #[error("invalid search '{name}': {reason}")]
    InvalidSearch { name: String, reason: String },
}
