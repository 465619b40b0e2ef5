//! Top-level error type surfaced to subscription consumers.
use thiserror::Error;

use super::{ConfigurationError, TransportError, TypeCacheError};

/// Represents every error a subscription can surface, either synchronously
/// from `open` or through the subscription's error channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListenError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("type cache error: {0}")]
    TypeCache(#[from] TypeCacheError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("channel error: {0}")]
    Channel(String),
}
