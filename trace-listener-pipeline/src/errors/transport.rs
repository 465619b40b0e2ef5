//! Error types forwarded from the stream transport collaborator.
//! The listener never retries or reinterprets these; they terminate the
//! affected subscription's event sequence.
use thiserror::Error;

/// Represents an error reported by the transport collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("stream error: {0}")]
    Stream(String),
}
