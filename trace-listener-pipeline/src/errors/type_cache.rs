//! Error types for the type cache / decode gateway and its schema/decoder
//! collaborators.
use thiserror::Error;

/// Returned by a [`crate::abi::SchemaProvider`] when an account's schema
/// cannot be fetched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaFetchError {
    #[error("no schema found for account '{account}'")]
    NotFound { account: String },
    #[error("schema for account '{account}' unavailable: {reason}")]
    Unavailable { account: String, reason: String },
}

/// Returned by a [`crate::abi::TypeDecoder`] on malformed bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DecodeFailure(pub String);

/// Represents errors that can occur while resolving or decoding a type path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeCacheError {
    #[error("invalid type path '{0}', expected 'account/type'")]
    InvalidTypePath(String),
    #[error("non existent type: {type_path}")]
    UnknownType { type_path: String },
    #[error("schema fetch failed: {0}")]
    SchemaFetch(#[from] SchemaFetchError),
    #[error("payload of type '{type_path}' is not valid hex: {reason}")]
    Hex { type_path: String, reason: String },
    #[error("decode of type '{type_path}' failed on bytes [{preview}]: {reason}")]
    Decode {
        type_path: String,
        preview: String,
        reason: String,
    },
}
