//! ABI collaborator traits and the type cache / decode gateway.
//!
//! The schema language and the byte-to-value deserialization routine live
//! outside this crate; they are reached through [`SchemaProvider`],
//! [`ContractSchema`] and [`TypeDecoder`]. The [`TypeCache`] owns the
//! memoization and fetch deduplication in front of them.

mod type_cache;

pub use type_cache::TypeCache;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{DecodeFailure, SchemaFetchError};

/// Fetches the ABI schema of one contract account.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn fetch_schema(&self, account: &str)
    -> Result<Arc<dyn ContractSchema>, SchemaFetchError>;
}

/// One account's resolved schema; a lookup table of named types.
pub trait ContractSchema: Send + Sync {
    fn extract_type(&self, type_name: &str) -> Option<Arc<dyn TypeDecoder>>;
}

/// A decode-capable type descriptor extracted from a schema.
pub trait TypeDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Value, DecodeFailure>;
}

impl std::fmt::Debug for dyn TypeDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TypeDecoder")
    }
}
