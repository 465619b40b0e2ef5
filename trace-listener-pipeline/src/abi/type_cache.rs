use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use trace_listener_shared::paths::parse_type_path;

use super::{ContractSchema, SchemaProvider, TypeDecoder};
use crate::errors::TypeCacheError;

/// How many payload bytes an error message shows before truncating.
const PREVIEW_BYTES: usize = 16;

type SchemaCell = Arc<OnceCell<Arc<dyn ContractSchema>>>;

/// Memoizing gateway from type paths (`account/type`) to decode-capable
/// type descriptors.
///
/// Both maps are append-only for the lifetime of the cache: schemas are
/// assumed immutable for the process lifetime and entries are never
/// evicted. Concurrent first-use lookups for one account attach to the
/// same in-flight fetch instead of issuing redundant ones; unrelated
/// accounts never serialize on each other.
pub struct TypeCache {
    provider: Arc<dyn SchemaProvider>,
    // std mutexes: guards are never held across an await. The slow path
    // clones the cell out of `schemas` before awaiting the fetch.
    schemas: Mutex<HashMap<String, SchemaCell>>,
    types: Mutex<HashMap<String, Arc<dyn TypeDecoder>>>,
}

impl TypeCache {
    pub fn new(provider: Arc<dyn SchemaProvider>) -> Self {
        Self {
            provider,
            schemas: Mutex::new(HashMap::new()),
            types: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves a type path to its descriptor, fetching and caching the
    /// account schema on first use.
    ///
    /// Fails with [`TypeCacheError::UnknownType`] when the account's schema
    /// has no type of that name. A failed schema fetch leaves no entry
    /// behind, so a later call retries it.
    pub async fn resolve_type(
        &self,
        type_path: &str,
    ) -> Result<Arc<dyn TypeDecoder>, TypeCacheError> {
        if let Some(descriptor) = self.types.lock().expect("lock poisoned").get(type_path) {
            return Ok(descriptor.clone());
        }

        let (account, type_name) = parse_type_path(type_path)
            .ok_or_else(|| TypeCacheError::InvalidTypePath(type_path.to_string()))?;

        let schema = self.account_schema(account).await?;
        let descriptor =
            schema
                .extract_type(type_name)
                .ok_or_else(|| TypeCacheError::UnknownType {
                    type_path: type_path.to_string(),
                })?;

        self.types
            .lock()
            .expect("lock poisoned")
            .entry(type_path.to_string())
            .or_insert_with(|| descriptor.clone());
        debug!(type_path, "resolved type descriptor");
        Ok(descriptor)
    }

    /// Resolves the type and decodes a hex payload through it.
    pub async fn decode(
        &self,
        type_path: &str,
        hex_data: &str,
    ) -> Result<serde_json::Value, TypeCacheError> {
        let descriptor = self.resolve_type(type_path).await?;
        let bytes = hex::decode(hex_data).map_err(|error| TypeCacheError::Hex {
            type_path: type_path.to_string(),
            reason: error.to_string(),
        })?;
        descriptor
            .decode(&bytes)
            .map_err(|failure| TypeCacheError::Decode {
                type_path: type_path.to_string(),
                preview: preview(&bytes),
                reason: failure.0,
            })
    }

    /// Best-effort pre-fetch so steady-state event processing never pays
    /// cold-cache latency for an already-declared table. Failures are left
    /// for the first live use to retry.
    pub async fn warm_type(&self, type_path: &str) {
        if let Err(error) = self.resolve_type(type_path).await {
            warn!(type_path, error = %error, "type warm-up failed, will retry on first use");
        }
    }

    /// Returns the account's schema, attaching to an in-flight fetch when
    /// one exists.
    async fn account_schema(
        &self,
        account: &str,
    ) -> Result<Arc<dyn ContractSchema>, TypeCacheError> {
        let cell = {
            let mut schemas = self.schemas.lock().expect("lock poisoned");
            schemas
                .entry(account.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        let schema = cell
            .get_or_try_init(|| self.provider.fetch_schema(account))
            .await?;
        Ok(schema.clone())
    }
}

fn preview(bytes: &[u8]) -> String {
    if bytes.len() <= PREVIEW_BYTES {
        hex::encode(bytes)
    } else {
        format!("{}..", hex::encode(&bytes[..PREVIEW_BYTES]))
    }
}
