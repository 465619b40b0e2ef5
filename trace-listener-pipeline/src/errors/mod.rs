mod config;
mod listen;
mod transport;
mod type_cache;

pub use config::ConfigurationError;
pub use listen::ListenError;
pub use transport::TransportError;
pub use type_cache::{DecodeFailure, SchemaFetchError, TypeCacheError};
