//! Subscription request model.
//!
//! Captures one logical subscription's filter parameters, derives the wire
//! query/projection shape handed to the transport, and tracks the resumable
//! stream position.

mod model;
mod request;

pub use model::{DEFAULT_ACTION_FIELDS, Projection, StreamPosition, Subscription, TraceQuery};
pub use request::{OutputMode, SearchDefinition, SubscriptionRequest, TableSpec};
