//! Stream event normalizer.
//!
//! Owns one subscription's lifecycle: receives raw trace events from the
//! transport collaborator, applies the subscription's filters, decodes
//! dbOps through the type cache, evaluates searches, and emits normalized
//! output events in delivery order.

mod listener;
mod output;
mod transport;

pub use listener::{SubscriptionHandle, SubscriptionMessage, TraceListener};
pub use output::{
    ActionOutput, DecodedDbOps, NormalizedAction, OutputEvent, TraceContext, TraceOutput,
};
pub use transport::{StreamMessage, StreamTraces};
