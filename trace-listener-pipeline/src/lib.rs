//! # Trace Listener Pipeline
//!
//! Turns a forward, cursor-resumable stream of transaction traces into
//! normalized application events.
//!
//! ## Architecture
//!
//! 1. **Subscription**: captures one subscription's filter parameters and
//!    derives the wire query/projection shape
//! 2. **Search**: evaluates nested structural predicates against trace
//!    documents
//! 3. **Abi**: resolves `(account, type)` pairs to decode-capable type
//!    descriptors with at-most-one-fetch-per-type semantics
//! 4. **Normalizer**: owns the live subscription and maps each incoming
//!    trace to zero-or-more output events
//!
//! The wire transport and the byte-to-value ABI deserialization are
//! external collaborators behind traits ([`normalizer::StreamTraces`],
//! [`abi::SchemaProvider`]).

pub mod abi;
pub mod errors;
pub mod normalizer;
pub mod search;
pub mod subscription;

pub use errors::ListenError;
pub use normalizer::{SubscriptionHandle, SubscriptionMessage, TraceListener};
pub use subscription::{Subscription, SubscriptionRequest};
