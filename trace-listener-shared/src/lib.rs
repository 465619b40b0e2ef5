//! # Trace Listener Shared
//! This crate defines the data structures shared across the trace listener
//! ecosystem: transaction trace events, action records, table-mutation
//! records (dbOps) and the type-path helpers used to address contract types.
pub mod paths;
pub mod types;
