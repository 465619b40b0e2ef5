use serde::{Deserialize, Serialize};

/// Execution outcome reported by the upstream stream for one trace.
///
/// Only `Executed` traces carry data this system cares about; every other
/// status is filtered out silently by the normalizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceStatus {
    Executed,
    SoftFail,
    HardFail,
    Delayed,
    Expired,
    /// Fallback for statuses introduced upstream after this crate was built.
    #[serde(other)]
    Unknown,
}

impl TraceStatus {
    pub fn was_executed(&self) -> bool {
        matches!(self, TraceStatus::Executed)
    }
}
