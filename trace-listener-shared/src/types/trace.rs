use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActionRecord, TraceStatus};

/// One transaction's execution result as reported by the upstream stream.
///
/// `undo` marks a fork retraction of a previously streamed block; the
/// listener passes it through unmodified. `cursor` is the opaque resumption
/// token for the position right after this event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub cursor: String,
    #[serde(default)]
    pub undo: bool,
    pub status: TraceStatus,
    pub block_num: u64,
    #[serde(default)]
    pub block_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub matching_actions: Vec<ActionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_actions: Option<Vec<ActionRecord>>,
}
