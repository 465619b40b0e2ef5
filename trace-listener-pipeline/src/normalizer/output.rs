//! Output event model.
//!
//! What a subscription's consumer receives for each processed trace,
//! depending on the configured output mode.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use trace_listener_shared::types::{ActionRecord, DecodedDbOp, TraceEvent};

/// Block/cursor/undo context shared by every event derived from one trace.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceContext {
    pub block_num: u64,
    pub block_time: Option<DateTime<Utc>>,
    pub cursor: String,
    pub undo: bool,
}

/// Decoded dbOps of one action.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedDbOps {
    /// Every op decoded in place (legacy decode-all mode).
    Flat(Vec<DecodedDbOp>),
    /// Only the requested tables, keyed by short table path
    /// (`account/table`).
    ByTable(BTreeMap<String, Vec<DecodedDbOp>>),
}

/// An action record whose dbOps, when requested, have been decoded.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAction {
    pub seq: Option<u64>,
    pub receiver: String,
    pub account: String,
    pub name: String,
    pub json: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_ops: Option<DecodedDbOps>,
}

/// Aggregate-mode output: one event per trace.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceOutput {
    #[serde(flatten)]
    pub context: TraceContext,
    pub matching_actions: Vec<NormalizedAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_actions: Option<Vec<ActionRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<BTreeMap<String, Vec<Value>>>,
}

/// Serialized-mode output: one event per surviving action.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutput {
    #[serde(flatten)]
    pub context: TraceContext,
    pub action_seq: Option<u64>,
    pub action: NormalizedAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<BTreeMap<String, Vec<Value>>>,
}

/// One normalized output event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputEvent {
    /// Raw mode: the untouched transport payload.
    Raw(TraceEvent),
    /// Aggregate mode.
    Trace(TraceOutput),
    /// Serialized mode.
    Action(ActionOutput),
}
