use std::collections::BTreeMap;

use serde_json::Value;

/// How the normalizer packages output events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// One output event per trace, carrying the full filtered action list.
    #[default]
    Aggregate,
    /// One output event per surviving action.
    Serialized,
    /// The untouched transport payload; no filtering, decoding or progress
    /// tracking is applied.
    Raw,
}

/// Names one table whose mutations must be decoded, and the schema type
/// describing its rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub account: String,
    pub table: String,
    pub type_name: String,
}

/// A raw, caller-supplied structural search definition.
#[derive(Clone, Debug)]
pub struct SearchDefinition {
    /// Which trace field to iterate, e.g. `"matchingActions"` or
    /// `"executedActions"`.
    pub list_name: String,
    /// The predicate tree; preprocessed into a
    /// [`crate::search::SearchSpec`] at subscription construction.
    pub tree: Value,
}

/// Configuration for one logical subscription.
///
/// `cursor` and `start_block` are mutually informative: when a cursor is
/// present it supersedes the block number on resume.
#[derive(Clone, Debug)]
pub struct SubscriptionRequest {
    /// Opaque filter expression passed through to the upstream matcher.
    pub filter_query: String,
    /// Lower bound of the scan.
    pub start_block: u64,
    /// Opaque resumption token from a previous session.
    pub cursor: Option<String>,
    /// When true, only finalized blocks are streamed.
    pub irreversible_only: bool,
    /// Projection fields for matching actions; defaults applied when absent.
    pub action_fields: Option<Vec<String>>,
    /// Projection fields for executed actions; when absent, executed
    /// actions are not fetched at all.
    pub executed_action_fields: Option<Vec<String>>,
    /// Table mutations to decode. `None` disables decoding entirely; an
    /// empty list decodes every op, inferring each type path from the op's
    /// own key metadata; a non-empty list decodes only the listed tables.
    pub db_op_tables: Option<Vec<TableSpec>>,
    /// When true, only actions where the acting account equals the
    /// receiving account survive.
    pub receiver_equals_account: bool,
    pub output: OutputMode,
    /// Caller-chosen name to search definition, evaluated per trace.
    pub searches: BTreeMap<String, SearchDefinition>,
}

impl Default for SubscriptionRequest {
    fn default() -> Self {
        Self {
            filter_query: String::new(),
            start_block: 0,
            cursor: None,
            irreversible_only: true,
            action_fields: None,
            executed_action_fields: None,
            db_op_tables: None,
            receiver_equals_account: false,
            output: OutputMode::Aggregate,
            searches: BTreeMap::new(),
        }
    }
}
