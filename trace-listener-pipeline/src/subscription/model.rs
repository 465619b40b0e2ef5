use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use trace_listener_shared::paths::{short_table_path, type_path};
use trace_listener_shared::types::ActionRecord;

use super::{OutputMode, SubscriptionRequest, TableSpec};
use crate::errors::ConfigurationError;
use crate::search::SearchSpec;

/// Projection applied to matching actions when the caller supplies none.
pub const DEFAULT_ACTION_FIELDS: [&str; 5] = ["seq", "receiver", "account", "name", "json"];

/// Field-selection shape handed to the transport, derived once per request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Projection {
    pub action_fields: Vec<String>,
    /// `None` means executed actions are not fetched at all.
    pub executed_action_fields: Option<Vec<String>>,
    /// Whether the dbOp sub-fields are requested for each action.
    pub include_db_ops: bool,
}

/// The wire-level query shape for one subscription.
///
/// Computed once at construction and immutable for the life of the
/// subscription; re-deriving mid-stream would desynchronize with the
/// in-flight subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceQuery {
    pub filter: String,
    pub low_block_num: u64,
    /// Supersedes `low_block_num` when present.
    pub cursor: Option<String>,
    pub irreversible_only: bool,
    pub projection: Projection,
}

/// The resumable stream position, updated from each processed event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamPosition {
    pub block_num: u64,
    pub cursor: Option<String>,
}

/// Which dbOps get decoded, resolved once from the request's table specs.
#[derive(Clone, Debug)]
enum DbOpDecoding {
    Disabled,
    /// Decode every op, inferring the type path from the op's own key
    /// metadata (type name = table name).
    All,
    /// Decode only the listed tables; short table path to type path.
    Selected(HashMap<String, String>),
}

/// One validated, normalized subscription.
///
/// Mutable only through [`Subscription::advance_progress`].
#[derive(Clone, Debug)]
pub struct Subscription {
    query: TraceQuery,
    output: OutputMode,
    receiver_equals_account: bool,
    db_ops: DbOpDecoding,
    searches: BTreeMap<String, SearchSpec>,
    position: StreamPosition,
}

impl Subscription {
    /// Validates and normalizes a request.
    ///
    /// Fails fast with a [`ConfigurationError`] before any subscription is
    /// opened.
    pub fn new(request: SubscriptionRequest) -> Result<Self, ConfigurationError> {
        if request.filter_query.is_empty() {
            return Err(ConfigurationError::EmptyFilterQuery);
        }

        let db_ops = match request.db_op_tables {
            None => DbOpDecoding::Disabled,
            Some(specs) if specs.is_empty() => DbOpDecoding::All,
            Some(specs) => {
                let mut tables = HashMap::new();
                for spec in &specs {
                    validate_table_spec(spec)?;
                    tables.insert(
                        short_table_path(&spec.account, &spec.table),
                        type_path(&spec.account, &spec.type_name),
                    );
                }
                DbOpDecoding::Selected(tables)
            }
        };

        let mut searches = BTreeMap::new();
        for (name, definition) in request.searches {
            let spec = SearchSpec::new(definition.list_name, definition.tree).map_err(
                |reason| ConfigurationError::InvalidSearch {
                    name: name.clone(),
                    reason: reason.to_string(),
                },
            )?;
            searches.insert(name, spec);
        }

        let projection = Projection {
            action_fields: request.action_fields.unwrap_or_else(|| {
                DEFAULT_ACTION_FIELDS.iter().map(|f| f.to_string()).collect()
            }),
            executed_action_fields: request.executed_action_fields,
            include_db_ops: !matches!(db_ops, DbOpDecoding::Disabled),
        };

        let position = StreamPosition {
            block_num: request.start_block,
            cursor: request.cursor.clone(),
        };

        let query = TraceQuery {
            filter: request.filter_query,
            low_block_num: request.start_block,
            cursor: request.cursor,
            irreversible_only: request.irreversible_only,
            projection,
        };

        Ok(Self {
            query,
            output: request.output,
            receiver_equals_account: request.receiver_equals_account,
            db_ops,
            searches,
            position,
        })
    }

    pub fn query(&self) -> &TraceQuery {
        &self.query
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }

    /// Whether any decode work happens at all.
    pub fn has_db_ops(&self) -> bool {
        !matches!(self.db_ops, DbOpDecoding::Disabled)
    }

    /// Whether only the declared tables survive decoding (selective mode,
    /// grouped by short table path).
    pub fn should_filter_db_ops(&self) -> bool {
        matches!(self.db_ops, DbOpDecoding::Selected(_))
    }

    /// Resolves one dbOp's `(code, table)` key to the type path describing
    /// its rows; `None` means the op is not decoded (and, in selective
    /// mode, dropped).
    pub fn db_op_type_path(&self, code: &str, table: &str) -> Option<String> {
        match &self.db_ops {
            DbOpDecoding::Disabled => None,
            DbOpDecoding::All => Some(type_path(code, table)),
            DbOpDecoding::Selected(tables) => {
                tables.get(&short_table_path(code, table)).cloned()
            }
        }
    }

    /// Type paths declared up front, for cache warming before the
    /// subscription opens.
    pub fn declared_type_paths(&self) -> Vec<String> {
        match &self.db_ops {
            DbOpDecoding::Selected(tables) => {
                let mut paths: Vec<String> = tables.values().cloned().collect();
                paths.sort();
                paths.dedup();
                paths
            }
            _ => Vec::new(),
        }
    }

    /// Applies the receiver-equals-account filter; pure and
    /// order-preserving.
    pub fn filter_actions(&self, actions: Vec<ActionRecord>) -> Vec<ActionRecord> {
        if !self.receiver_equals_account {
            return actions;
        }
        actions
            .into_iter()
            .filter(|action| action.receiver == action.account)
            .collect()
    }

    pub fn has_searches(&self) -> bool {
        !self.searches.is_empty()
    }

    /// Runs every configured search against the trace document.
    ///
    /// Returns `None` when no searches are configured, which is distinct
    /// from every search returning zero matches.
    pub fn evaluate_searches(&self, trace_doc: &Value) -> Option<BTreeMap<String, Vec<Value>>> {
        if self.searches.is_empty() {
            return None;
        }
        Some(
            self.searches
                .iter()
                .map(|(name, spec)| (name.clone(), spec.run_search(trace_doc)))
                .collect(),
        )
    }

    /// Updates the tracked resumption position from an event's own reported
    /// block number and cursor. Called only after the event is fully
    /// processed, so a crash-and-resume never advances past incomplete
    /// work.
    pub fn advance_progress(&mut self, block_num: u64, cursor: &str) {
        self.position.block_num = block_num;
        self.position.cursor = Some(cursor.to_string());
    }

    pub fn position(&self) -> &StreamPosition {
        &self.position
    }
}

fn validate_table_spec(spec: &TableSpec) -> Result<(), ConfigurationError> {
    let fields = [
        ("account", &spec.account),
        ("table", &spec.table),
        ("type", &spec.type_name),
    ];
    for (label, value) in fields {
        if value.is_empty() || value.contains('/') {
            return Err(ConfigurationError::InvalidTableSpec(format!(
                "{} '{}' must be non-empty and must not contain '/'",
                label, value
            )));
        }
    }
    Ok(())
}
