use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DbOp;

/// One contract invocation inside a transaction trace.
///
/// `json` is the action payload as an arbitrary structured value; `db_ops`
/// is only present when the subscription asked the transport for table
/// mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    #[serde(default)]
    pub seq: Option<u64>,
    pub receiver: String,
    pub account: String,
    pub name: String,
    #[serde(default)]
    pub json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_ops: Option<Vec<DbOp>>,
}
