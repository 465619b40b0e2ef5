use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of table-row mutation recorded by a dbOp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbOperation {
    #[serde(rename = "ins")]
    Insert,
    #[serde(rename = "upd")]
    Update,
    #[serde(rename = "rem")]
    Remove,
}

impl DbOperation {
    pub fn is_insert(&self) -> bool {
        matches!(self, DbOperation::Insert)
    }

    pub fn is_update(&self) -> bool {
        matches!(self, DbOperation::Update)
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, DbOperation::Remove)
    }
}

/// Identifies the table row a dbOp touched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbOpKey {
    pub code: String,
    pub table: String,
    pub scope: String,
    pub key: String,
}

/// One table-row mutation as delivered by the transport.
///
/// `old_data`/`new_data` are hex-encoded payloads; the decode gateway turns
/// them into value trees (see [`DecodedDbOp`]). An insert carries no
/// `old_data`, a remove no `new_data`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbOp {
    pub operation: DbOperation,
    #[serde(default)]
    pub old_payer: Option<String>,
    #[serde(default)]
    pub new_payer: Option<String>,
    pub key: DbOpKey,
    #[serde(default)]
    pub old_data: Option<String>,
    #[serde(default)]
    pub new_data: Option<String>,
}

/// A dbOp whose payloads have been decoded through the contract's ABI.
///
/// Both sides are decoded independently from their respective raw payloads.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedDbOp {
    pub operation: DbOperation,
    pub old_payer: Option<String>,
    pub new_payer: Option<String>,
    pub key: DbOpKey,
    pub old_data: Option<Value>,
    pub new_data: Option<Value>,
}
