//! Structural search matcher.
//!
//! Evaluates a nested predicate tree against arbitrary JSON documents.
//! Leaves are allowed-value sets (equality-or-membership only, no wildcards
//! or ranges); interior nodes recurse into the corresponding sub-object.
//! Matching is total and side-effect-free.

use std::collections::BTreeMap;

use serde_json::Value;

/// One node of a preprocessed predicate tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Candidate value must equal at least one of these values.
    Leaf(Vec<Value>),
    /// Recurse into the candidate's sub-object.
    Branch(BTreeMap<String, Predicate>),
}

impl Predicate {
    fn from_value(value: Value) -> Predicate {
        match value {
            Value::Object(map) => Predicate::Branch(
                map.into_iter()
                    .map(|(key, term)| (key, Predicate::from_value(term)))
                    .collect(),
            ),
            // A bare scalar is a single-element allowed set, so leaf
            // matching is uniform.
            Value::Array(allowed) => Predicate::Leaf(allowed),
            scalar => Predicate::Leaf(vec![scalar]),
        }
    }
}

/// A named list to iterate plus the predicate tree applied to each element.
///
/// The tree is preprocessed once at construction; evaluation never fails.
#[derive(Clone, Debug)]
pub struct SearchSpec {
    list_name: String,
    root: BTreeMap<String, Predicate>,
}

impl SearchSpec {
    /// Preprocesses a raw predicate tree.
    ///
    /// The tree must be a non-empty JSON object and `list_name` must name
    /// the trace field to iterate.
    pub fn new(list_name: impl Into<String>, tree: Value) -> Result<Self, &'static str> {
        let list_name = list_name.into();
        if list_name.is_empty() {
            return Err("list name must not be empty");
        }
        let root = match Predicate::from_value(tree) {
            Predicate::Branch(root) if !root.is_empty() => root,
            _ => return Err("predicate tree must be a non-empty object"),
        };
        Ok(Self { list_name, root })
    }

    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    /// True iff every leaf predicate matches the corresponding path in the
    /// candidate document.
    pub fn matches(&self, candidate: &Value) -> bool {
        matches_branch(&self.root, candidate)
    }

    /// Applies the matcher to every element of `doc[list_name]`, preserving
    /// order. An absent or non-array list yields an empty result.
    pub fn run_search(&self, doc: &Value) -> Vec<Value> {
        match doc.get(&self.list_name).and_then(Value::as_array) {
            Some(items) => items
                .iter()
                .filter(|item| self.matches(item))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

fn matches_branch(predicates: &BTreeMap<String, Predicate>, candidate: &Value) -> bool {
    if candidate.is_null() {
        return false;
    }
    predicates.iter().all(|(key, predicate)| {
        match (predicate, candidate.get(key)) {
            (Predicate::Leaf(allowed), Some(value)) => allowed.contains(value),
            (Predicate::Branch(inner), Some(value)) => matches_branch(inner, value),
            // A missing path fails the match regardless of remaining
            // predicates.
            (_, None) => false,
        }
    })
}
