//! DSL wire format (§6.3) — the external JSON query description.
//!
//! Plain `serde` types; no validation lives here. The validator (C3) and
//! planner (C4) own the DSL → IR transformation (§3.3); nothing else parses
//! the DSL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `operation?` — defaults to `select` when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DslOperation {
    Select,
    Create,
    Update,
    Delete,
}

impl Default for DslOperation {
    fn default() -> Self {
        DslOperation::Select
    }
}

/// A single sort directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DslSort {
    pub field: String,
    #[serde(default)]
    pub direction: DslSortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DslSortDirection {
    Asc,
    Desc,
}

impl Default for DslSortDirection {
    fn default() -> Self {
        DslSortDirection::Asc
    }
}

/// A single aggregate directive. The wire field is named `fn`, a reserved
/// word in Rust, hence the rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DslAggregate {
    #[serde(rename = "fn")]
    pub fn_: String,
    #[serde(default)]
    pub field: String,
    pub alias: String,
}

/// Pagination directive.
///
/// Wire values are accepted as `i64` rather than `u32` so that a negative
/// `limit`/`offset` parses successfully and can be rejected by the
/// validator as `BadPagination` (§4.2), rather than failing JSON
/// deserialization with an opaque parse error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DslPagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `FilterNode` (§6.3) — comparison leaf or logical combinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Comparison {
        field: String,
        op: String,
        #[serde(default)]
        value: Option<Value>,
    },
    And {
        and: Vec<FilterNode>,
    },
    Or {
        or: Vec<FilterNode>,
    },
    Not {
        not: Box<FilterNode>,
    },
}

/// The full DSL wire query (§6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DslQuery {
    #[serde(default)]
    pub operation: DslOperation,
    pub model: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filters: Option<FilterNode>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub aggregates: Vec<DslAggregate>,
    #[serde(default)]
    pub sort: Vec<DslSort>,
    #[serde(default)]
    pub pagination: Option<DslPagination>,
    #[serde(default)]
    pub data: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub id: Option<Value>,
}
