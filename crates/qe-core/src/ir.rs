//! Intermediate representation (§3.2) — the backend-neutral output of the
//! planner (C4), consumed once by exactly one builder (C5 or C6).
//!
//! The tree is immutable post-construction: no back-references, no cycles,
//! children owned by their parent and dropped with it (per spec.md §9
//! Design Notes).

use serde::Serialize;

use crate::catalog::FieldType;

/// The one concrete scalar representation shared by the IR, the builders,
/// and the executor's row decoding (promoted from spec.md §9's suggestion
/// to a hard requirement — see SPEC_FULL.md §3).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(chrono::NaiveDateTime),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
}

impl Scalar {
    /// Convert a raw DSL JSON scalar into an IR [`Scalar`], guided by the
    /// target column's declared [`FieldType`]. This is where wire-level
    /// JSON numbers/strings become typed values; it never fails — values
    /// that don't parse per their declared type are carried through as
    /// `Text`/`Json` and surface downstream as driver-level errors instead
    /// of planner errors (planner failures are bugs per §4.3, not user
    /// errors caused by bad data).
    pub fn from_json(value: &serde_json::Value, field_type: FieldType) -> Self {
        match (field_type, value) {
            (_, serde_json::Value::Null) => Scalar::Null,
            (FieldType::Boolean, serde_json::Value::Bool(b)) => Scalar::Bool(*b),
            (FieldType::Integer | FieldType::Int, v) if v.is_i64() || v.is_u64() => {
                Scalar::Int(v.as_i64().unwrap_or_default())
            }
            (FieldType::Float | FieldType::Decimal, v) if v.is_number() => {
                Scalar::Float(v.as_f64().unwrap_or_default())
            }
            (FieldType::Uuid, serde_json::Value::String(s)) => uuid::Uuid::parse_str(s)
                .map(Scalar::Uuid)
                .unwrap_or_else(|_| Scalar::Text(s.clone())),
            (FieldType::Timestamp | FieldType::Datetime, serde_json::Value::String(s)) => {
                parse_timestamp(s)
                    .map(Scalar::Timestamp)
                    .unwrap_or_else(|| Scalar::Text(s.clone()))
            }
            (FieldType::Json, v) => Scalar::Json(v.clone()),
            (FieldType::Binary, serde_json::Value::String(s)) => Scalar::Bytes(s.clone().into_bytes()),
            (_, serde_json::Value::Bool(b)) => Scalar::Bool(*b),
            (_, serde_json::Value::String(s)) => Scalar::Text(s.clone()),
            (_, serde_json::Value::Number(n)) => n
                .as_i64()
                .map(Scalar::Int)
                .unwrap_or_else(|| Scalar::Float(n.as_f64().unwrap_or_default())),
            (_, other) => Scalar::Json(other.clone()),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
        })
}

/// `(model_alias, column_name, data_type)` — emitted by the planner,
/// consumed by builders. The alias is always `t0` in this single-entity
/// planner (spec.md §9: builders MUST read the alias from the IR rather
/// than hard-coding `t0`, so a future multi-entity planner can emit `tN`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedColumnRef {
    pub alias: String,
    pub column_name: String,
    pub data_type: FieldType,
}

/// The closed set of filter operators (§3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    IsNull,
    NotNull,
    Like,
    Ilike,
    StartsWith,
    EndsWith,
    Contains,
    Between,
    Before,
    After,
}

/// Value-arity classes referenced by §4.2's `BadOperatorUsage` check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorArity {
    None,
    Scalar,
    Sequence,
    Pair,
}

impl Operator {
    pub fn parse(raw: &str) -> Option<Operator> {
        Some(match raw {
            "=" => Operator::Eq,
            "≠" | "!=" | "<>" => Operator::Ne,
            ">" => Operator::Gt,
            "≥" | ">=" => Operator::Ge,
            "<" => Operator::Lt,
            "≤" | "<=" => Operator::Le,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            "is_null" => Operator::IsNull,
            "not_null" => Operator::NotNull,
            "like" => Operator::Like,
            "ilike" => Operator::Ilike,
            "starts_with" => Operator::StartsWith,
            "ends_with" => Operator::EndsWith,
            "contains" => Operator::Contains,
            "between" => Operator::Between,
            "before" => Operator::Before,
            "after" => Operator::After,
            _ => return None,
        })
    }

    pub fn arity(self) -> OperatorArity {
        match self {
            Operator::IsNull | Operator::NotNull => OperatorArity::None,
            Operator::In | Operator::NotIn => OperatorArity::Sequence,
            Operator::Between => OperatorArity::Pair,
            _ => OperatorArity::Scalar,
        }
    }
}

/// n-ary (AND/OR) or unary (NOT) logical combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// Recursive filter tree (§3.2). Tagged variant: no back-references, no
/// cycles, owned top-down.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FilterExpr {
    Comparison {
        left: TypedColumnRef,
        op: Operator,
        /// `None` only for `is_null`/`not_null`; a single [`Scalar`] for
        /// scalar operators; a `Json` array-wrapped sequence for
        /// `in`/`not_in`/`between` (builders destructure per operator
        /// arity, not per `Scalar` variant).
        value: Option<FilterValue>,
    },
    Logical {
        op: LogicalOp,
        children: Vec<FilterExpr>,
    },
}

/// The value payload of a [`FilterExpr::Comparison`], shaped per operator
/// arity (§3.2).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(Scalar),
    Sequence(Vec<Scalar>),
    Pair(Scalar, Scalar),
}

/// `{ fn, column?, alias }` (§3.2). `count` permits a `None` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub fn parse(raw: &str) -> Option<AggregateFn> {
        Some(match raw {
            "count" => AggregateFn::Count,
            "sum" => AggregateFn::Sum,
            "avg" => AggregateFn::Avg,
            "min" => AggregateFn::Min,
            "max" => AggregateFn::Max,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateExpr {
    pub func: AggregateFn,
    pub column: Option<TypedColumnRef>,
    pub alias: String,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A sort target: either a real column, or the alias of an aggregate in the
/// same query (§3.2).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SortTarget {
    Column(TypedColumnRef),
    AggregateAlias(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortExpr {
    pub target: SortTarget,
    pub direction: SortDirection,
}

/// A `GROUP BY` target — always a real column (§3.2).
pub type GroupByExpr = TypedColumnRef;

/// `{ limit, offset }`, always populated by the planner (defaults 100/0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// The operation an IR plan performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Select,
    Create,
    Update,
    Delete,
}

/// The root entity a plan targets, with its planner-assigned alias.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootModel {
    pub model_ref: String,
    pub storage_name: String,
    /// Always `"t0"` in this single-entity planner (spec.md §9).
    pub alias: String,
    pub primary_key: TypedColumnRef,
}

/// A single projected column in a `select` plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectItem {
    pub column: TypedColumnRef,
    pub alias: String,
}

/// The frozen, validated IR (§3.2). Value-typed; no mutation after
/// construction; consumed once by one builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(clippy::derive_partial_eq_without_eq)]
pub struct QueryPlan {
    pub operation: Operation,
    pub root_model: RootModel,
    /// May be empty ⇒ `SELECT *` (or, for document builds, a bare `find`
    /// with no projection).
    pub select: Vec<SelectItem>,
    pub filters: Option<FilterExpr>,
    pub group_by: Vec<GroupByExpr>,
    pub aggregates: Vec<AggregateExpr>,
    pub sort: Vec<SortExpr>,
    pub pagination: Pagination,
    /// Key-ordered lexicographically for reproducibility (§4.3 step 5).
    /// Required for `create`; optional for `update`.
    pub data: Option<Vec<(String, Scalar)>>,
    /// Alternative identifier for `update`/`delete` (the single-key path).
    pub id: Option<Scalar>,
}
