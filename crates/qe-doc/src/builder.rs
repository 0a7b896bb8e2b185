//! Backend Query Builder — Document (C6).
//!
//! `build(plan) -> DocumentCommand`, a MongoDB-shaped command record: `{
//! collection, operation, filter?, pipeline?, update?, document?, options? }`
//! (§4.5). Unlike the relational builder there is no parameter list — values
//! are embedded directly in the command document.
//!
//! Open question (operator-support-parity, spec.md §9): the document query
//! language has no direct equivalent for `ilike`, `starts_with`, `ends_with`,
//! `between`, `before`, `after`. Rather than reject these at validation time
//! (which would make the same DSL query valid against one backend and
//! invalid against another), this builder synthesizes them from primitives
//! every document store supports: anchored/case-insensitive `$regex` for the
//! string operators, and a `$gte`/`$lte` pair (wrapped in `$and`) for
//! `between`. `before`/`after` reuse `$lt`/`$gt` — a document store has no
//! separate "temporal before" operator, so they compile identically to
//! `<`/`>`. See DESIGN.md.

use qe_core::ir::{
    AggregateFn, FilterExpr, FilterValue, LogicalOp, Operation, Operator, QueryPlan, Scalar,
    SortDirection, SortTarget,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{BuildError, BuildResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOp {
    Find,
    Aggregate,
    Insert,
    Update,
    Delete,
}

/// The document-store command record (§4.5).
#[derive(Debug, Clone, Serialize)]
pub struct DocumentCommand {
    pub collection: String,
    pub operation: CommandOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

pub fn build(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    match plan.operation {
        Operation::Select if plan.group_by.is_empty() && plan.aggregates.is_empty() => {
            build_find(plan)
        }
        Operation::Select => build_aggregate(plan),
        Operation::Create => build_insert(plan),
        Operation::Update => build_update(plan),
        Operation::Delete => build_delete(plan),
    }
}

fn build_find(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    let filter = plan.filters.as_ref().map(compile_filter).transpose()?;

    let mut options = Map::new();
    options.insert("limit".to_string(), Value::from(plan.pagination.limit));
    options.insert("skip".to_string(), Value::from(plan.pagination.offset));
    if !plan.sort.is_empty() {
        options.insert("sort".to_string(), compile_sort(&plan.sort));
    }

    Ok(DocumentCommand {
        collection: plan.root_model.storage_name.clone(),
        operation: CommandOp::Find,
        filter,
        pipeline: None,
        update: None,
        document: None,
        options: Some(Value::Object(options)),
    })
}

fn build_aggregate(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    let mut pipeline = Vec::new();

    if let Some(filter) = &plan.filters {
        let mut stage = Map::new();
        stage.insert("$match".to_string(), compile_filter(filter)?);
        pipeline.push(Value::Object(stage));
    }

    let mut group_id = Map::new();
    for col in &plan.group_by {
        group_id.insert(
            col.column_name.clone(),
            Value::String(format!("${}", col.column_name)),
        );
    }
    let mut group_stage = Map::new();
    group_stage.insert(
        "_id".to_string(),
        if group_id.is_empty() {
            Value::Null
        } else {
            Value::Object(group_id)
        },
    );
    for agg in &plan.aggregates {
        group_stage.insert(agg.alias.clone(), compile_aggregate(agg));
    }
    let mut group_wrapper = Map::new();
    group_wrapper.insert("$group".to_string(), Value::Object(group_stage));
    pipeline.push(Value::Object(group_wrapper));

    if !plan.sort.is_empty() {
        let mut stage = Map::new();
        stage.insert("$sort".to_string(), compile_sort(&plan.sort));
        pipeline.push(Value::Object(stage));
    }

    let mut skip_stage = Map::new();
    skip_stage.insert("$skip".to_string(), Value::from(plan.pagination.offset));
    pipeline.push(Value::Object(skip_stage));

    let mut limit_stage = Map::new();
    limit_stage.insert("$limit".to_string(), Value::from(plan.pagination.limit));
    pipeline.push(Value::Object(limit_stage));

    Ok(DocumentCommand {
        collection: plan.root_model.storage_name.clone(),
        operation: CommandOp::Aggregate,
        filter: None,
        pipeline: Some(pipeline),
        update: None,
        document: None,
        options: None,
    })
}

fn build_insert(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    let data = plan
        .data
        .as_ref()
        .ok_or_else(|| BuildError::MalformedValue("create plan missing data".to_string()))?;

    let mut document = Map::new();
    for (name, value) in data {
        document.insert(name.clone(), scalar_to_json(value));
    }

    Ok(DocumentCommand {
        collection: plan.root_model.storage_name.clone(),
        operation: CommandOp::Insert,
        filter: None,
        pipeline: None,
        update: None,
        document: Some(Value::Object(document)),
        options: None,
    })
}

fn build_update(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    let data = plan
        .data
        .as_ref()
        .ok_or_else(|| BuildError::MalformedValue("update plan missing data".to_string()))?;

    let mut set_doc = Map::new();
    for (name, value) in data {
        set_doc.insert(name.clone(), scalar_to_json(value));
    }
    let mut update = Map::new();
    update.insert("$set".to_string(), Value::Object(set_doc));

    Ok(DocumentCommand {
        collection: plan.root_model.storage_name.clone(),
        operation: CommandOp::Update,
        filter: Some(compile_selector(plan)?),
        pipeline: None,
        update: Some(Value::Object(update)),
        document: None,
        options: None,
    })
}

fn build_delete(plan: &QueryPlan) -> BuildResult<DocumentCommand> {
    Ok(DocumentCommand {
        collection: plan.root_model.storage_name.clone(),
        operation: CommandOp::Delete,
        filter: Some(compile_selector(plan)?),
        pipeline: None,
        update: None,
        document: None,
        options: None,
    })
}

fn compile_selector(plan: &QueryPlan) -> BuildResult<Value> {
    if let Some(id) = &plan.id {
        let mut filter = Map::new();
        filter.insert(
            plan.root_model.primary_key.column_name.clone(),
            scalar_to_json(id),
        );
        return Ok(Value::Object(filter));
    }
    let filter = plan.filters.as_ref().ok_or_else(|| {
        BuildError::MalformedValue("update/delete plan has neither id nor filters".to_string())
    })?;
    compile_filter(filter)
}

fn compile_filter(expr: &FilterExpr) -> BuildResult<Value> {
    match expr {
        FilterExpr::Comparison { left, op, value } => compile_comparison(&left.column_name, *op, value.as_ref()),
        FilterExpr::Logical { op, children } => {
            let compiled: Result<Vec<Value>, BuildError> =
                children.iter().map(compile_filter).collect();
            let compiled = compiled?;
            let mut wrapper = Map::new();
            let key = match op {
                LogicalOp::And => "$and",
                LogicalOp::Or => "$or",
                LogicalOp::Not => "$not",
            };
            wrapper.insert(key.to_string(), Value::Array(compiled));
            Ok(Value::Object(wrapper))
        }
    }
}

fn compile_comparison(field: &str, op: Operator, value: Option<&FilterValue>) -> BuildResult<Value> {
    match op {
        Operator::IsNull => Ok(field_op(field, "$exists", Value::Bool(false))),
        Operator::NotNull => Ok(field_op(field, "$exists", Value::Bool(true))),
        Operator::Eq => {
            let scalar = expect_scalar(value)?;
            Ok(bare_field(field, scalar_to_json(scalar)))
        }
        Operator::Ne => Ok(field_op(field, "$ne", scalar_to_json(expect_scalar(value)?))),
        Operator::Gt => Ok(field_op(field, "$gt", scalar_to_json(expect_scalar(value)?))),
        Operator::Ge => Ok(field_op(field, "$gte", scalar_to_json(expect_scalar(value)?))),
        Operator::Lt | Operator::Before => {
            Ok(field_op(field, "$lt", scalar_to_json(expect_scalar(value)?)))
        }
        Operator::Le => Ok(field_op(field, "$lte", scalar_to_json(expect_scalar(value)?))),
        Operator::After => Ok(field_op(field, "$gt", scalar_to_json(expect_scalar(value)?))),
        Operator::In => {
            let seq = expect_sequence(value)?;
            Ok(field_op(
                field,
                "$in",
                Value::Array(seq.iter().map(scalar_to_json).collect()),
            ))
        }
        Operator::NotIn => {
            let seq = expect_sequence(value)?;
            Ok(field_op(
                field,
                "$nin",
                Value::Array(seq.iter().map(scalar_to_json).collect()),
            ))
        }
        Operator::Like | Operator::Contains => {
            let text = expect_text(value)?;
            Ok(field_op(field, "$regex", Value::String(escape_regex(&text))))
        }
        Operator::Ilike => {
            let text = expect_text(value)?;
            let mut ops = Map::new();
            ops.insert("$regex".to_string(), Value::String(escape_regex(&text)));
            ops.insert("$options".to_string(), Value::String("i".to_string()));
            let mut outer = Map::new();
            outer.insert(field.to_string(), Value::Object(ops));
            Ok(Value::Object(outer))
        }
        Operator::StartsWith => {
            let text = expect_text(value)?;
            Ok(field_op(
                field,
                "$regex",
                Value::String(format!("^{}", escape_regex(&text))),
            ))
        }
        Operator::EndsWith => {
            let text = expect_text(value)?;
            Ok(field_op(
                field,
                "$regex",
                Value::String(format!("{}$", escape_regex(&text))),
            ))
        }
        Operator::Between => {
            let (low, high) = expect_pair(value)?;
            let lower = field_op(field, "$gte", scalar_to_json(low));
            let upper = field_op(field, "$lte", scalar_to_json(high));
            let mut wrapper = Map::new();
            wrapper.insert("$and".to_string(), Value::Array(vec![lower, upper]));
            Ok(Value::Object(wrapper))
        }
    }
}

fn bare_field(field: &str, value: Value) -> Value {
    let mut m = Map::new();
    m.insert(field.to_string(), value);
    Value::Object(m)
}

fn field_op(field: &str, op: &str, value: Value) -> Value {
    let mut inner = Map::new();
    inner.insert(op.to_string(), value);
    bare_field(field, Value::Object(inner))
}

fn compile_aggregate(agg: &qe_core::ir::AggregateExpr) -> Value {
    let expr = match (&agg.func, &agg.column) {
        (AggregateFn::Count, _) => Value::Number(1.into()),
        (_, Some(col)) => Value::String(format!("${}", col.column_name)),
        (_, None) => Value::Null,
    };
    let op = match agg.func {
        AggregateFn::Count => "$sum",
        AggregateFn::Sum => "$sum",
        AggregateFn::Avg => "$avg",
        AggregateFn::Min => "$min",
        AggregateFn::Max => "$max",
    };
    let mut m = Map::new();
    m.insert(op.to_string(), expr);
    Value::Object(m)
}

/// Emits fields in the order they appear in `sort` (§4.5's "order
/// preserved") — requires `serde_json`'s `preserve_order` feature, since
/// `serde_json::Map` is a plain `BTreeMap` without it.
fn compile_sort(sort: &[qe_core::ir::SortExpr]) -> Value {
    let mut m = Map::new();
    for s in sort {
        let name = match &s.target {
            SortTarget::Column(c) => c.column_name.clone(),
            SortTarget::AggregateAlias(a) => a.clone(),
        };
        let dir = match s.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        };
        m.insert(name, Value::from(dir));
    }
    Value::Object(m)
}

fn scalar_to_json(s: &Scalar) -> Value {
    match s {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => Value::from(*i),
        Scalar::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Scalar::Text(s) => Value::String(s.clone()),
        Scalar::Bytes(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
        Scalar::Timestamp(ts) => Value::String(ts.to_string()),
        Scalar::Uuid(u) => Value::String(u.to_string()),
        Scalar::Json(v) => v.clone(),
    }
}

/// Minimal regex-metacharacter escape for building a literal substring
/// pattern (`like`/`contains`/`starts_with`/`ends_with`). Not a general
/// regex escaper — document stores only need us to keep user text literal.
fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn expect_scalar(value: Option<&FilterValue>) -> BuildResult<&Scalar> {
    match value {
        Some(FilterValue::Scalar(s)) => Ok(s),
        _ => Err(BuildError::MalformedValue(
            "expected a scalar filter value".to_string(),
        )),
    }
}

fn expect_sequence(value: Option<&FilterValue>) -> BuildResult<&Vec<Scalar>> {
    match value {
        Some(FilterValue::Sequence(s)) => Ok(s),
        _ => Err(BuildError::MalformedValue(
            "expected a sequence filter value".to_string(),
        )),
    }
}

fn expect_pair(value: Option<&FilterValue>) -> BuildResult<(&Scalar, &Scalar)> {
    match value {
        Some(FilterValue::Pair(low, high)) => Ok((low, high)),
        _ => Err(BuildError::MalformedValue(
            "expected a pair filter value".to_string(),
        )),
    }
}

fn expect_text(value: Option<&FilterValue>) -> BuildResult<String> {
    match value {
        Some(FilterValue::Scalar(Scalar::Text(t))) => Ok(t.clone()),
        _ => Err(BuildError::MalformedValue(
            "expected a text filter value".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qe_core::ir::*;
    use qe_core::FieldType;

    fn col(name: &str, ty: FieldType) -> TypedColumnRef {
        TypedColumnRef {
            alias: "t0".to_string(),
            column_name: name.to_string(),
            data_type: ty,
        }
    }

    fn base_plan() -> QueryPlan {
        QueryPlan {
            operation: Operation::Select,
            root_model: RootModel {
                model_ref: "orders".to_string(),
                storage_name: "orders".to_string(),
                alias: "t0".to_string(),
                primary_key: col("id", FieldType::Integer),
            },
            select: Vec::new(),
            filters: None,
            group_by: Vec::new(),
            aggregates: Vec::new(),
            sort: Vec::new(),
            pagination: Pagination::default(),
            data: None,
            id: None,
        }
    }

    #[test]
    fn find_with_equality_filter() {
        let mut plan = base_plan();
        plan.filters = Some(FilterExpr::Comparison {
            left: col("status", FieldType::String),
            op: Operator::Eq,
            value: Some(FilterValue::Scalar(Scalar::Text("open".to_string()))),
        });
        let cmd = build(&plan).unwrap();
        assert_eq!(cmd.operation, CommandOp::Find);
        assert_eq!(
            cmd.filter.unwrap(),
            serde_json::json!({"status": "open"})
        );
    }

    #[test]
    fn select_with_count_becomes_aggregate_pipeline() {
        let mut plan = base_plan();
        plan.group_by = vec![col("status", FieldType::String)];
        plan.aggregates = vec![AggregateExpr {
            func: AggregateFn::Count,
            column: None,
            alias: "n".to_string(),
        }];
        let cmd = build(&plan).unwrap();
        assert_eq!(cmd.operation, CommandOp::Aggregate);
        let pipeline = cmd.pipeline.unwrap();
        assert_eq!(
            pipeline[0],
            serde_json::json!({"$group": {"_id": {"status": "$status"}, "n": {"$sum": 1}}})
        );
    }

    #[test]
    fn between_synthesizes_and_of_gte_lte() {
        let mut plan = base_plan();
        plan.filters = Some(FilterExpr::Comparison {
            left: col("total", FieldType::Decimal),
            op: Operator::Between,
            value: Some(FilterValue::Pair(Scalar::Float(1.0), Scalar::Float(2.0))),
        });
        let cmd = build(&plan).unwrap();
        assert_eq!(
            cmd.filter.unwrap(),
            serde_json::json!({"$and": [{"total": {"$gte": 1.0}}, {"total": {"$lte": 2.0}}]})
        );
    }

    #[test]
    fn insert_carries_data_verbatim() {
        let mut plan = base_plan();
        plan.operation = Operation::Create;
        plan.data = Some(vec![
            ("email".to_string(), Scalar::Text("a@b".to_string())),
            ("name".to_string(), Scalar::Text("A".to_string())),
        ]);
        let cmd = build(&plan).unwrap();
        assert_eq!(cmd.operation, CommandOp::Insert);
        assert_eq!(
            cmd.document.unwrap(),
            serde_json::json!({"email": "a@b", "name": "A"})
        );
    }

    #[test]
    fn update_by_id_uses_set_and_id_filter() {
        let mut plan = base_plan();
        plan.operation = Operation::Update;
        plan.data = Some(vec![("name".to_string(), Scalar::Text("X".to_string()))]);
        plan.id = Some(Scalar::Int(7));
        let cmd = build(&plan).unwrap();
        assert_eq!(cmd.filter.unwrap(), serde_json::json!({"id": 7}));
        assert_eq!(
            cmd.update.unwrap(),
            serde_json::json!({"$set": {"name": "X"}})
        );
    }

    #[test]
    fn pagination_maps_to_limit_and_skip() {
        let mut plan = base_plan();
        plan.pagination = Pagination {
            limit: 25,
            offset: 50,
        };
        let cmd = build(&plan).unwrap();
        let options = cmd.options.unwrap();
        assert_eq!(options["limit"], serde_json::json!(25));
        assert_eq!(options["skip"], serde_json::json!(50));
    }
}
