//! Planner (C4) — lowers a validated DSL query into a backend-neutral
//! [`QueryPlan`].
//!
//! Callers MUST validate (see [`crate::validator::validate`]) before
//! calling [`plan`]; every failure here indicates a planner invariant was
//! violated, i.e. a bug, not a user error (§4.3).

use qe_core::catalog::Model;
use qe_core::dsl::{DslAggregate, DslOperation, DslQuery, DslSortDirection, FilterNode};
use qe_core::ir::{
    AggregateExpr, AggregateFn, FilterExpr, FilterValue, LogicalOp, Operation, Operator,
    OperatorArity, Pagination, QueryPlan, RootModel, Scalar, SelectItem, SortDirection, SortExpr,
    SortTarget, TypedColumnRef,
};
use qe_core::Registry;

use crate::error::{PlanError, PlanResult};

const ROOT_ALIAS: &str = "t0";

/// Lower `query` into a [`QueryPlan`] against `registry`.
pub fn plan(registry: &Registry, query: &DslQuery) -> PlanResult<QueryPlan> {
    let model = registry.get_model(&query.model).ok_or_else(|| {
        PlanError::Invariant(format!("unknown model '{}' reached planner", query.model))
    })?;

    let root_model = RootModel {
        model_ref: model.name.clone(),
        storage_name: model.storage_name.clone(),
        alias: ROOT_ALIAS.to_string(),
        primary_key: column_ref(model, &model.primary_key)?,
    };

    let mut select = Vec::with_capacity(query.fields.len());
    for field in &query.fields {
        select.push(SelectItem {
            column: column_ref(model, field)?,
            alias: field.clone(),
        });
    }

    let filters = query
        .filters
        .as_ref()
        .map(|node| lower_filter(model, node))
        .transpose()?;

    let mut group_by = Vec::with_capacity(query.group_by.len());
    for field in &query.group_by {
        group_by.push(column_ref(model, field)?);
    }

    let mut aggregates = Vec::with_capacity(query.aggregates.len());
    for agg in &query.aggregates {
        aggregates.push(lower_aggregate(model, agg)?);
    }
    let aggregate_aliases: Vec<&str> = aggregates.iter().map(|a| a.alias.as_str()).collect();

    let mut sort = Vec::with_capacity(query.sort.len());
    for s in &query.sort {
        let target = if aggregate_aliases.contains(&s.field.as_str()) {
            SortTarget::AggregateAlias(s.field.clone())
        } else {
            SortTarget::Column(column_ref(model, &s.field)?)
        };
        sort.push(SortExpr {
            target,
            direction: match s.direction {
                DslSortDirection::Asc => SortDirection::Asc,
                DslSortDirection::Desc => SortDirection::Desc,
            },
        });
    }

    let pagination = Pagination {
        limit: query
            .pagination
            .and_then(|p| p.limit)
            .map(|v| v as u32)
            .unwrap_or(100),
        offset: query
            .pagination
            .and_then(|p| p.offset)
            .map(|v| v as u32)
            .unwrap_or(0),
    };

    let data = query.data.as_ref().map(|map| {
        map.iter()
            .map(|(k, v)| {
                let field_type = model
                    .field(k)
                    .map(|f| f.field_type)
                    .unwrap_or(qe_core::FieldType::Json);
                (k.clone(), Scalar::from_json(v, field_type))
            })
            .collect::<Vec<_>>()
    });

    let id = query.id.as_ref().map(|v| {
        let field_type = model
            .primary_key_field()
            .map(|f| f.field_type)
            .unwrap_or(qe_core::FieldType::Json);
        Scalar::from_json(v, field_type)
    });

    let operation = match query.operation {
        DslOperation::Select => Operation::Select,
        DslOperation::Create => Operation::Create,
        DslOperation::Update => Operation::Update,
        DslOperation::Delete => Operation::Delete,
    };

    if operation == Operation::Create && data.is_none() {
        return Err(PlanError::Invariant(
            "create plan requires data; validator should have rejected this".to_string(),
        ));
    }
    if matches!(operation, Operation::Update | Operation::Delete) && id.is_none() && filters.is_none()
    {
        return Err(PlanError::Invariant(
            "update/delete plan requires id or filters; validator should have rejected this"
                .to_string(),
        ));
    }

    Ok(QueryPlan {
        operation,
        root_model,
        select,
        filters,
        group_by,
        aggregates,
        sort,
        pagination,
        data,
        id,
    })
}

fn column_ref(model: &Model, field_name: &str) -> PlanResult<TypedColumnRef> {
    let field = model.field(field_name).ok_or_else(|| {
        PlanError::Invariant(format!(
            "unknown field '{field_name}' on model '{}' reached planner",
            model.name
        ))
    })?;
    Ok(TypedColumnRef {
        alias: ROOT_ALIAS.to_string(),
        column_name: field.name.clone(),
        data_type: field.field_type,
    })
}

fn lower_filter(model: &Model, node: &FilterNode) -> PlanResult<FilterExpr> {
    match node {
        FilterNode::Comparison { field, op, value } => {
            let column = column_ref(model, field)?;
            let operator = Operator::parse(op).ok_or_else(|| {
                PlanError::Invariant(format!("unknown operator '{op}' reached planner"))
            })?;
            let filter_value = lower_value(operator, column.data_type, value.as_ref())?;
            Ok(FilterExpr::Comparison {
                left: column,
                op: operator,
                value: filter_value,
            })
        }
        FilterNode::And { and } => Ok(FilterExpr::Logical {
            op: LogicalOp::And,
            children: and
                .iter()
                .map(|c| lower_filter(model, c))
                .collect::<PlanResult<Vec<_>>>()?,
        }),
        FilterNode::Or { or } => Ok(FilterExpr::Logical {
            op: LogicalOp::Or,
            children: or
                .iter()
                .map(|c| lower_filter(model, c))
                .collect::<PlanResult<Vec<_>>>()?,
        }),
        FilterNode::Not { not } => Ok(FilterExpr::Logical {
            op: LogicalOp::Not,
            children: vec![lower_filter(model, not)?],
        }),
    }
}

fn lower_value(
    op: Operator,
    field_type: qe_core::FieldType,
    value: Option<&serde_json::Value>,
) -> PlanResult<Option<FilterValue>> {
    match (op.arity(), value) {
        (OperatorArity::None, _) => Ok(None),
        (OperatorArity::Scalar, Some(v)) => {
            Ok(Some(FilterValue::Scalar(Scalar::from_json(v, field_type))))
        }
        (OperatorArity::Sequence, Some(serde_json::Value::Array(items))) => Ok(Some(
            FilterValue::Sequence(items.iter().map(|v| Scalar::from_json(v, field_type)).collect()),
        )),
        (OperatorArity::Pair, Some(serde_json::Value::Array(items))) if items.len() == 2 => {
            Ok(Some(FilterValue::Pair(
                Scalar::from_json(&items[0], field_type),
                Scalar::from_json(&items[1], field_type),
            )))
        }
        _ => Err(PlanError::Invariant(format!(
            "operator {op:?} reached planner with incompatible value; validator should have rejected this"
        ))),
    }
}

fn lower_aggregate(model: &Model, agg: &DslAggregate) -> PlanResult<AggregateExpr> {
    let func = AggregateFn::parse(&agg.fn_)
        .ok_or_else(|| PlanError::Invariant(format!("unknown aggregate fn '{}'", agg.fn_)))?;
    let column = if agg.field.is_empty() {
        None
    } else {
        Some(column_ref(model, &agg.field)?)
    };
    Ok(AggregateExpr {
        func,
        column,
        alias: agg.alias.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qe_core::catalog::{CatalogConfig, FieldConfig, FieldType, ModelConfig};
    use serde_json::json;

    fn registry() -> Registry {
        let config = CatalogConfig {
            models: vec![ModelConfig {
                name: "orders".to_string(),
                table: "orders".to_string(),
                primary_key: "id".to_string(),
                fields: vec![
                    FieldConfig {
                        name: "id".to_string(),
                        field_type: FieldType::Integer,
                        nullable: false,
                    },
                    FieldConfig {
                        name: "user_id".to_string(),
                        field_type: FieldType::Uuid,
                        nullable: false,
                    },
                    FieldConfig {
                        name: "status".to_string(),
                        field_type: FieldType::String,
                        nullable: false,
                    },
                ],
            }],
        };
        Registry::load(&config).unwrap()
    }

    #[test]
    fn fills_default_pagination() {
        let q: DslQuery = serde_json::from_value(json!({ "model": "orders" })).unwrap();
        let p = plan(&registry(), &q).unwrap();
        assert_eq!(p.pagination.limit, 100);
        assert_eq!(p.pagination.offset, 0);
    }

    #[test]
    fn default_fill_is_idempotent() {
        let q1: DslQuery = serde_json::from_value(json!({ "model": "orders" })).unwrap();
        let p1 = plan(&registry(), &q1).unwrap();
        let q2: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "pagination": { "limit": 100, "offset": 0 }
        }))
        .unwrap();
        let p2 = plan(&registry(), &q2).unwrap();
        assert_eq!(p1.pagination, p2.pagination);
    }

    #[test]
    fn assigns_root_alias_t0() {
        let q: DslQuery = serde_json::from_value(json!({ "model": "orders" })).unwrap();
        let p = plan(&registry(), &q).unwrap();
        assert_eq!(p.root_model.alias, "t0");
        assert_eq!(p.root_model.primary_key.alias, "t0");
    }

    #[test]
    fn lowers_uuid_filter_value() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "filters": {
                "field": "user_id",
                "op": "=",
                "value": "11111111-1111-1111-1111-111111111111"
            }
        }))
        .unwrap();
        let p = plan(&registry(), &q).unwrap();
        match p.filters.unwrap() {
            FilterExpr::Comparison { value, .. } => match value.unwrap() {
                FilterValue::Scalar(Scalar::Uuid(_)) => {}
                other => panic!("expected uuid scalar, got {other:?}"),
            },
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn planning_is_deterministic() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "filters": { "field": "status", "op": "=", "value": "open" }
        }))
        .unwrap();
        let p1 = plan(&registry(), &q).unwrap();
        let p2 = plan(&registry(), &q).unwrap();
        assert_eq!(p1, p2);
    }
}
