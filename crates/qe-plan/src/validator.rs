//! DSL Validator (C3) — validates a DSL query against a registry.
//!
//! Pure over the registry snapshot; never touches the backend (§4.3:
//! validation completes before any planning).

use qe_core::catalog::Model;
use qe_core::dsl::{DslAggregate, DslOperation, DslQuery, FilterNode};
use qe_core::ir::{AggregateFn, Operator, OperatorArity};
use qe_core::Registry;

use crate::error::{ValidationError, ValidationResult};

/// Validate `query` against `registry`. Checks run in the order documented
/// in spec.md §4.2's table and return the first failure encountered.
pub fn validate(registry: &Registry, query: &DslQuery) -> ValidationResult<()> {
    if query.model.is_empty() {
        return Err(ValidationError::UnknownModel(query.model.clone()));
    }
    let model = registry
        .get_model(&query.model)
        .ok_or_else(|| ValidationError::UnknownModel(query.model.clone()))?;

    for field in &query.fields {
        require_field(model, field)?;
    }

    if let Some(filter) = &query.filters {
        validate_filter(model, filter)?;
    }

    let mut aggregate_aliases = Vec::with_capacity(query.aggregates.len());
    for agg in &query.aggregates {
        validate_aggregate(model, agg)?;
        aggregate_aliases.push(agg.alias.as_str());
    }

    for sort in &query.sort {
        if !aggregate_aliases.contains(&sort.field.as_str()) {
            require_field(model, &sort.field)?;
        }
    }

    for field in &query.group_by {
        require_field(model, field)?;
    }

    if let Some(pagination) = &query.pagination {
        if pagination.limit.is_some_and(|v| v < 0) {
            return Err(ValidationError::BadPagination(
                "limit must be >= 0".to_string(),
            ));
        }
        if pagination.offset.is_some_and(|v| v < 0) {
            return Err(ValidationError::BadPagination(
                "offset must be >= 0".to_string(),
            ));
        }
    }

    match query.operation {
        DslOperation::Select => {}
        DslOperation::Create => {
            let data = query.data.as_ref().ok_or(ValidationError::MissingData)?;
            if data.is_empty() {
                return Err(ValidationError::MissingData);
            }
            for field in &model.fields {
                if field.name == model.primary_key {
                    // Primary keys may be generated by the backend.
                    continue;
                }
                if !field.nullable && !data.contains_key(&field.name) {
                    return Err(ValidationError::MissingRequiredField(field.name.clone()));
                }
            }
        }
        DslOperation::Update | DslOperation::Delete => {
            let has_id = query.id.is_some();
            let has_filters = query.filters.is_some();
            if !has_id && !has_filters {
                return Err(ValidationError::MissingSelector);
            }
        }
    }

    Ok(())
}

fn require_field(model: &Model, field: &str) -> ValidationResult<()> {
    if model.field(field).is_none() {
        return Err(ValidationError::UnknownField {
            model: model.name.clone(),
            field: field.to_string(),
        });
    }
    Ok(())
}

fn validate_filter(model: &Model, node: &FilterNode) -> ValidationResult<()> {
    match node {
        FilterNode::Comparison { field, op, value } => {
            require_field(model, field)?;
            let operator = Operator::parse(op)
                .ok_or_else(|| ValidationError::UnknownOperator(op.clone()))?;
            validate_arity(operator, value.as_ref())?;
        }
        FilterNode::And { and } => {
            for child in and {
                validate_filter(model, child)?;
            }
        }
        FilterNode::Or { or } => {
            for child in or {
                validate_filter(model, child)?;
            }
        }
        FilterNode::Not { not } => validate_filter(model, not)?,
    }
    Ok(())
}

fn validate_arity(op: Operator, value: Option<&serde_json::Value>) -> ValidationResult<()> {
    match (op.arity(), value) {
        (OperatorArity::None, None) => Ok(()),
        (OperatorArity::Scalar, Some(v)) if !v.is_array() => Ok(()),
        (OperatorArity::Sequence, Some(serde_json::Value::Array(items))) if !items.is_empty() => {
            Ok(())
        }
        (OperatorArity::Pair, Some(serde_json::Value::Array(items))) if items.len() == 2 => {
            Ok(())
        }
        _ => Err(ValidationError::BadOperatorUsage(format!(
            "operator {op:?} received a value with incompatible arity"
        ))),
    }
}

fn validate_aggregate(model: &Model, agg: &DslAggregate) -> ValidationResult<()> {
    let func = AggregateFn::parse(&agg.fn_)
        .ok_or_else(|| ValidationError::UnknownOperator(agg.fn_.clone()))?;
    if func == AggregateFn::Count && agg.field.is_empty() {
        return Ok(());
    }
    let field = model
        .field(&agg.field)
        .ok_or_else(|| ValidationError::UnknownField {
            model: model.name.clone(),
            field: agg.field.clone(),
        })?;
    if !field.aggregatable {
        return Err(ValidationError::TypeMismatch(format!(
            "field '{}' is not aggregatable",
            agg.field
        )));
    }
    Ok(())
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
                        field_type: FieldType::Uuid,
                        nullable: false,
                    },
                    FieldConfig {
                        name: "status".to_string(),
                        field_type: FieldType::String,
                        nullable: false,
                    },
                    FieldConfig {
                        name: "total".to_string(),
                        field_type: FieldType::Decimal,
                        nullable: true,
                    },
                ],
            }],
        };
        Registry::load(&config).unwrap()
    }

    fn base_query() -> DslQuery {
        serde_json::from_value(json!({ "model": "orders" })).unwrap()
    }

    #[test]
    fn accepts_minimal_select() {
        assert!(validate(&registry(), &base_query()).is_ok());
    }

    #[test]
    fn rejects_unknown_model() {
        let mut q = base_query();
        q.model = "missing".to_string();
        assert_eq!(
            validate(&registry(), &q),
            Err(ValidationError::UnknownModel("missing".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_select_field() {
        let mut q = base_query();
        q.fields = vec!["nope".to_string()];
        assert!(matches!(
            validate(&registry(), &q),
            Err(ValidationError::UnknownField { .. })
        ));
    }

    #[test]
    fn rejects_unknown_operator() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "filters": { "field": "status", "op": "frobnicate", "value": "x" }
        }))
        .unwrap();
        assert!(matches!(
            validate(&registry(), &q),
            Err(ValidationError::UnknownOperator(_))
        ));
    }

    #[test]
    fn rejects_between_with_wrong_arity() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "filters": { "field": "total", "op": "between", "value": [1] }
        }))
        .unwrap();
        assert!(matches!(
            validate(&registry(), &q),
            Err(ValidationError::BadOperatorUsage(_))
        ));
    }

    #[test]
    fn accepts_between_with_pair() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "filters": { "field": "total", "op": "between", "value": [1, 2] }
        }))
        .unwrap();
        assert!(validate(&registry(), &q).is_ok());
    }

    #[test]
    fn rejects_in_with_scalar_value() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "filters": { "field": "status", "op": "in", "value": "active" }
        }))
        .unwrap();
        assert!(matches!(
            validate(&registry(), &q),
            Err(ValidationError::BadOperatorUsage(_))
        ));
    }

    #[test]
    fn accepts_is_null_with_no_value() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "filters": { "field": "total", "op": "is_null" }
        }))
        .unwrap();
        assert!(validate(&registry(), &q).is_ok());
    }

    #[test]
    fn rejects_is_null_with_a_value() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "filters": { "field": "total", "op": "is_null", "value": true }
        }))
        .unwrap();
        assert!(matches!(
            validate(&registry(), &q),
            Err(ValidationError::BadOperatorUsage(_))
        ));
    }

    #[test]
    fn rejects_aggregate_on_non_aggregatable_field() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "aggregates": [{ "fn": "sum", "field": "status", "alias": "total_status" }]
        }))
        .unwrap();
        assert!(matches!(
            validate(&registry(), &q),
            Err(ValidationError::TypeMismatch(_))
        ));
    }

    #[test]
    fn accepts_count_star() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "group_by": ["status"],
            "aggregates": [{ "fn": "count", "field": "", "alias": "n" }]
        }))
        .unwrap();
        assert!(validate(&registry(), &q).is_ok());
    }

    #[test]
    fn accepts_sort_by_aggregate_alias() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "aggregates": [{ "fn": "count", "field": "", "alias": "n" }],
            "sort": [{ "field": "n", "direction": "desc" }]
        }))
        .unwrap();
        assert!(validate(&registry(), &q).is_ok());
    }

    #[test]
    fn rejects_negative_limit() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "pagination": { "limit": -1, "offset": 0 }
        }))
        .unwrap();
        assert!(matches!(
            validate(&registry(), &q),
            Err(ValidationError::BadPagination(_))
        ));
    }

    #[test]
    fn rejects_create_without_data() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "operation": "create"
        }))
        .unwrap();
        assert_eq!(validate(&registry(), &q), Err(ValidationError::MissingData));
    }

    #[test]
    fn rejects_create_missing_required_field() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "operation": "create",
            "data": { "id": "11111111-1111-1111-1111-111111111111" }
        }))
        .unwrap();
        assert!(matches!(
            validate(&registry(), &q),
            Err(ValidationError::MissingRequiredField(_))
        ));
    }

    #[test]
    fn accepts_create_with_all_required_fields() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "operation": "create",
            "data": { "status": "pending" }
        }))
        .unwrap();
        assert!(validate(&registry(), &q).is_ok());
    }

    #[test]
    fn rejects_update_without_id_or_filters() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "operation": "update",
            "data": { "status": "done" }
        }))
        .unwrap();
        assert_eq!(
            validate(&registry(), &q),
            Err(ValidationError::MissingSelector)
        );
    }

    #[test]
    fn accepts_update_with_id() {
        let q: DslQuery = serde_json::from_value(json!({
            "model": "orders",
            "operation": "update",
            "id": 7,
            "data": { "status": "done" }
        }))
        .unwrap();
        assert!(validate(&registry(), &q).is_ok());
    }
}
