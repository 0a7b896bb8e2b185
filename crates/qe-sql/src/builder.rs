//! Backend Query Builder — Relational (C5).
//!
//! `build(plan) -> (text, params)` where `text` is a single parameterized
//! statement using positional placeholders (`$1`, `$2`, …) numbered
//! left-to-right, and `params` holds the bound values in the same order
//! (§4.4, §8.1 invariants 1–3).
//!
//! A fresh [`SqlBuilder`] is constructed per call — it owns a per-invocation
//! parameter list and placeholder counter that is never reused across calls
//! (§5), so concurrent callers never share builder state.

use qe_core::ir::{
    AggregateExpr, AggregateFn, FilterExpr, FilterValue, LogicalOp, Operation, Operator,
    QueryPlan, Scalar, SortDirection, SortTarget, TypedColumnRef,
};

use crate::error::{BuildError, BuildResult};

/// A single bound parameter. `Sequence` backs `in`/`not_in`, which bind a
/// Postgres array against `= ANY($n)` / `!= ALL($n)`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Value(Scalar),
    Sequence(Vec<Scalar>),
}

/// Build a single relational statement (plus its bound parameters) from a
/// [`QueryPlan`].
pub fn build(plan: &QueryPlan) -> BuildResult<(String, Vec<SqlParam>)> {
    let mut builder = SqlBuilder::default();
    let text = match plan.operation {
        Operation::Select => builder.build_select(plan)?,
        Operation::Create => builder.build_create(plan)?,
        Operation::Update => builder.build_update(plan)?,
        Operation::Delete => builder.build_delete(plan)?,
    };
    Ok((text, builder.params))
}

#[derive(Default)]
struct SqlBuilder {
    params: Vec<SqlParam>,
}

impl SqlBuilder {
    fn push(&mut self, param: SqlParam) -> usize {
        self.params.push(param);
        self.params.len()
    }

    fn build_select(&mut self, plan: &QueryPlan) -> BuildResult<String> {
        let projection = self.compile_projection(plan);
        let mut sql = format!(
            "SELECT {} FROM {} {}",
            projection, plan.root_model.storage_name, plan.root_model.alias
        );

        if let Some(filter) = &plan.filters {
            sql.push_str(" WHERE ");
            sql.push_str(&self.compile_filter(filter, true)?);
        }

        if !plan.group_by.is_empty() {
            let cols: Vec<String> = plan
                .group_by
                .iter()
                .map(|c| format!("{}.{}", c.alias, c.column_name))
                .collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&cols.join(", "));
        }

        if !plan.sort.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.compile_sort(&plan.sort));
        }

        let limit_idx = self.push(SqlParam::Value(Scalar::Int(plan.pagination.limit as i64)));
        let offset_idx = self.push(SqlParam::Value(Scalar::Int(plan.pagination.offset as i64)));
        sql.push_str(&format!(" LIMIT ${limit_idx} OFFSET ${offset_idx};"));

        Ok(sql)
    }

    fn build_create(&mut self, plan: &QueryPlan) -> BuildResult<String> {
        let data = plan
            .data
            .as_ref()
            .ok_or_else(|| BuildError::MalformedValue("create plan missing data".to_string()))?;

        let mut columns = Vec::with_capacity(data.len());
        let mut placeholders = Vec::with_capacity(data.len());
        for (name, value) in data {
            columns.push(name.clone());
            let idx = self.push(SqlParam::Value(value.clone()));
            placeholders.push(format!("${idx}"));
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *;",
            plan.root_model.storage_name,
            columns.join(", "),
            placeholders.join(", ")
        ))
    }

    fn build_update(&mut self, plan: &QueryPlan) -> BuildResult<String> {
        let data = plan
            .data
            .as_ref()
            .ok_or_else(|| BuildError::MalformedValue("update plan missing data".to_string()))?;

        let mut sets = Vec::with_capacity(data.len());
        for (name, value) in data {
            let idx = self.push(SqlParam::Value(value.clone()));
            sets.push(format!("{name} = ${idx}"));
        }

        let selector = self.compile_selector(plan)?;
        Ok(format!(
            "UPDATE {} SET {} WHERE {} RETURNING *;",
            plan.root_model.storage_name,
            sets.join(", "),
            selector
        ))
    }

    fn build_delete(&mut self, plan: &QueryPlan) -> BuildResult<String> {
        let selector = self.compile_selector(plan)?;
        Ok(format!(
            "DELETE FROM {} WHERE {};",
            plan.root_model.storage_name, selector
        ))
    }

    /// `update`/`delete` statements target the bare table, with no alias —
    /// unlike `select`, whose filters are always compiled against `t0`
    /// (§4.4's examples 5/6 show `WHERE id = $2`, not `WHERE t0.id = $2`).
    fn compile_selector(&mut self, plan: &QueryPlan) -> BuildResult<String> {
        if let Some(id) = &plan.id {
            let idx = self.push(SqlParam::Value(id.clone()));
            return Ok(format!(
                "{} = ${}",
                plan.root_model.primary_key.column_name, idx
            ));
        }
        let filter = plan.filters.as_ref().ok_or_else(|| {
            BuildError::MalformedValue("update/delete plan has neither id nor filters".to_string())
        })?;
        self.compile_filter(filter, false)
    }

    fn compile_projection(&self, plan: &QueryPlan) -> String {
        let mut columns: Vec<String> = Vec::new();

        if !plan.select.is_empty() {
            for item in &plan.select {
                if item.alias != item.column.column_name {
                    columns.push(format!(
                        "{}.{} AS {}",
                        item.column.alias, item.column.column_name, item.alias
                    ));
                } else {
                    columns.push(format!("{}.{}", item.column.alias, item.column.column_name));
                }
            }
        } else if !plan.group_by.is_empty() {
            for g in &plan.group_by {
                columns.push(format!("{}.{}", g.alias, g.column_name));
            }
        }

        for agg in &plan.aggregates {
            columns.push(compile_aggregate(agg));
        }

        if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(", ")
        }
    }

    fn compile_sort(&self, sort: &[qe_core::ir::SortExpr]) -> String {
        sort.iter()
            .map(|s| {
                let target = match &s.target {
                    SortTarget::Column(c) => format!("{}.{}", c.alias, c.column_name),
                    SortTarget::AggregateAlias(alias) => alias.clone(),
                };
                let dir = match s.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                format!("{target} {dir}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn compile_filter(&mut self, expr: &FilterExpr, qualify: bool) -> BuildResult<String> {
        match expr {
            FilterExpr::Comparison { left, op, value } => {
                self.compile_comparison(left, *op, value.as_ref(), qualify)
            }
            FilterExpr::Logical { op, children } => match op {
                LogicalOp::Not => {
                    let child = children.first().ok_or_else(|| {
                        BuildError::MalformedValue("NOT with no child".to_string())
                    })?;
                    Ok(format!("NOT {}", self.compile_filter(child, qualify)?))
                }
                LogicalOp::And | LogicalOp::Or => {
                    let joiner = if *op == LogicalOp::And { "AND" } else { "OR" };
                    let mut parts = Vec::with_capacity(children.len());
                    for child in children {
                        parts.push(self.compile_filter(child, qualify)?);
                    }
                    Ok(format!("({})", parts.join(&format!(" {joiner} "))))
                }
            },
        }
    }

    fn compile_comparison(
        &mut self,
        column: &TypedColumnRef,
        op: Operator,
        value: Option<&FilterValue>,
        qualify: bool,
    ) -> BuildResult<String> {
        let col_ref = if qualify {
            format!("{}.{}", column.alias, column.column_name)
        } else {
            column.column_name.clone()
        };
        let cast = column.data_type.cast_suffix();

        match op {
            Operator::IsNull => Ok(format!("{col_ref} IS NULL")),
            Operator::NotNull => Ok(format!("{col_ref} IS NOT NULL")),
            Operator::Eq | Operator::Ne => {
                let scalar = expect_scalar(value)?;
                let idx = self.push(SqlParam::Value(scalar.clone()));
                let placeholder = cast_placeholder(idx, cast, false);
                let sym = if op == Operator::Eq { "=" } else { "!=" };
                Ok(format!("{col_ref} {sym} {placeholder}"))
            }
            Operator::In | Operator::NotIn => {
                let seq = expect_sequence(value)?;
                let idx = self.push(SqlParam::Sequence(seq.clone()));
                let placeholder = cast_placeholder(idx, cast, true);
                if op == Operator::In {
                    Ok(format!("{col_ref} = ANY({placeholder})"))
                } else {
                    Ok(format!("{col_ref} != ALL({placeholder})"))
                }
            }
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                let scalar = expect_scalar(value)?;
                let idx = self.push(SqlParam::Value(scalar.clone()));
                let sym = match op {
                    Operator::Gt => ">",
                    Operator::Ge => ">=",
                    Operator::Lt => "<",
                    Operator::Le => "<=",
                    _ => unreachable!(),
                };
                Ok(format!("{col_ref} {sym} ${idx}"))
            }
            Operator::Before | Operator::After => {
                let scalar = expect_scalar(value)?;
                let idx = self.push(SqlParam::Value(scalar.clone()));
                let sym = if op == Operator::Before { "<" } else { ">" };
                Ok(format!("{col_ref} {sym} ${idx}"))
            }
            Operator::Like => {
                let scalar = expect_scalar(value)?;
                let idx = self.push(SqlParam::Value(scalar.clone()));
                Ok(format!("{col_ref} LIKE ${idx}"))
            }
            Operator::Ilike => {
                let scalar = expect_scalar(value)?;
                let idx = self.push(SqlParam::Value(scalar.clone()));
                Ok(format!("{col_ref} ILIKE ${idx}"))
            }
            Operator::StartsWith | Operator::EndsWith | Operator::Contains => {
                let text = expect_text(value)?;
                let wrapped = match op {
                    Operator::StartsWith => format!("{text}%"),
                    Operator::EndsWith => format!("%{text}"),
                    _ => format!("%{text}%"),
                };
                let idx = self.push(SqlParam::Value(Scalar::Text(wrapped)));
                Ok(format!("{col_ref} LIKE ${idx}"))
            }
            Operator::Between => {
                let (low, high) = expect_pair(value)?;
                let low_idx = self.push(SqlParam::Value(low.clone()));
                let high_idx = self.push(SqlParam::Value(high.clone()));
                Ok(format!("{col_ref} BETWEEN ${low_idx} AND ${high_idx}"))
            }
        }
    }
}

/// `$n[::cast]`, with `[]` appended to the cast for sequence params bound
/// against `= ANY`/`!= ALL`.
fn cast_placeholder(idx: usize, cast: Option<&'static str>, is_sequence: bool) -> String {
    match cast {
        Some(c) if is_sequence => format!("${idx}::{c}[]"),
        Some(c) => format!("${idx}::{c}"),
        None => format!("${idx}"),
    }
}

fn compile_aggregate(agg: &AggregateExpr) -> String {
    let func_name = match agg.func {
        AggregateFn::Count => "COUNT",
        AggregateFn::Sum => "SUM",
        AggregateFn::Avg => "AVG",
        AggregateFn::Min => "MIN",
        AggregateFn::Max => "MAX",
    };
    match &agg.column {
        None => format!("{func_name}(*) AS {}", agg.alias),
        Some(col) => format!(
            "{func_name}({}.{}) AS {}",
            col.alias, col.column_name, agg.alias
        ),
    }
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
    fn equality_with_uuid_cast() {
        let mut plan = base_plan();
        plan.filters = Some(FilterExpr::Comparison {
            left: col("user_id", FieldType::Uuid),
            op: Operator::Eq,
            value: Some(FilterValue::Scalar(Scalar::Uuid(
                uuid::Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap(),
            ))),
        });
        let (sql, params) = build(&plan).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM orders t0 WHERE t0.user_id = $1::uuid LIMIT $2 OFFSET $3;"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn group_by_with_count() {
        let mut plan = base_plan();
        plan.group_by = vec![col("status", FieldType::String)];
        plan.aggregates = vec![AggregateExpr {
            func: AggregateFn::Count,
            column: None,
            alias: "n".to_string(),
        }];
        let (sql, _) = build(&plan).unwrap();
        assert_eq!(
            sql,
            "SELECT t0.status, COUNT(*) AS n FROM orders t0 GROUP BY t0.status LIMIT $1 OFFSET $2;"
        );
    }

    #[test]
    fn and_of_comparison_and_starts_with() {
        let mut plan = base_plan();
        plan.root_model.storage_name = "users".to_string();
        plan.pagination = Pagination {
            limit: 10,
            offset: 0,
        };
        plan.filters = Some(FilterExpr::Logical {
            op: LogicalOp::And,
            children: vec![
                FilterExpr::Comparison {
                    left: col("active", FieldType::Boolean),
                    op: Operator::Eq,
                    value: Some(FilterValue::Scalar(Scalar::Bool(true))),
                },
                FilterExpr::Comparison {
                    left: col("name", FieldType::String),
                    op: Operator::StartsWith,
                    value: Some(FilterValue::Scalar(Scalar::Text("A".to_string()))),
                },
            ],
        });
        let (sql, params) = build(&plan).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM users t0 WHERE (t0.active = $1 AND t0.name LIKE $2) LIMIT $3 OFFSET $4;"
        );
        assert_eq!(
            params[1],
            SqlParam::Value(Scalar::Text("A%".to_string()))
        );
    }

    #[test]
    fn create_with_returning() {
        let mut plan = base_plan();
        plan.operation = Operation::Create;
        plan.root_model.storage_name = "users".to_string();
        plan.data = Some(vec![
            ("email".to_string(), Scalar::Text("a@b".to_string())),
            ("name".to_string(), Scalar::Text("A".to_string())),
        ]);
        let (sql, params) = build(&plan).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO users (email, name) VALUES ($1, $2) RETURNING *;"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn update_by_id_is_unaliased() {
        let mut plan = base_plan();
        plan.operation = Operation::Update;
        plan.root_model.storage_name = "users".to_string();
        plan.root_model.primary_key = col("id", FieldType::Integer);
        plan.data = Some(vec![("name".to_string(), Scalar::Text("X".to_string()))]);
        plan.id = Some(Scalar::Int(7));
        let (sql, params) = build(&plan).unwrap();
        assert_eq!(sql, "UPDATE users SET name = $1 WHERE id = $2 RETURNING *;");
        assert_eq!(params[1], SqlParam::Value(Scalar::Int(7)));
    }

    #[test]
    fn delete_by_filter() {
        let mut plan = base_plan();
        plan.operation = Operation::Delete;
        plan.root_model.storage_name = "users".to_string();
        plan.filters = Some(FilterExpr::Comparison {
            left: col("status", FieldType::String),
            op: Operator::Eq,
            value: Some(FilterValue::Scalar(Scalar::Text("inactive".to_string()))),
        });
        let (sql, _) = build(&plan).unwrap();
        assert_eq!(sql, "DELETE FROM users WHERE status = $1;");
    }

    #[test]
    fn between_with_equal_bounds() {
        let mut plan = base_plan();
        plan.filters = Some(FilterExpr::Comparison {
            left: col("total", FieldType::Decimal),
            op: Operator::Between,
            value: Some(FilterValue::Pair(Scalar::Float(5.0), Scalar::Float(5.0))),
        });
        let (sql, params) = build(&plan).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM orders t0 WHERE t0.total BETWEEN $1 AND $2 LIMIT $3 OFFSET $4;"
        );
        assert_eq!(params[0], params[1]);
    }

    #[test]
    fn deeply_nested_logical_tree_compiles() {
        let mut expr = FilterExpr::Comparison {
            left: col("status", FieldType::String),
            op: Operator::Eq,
            value: Some(FilterValue::Scalar(Scalar::Text("x".to_string()))),
        };
        for _ in 0..10 {
            expr = FilterExpr::Logical {
                op: LogicalOp::And,
                children: vec![expr],
            };
        }
        let mut plan = base_plan();
        plan.filters = Some(expr);
        let (sql, _) = build(&plan).unwrap();
        assert!(sql.contains("t0.status = $1"));
    }

    #[test]
    fn placeholder_numbers_are_contiguous_and_in_order() {
        let mut plan = base_plan();
        plan.filters = Some(FilterExpr::Comparison {
            left: col("status", FieldType::String),
            op: Operator::In,
            value: Some(FilterValue::Sequence(vec![
                Scalar::Text("a".to_string()),
                Scalar::Text("b".to_string()),
            ])),
        });
        let (sql, params) = build(&plan).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM orders t0 WHERE t0.status = ANY($1) LIMIT $2 OFFSET $3;"
        );
        assert_eq!(params.len(), 3);
    }
}
