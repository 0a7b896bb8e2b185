//! HTTP handlers for the four routes in the public surface (§6.2).

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use qe_core::dsl::DslQuery;
use qe_core::ir::{Operation, QueryPlan, Scalar};
use qe_exec::{ExecutionRequest, Row};
use qe_sql::SqlParam;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /models` — the catalog keyed by `name, table, primary_key, fields[]`.
pub async fn get_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let models: Vec<Value> = state
        .registry
        .list_models()
        .map(|name| {
            let model = state
                .registry
                .get_model(name)
                .expect("name came from list_models, so get_model must resolve");
            json!({
                "name": model.name,
                "table": model.storage_name,
                "primary_key": model.primary_key,
                "fields": model.fields,
            })
        })
        .collect();
    Json(json!({ "models": models }))
}

/// `GET /info`.
pub async fn get_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "database_type": state.db_type, "status": "ok" }))
}

/// `GET /health`.
pub async fn get_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `POST /query` — validate, plan, build, and execute a DSL query (§4.1-§4.6
/// end to end, one handler task per request, §5).
pub async fn post_query(
    State(state): State<Arc<AppState>>,
    Json(query): Json<DslQuery>,
) -> Result<impl IntoResponse, ApiError> {
    qe_plan::validate(&state.registry, &query)?;
    let plan = qe_plan::plan(&state.registry, &query)?;

    let response = if state.db_type == "mongo" {
        let command = qe_doc::build(&plan)?;
        execute_document(&state, &plan, command).await?
    } else {
        let (text, params) = qe_sql::build(&plan)?;
        execute_relational(&state, &plan, text, params).await?
    };

    Ok(Json(response))
}

async fn execute_relational(
    state: &AppState,
    plan: &QueryPlan,
    text: String,
    params: Vec<SqlParam>,
) -> Result<Value, ApiError> {
    let params_json: Vec<Value> = params.iter().map(sql_param_to_json).collect();
    let request = ExecutionRequest::Sql {
        text: text.clone(),
        params,
    };

    if plan.operation == Operation::Select {
        let rows = state.executor.execute_query(&request).await?;
        Ok(json!({
            "sql": text,
            "params": params_json,
            "data": rows.iter().map(row_to_json).collect::<Vec<_>>(),
        }))
    } else {
        let outcome = state.executor.execute_command(&request).await?;
        if outcome.returned.is_empty() {
            Ok(json!({
                "sql": text,
                "params": params_json,
                "affected_rows": outcome.affected_rows,
            }))
        } else {
            Ok(json!({
                "sql": text,
                "params": params_json,
                "data": outcome.returned.iter().map(row_to_json).collect::<Vec<_>>(),
            }))
        }
    }
}

async fn execute_document(
    state: &AppState,
    plan: &QueryPlan,
    command: qe_doc::DocumentCommand,
) -> Result<Value, ApiError> {
    let command_json = serde_json::to_value(&command).unwrap_or(Value::Null);
    let request = ExecutionRequest::Document(command);

    if plan.operation == Operation::Select {
        let rows = state.executor.execute_query(&request).await?;
        Ok(json!({
            "command": command_json,
            "params": Vec::<Value>::new(),
            "data": rows.iter().map(row_to_json).collect::<Vec<_>>(),
        }))
    } else {
        let outcome = state.executor.execute_command(&request).await?;
        if outcome.returned.is_empty() {
            Ok(json!({
                "command": command_json,
                "params": Vec::<Value>::new(),
                "affected_rows": outcome.affected_rows,
            }))
        } else {
            Ok(json!({
                "command": command_json,
                "params": Vec::<Value>::new(),
                "data": outcome.returned.iter().map(row_to_json).collect::<Vec<_>>(),
            }))
        }
    }
}

fn row_to_json(row: &Row) -> Value {
    let mut map = serde_json::Map::new();
    for (name, value) in row {
        map.insert(name.clone(), scalar_to_json(value));
    }
    Value::Object(map)
}

fn scalar_to_json(value: &Scalar) -> Value {
    match value {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => Value::from(*i),
        Scalar::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Scalar::Text(t) => Value::String(t.clone()),
        Scalar::Bytes(b) => Value::String(String::from_utf8_lossy(b).to_string()),
        Scalar::Timestamp(ts) => Value::String(ts.to_string()),
        Scalar::Uuid(u) => Value::String(u.to_string()),
        Scalar::Json(v) => v.clone(),
    }
}

fn sql_param_to_json(param: &SqlParam) -> Value {
    match param {
        SqlParam::Value(scalar) => scalar_to_json(scalar),
        SqlParam::Sequence(seq) => Value::Array(seq.iter().map(scalar_to_json).collect()),
    }
}
