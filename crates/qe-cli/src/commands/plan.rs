//! `qe plan` — validate, plan, and build a query file, printing the compiled
//! statement without executing it (§4.3-§4.6).

use anyhow::{Context, Result};
use qe_core::dsl::DslQuery;
use qe_core::ir::Scalar;
use serde_json::{json, Value};

use crate::cli::{GlobalArgs, QueryFileArgs};
use crate::commands::common::{db_type, load_registry, DbType};

pub async fn execute(args: &QueryFileArgs, global: &GlobalArgs) -> Result<()> {
    let registry = load_registry(global)?;
    let content = std::fs::read_to_string(&args.query_file)
        .with_context(|| format!("failed to read {}", args.query_file))?;
    let query: DslQuery =
        serde_json::from_str(&content).context("failed to parse DSL query JSON")?;

    qe_plan::validate(&registry, &query)?;
    let plan = qe_plan::plan(&registry, &query)?;

    let output = match db_type()? {
        DbType::Postgres => {
            let (text, params) = qe_sql::build(&plan)?;
            json!({
                "sql": text,
                "params": params.iter().map(sql_param_to_json).collect::<Vec<_>>(),
            })
        }
        DbType::Mongo => {
            let command = qe_doc::build(&plan)?;
            json!({ "command": command })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn sql_param_to_json(param: &qe_sql::SqlParam) -> Value {
    match param {
        qe_sql::SqlParam::Value(scalar) => scalar_to_json(scalar),
        qe_sql::SqlParam::Sequence(seq) => Value::Array(seq.iter().map(scalar_to_json).collect()),
    }
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
