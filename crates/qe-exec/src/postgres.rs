//! Relational executor, backed by `tokio-postgres` through a
//! `deadpool-postgres` connection pool (§4.6). The pool owns its own
//! concurrency and resource limits (§5); this type only borrows connections
//! from it per call.

use async_trait::async_trait;
use bytes::BytesMut;
use deadpool_postgres::Pool;
use postgres_types::{IsNull, ToSql, Type};
use qe_core::ir::Scalar;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{ExecError, ExecResult};
use crate::traits::{CommandOutcome, ExecutionRequest, Executor, Row};

pub struct PostgresExecutor {
    pool: Pool,
}

impl PostgresExecutor {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Executor for PostgresExecutor {
    async fn execute_query(&self, request: &ExecutionRequest) -> ExecResult<Vec<Row>> {
        let (text, params) = match request {
            ExecutionRequest::Sql { text, params } => (text, params),
            ExecutionRequest::Document(_) => {
                return Err(ExecError::Query(
                    "relational executor received a document command".to_string(),
                ))
            }
        };

        let client = self.pool.get().await?;
        let bound = bind(params);
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|p| p.as_ref()).collect();
        let rows = client.query(text.as_str(), &refs).await?;
        rows.iter().map(row_to_scalars).collect()
    }

    async fn execute_command(&self, request: &ExecutionRequest) -> ExecResult<CommandOutcome> {
        let (text, params) = match request {
            ExecutionRequest::Sql { text, params } => (text, params),
            ExecutionRequest::Document(_) => {
                return Err(ExecError::Query(
                    "relational executor received a document command".to_string(),
                ))
            }
        };

        let client = self.pool.get().await?;
        let bound = bind(params);
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|p| p.as_ref()).collect();

        if text.to_uppercase().contains("RETURNING") {
            let rows = client.query(text.as_str(), &refs).await?;
            let returned: Vec<Row> = rows
                .iter()
                .map(row_to_scalars)
                .collect::<ExecResult<Vec<Row>>>()?;
            Ok(CommandOutcome {
                affected_rows: returned.len(),
                returned,
            })
        } else {
            let affected = client.execute(text.as_str(), &refs).await?;
            Ok(CommandOutcome {
                affected_rows: affected as usize,
                returned: Vec::new(),
            })
        }
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}

/// A parameter that always reports `NULL`, regardless of the column type
/// Postgres expects. `Scalar::Null` can target any nullable column, so it
/// cannot be bound through a concretely-typed `Option<T>`.
struct SqlNull;

impl ToSql for SqlNull {
    fn to_sql(
        &self,
        _ty: &Type,
        _out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

fn bind(params: &[qe_sql::SqlParam]) -> Vec<Box<dyn ToSql + Sync + '_>> {
    params.iter().map(bind_one).collect()
}

fn bind_one(param: &qe_sql::SqlParam) -> Box<dyn ToSql + Sync + '_> {
    match param {
        qe_sql::SqlParam::Value(scalar) => scalar_to_sql(scalar),
        qe_sql::SqlParam::Sequence(seq) => sequence_to_sql(seq),
    }
}

fn scalar_to_sql(s: &Scalar) -> Box<dyn ToSql + Sync + '_> {
    match s {
        Scalar::Null => Box::new(SqlNull),
        Scalar::Bool(b) => Box::new(*b),
        Scalar::Int(i) => Box::new(*i),
        Scalar::Float(f) => Box::new(*f),
        Scalar::Text(s) => Box::new(s.clone()),
        Scalar::Bytes(b) => Box::new(b.clone()),
        Scalar::Timestamp(ts) => Box::new(*ts),
        Scalar::Uuid(u) => Box::new(*u),
        Scalar::Json(v) => Box::new(v.clone()),
    }
}

/// `in`/`not_in` bind a homogeneous Postgres array against `= ANY($n)` /
/// `!= ALL($n)` (qe-sql §4.4). The element type is inferred from the first
/// non-null member; an empty or all-null sequence falls back to text.
fn sequence_to_sql(seq: &[Scalar]) -> Box<dyn ToSql + Sync + '_> {
    let sample = seq.iter().find(|s| !matches!(s, Scalar::Null));
    match sample {
        Some(Scalar::Int(_)) => Box::new(seq.iter().map(as_int).collect::<Vec<_>>()),
        Some(Scalar::Float(_)) => Box::new(seq.iter().map(as_float).collect::<Vec<_>>()),
        Some(Scalar::Bool(_)) => Box::new(seq.iter().map(as_bool).collect::<Vec<_>>()),
        Some(Scalar::Uuid(_)) => Box::new(seq.iter().map(as_uuid).collect::<Vec<_>>()),
        _ => Box::new(seq.iter().map(as_text).collect::<Vec<_>>()),
    }
}

fn as_int(s: &Scalar) -> i64 {
    match s {
        Scalar::Int(i) => *i,
        _ => 0,
    }
}

fn as_float(s: &Scalar) -> f64 {
    match s {
        Scalar::Float(f) => *f,
        _ => 0.0,
    }
}

fn as_bool(s: &Scalar) -> bool {
    matches!(s, Scalar::Bool(true))
}

fn as_uuid(s: &Scalar) -> uuid::Uuid {
    match s {
        Scalar::Uuid(u) => *u,
        _ => uuid::Uuid::nil(),
    }
}

fn as_text(s: &Scalar) -> String {
    match s {
        Scalar::Text(t) => t.clone(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Uuid(u) => u.to_string(),
        Scalar::Timestamp(ts) => ts.to_string(),
        Scalar::Bytes(b) => String::from_utf8_lossy(b).to_string(),
        Scalar::Json(v) => v.to_string(),
        Scalar::Null => String::new(),
    }
}

/// Decode a Postgres row into the generic `(column, Scalar)` row shape
/// (§4.6, §9). Byte-array values are promoted to text so every row is
/// JSON-representable; unrecognized column types fall back to text too.
///
/// Each arm's Rust type must be one `FromSql` actually `accepts()` for that
/// Postgres type (e.g. `f64` only accepts `FLOAT8`, not `FLOAT4`/`NUMERIC`) —
/// a mismatch here returns `WrongType`, which is a real decode failure, not
/// a null, so it is propagated rather than swallowed.
fn row_to_scalars(row: &tokio_postgres::Row) -> ExecResult<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let value = match *col.type_() {
                Type::BOOL => row
                    .try_get::<_, Option<bool>>(i)
                    .map_err(decode_error)?
                    .map(Scalar::Bool),
                Type::INT2 | Type::INT4 | Type::INT8 => row
                    .try_get::<_, Option<i64>>(i)
                    .map_err(decode_error)?
                    .map(Scalar::Int),
                Type::FLOAT4 => row
                    .try_get::<_, Option<f32>>(i)
                    .map_err(decode_error)?
                    .map(|f| Scalar::Float(f as f64)),
                Type::FLOAT8 => row
                    .try_get::<_, Option<f64>>(i)
                    .map_err(decode_error)?
                    .map(Scalar::Float),
                Type::NUMERIC => row
                    .try_get::<_, Option<Decimal>>(i)
                    .map_err(decode_error)?
                    .and_then(|d| d.to_f64())
                    .map(Scalar::Float),
                Type::UUID => row
                    .try_get::<_, Option<uuid::Uuid>>(i)
                    .map_err(decode_error)?
                    .map(Scalar::Uuid),
                Type::TIMESTAMP => row
                    .try_get::<_, Option<chrono::NaiveDateTime>>(i)
                    .map_err(decode_error)?
                    .map(Scalar::Timestamp),
                Type::TIMESTAMPTZ => row
                    .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(i)
                    .map_err(decode_error)?
                    .map(|dt| Scalar::Timestamp(dt.naive_utc())),
                Type::JSON | Type::JSONB => row
                    .try_get::<_, Option<serde_json::Value>>(i)
                    .map_err(decode_error)?
                    .map(Scalar::Json),
                Type::BYTEA => row
                    .try_get::<_, Option<Vec<u8>>>(i)
                    .map_err(decode_error)?
                    .map(|b| Scalar::Text(String::from_utf8_lossy(&b).to_string())),
                _ => row
                    .try_get::<_, Option<String>>(i)
                    .map_err(decode_error)?
                    .map(Scalar::Text),
            };
            Ok((col.name().to_string(), value.unwrap_or(Scalar::Null)))
        })
        .collect()
}

fn decode_error(err: tokio_postgres::Error) -> ExecError {
    ExecError::Query(format!("failed to decode column: {err}"))
}
