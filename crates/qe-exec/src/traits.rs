//! Executor trait (C7, §4.6).
//!
//! A minimal two-method contract both backends implement. Rows are
//! key-value mappings (`column_name -> value`); the relational
//! implementation coerces byte-array values into text so every row is
//! JSON-representable, the document implementation decodes BSON documents
//! into the same shape.

use async_trait::async_trait;
use qe_core::ir::Scalar;
use qe_doc::DocumentCommand;
use qe_sql::SqlParam;

use crate::error::ExecResult;

/// A single output row: an ordered `(column_name, value)` list. Ordered
/// (rather than a `HashMap`) so relational column order survives into the
/// JSON response.
pub type Row = Vec<(String, Scalar)>;

/// The compiled, backend-specific statement a builder produced — either
/// C5's parameterized SQL or C6's command document.
pub enum ExecutionRequest {
    Sql { text: String, params: Vec<SqlParam> },
    Document(DocumentCommand),
}

/// The result of a data-modifying command.
pub struct CommandOutcome {
    pub affected_rows: usize,
    /// Rows returned by `RETURNING *` (relational) or an echoed document
    /// (document `insert`/`update`). Empty for `delete`.
    pub returned: Vec<Row>,
}

/// Database abstraction for the query engine's two supported backend
/// families.
///
/// Implementations MUST be `Send + Sync`: the executor wraps a
/// driver-level connection pool shared across concurrent request handlers
/// (§5); the pool, not this trait, owns concurrency limits.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a read (`select`) request, returning every matched row
    /// materialized up front — partial rows are never returned (§5).
    async fn execute_query(&self, request: &ExecutionRequest) -> ExecResult<Vec<Row>>;

    /// Execute a data-modifying (`create`/`update`/`delete`) request.
    async fn execute_command(&self, request: &ExecutionRequest) -> ExecResult<CommandOutcome>;

    /// Backend type identifier for `GET /info` and logging.
    fn backend_type(&self) -> &'static str;
}
