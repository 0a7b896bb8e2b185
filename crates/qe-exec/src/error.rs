//! Error types for the executor (C7).

use thiserror::Error;

/// Execution errors (§7): driver, timeout, or constraint-violation failures.
/// Mapped to HTTP 500, message sanitized of backend-specific leakage where
/// possible by the caller.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("backend connection error: {0}")]
    Connection(String),

    #[error("query execution error: {0}")]
    Query(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),
}

pub type ExecResult<T> = Result<T, ExecError>;

impl From<tokio_postgres::Error> for ExecError {
    fn from(err: tokio_postgres::Error) -> Self {
        ExecError::Query(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for ExecError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        ExecError::Connection(err.to_string())
    }
}

impl From<mongodb::error::Error> for ExecError {
    fn from(err: mongodb::error::Error) -> Self {
        ExecError::Query(err.to_string())
    }
}
