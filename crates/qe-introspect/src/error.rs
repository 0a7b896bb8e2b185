//! Error types for the schema introspectors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntrospectError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("introspection query failed: {0}")]
    Query(String),

    #[error("no tables found in the introspected database")]
    NoTables,
}

pub type IntrospectResult<T> = Result<T, IntrospectError>;

impl From<tokio_postgres::Error> for IntrospectError {
    fn from(err: tokio_postgres::Error) -> Self {
        IntrospectError::Query(err.to_string())
    }
}

impl From<mongodb::error::Error> for IntrospectError {
    fn from(err: mongodb::error::Error) -> Self {
        IntrospectError::Query(err.to_string())
    }
}
