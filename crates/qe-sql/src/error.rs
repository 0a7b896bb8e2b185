//! Error types for the relational query builder.

use thiserror::Error;

/// Build errors (§7): operator not implemented for this backend, or a
/// value-type mismatch unanticipated by the validator. Indicates a bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("unsupported operator for the relational backend: {0:?}")]
    UnsupportedOperator(String),

    #[error("malformed filter value reached the relational builder: {0}")]
    MalformedValue(String),
}

pub type BuildResult<T> = Result<T, BuildError>;
