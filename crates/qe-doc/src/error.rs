//! Error types for the document query builder.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("malformed filter value reached the document builder: {0}")]
    MalformedValue(String),
}

pub type BuildResult<T> = Result<T, BuildError>;
