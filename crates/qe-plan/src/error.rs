//! Error types for validation (C3) and planning (C4).

use thiserror::Error;

/// Validation error kinds (§4.2). Client-caused; callers map these to
/// HTTP 400 (§7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("unknown field '{field}' on model '{model}'")]
    UnknownField { model: String, field: String },

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("bad operator usage: {0}")]
    BadOperatorUsage(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("bad pagination: {0}")]
    BadPagination(String),

    #[error("create requires a data payload")]
    MissingData,

    #[error("update/delete requires either an id or non-empty filters")]
    MissingSelector,

    #[error("missing required field '{0}' in create payload")]
    MissingRequiredField(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Planner error (§4.3). Planner failures are bugs, not user errors — the
/// validator is supposed to have caught everything; callers map these to
/// HTTP 500 (§7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("planner invariant violated: {0}")]
    Invariant(String),
}

pub type PlanResult<T> = Result<T, PlanError>;
