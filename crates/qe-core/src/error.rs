//! Error types for qe-core

use thiserror::Error;

/// Core error type — catalog loading and registry errors.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Catalog config file not found
    #[error("Catalog config not found: {path}")]
    ConfigNotFound { path: String },

    /// Failed to parse catalog config JSON
    #[error("Failed to parse catalog config: {0}")]
    ConfigParseError(#[from] serde_json::Error),

    /// Catalog failed an invariant check at load time
    #[error("Invalid catalog: {message}")]
    ConfigInvalid { message: String },

    /// IO error reading the catalog config
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for [`CoreError`]
pub type CoreResult<T> = Result<T, CoreError>;
