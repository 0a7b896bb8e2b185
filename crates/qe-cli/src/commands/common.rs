//! Shared utilities for CLI commands

use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use qe_core::Registry;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub struct ExitCode(pub i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

impl std::error::Error for ExitCode {}

/// Resolve the catalog config path: `--config`, then `CONFIG_PATH`, then `./catalog.json` (§6.4).
pub fn config_path(global: &GlobalArgs) -> PathBuf {
    if let Some(path) = &global.config {
        return PathBuf::from(path);
    }
    if let Ok(path) = std::env::var("CONFIG_PATH") {
        return PathBuf::from(path);
    }
    PathBuf::from("catalog.json")
}

/// Resolve the server bind address: `--addr`, then `HTTP_HOST`/`HTTP_PORT`,
/// then `127.0.0.1:8080` (§6).
pub fn bind_addr(addr: &Option<String>) -> String {
    if let Some(addr) = addr {
        return addr.clone();
    }
    let host = std::env::var("HTTP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("HTTP_PORT").unwrap_or_else(|_| "8080".to_string());
    format!("{host}:{port}")
}

/// Load the registry from the resolved config path. A missing or invalid
/// catalog is a configuration error — exit code 1 (§6.2).
pub fn load_registry(global: &GlobalArgs) -> Result<Registry> {
    let path = config_path(global);
    Registry::load_from_path(&path)
        .with_context(|| format!("failed to load catalog config from {}", path.display()))
}

/// Selected backend kind, driven by `DB_TYPE` (§6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Mongo,
}

impl DbType {
    pub fn label(self) -> &'static str {
        match self {
            DbType::Postgres => "postgres",
            DbType::Mongo => "mongo",
        }
    }
}

pub fn db_type() -> Result<DbType> {
    match std::env::var("DB_TYPE").as_deref() {
        Ok("postgres") => Ok(DbType::Postgres),
        Ok("mongodb") => Ok(DbType::Mongo),
        Ok(other) => bail!("DB_TYPE must be 'postgres' or 'mongodb', got '{other}'"),
        Err(_) => bail!("DB_TYPE environment variable is required"),
    }
}

pub fn required_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} environment variable is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_prefers_an_explicit_override() {
        assert_eq!(bind_addr(&Some("10.0.0.1:9090".to_string())), "10.0.0.1:9090");
    }
}
