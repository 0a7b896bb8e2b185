//! qe-sql - Relational query builder (C5)
//!
//! Compiles a backend-neutral [`qe_core::ir::QueryPlan`] into a single
//! parameterized SQL statement plus its ordered bound parameters. Stateless
//! across calls: every [`build`] invocation gets its own placeholder
//! counter and parameter list (§5).

pub mod builder;
pub mod error;

pub use builder::{build, SqlParam};
pub use error::{BuildError, BuildResult};
