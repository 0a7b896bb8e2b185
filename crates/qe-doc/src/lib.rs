//! qe-doc - Document store query builder (C6)
//!
//! Compiles a backend-neutral [`qe_core::ir::QueryPlan`] into a MongoDB-style
//! command record. Unlike [`qe_sql`](../qe_sql), values are embedded
//! directly in the command rather than bound as positional parameters.

pub mod builder;
pub mod error;

pub use builder::{build, CommandOp, DocumentCommand};
pub use error::{BuildError, BuildResult};
