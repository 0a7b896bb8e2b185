//! qe-introspect - Schema introspectors (C8/C9)
//!
//! Populate a [`qe_core::catalog::CatalogConfig`] from a live backend: the
//! relational introspector reads system catalogs, the document introspector
//! samples collections and infers a schema statistically.

pub mod document;
pub mod error;
pub mod relational;

pub use error::{IntrospectError, IntrospectResult};
