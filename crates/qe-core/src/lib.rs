//! qe-core - Core library for the query engine
//!
//! Provides the catalog types and schema registry (C1/C2), the
//! backend-neutral query IR (C4's output shape), and the DSL wire types
//! (§6.3) shared by every downstream crate.

pub mod catalog;
pub mod dsl;
pub mod error;
pub mod ir;
pub mod registry;

pub use catalog::{CatalogConfig, Field, FieldType, Model};
pub use error::CoreError;
pub use registry::Registry;
