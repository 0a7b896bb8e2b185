//! `qe validate` — run the DSL validator (C3) against a query file without planning it.

use anyhow::{Context, Result};
use qe_core::dsl::DslQuery;

use crate::cli::{GlobalArgs, QueryFileArgs};
use crate::commands::common::load_registry;

pub async fn execute(args: &QueryFileArgs, global: &GlobalArgs) -> Result<()> {
    let registry = load_registry(global)?;
    let content = std::fs::read_to_string(&args.query_file)
        .with_context(|| format!("failed to read {}", args.query_file))?;
    let query: DslQuery =
        serde_json::from_str(&content).context("failed to parse DSL query JSON")?;

    qe_plan::validate(&registry, &query)?;
    println!("OK");
    Ok(())
}
