//! `qe introspect` — populate a catalog config from a live backend (C8/C9).
//!
//! Exit codes per §6.2: `0` success, `1` configuration or connection failure.

use anyhow::{Context, Result};
use qe_core::CatalogConfig;

use crate::cli::{DocumentIntrospectArgs, IntrospectArgs, IntrospectTarget};
use crate::commands::common::{required_env, ExitCode};

pub async fn execute(args: &IntrospectArgs) -> Result<()> {
    let catalog = match &args.target {
        IntrospectTarget::Relational => introspect_relational().await?,
        IntrospectTarget::Document(doc_args) => introspect_document(doc_args).await?,
    };

    let json = serde_json::to_string_pretty(&catalog).context("failed to serialize catalog")?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write catalog to {path}"))?,
        None => println!("{json}"),
    }

    Ok(())
}

async fn introspect_relational() -> Result<CatalogConfig> {
    let url = required_env("DATABASE_URL")?;
    let (client, connection) = tokio_postgres::connect(&url, tokio_postgres::NoTls)
        .await
        .map_err(|err| {
            log::error!("postgres connection failed: {err}");
            ExitCode(1)
        })?;

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            log::error!("postgres connection task ended: {err}");
        }
    });

    Ok(qe_introspect::relational::introspect(&client).await?)
}

async fn introspect_document(args: &DocumentIntrospectArgs) -> Result<CatalogConfig> {
    let uri = required_env("MONGODB_URI")?;
    let db_name = required_env("MONGODB_DATABASE")?;
    let client = mongodb::Client::with_uri_str(&uri).await.map_err(|err| {
        log::error!("mongodb connection failed: {err}");
        ExitCode(1)
    })?;
    let database = client.database(&db_name);

    let collections = args.collections.as_ref().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    });

    Ok(qe_introspect::document::introspect(&database, collections, Some(args.sample_size)).await?)
}
