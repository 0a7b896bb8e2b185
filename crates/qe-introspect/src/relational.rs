//! Schema Introspector — Relational (C8, §4.7).
//!
//! Populates a [`CatalogConfig`] by querying Postgres's own system catalogs
//! (`information_schema`), rather than sampling data.

use qe_core::catalog::{CatalogConfig, FieldConfig, FieldType, ModelConfig};
use tokio_postgres::Client;

use crate::error::{IntrospectError, IntrospectResult};

/// Enumerate `public`-schema base tables, their columns, and primary keys,
/// mapping declared types to the closed [`FieldType`] set (§4.7 step 4).
pub async fn introspect(client: &Client) -> IntrospectResult<CatalogConfig> {
    let table_rows = client
        .query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            &[],
        )
        .await?;

    if table_rows.is_empty() {
        return Err(IntrospectError::NoTables);
    }

    let mut models = Vec::with_capacity(table_rows.len());
    for row in &table_rows {
        let table_name: String = row.get(0);
        let fields = fetch_columns(client, &table_name).await?;
        let primary_key = fetch_primary_key(client, &table_name)
            .await?
            .unwrap_or_else(|| "id".to_string());
        models.push(ModelConfig {
            name: table_name.clone(),
            table: table_name,
            primary_key,
            fields,
        });
    }

    Ok(CatalogConfig { models })
}

async fn fetch_columns(client: &Client, table: &str) -> IntrospectResult<Vec<FieldConfig>> {
    let rows = client
        .query(
            "SELECT column_name, data_type, is_nullable FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1 \
             ORDER BY ordinal_position",
            &[&table],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let name: String = row.get(0);
            let declared: String = row.get(1);
            let is_nullable: String = row.get(2);
            FieldConfig {
                name,
                field_type: normalize_sql_type(&declared),
                nullable: is_nullable == "YES",
            }
        })
        .collect())
}

async fn fetch_primary_key(client: &Client, table: &str) -> IntrospectResult<Option<String>> {
    let rows = client
        .query(
            "SELECT kcu.column_name FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
             WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = 'public' \
               AND tc.table_name = $1 \
             ORDER BY kcu.ordinal_position LIMIT 1",
            &[&table],
        )
        .await?;

    Ok(rows.first().map(|row| row.get::<_, String>(0)))
}

/// Map a declared Postgres type name to the closed field-type set (§4.7
/// step 4): normalize case, trim `(...)` parameters, strip an array
/// suffix, then match a fixed table. Unrecognized types fall back to
/// `string` with a warning rather than failing introspection outright.
pub fn normalize_sql_type(declared: &str) -> FieldType {
    let mut normalized = declared.trim().to_lowercase();
    if let Some(paren) = normalized.find('(') {
        normalized.truncate(paren);
    }
    let normalized = normalized.trim().trim_end_matches("[]").trim();

    match normalized {
        "smallint" | "integer" | "int" | "int2" | "int4" | "int8" | "bigint" | "serial"
        | "bigserial" | "smallserial" => FieldType::Integer,
        "character varying" | "varchar" | "char" | "character" | "text" | "citext" => {
            FieldType::String
        }
        "numeric" | "decimal" | "real" | "double precision" | "float4" | "float8" | "money" => {
            FieldType::Decimal
        }
        "timestamp" | "timestamp without time zone" | "timestamp with time zone"
        | "timestamptz" => FieldType::Timestamp,
        "date" => FieldType::Date,
        "time" | "time without time zone" | "time with time zone" => FieldType::Time,
        "boolean" | "bool" => FieldType::Boolean,
        "uuid" => FieldType::Uuid,
        "json" | "jsonb" => FieldType::Json,
        "bytea" | "bit" | "bit varying" | "varbit" => FieldType::Binary,
        other => {
            log::warn!("unmapped relational column type '{other}', defaulting to string");
            FieldType::String
        }
    }
}
