//! Schema Introspector — Document (C9, §4.8).
//!
//! Populates a [`CatalogConfig`] by **sampling**, not by reading metadata:
//! a collection has no declared schema, so the shape is inferred from a
//! random sample of its documents.

use bson::{Bson, Document};
use futures_util::TryStreamExt;
use mongodb::Database;
use qe_core::catalog::{CatalogConfig, FieldConfig, FieldType, ModelConfig};

use crate::error::IntrospectResult;

const DEFAULT_SAMPLE_SIZE: i64 = 100;
const NULLABILITY_THRESHOLD: f64 = 0.10;

/// Per-field-path observation accumulator (§4.8 step 3). `type_counts` is a
/// `Vec` rather than a `HashMap` so that a tie between two equally-frequent
/// types resolves to whichever was observed first (§4.8 step 6).
#[derive(Debug, Default)]
struct FieldStats {
    type_counts: Vec<(FieldType, u32)>,
    total_count: u32,
    null_count: u32,
    samples: Vec<Bson>,
}

impl FieldStats {
    fn record_present(&mut self, value: &Bson) {
        self.total_count += 1;
        let field_type = classify_bson(value);
        match self.type_counts.iter_mut().find(|(t, _)| *t == field_type) {
            Some((_, count)) => *count += 1,
            None => self.type_counts.push((field_type, 1)),
        }
        if self.samples.len() < 5 {
            self.samples.push(value.clone());
        }
    }

    fn record_absent(&mut self) {
        self.total_count += 1;
        self.null_count += 1;
    }

    fn nullable(&self) -> bool {
        self.total_count > 0
            && (self.null_count as f64 / self.total_count as f64) > NULLABILITY_THRESHOLD
    }

    /// §4.8 step 6's type rule: most-frequent type wins; if the winner has
    /// strictly less than half the votes and both `integer` and `string`
    /// appear, probe up to 5 samples for an all-numeric-string override.
    fn resolve_type(&self) -> FieldType {
        let Some(&(mut winner, mut winner_count)) = self.type_counts.first() else {
            return FieldType::String;
        };
        for &(t, c) in &self.type_counts[1..] {
            if c > winner_count {
                winner = t;
                winner_count = c;
            }
        }

        let observed: u32 = self.type_counts.iter().map(|(_, c)| c).sum();
        if observed > 0 && (winner_count as f64) < 0.5 * observed as f64 {
            let has_integer = self.type_counts.iter().any(|(t, _)| *t == FieldType::Integer);
            let has_string = self.type_counts.iter().any(|(t, _)| *t == FieldType::String);
            if has_integer && has_string && !self.samples.is_empty() {
                let all_numeric_strings = self.samples.iter().all(|b| match b {
                    Bson::String(s) => s.parse::<i64>().is_ok(),
                    _ => false,
                });
                if all_numeric_strings {
                    return FieldType::Integer;
                }
            }
        }

        winner
    }
}

/// Enumerate collections (or use `collections` if given) and sample each
/// for `sample_size` documents (default 100).
pub async fn introspect(
    database: &Database,
    collections: Option<Vec<String>>,
    sample_size: Option<i64>,
) -> IntrospectResult<CatalogConfig> {
    let names = match collections {
        Some(names) => names,
        None => database.list_collection_names().await?,
    };
    let sample_size = sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE);

    let mut models = Vec::with_capacity(names.len());
    for name in names {
        let collection = database.collection::<Document>(&name);
        let mut cursor = collection
            .aggregate(vec![bson::doc! { "$sample": { "size": sample_size } }])
            .await?;

        let mut docs = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            docs.push(doc);
        }

        models.push(ModelConfig {
            name: name.clone(),
            table: name,
            primary_key: "_id".to_string(),
            fields: resolve_fields(&docs),
        });
    }

    Ok(CatalogConfig { models })
}

/// Walk every sampled document, accumulate per-path stats, then resolve
/// each path's final type and nullability (§4.8 steps 3, 6, 7).
fn resolve_fields(docs: &[Document]) -> Vec<FieldConfig> {
    let mut paths: Vec<String> = Vec::new();
    for doc in docs {
        collect_paths(doc, "", &mut paths);
    }

    let mut fields = Vec::with_capacity(paths.len());
    for path in &paths {
        let mut stats = FieldStats::default();
        for doc in docs {
            match get_path(doc, path) {
                Some(Bson::Null) | None => stats.record_absent(),
                Some(value) => stats.record_present(&value),
            }
        }
        fields.push(FieldConfig {
            name: path.clone(),
            field_type: stats.resolve_type(),
            nullable: stats.nullable(),
        });
    }

    if !fields.iter().any(|f| f.name == "_id") {
        fields.insert(
            0,
            FieldConfig {
                name: "_id".to_string(),
                field_type: FieldType::Uuid,
                nullable: false,
            },
        );
    }

    fields
}

/// Record every dot-notation field path reachable from `doc`. Synthetic
/// `<field>[]` element-type paths (§4.8 step 5) are intentionally not
/// walked here: the final schema drops them (arrays resolve to `json`), so
/// materializing their stats would be wasted work.
fn collect_paths(doc: &Document, prefix: &str, paths: &mut Vec<String>) {
    for (key, value) in doc {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if !paths.contains(&path) {
            paths.push(path.clone());
        }
        if let Bson::Document(inner) = value {
            collect_paths(inner, &path, paths);
        }
    }
}

fn get_path(doc: &Document, path: &str) -> Option<Bson> {
    let mut parts = path.split('.');
    let mut current: Bson = doc.get(parts.next()?)?.clone();
    for part in parts {
        match current {
            Bson::Document(inner) => current = inner.get(part)?.clone(),
            _ => return None,
        }
    }
    Some(current)
}

/// Classify a present (non-null) scalar value (§4.8 step 4).
fn classify_bson(value: &Bson) -> FieldType {
    match value {
        Bson::Boolean(_) => FieldType::Boolean,
        Bson::Int32(_) | Bson::Int64(_) => FieldType::Integer,
        Bson::Double(_) => FieldType::Float,
        Bson::ObjectId(_) => FieldType::Uuid,
        Bson::DateTime(_) => FieldType::Timestamp,
        Bson::String(s) => classify_string(s),
        Bson::Document(_) | Bson::Array(_) => FieldType::Json,
        Bson::Binary(_) => FieldType::Binary,
        _ => FieldType::String,
    }
}

fn classify_string(s: &str) -> FieldType {
    if uuid::Uuid::parse_str(s).is_ok() {
        return FieldType::Uuid;
    }
    if parse_iso_datetime(s).is_some() {
        return FieldType::Timestamp;
    }
    FieldType::String
}

fn parse_iso_datetime(s: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullability_threshold_is_exclusive_at_ten_percent() {
        let mut stats = FieldStats::default();
        for _ in 0..9 {
            stats.record_present(&Bson::String("x".to_string()));
        }
        stats.record_absent();
        assert!(!stats.nullable(), "exactly 10% missing must not be nullable");

        let mut stats = FieldStats::default();
        for _ in 0..8 {
            stats.record_present(&Bson::String("x".to_string()));
        }
        stats.record_absent();
        stats.record_absent();
        assert!(stats.nullable(), "20% missing must be nullable");
    }

    #[test]
    fn even_split_of_numeric_strings_resolves_to_integer() {
        let mut stats = FieldStats::default();
        stats.record_present(&Bson::Int32(1));
        stats.record_present(&Bson::String("12".to_string()));
        // force only numeric-string samples into the probe window
        stats.samples = vec![Bson::String("12".to_string()), Bson::String("34".to_string())];
        assert_eq!(stats.resolve_type(), FieldType::Integer);
    }

    #[test]
    fn ties_prefer_first_observed_type() {
        let mut stats = FieldStats::default();
        stats.record_present(&Bson::String("a".to_string()));
        stats.record_present(&Bson::Int32(1));
        assert_eq!(stats.resolve_type(), FieldType::String);
    }

    #[test]
    fn missing_id_is_synthesized_at_front() {
        let fields = resolve_fields(&[bson::doc! {"name": "a"}]);
        assert_eq!(fields[0].name, "_id");
        assert_eq!(fields[0].field_type, FieldType::Uuid);
        assert!(!fields[0].nullable);
    }
}
