//! Catalog entities: the plain-data shape of the schema configuration file (§6.1).
//!
//! These types only describe *shape*; cross-field invariants (unique names,
//! primary key resolution, closed type set) are enforced by
//! [`crate::registry::Registry::load`], not here — mirrors the
//! config-vs-project split in the teacher crate.

use serde::{Deserialize, Serialize};

/// The closed set of field types a [`Field`] may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Int,
    Float,
    Decimal,
    Boolean,
    Date,
    Time,
    Timestamp,
    Datetime,
    Uuid,
    Json,
    Binary,
}

impl FieldType {
    /// True iff this type may be the target of `sum`/`avg`/`min`/`max`.
    pub fn is_aggregatable(self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Int | FieldType::Float | FieldType::Decimal
        )
    }

    /// True iff a relational placeholder bound against this type needs an
    /// explicit `::type` cast because the wire protocol cannot infer it.
    ///
    /// §4.4 names the trigger set as `{uuid, json, binary, timestamp}` in
    /// prose but then gives a cast mapping of `timestamp/date/datetime →
    /// timestamp` — the mapping row is the more specific statement, so
    /// `date`/`datetime` are treated as cast-triggering too (see DESIGN.md).
    /// `time` is left uncast: it has no entry in either the prose set or
    /// the mapping table.
    pub fn needs_cast(self) -> bool {
        matches!(
            self,
            FieldType::Uuid
                | FieldType::Json
                | FieldType::Binary
                | FieldType::Timestamp
                | FieldType::Date
                | FieldType::Datetime
        )
    }

    /// The Postgres cast suffix for this type, per §4.4's mapping table.
    pub fn cast_suffix(self) -> Option<&'static str> {
        match self {
            FieldType::Uuid => Some("uuid"),
            FieldType::Json => Some("jsonb"),
            FieldType::Binary => Some("bytea"),
            FieldType::Timestamp | FieldType::Date | FieldType::Datetime => Some("timestamp"),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Timestamp => "timestamp",
            FieldType::Datetime => "datetime",
            FieldType::Uuid => "uuid",
            FieldType::Json => "json",
            FieldType::Binary => "binary",
        };
        write!(f, "{s}")
    }
}

/// A single column definition, as it appears in the catalog config JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub nullable: bool,
}

/// A named entity, as it appears in the catalog config JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub table: String,
    #[serde(rename = "primaryKey")]
    pub primary_key: String,
    pub fields: Vec<FieldConfig>,
}

/// Root catalog config document (§6.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub models: Vec<ModelConfig>,
}

impl CatalogConfig {
    /// Parse a catalog config document from its JSON text form.
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// A resolved, validated field: [`FieldConfig`] plus the derived
/// `aggregatable` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub nullable: bool,
    pub aggregatable: bool,
}

impl From<&FieldConfig> for Field {
    fn from(cfg: &FieldConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            field_type: cfg.field_type,
            nullable: cfg.nullable,
            aggregatable: cfg.field_type.is_aggregatable(),
        }
    }
}

/// A resolved, validated named entity.
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    pub name: String,
    pub storage_name: String,
    pub primary_key: String,
    pub fields: Vec<Field>,
}

impl Model {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up the primary key's resolved [`Field`].
    ///
    /// Invariant (enforced at [`crate::registry::Registry::load`] time):
    /// `primary_key` always resolves to a known field, so this never
    /// returns `None` for a `Model` obtained from a loaded [`crate::registry::Registry`].
    pub fn primary_key_field(&self) -> Option<&Field> {
        self.field(&self.primary_key)
    }
}
