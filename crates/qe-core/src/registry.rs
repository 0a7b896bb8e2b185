//! Schema Registry (C2) — the source of truth for entities, fields, types,
//! primary keys.
//!
//! Loaded once from a [`CatalogConfig`], immutable thereafter. Concurrent
//! readers need no coordination since there are no `&mut self` methods past
//! `load`.

use std::collections::HashMap;
use std::path::Path;

use crate::catalog::{CatalogConfig, Field, Model};
use crate::error::{CoreError, CoreResult};

/// The immutable, loaded catalog.
#[derive(Debug, Clone)]
pub struct Registry {
    models: HashMap<String, Model>,
    /// Preserves declaration order for `list_models`.
    order: Vec<String>,
}

impl Registry {
    /// Load and validate a registry from a parsed [`CatalogConfig`].
    ///
    /// Enforces, in order:
    /// - model names unique
    /// - field names unique within each model
    /// - `primaryKey` resolves to a declared field
    /// - every field `type` is in the closed set (guaranteed by `FieldType`'s
    ///   `Deserialize` impl — an unknown type fails JSON parsing before this
    ///   function ever runs)
    pub fn load(config: &CatalogConfig) -> CoreResult<Self> {
        let mut models = HashMap::with_capacity(config.models.len());
        let mut order = Vec::with_capacity(config.models.len());

        for model_cfg in &config.models {
            if models.contains_key(&model_cfg.name) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("duplicate model name: {}", model_cfg.name),
                });
            }

            let mut seen_fields = std::collections::HashSet::new();
            let mut fields = Vec::with_capacity(model_cfg.fields.len());
            for field_cfg in &model_cfg.fields {
                if !seen_fields.insert(field_cfg.name.clone()) {
                    return Err(CoreError::ConfigInvalid {
                        message: format!(
                            "duplicate field name '{}' on model '{}'",
                            field_cfg.name, model_cfg.name
                        ),
                    });
                }
                fields.push(Field::from(field_cfg));
            }

            if !seen_fields.contains(&model_cfg.primary_key) {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "primary key '{}' on model '{}' is not a declared field",
                        model_cfg.primary_key, model_cfg.name
                    ),
                });
            }

            let model = Model {
                name: model_cfg.name.clone(),
                storage_name: model_cfg.table.clone(),
                primary_key: model_cfg.primary_key.clone(),
                fields,
            };

            order.push(model.name.clone());
            models.insert(model.name.clone(), model);
        }

        Ok(Self { models, order })
    }

    /// Load a registry from a JSON file on disk.
    pub fn load_from_path(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config = CatalogConfig::parse(&content)?;
        Self::load(&config)
    }

    /// Look up a model by name. Never fails — absence propagates to the
    /// validator as an `UnknownModel` error, not a `Result` here.
    pub fn get_model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// All model names, in catalog declaration order.
    pub fn list_models(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Whether `field` is a declared field of `model`.
    pub fn field_exists(&self, model: &str, field: &str) -> bool {
        self.models
            .get(model)
            .is_some_and(|m| m.field(field).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldConfig, FieldType, ModelConfig};

    fn sample_config() -> CatalogConfig {
        CatalogConfig {
            models: vec![ModelConfig {
                name: "users".to_string(),
                table: "users".to_string(),
                primary_key: "id".to_string(),
                fields: vec![
                    FieldConfig {
                        name: "id".to_string(),
                        field_type: FieldType::Uuid,
                        nullable: false,
                    },
                    FieldConfig {
                        name: "active".to_string(),
                        field_type: FieldType::Boolean,
                        nullable: false,
                    },
                ],
            }],
        }
    }

    #[test]
    fn loads_valid_catalog() {
        let registry = Registry::load(&sample_config()).unwrap();
        assert_eq!(registry.list_models().collect::<Vec<_>>(), vec!["users"]);
        assert!(registry.field_exists("users", "active"));
        assert!(!registry.field_exists("users", "missing"));
    }

    #[test]
    fn rejects_unresolvable_primary_key() {
        let mut config = sample_config();
        config.models[0].primary_key = "nope".to_string();
        assert!(Registry::load(&config).is_err());
    }

    #[test]
    fn rejects_duplicate_model_names() {
        let mut config = sample_config();
        config.models.push(config.models[0].clone());
        assert!(Registry::load(&config).is_err());
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let mut config = sample_config();
        config.models[0].fields.push(config.models[0].fields[0].clone());
        assert!(Registry::load(&config).is_err());
    }

    #[test]
    fn get_model_returns_none_for_unknown() {
        let registry = Registry::load(&sample_config()).unwrap();
        assert!(registry.get_model("missing").is_none());
    }

    #[test]
    fn load_from_path_reads_and_validates_a_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, serde_json::to_string(&sample_config()).unwrap()).unwrap();

        let registry = Registry::load_from_path(&path).unwrap();
        assert_eq!(registry.list_models().collect::<Vec<_>>(), vec!["users"]);
    }

    #[test]
    fn load_from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        assert!(matches!(
            Registry::load_from_path(&path),
            Err(CoreError::ConfigNotFound { .. })
        ));
    }
}
