//! Named schema definitions
//!
//! A schema is a structural contract for one kind of record: which fields
//! must be present, their types, and their range, length, pattern and
//! allowed-value constraints. Schemas are supplied as data (YAML or JSON)
//! and compiled once on registration.

pub mod validator;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validation_core::error::{Result, SolarValidationError};

use crate::json_path::FieldPath;

pub use validator::SchemaValidator;

/// JSON type expected for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// JSON string
    String,
    /// Any JSON number
    Number,
    /// JSON number without a fractional part
    Integer,
    /// JSON boolean
    Boolean,
    /// JSON object
    Object,
    /// JSON array
    Array,
    /// String holding an ISO 8601 date or RFC 3339 timestamp
    Date,
}

impl FieldType {
    /// Whether `value` has this type
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.is_finite() && n.fract() == 0.0)
            }
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Date => value.as_str().is_some_and(|raw| {
                chrono::DateTime::parse_from_rfc3339(raw).is_ok()
                    || chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
            }),
        }
    }
}

/// Constraints on a single field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConstraint {
    /// Expected type
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    /// Field must be present and non-null
    pub required: bool,
    /// Lower numeric bound
    pub minimum: Option<f64>,
    /// Upper numeric bound
    pub maximum: Option<f64>,
    /// Lower bound is exclusive
    pub exclusive_minimum: bool,
    /// Upper bound is exclusive
    pub exclusive_maximum: bool,
    /// Minimum length of a string (characters) or array (items)
    pub min_length: Option<usize>,
    /// Maximum length of a string (characters) or array (items)
    pub max_length: Option<usize>,
    /// Regular expression a string must match
    pub pattern: Option<String>,
    /// Values the field may take
    pub allowed_values: Option<Vec<Value>>,
}

/// A named schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Schema name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Constraints keyed by dot-separated field path
    #[serde(default)]
    pub fields: IndexMap<String, FieldConstraint>,
    /// Whether top-level fields not named in `fields` are tolerated
    #[serde(default = "default_additional_properties")]
    pub additional_properties: bool,
}

fn default_additional_properties() -> bool {
    true
}

impl SchemaDefinition {
    /// Create an empty, open schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            fields: IndexMap::new(),
            additional_properties: true,
        }
    }

    /// Add a field constraint
    #[must_use]
    pub fn field(mut self, path: impl Into<String>, constraint: FieldConstraint) -> Self {
        self.fields.insert(path.into(), constraint);
        self
    }

    /// Forbid undeclared top-level fields
    #[must_use]
    pub fn closed(mut self) -> Self {
        self.additional_properties = false;
        self
    }
}

/// Field constraint with its path parsed and pattern compiled
#[derive(Debug)]
pub(crate) struct CompiledField {
    pub(crate) name: String,
    pub(crate) path: FieldPath,
    pub(crate) constraint: FieldConstraint,
    pub(crate) pattern: Option<Regex>,
}

/// Schema ready for validation
#[derive(Debug)]
pub struct CompiledSchema {
    definition: SchemaDefinition,
    pub(crate) fields: Vec<CompiledField>,
    pub(crate) top_level: Vec<String>,
}

impl CompiledSchema {
    /// Compile a definition
    ///
    /// # Errors
    ///
    /// Returns `SolarValidationError::InvalidSchema` for malformed paths,
    /// patterns that don't compile, or inverted bounds
    pub fn compile(definition: SchemaDefinition) -> Result<Self> {
        let mut fields = Vec::with_capacity(definition.fields.len());
        let mut top_level = Vec::new();

        for (name, constraint) in &definition.fields {
            let path = FieldPath::parse(name).map_err(|e| {
                SolarValidationError::invalid_schema(&definition.name, e.to_string())
            })?;

            if let (Some(min), Some(max)) = (constraint.minimum, constraint.maximum) {
                if min > max {
                    return Err(SolarValidationError::invalid_schema(
                        &definition.name,
                        format!("field '{name}' has minimum {min} above maximum {max}"),
                    ));
                }
            }
            if let (Some(min), Some(max)) = (constraint.min_length, constraint.max_length) {
                if min > max {
                    return Err(SolarValidationError::invalid_schema(
                        &definition.name,
                        format!("field '{name}' has min_length {min} above max_length {max}"),
                    ));
                }
            }

            let pattern = constraint
                .pattern
                .as_deref()
                .map(Regex::new)
                .transpose()
                .map_err(|e| {
                    SolarValidationError::invalid_schema(
                        &definition.name,
                        format!("field '{name}' has an invalid pattern: {e}"),
                    )
                })?;

            if let Some(crate::json_path::PathSegment::Property(first)) = path.segments().first() {
                if !top_level.contains(first) {
                    top_level.push(first.clone());
                }
            }

            fields.push(CompiledField {
                name: name.clone(),
                path,
                constraint: constraint.clone(),
                pattern,
            });
        }

        Ok(Self {
            definition,
            fields,
            top_level,
        })
    }

    /// The source definition
    #[must_use]
    pub fn definition(&self) -> &SchemaDefinition {
        &self.definition
    }
}

/// Registry of named schemas
///
/// Registering a name twice replaces the earlier definition, so schema
/// files can be reloaded.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<CompiledSchema>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register a schema
    ///
    /// # Errors
    ///
    /// Returns `SolarValidationError::InvalidSchema` if compilation fails
    pub fn register(&mut self, definition: SchemaDefinition) -> Result<()> {
        let name = definition.name.clone();
        let compiled = CompiledSchema::compile(definition)?;
        if self.schemas.insert(name.clone(), Arc::new(compiled)).is_some() {
            warn!(schema = %name, "Replaced existing schema definition");
        } else {
            debug!(schema = %name, "Registered schema");
        }
        Ok(())
    }

    /// Look up a compiled schema
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<CompiledSchema>> {
        self.schemas.get(name).cloned()
    }

    /// Whether a schema is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered schema names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered schemas
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether no schema is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Parse a schema document (YAML or JSON) and register it
    ///
    /// # Errors
    ///
    /// Returns a serialization error for unparseable documents, or
    /// `InvalidSchema` if compilation fails
    pub fn register_document(&mut self, document: &str) -> Result<()> {
        let definition: SchemaDefinition = serde_yaml::from_str(document)?;
        self.register(definition)
    }

    /// Load every `*.yaml`, `*.yml` and `*.json` file in a directory
    ///
    /// Returns the number of schemas loaded.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be read, or the first
    /// parse/compile error encountered
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| matches!(ext, "yaml" | "yml" | "json"))
            })
            .collect();
        paths.sort();

        for path in &paths {
            let contents = std::fs::read_to_string(path)?;
            self.register_document(&contents).map_err(|e| {
                SolarValidationError::other(format!("{}: {e}", path.display()))
            })?;
        }

        info!(count = paths.len(), dir = %dir.display(), "Loaded schema definitions");
        Ok(paths.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_document_parsing() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut registry = SchemaRegistry::new();
        registry.register_document(
            r#"
name: solar_panel
additional_properties: false
fields:
  wattage: { type: number, required: true, minimum: 0 }
  model: { type: string, pattern: "^[A-Z0-9-]+$" }
  specs.voc: { type: number }
"#,
        )?;

        let schema = registry.get("solar_panel").ok_or("schema missing")?;
        assert!(!schema.definition().additional_properties);
        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.top_level, vec!["wattage", "model", "specs"]);
        Ok(())
    }

    #[test]
    fn test_invalid_schemas_rejected() {
        let mut registry = SchemaRegistry::new();
        let inverted = SchemaDefinition::new("bad").field(
            "x",
            FieldConstraint {
                minimum: Some(10.0),
                maximum: Some(1.0),
                ..Default::default()
            },
        );
        assert!(matches!(
            registry.register(inverted),
            Err(SolarValidationError::InvalidSchema { .. })
        ));

        let bad_pattern = SchemaDefinition::new("bad").field(
            "x",
            FieldConstraint {
                pattern: Some("(".to_string()),
                ..Default::default()
            },
        );
        assert!(registry.register(bad_pattern).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_field_types() {
        assert!(FieldType::Integer.matches(&json!(4)));
        assert!(FieldType::Integer.matches(&json!(4.0)));
        assert!(!FieldType::Integer.matches(&json!(4.5)));
        assert!(FieldType::Date.matches(&json!("2024-03-01")));
        assert!(!FieldType::Date.matches(&json!("March 1st")));
    }

    #[test]
    fn test_load_dir() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join("inverter.yaml"),
            "name: inverter\nfields:\n  capacity_kw: { type: number, required: true }\n",
        )?;
        std::fs::write(
            dir.path().join("battery.json"),
            r#"{"name": "battery", "fields": {"capacity_kwh": {"type": "number"}}}"#,
        )?;
        std::fs::write(dir.path().join("README.md"), "not a schema")?;

        let mut registry = SchemaRegistry::new();
        assert_eq!(registry.load_dir(dir.path())?, 2);
        assert_eq!(registry.names(), vec!["battery", "inverter"]);
        Ok(())
    }
}
