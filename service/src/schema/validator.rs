//! Schema validation
//!
//! Checks a payload against a named schema and reports one structured issue
//! per violated constraint. Severity follows the violation kind and the
//! request context.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use validation_core::report::SchemaResult;
use validation_core::types::ContextType;
use validation_core::validation::{IssueCode, SchemaIssue, ValidationSeverity};

use super::{CompiledField, CompiledSchema, SchemaRegistry};

/// Validates payloads against registered schemas
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    registry: Arc<SchemaRegistry>,
}

impl SchemaValidator {
    /// Create a validator over a registry
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Validate `payload` against the schema called `name`
    ///
    /// An unknown name yields an invalid result carrying a single
    /// `schema_not_found` issue. The result is invalid when any issue is
    /// blocking; warnings block only when `strict` is set.
    #[must_use]
    pub fn validate(
        &self,
        name: &str,
        payload: &Value,
        context: ContextType,
        strict: bool,
    ) -> SchemaResult {
        let Some(schema) = self.registry.get(name) else {
            debug!(schema = %name, "Schema not found");
            return SchemaResult {
                schema: name.to_string(),
                valid: false,
                issues: vec![SchemaIssue::new(
                    "",
                    IssueCode::SchemaNotFound,
                    ValidationSeverity::Critical,
                    format!("Schema '{name}' is not registered"),
                )],
            };
        };

        let issues = check_schema(&schema, payload, context);
        let valid = !issues.iter().any(|issue| issue.severity.is_blocking(strict));
        debug!(schema = %name, issues = issues.len(), valid, "Schema checked");

        SchemaResult {
            schema: name.to_string(),
            valid,
            issues,
        }
    }
}

/// Severity of a violation in a given context
fn severity_for(code: IssueCode, context: ContextType) -> ValidationSeverity {
    match code {
        IssueCode::Required => match context {
            ContextType::ApiRequest | ContextType::SystemInternal => ValidationSeverity::Critical,
            _ => ValidationSeverity::Error,
        },
        IssueCode::AdditionalProperty => ValidationSeverity::Warning,
        IssueCode::SchemaNotFound => ValidationSeverity::Critical,
        _ => ValidationSeverity::Error,
    }
}

fn check_schema(
    schema: &CompiledSchema,
    payload: &Value,
    context: ContextType,
) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    let mut report = |path: &str, code: IssueCode, message: String| {
        issues.push(SchemaIssue::new(path, code, severity_for(code, context), message));
    };

    for field in &schema.fields {
        match field.path.resolve(payload) {
            None | Some(Value::Null) => {
                if field.constraint.required {
                    report(
                        &field.name,
                        IssueCode::Required,
                        format!("Required field '{}' is missing", field.name),
                    );
                }
            }
            Some(value) => check_field(field, value, &mut report),
        }
    }

    if !schema.definition().additional_properties {
        if let Some(object) = payload.as_object() {
            for key in object.keys() {
                if !schema.top_level.iter().any(|declared| declared == key) {
                    let schema_name = &schema.definition().name;
                    report(
                        key,
                        IssueCode::AdditionalProperty,
                        format!("Field '{key}' is not declared by schema '{schema_name}'"),
                    );
                }
            }
        }
    }

    issues
}

fn check_field(
    field: &CompiledField,
    value: &Value,
    report: &mut impl FnMut(&str, IssueCode, String),
) {
    let constraint = &field.constraint;
    let path = field.name.as_str();

    if let Some(expected) = constraint.field_type {
        if !expected.matches(value) {
            report(
                path,
                IssueCode::Type,
                format!("Expected {expected:?} but found {}", type_name(value)).to_lowercase(),
            );
            // further checks assume the declared type
            return;
        }
    }

    if let Some(number) = value.as_f64() {
        if let Some(min) = constraint.minimum {
            let below = if constraint.exclusive_minimum {
                number <= min
            } else {
                number < min
            };
            if below {
                report(
                    path,
                    IssueCode::Minimum,
                    format!("Value {number} is below the minimum of {min}"),
                );
            }
        }
        if let Some(max) = constraint.maximum {
            let above = if constraint.exclusive_maximum {
                number >= max
            } else {
                number > max
            };
            if above {
                report(
                    path,
                    IssueCode::Maximum,
                    format!("Value {number} is above the maximum of {max}"),
                );
            }
        }
    }

    let length = match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    };
    if let Some(length) = length {
        if let Some(min) = constraint.min_length {
            if length < min {
                report(
                    path,
                    IssueCode::MinLength,
                    format!("Length {length} is shorter than the minimum of {min}"),
                );
            }
        }
        if let Some(max) = constraint.max_length {
            if length > max {
                report(
                    path,
                    IssueCode::MaxLength,
                    format!("Length {length} is longer than the maximum of {max}"),
                );
            }
        }
    }

    if let (Some(pattern), Some(text)) = (&field.pattern, value.as_str()) {
        if !pattern.is_match(text) {
            report(
                path,
                IssueCode::Pattern,
                format!("Value '{text}' does not match pattern '{}'", pattern.as_str()),
            );
        }
    }

    if let Some(allowed) = &constraint.allowed_values {
        if !allowed.iter().any(|candidate| candidate == value) {
            report(
                path,
                IssueCode::Enum,
                format!("Value {value} is not one of the allowed values"),
            );
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldConstraint, FieldType, SchemaDefinition};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn panel_validator() -> SchemaValidator {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                SchemaDefinition::new("solar_panel")
                    .field(
                        "wattage",
                        FieldConstraint {
                            field_type: Some(FieldType::Number),
                            required: true,
                            minimum: Some(0.0),
                            exclusive_minimum: true,
                            maximum: Some(800.0),
                            ..Default::default()
                        },
                    )
                    .field(
                        "model",
                        FieldConstraint {
                            field_type: Some(FieldType::String),
                            pattern: Some("^[A-Z0-9-]+$".to_string()),
                            max_length: Some(12),
                            ..Default::default()
                        },
                    )
                    .field(
                        "cell_type",
                        FieldConstraint {
                            allowed_values: Some(vec![json!("mono"), json!("poly")]),
                            ..Default::default()
                        },
                    )
                    .field(
                        "specs.voc",
                        FieldConstraint {
                            field_type: Some(FieldType::Number),
                            required: true,
                            ..Default::default()
                        },
                    )
                    .closed(),
            )
            .expect("valid schema");
        SchemaValidator::new(Arc::new(registry))
    }

    #[test]
    fn test_valid_payload() {
        let result = panel_validator().validate(
            "solar_panel",
            &json!({
                "wattage": 400,
                "model": "SP-400",
                "cell_type": "mono",
                "specs": { "voc": 49.5 }
            }),
            ContextType::UserInput,
            false,
        );
        assert!(result.valid);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_missing_required_field_severity_depends_on_context() {
        let validator = panel_validator();
        let payload = json!({ "wattage": 400 });

        let user = validator.validate("solar_panel", &payload, ContextType::UserInput, false);
        assert!(!user.valid);
        assert_eq!(user.issues.len(), 1);
        assert_eq!(user.issues[0].path, "specs.voc");
        assert_eq!(user.issues[0].code, IssueCode::Required);
        assert_eq!(user.issues[0].severity, ValidationSeverity::Error);

        let api = validator.validate("solar_panel", &payload, ContextType::ApiRequest, false);
        assert_eq!(api.issues[0].severity, ValidationSeverity::Critical);
    }

    #[test]
    fn test_one_issue_per_violation() {
        let result = panel_validator().validate(
            "solar_panel",
            &json!({
                "wattage": 0,
                "model": "lowercase-and-too-long",
                "cell_type": "thin-film",
                "specs": { "voc": "high" }
            }),
            ContextType::UserInput,
            false,
        );
        let codes: Vec<IssueCode> = result.issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                IssueCode::Minimum,
                IssueCode::MaxLength,
                IssueCode::Pattern,
                IssueCode::Enum,
                IssueCode::Type,
            ]
        );
    }

    #[test]
    fn test_additional_properties_warn() {
        let validator = panel_validator();
        let payload = json!({ "wattage": 400, "specs": { "voc": 40 }, "color": "black" });

        let lenient = validator.validate("solar_panel", &payload, ContextType::UserInput, false);
        assert!(lenient.valid);
        assert_eq!(lenient.issues[0].code, IssueCode::AdditionalProperty);
        assert_eq!(lenient.issues[0].severity, ValidationSeverity::Warning);

        let strict = validator.validate("solar_panel", &payload, ContextType::UserInput, true);
        assert!(!strict.valid);
    }

    #[test]
    fn test_unknown_schema_is_a_result() {
        let result =
            panel_validator().validate("does_not_exist", &json!({}), ContextType::UserInput, false);
        assert!(!result.valid);
        assert_eq!(result.schema, "does_not_exist");
        assert_eq!(result.issues[0].code, IssueCode::SchemaNotFound);
        assert_eq!(result.issues[0].code.to_string(), "schema not found");
    }
}
