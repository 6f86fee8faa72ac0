//! Rule engine for custom business rules
//!
//! Rules live in a [`RuleRegistry`], are ordered by the
//! [`DependencyResolver`] so that prerequisites run first, and are executed
//! against a record by the [`RuleExecutor`].

pub mod executor;
pub mod predicate;
pub mod registry;
pub mod resolver;

use std::fmt;
use std::sync::Arc;
use validation_core::error::Result;
use validation_core::types::RuleSpec;
use validation_core::validation::{RuleCategory, ValidationSeverity};

pub use executor::RuleExecutor;
pub use predicate::{BuiltinPredicate, FnPredicate, RuleError, RuleOutcome, RulePredicate};
pub use registry::RuleRegistry;
pub use resolver::DependencyResolver;

/// A named, independently testable predicate over a record
///
/// Immutable once registered; shared as `Arc<ValidationRule>`.
#[derive(Clone)]
pub struct ValidationRule {
    /// Unique identifier
    pub id: String,
    /// Human name
    pub name: String,
    /// Description
    pub description: String,
    /// Target field path; `None` targets the whole record
    pub field: Option<String>,
    /// Severity of a failure
    pub severity: ValidationSeverity,
    /// Rule category
    pub category: RuleCategory,
    /// Identifiers of rules that must be evaluated first
    pub dependencies: Vec<String>,
    /// Message overriding the predicate's failure message
    pub failure_message: Option<String>,
    /// The predicate
    pub predicate: Arc<dyn RulePredicate>,
}

impl ValidationRule {
    /// Create a whole-record business rule with error severity
    pub fn new(id: impl Into<String>, predicate: impl RulePredicate + 'static) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            field: None,
            severity: ValidationSeverity::Error,
            category: RuleCategory::Business,
            dependencies: Vec::new(),
            failure_message: None,
            predicate: Arc::new(predicate),
        }
    }

    /// Build a rule from its serializable specification
    ///
    /// # Errors
    ///
    /// Returns `SolarValidationError::ConfigError` if the predicate cannot be built
    pub fn from_spec(spec: RuleSpec) -> Result<Self> {
        let predicate = BuiltinPredicate::new(spec.predicate)?;
        Ok(Self {
            name: if spec.name.is_empty() {
                spec.id.clone()
            } else {
                spec.name
            },
            id: spec.id,
            description: spec.description,
            field: spec.field,
            severity: spec.severity,
            category: spec.category,
            dependencies: spec.dependencies,
            failure_message: spec.message,
            predicate: Arc::new(predicate),
        })
    }

    /// Set the target field
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the human name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the severity
    #[must_use]
    pub fn with_severity(mut self, severity: ValidationSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: RuleCategory) -> Self {
        self.category = category;
        self
    }

    /// Add a dependency
    #[must_use]
    pub fn depends_on(mut self, rule_id: impl Into<String>) -> Self {
        self.dependencies.push(rule_id.into());
        self
    }

    /// Target field path, `None` for whole-record rules
    #[must_use]
    pub fn target_field(&self) -> Option<&str> {
        match self.field.as_deref() {
            None | Some("*" | "") => None,
            Some(path) => Some(path),
        }
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("id", &self.id)
            .field("field", &self.field)
            .field("severity", &self.severity)
            .field("category", &self.category)
            .field("dependencies", &self.dependencies)
            .field("predicate", &self.predicate.describe())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validation_core::types::PredicateSpec;

    #[test]
    fn test_from_spec() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let spec = RuleSpec::new("efficiency", Some("efficiency"), PredicateSpec::PositiveNumber)
            .with_severity(ValidationSeverity::Warning)
            .depends_on("efficiency-present");
        let rule = ValidationRule::from_spec(spec)?;

        assert_eq!(rule.name, "efficiency");
        assert_eq!(rule.target_field(), Some("efficiency"));
        assert_eq!(rule.dependencies, vec!["efficiency-present".to_string()]);
        assert!(rule.predicate.describe().contains("positive_number"));
        Ok(())
    }

    #[test]
    fn test_wildcard_targets_whole_record() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let rule = ValidationRule::from_spec(RuleSpec::new(
            "record-present",
            Some("*"),
            PredicateSpec::Required,
        ))?;
        assert_eq!(rule.target_field(), None);
        Ok(())
    }
}
