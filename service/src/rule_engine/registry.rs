//! Rule registry
//!
//! Append-only storage of validation rules keyed by identifier, with
//! secondary indexes by category and target field. The registry is filled
//! at startup and then shared read-only (`Arc<RuleRegistry>`), so lookups
//! take no locks.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use validation_core::error::{Result, SolarValidationError};
use validation_core::types::RuleSpec;
use validation_core::validation::RuleCategory;

use super::ValidationRule;

/// Index key for whole-record rules
const WHOLE_RECORD: &str = "*";

/// Registry of validation rules
#[derive(Debug, Default)]
pub struct RuleRegistry {
    /// Rules by identifier, in registration order
    rules: IndexMap<String, Arc<ValidationRule>>,
    /// Rule identifiers by category
    by_category: HashMap<RuleCategory, Vec<String>>,
    /// Rule identifiers by target field
    by_field: HashMap<String, Vec<String>>,
}

impl RuleRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from rule specifications
    ///
    /// # Errors
    ///
    /// Returns an error if a specification is invalid or an id repeats
    pub fn from_specs(specs: impl IntoIterator<Item = RuleSpec>) -> Result<Self> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(ValidationRule::from_spec(spec)?)?;
        }
        Ok(registry)
    }

    /// Register a rule
    ///
    /// # Errors
    ///
    /// Returns `SolarValidationError::DuplicateRule` if the id is taken
    pub fn register(&mut self, rule: ValidationRule) -> Result<()> {
        if self.rules.contains_key(&rule.id) {
            return Err(SolarValidationError::DuplicateRule(rule.id));
        }

        let id = rule.id.clone();
        self.by_category
            .entry(rule.category)
            .or_default()
            .push(id.clone());
        self.by_field
            .entry(rule.target_field().unwrap_or(WHOLE_RECORD).to_string())
            .or_default()
            .push(id.clone());

        debug!(rule_id = %id, category = %rule.category, "Registered validation rule");
        self.rules.insert(id, Arc::new(rule));
        Ok(())
    }

    /// Register several rules, stopping at the first error
    ///
    /// # Errors
    ///
    /// Returns `SolarValidationError::DuplicateRule` if any id is taken
    pub fn register_all(&mut self, rules: impl IntoIterator<Item = ValidationRule>) -> Result<()> {
        for rule in rules {
            self.register(rule)?;
        }
        Ok(())
    }

    /// Look up a rule by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<ValidationRule>> {
        self.rules.get(id).cloned()
    }

    /// All rules in registration order
    #[must_use]
    pub fn all(&self) -> Vec<Arc<ValidationRule>> {
        self.rules.values().cloned().collect()
    }

    /// Rules of one category
    #[must_use]
    pub fn by_category(&self, category: RuleCategory) -> Vec<Arc<ValidationRule>> {
        self.collect(self.by_category.get(&category))
    }

    /// Rules targeting a field path; `"*"` returns whole-record rules
    #[must_use]
    pub fn for_field(&self, field_path: &str) -> Vec<Arc<ValidationRule>> {
        let key = if field_path.is_empty() {
            WHOLE_RECORD
        } else {
            field_path
        };
        self.collect(self.by_field.get(key))
    }

    /// Registered identifiers
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Number of registered rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Remove every rule
    pub fn clear(&mut self) {
        self.rules.clear();
        self.by_category.clear();
        self.by_field.clear();
    }

    fn collect(&self, ids: Option<&Vec<String>>) -> Vec<Arc<ValidationRule>> {
        ids.map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }
}
