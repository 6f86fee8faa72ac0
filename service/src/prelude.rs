//! Prelude module for the validation service
//!
//! This module re-exports commonly used types for convenient import.

// Re-export core types
pub use validation_core::prelude::*;

// Re-export engine components
pub use crate::cache::ValidationCache;
pub use crate::cross_validation::CrossValidationEngine;
pub use crate::orchestrator::Orchestrator;
pub use crate::rule_engine::{
    BuiltinPredicate, FnPredicate, RuleError, RuleExecutor, RuleOutcome, RulePredicate,
    RuleRegistry, ValidationRule,
};
pub use crate::schema::{FieldConstraint, FieldType, SchemaDefinition, SchemaRegistry};
