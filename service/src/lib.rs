//! # Solar Marketplace Validation
//!
//! Validation orchestration engine for solar marketplace records:
//! equipment specifications, system configurations, financial records and
//! sensor readings.
//!
//! ## Overview
//!
//! A [`ValidationRequest`](validation_core::ValidationRequest) names the
//! schemas, custom rules and cross-validation rules to apply to a payload.
//! The [`Orchestrator`] runs them as three sequential stages and merges the
//! outcome into a [`ValidationResult`](validation_core::ValidationResult):
//!
//! - **Schema stage**: structural and field-level checks against named
//!   schemas from a [`SchemaRegistry`]
//! - **Custom-rule stage**: business rules from a [`RuleRegistry`] or
//!   inline in the request, ordered by their dependencies
//! - **Cross-validation stage**: named checks spanning several fields
//!
//! Successful results are cached, every request is bounded by a time
//! budget, and internal failures come back as diagnostics rather than
//! errors.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use validation_service::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let rules = RuleRegistry::from_specs([
//!     RuleSpec::new("cost-positive", Some("total_cost"), PredicateSpec::PositiveNumber),
//! ])?;
//! let schemas = SchemaRegistry::new();
//! let engine = Orchestrator::new(Arc::new(rules), Arc::new(schemas), EngineConfig::default());
//!
//! let request = ValidationRequest::new(
//!     ValidationContext::new(ContextType::UserInput),
//!     RecordCategory::FinancialRecord,
//!     json!({ "total_cost": -5 }),
//! )
//! .with_registered_rule("cost-positive");
//!
//! let result = engine.validate(request).await;
//! assert!(!result.overall_valid);
//! assert_eq!(result.results.custom.suggested_fixes["total_cost"], json!(5));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Result cache
pub mod cache;

/// Command-line interface
pub mod cli;

/// Configuration loading
pub mod config;

/// Cross-validation rules
pub mod cross_validation;

/// Field path navigation
pub mod json_path;

/// Process-wide metrics
pub mod metrics;

/// Request orchestration
pub mod orchestrator;

/// Prelude for convenient imports
pub mod prelude;

/// Custom rule engine
pub mod rule_engine;

/// Schema registry and validation
pub mod schema;

/// Logging setup
pub mod telemetry;

pub use cache::{CacheStats, ValidationCache};
pub use cross_validation::CrossValidationEngine;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use orchestrator::Orchestrator;
pub use rule_engine::{
    BuiltinPredicate, DependencyResolver, FnPredicate, RuleExecutor, RuleOutcome, RulePredicate,
    RuleRegistry, ValidationRule,
};
pub use schema::{FieldConstraint, FieldType, SchemaDefinition, SchemaRegistry, SchemaValidator};
