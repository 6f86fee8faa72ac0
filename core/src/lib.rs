//! # Validation Core
//!
//! Core types for validating solar marketplace records: equipment
//! specifications, system configurations, financial records and sensor
//! readings.
//!
//! This crate holds the vocabulary shared between callers and the
//! validation engine in `validation_service`: contexts, requests, rule and
//! predicate specifications, stage results, configuration and errors. It
//! contains no engine logic.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Error types for engine operations
pub mod error;

/// Severities, categories and issue types
pub mod validation;

/// Contexts, rule specifications and requests
pub mod types;

/// Stage results and the merged validation result
pub mod report;

/// Engine configuration
pub mod configuration;

pub use configuration::EngineConfig;
pub use error::{Result, SolarValidationError};
pub use report::{ResultStatus, ValidationResult};
pub use serde_json::Value;
pub use types::{ValidationContext, ValidationRequest};
pub use validation::ValidationSeverity;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::configuration::*;
    pub use crate::error::{Result, SolarValidationError};
    pub use crate::report::*;
    pub use crate::types::*;
    pub use crate::validation::*;
}
