//! Error types for validation engine operations

use thiserror::Error;

/// Main error type for validation engine operations
#[derive(Error, Debug)]
pub enum SolarValidationError {
    /// A rule with the same identifier is already registered
    #[error("Rule '{0}' is already registered")]
    DuplicateRule(String),

    /// Rule dependencies form a cycle
    #[error("Circular rule dependency detected at '{rule_id}' ({})", path.join(" -> "))]
    CycleDetected {
        /// Rule at which the cycle was closed
        rule_id: String,
        /// Dependency chain leading back to `rule_id`
        path: Vec<String>,
    },

    /// A schema name could not be resolved
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    /// A schema definition is malformed
    #[error("Invalid schema '{schema}': {message}")]
    InvalidSchema {
        /// Schema name
        schema: String,
        /// What is wrong with it
        message: String,
    },

    /// An `api_request` arrived without an authentication token
    #[error("Authentication token missing from request metadata (expected key '{0}')")]
    AuthenticationMissing(String),

    /// A rule predicate returned an error
    #[error("Rule '{rule_id}' failed to evaluate: {message}")]
    RuleFailure {
        /// Rule identifier
        rule_id: String,
        /// Cause reported by the predicate
        message: String,
    },

    /// The request exceeded its time budget
    #[error("Validation timed out after {0} ms")]
    Timeout(u64),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic errors with context
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for validation engine operations
pub type Result<T> = std::result::Result<T, SolarValidationError>;

impl SolarValidationError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a new serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError(message.into())
    }

    /// Create a new invalid-schema error
    #[must_use]
    pub fn invalid_schema(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            schema: schema.into(),
            message: message.into(),
        }
    }

    /// Create a new rule failure
    #[must_use]
    pub fn rule_failure(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleFailure {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }

    /// Create a generic error with source
    #[must_use]
    pub fn other_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Short machine-readable code for result diagnostics
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateRule(_) => "duplicate_rule",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::SchemaNotFound(_) => "schema_not_found",
            Self::InvalidSchema { .. } => "invalid_schema",
            Self::AuthenticationMissing(_) => "authentication_missing",
            Self::RuleFailure { .. } => "rule_failure",
            Self::Timeout(_) => "timeout",
            Self::ConfigError(_) => "config_error",
            Self::IoError(_) => "io_error",
            Self::SerializationError(_) => "serialization_error",
            Self::Other { .. } => "internal_error",
        }
    }
}

impl From<serde_json::Error> for SolarValidationError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for SolarValidationError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<regex::Error> for SolarValidationError {
    fn from(err: regex::Error) -> Self {
        Self::ConfigError(format!("invalid pattern: {err}"))
    }
}

impl From<anyhow::Error> for SolarValidationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: err.to_string(),
            source: Some(Box::new(std::io::Error::other(err))),
        }
    }
}
