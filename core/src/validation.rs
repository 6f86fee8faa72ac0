//! Severity levels, rule categories and issue types
//!
//! These are the vocabulary shared by every validation stage: a schema
//! violation, a failed business rule and a cross-record inconsistency are
//! all reported with a [`ValidationSeverity`] and a machine-readable code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for validation findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSeverity {
    /// Informational message
    Info,
    /// Warning that doesn't prevent processing
    Warning,
    /// Error that prevents successful processing
    Error,
    /// Critical error that indicates severe problems
    Critical,
}

impl ValidationSeverity {
    /// Whether a failure at this severity invalidates the record
    ///
    /// In strict mode warnings block as well.
    #[must_use]
    pub fn is_blocking(self, strict: bool) -> bool {
        match self {
            Self::Critical | Self::Error => true,
            Self::Warning => strict,
            Self::Info => false,
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Category of a validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Value has the expected type
    Type,
    /// Value has the expected textual format
    Format,
    /// Domain business rule
    Business,
    /// Referential or structural integrity
    Integrity,
    /// Performance characteristic of the described system
    Performance,
    /// Security-relevant constraint
    Security,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Type => "type",
            Self::Format => "format",
            Self::Business => "business",
            Self::Integrity => "integrity",
            Self::Performance => "performance",
            Self::Security => "security",
        };
        f.write_str(name)
    }
}

/// Machine-readable code for a schema violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Required field is absent or null
    Required,
    /// Value has the wrong JSON type
    Type,
    /// Numeric value below the lower bound
    Minimum,
    /// Numeric value above the upper bound
    Maximum,
    /// String or array shorter than allowed
    MinLength,
    /// String or array longer than allowed
    MaxLength,
    /// String does not match the pattern
    Pattern,
    /// Value is not one of the allowed values
    Enum,
    /// Field not declared by a closed schema
    AdditionalProperty,
    /// Referenced schema is not registered
    SchemaNotFound,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Required => "required",
            Self::Type => "type",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::MinLength => "min length",
            Self::MaxLength => "max length",
            Self::Pattern => "pattern",
            Self::Enum => "enum",
            Self::AdditionalProperty => "additional property",
            Self::SchemaNotFound => "schema not found",
        };
        f.write_str(text)
    }
}

/// A single structured schema violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaIssue {
    /// Dot-separated path to the offending field (empty for the whole record)
    pub path: String,
    /// Human-readable message
    pub message: String,
    /// Violation kind
    pub code: IssueCode,
    /// Severity, derived from the violation kind and the request context
    pub severity: ValidationSeverity,
}

impl SchemaIssue {
    /// Create a new schema issue
    pub fn new(
        path: impl Into<String>,
        code: IssueCode,
        severity: ValidationSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
            severity,
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if !self.path.is_empty() {
            write!(f, " at {}", self.path)?;
        }
        write!(f, " [code: {}]", self.code)
    }
}

/// Orchestrator-level finding that belongs to no single stage
///
/// Staleness markers, missing authentication and pipeline failures are
/// reported here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Severity
    pub severity: ValidationSeverity,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(
        code: impl Into<String>,
        severity: ValidationSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity,
        }
    }

    /// Synthetic critical entry for an orchestrator-internal error
    #[must_use]
    pub fn critical(error: &crate::error::SolarValidationError) -> Self {
        Self::new(error.code(), ValidationSeverity::Critical, error.to_string())
    }
}

/// Counts of findings by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    /// Number of info findings
    pub info_count: usize,
    /// Number of warning findings
    pub warning_count: usize,
    /// Number of error findings
    pub error_count: usize,
    /// Number of critical findings
    pub critical_count: usize,
}

impl SeveritySummary {
    /// Record one finding
    pub fn add(&mut self, severity: ValidationSeverity) {
        match severity {
            ValidationSeverity::Info => self.info_count += 1,
            ValidationSeverity::Warning => self.warning_count += 1,
            ValidationSeverity::Error => self.error_count += 1,
            ValidationSeverity::Critical => self.critical_count += 1,
        }
    }

    /// Total number of findings
    #[must_use]
    pub fn total(&self) -> usize {
        self.info_count + self.warning_count + self.error_count + self.critical_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering_and_blocking() {
        assert!(ValidationSeverity::Critical > ValidationSeverity::Error);
        assert!(ValidationSeverity::Warning > ValidationSeverity::Info);
        assert!(ValidationSeverity::Error.is_blocking(false));
        assert!(!ValidationSeverity::Warning.is_blocking(false));
        assert!(ValidationSeverity::Warning.is_blocking(true));
        assert!(!ValidationSeverity::Info.is_blocking(true));
    }

    #[test]
    fn test_issue_code_text() {
        assert_eq!(IssueCode::SchemaNotFound.to_string(), "schema not found");
        let json = serde_json::to_string(&IssueCode::SchemaNotFound).unwrap();
        assert_eq!(json, "\"schema_not_found\"");
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = SeveritySummary::default();
        summary.add(ValidationSeverity::Error);
        summary.add(ValidationSeverity::Error);
        summary.add(ValidationSeverity::Info);
        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.total(), 3);
    }
}
