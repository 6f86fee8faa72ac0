//! Result-side types: stage results, metrics and the merged validation result

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{
    Diagnostic, RuleCategory, SchemaIssue, SeveritySummary, ValidationSeverity,
};

/// Terminal status of a validation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Valid with no warnings
    Success,
    /// Valid, but with warning-level findings
    Warning,
    /// Invalid, or an orchestrator-internal error occurred
    Error,
    /// The time budget ran out; stage results are partial
    Timeout,
    /// Served from the result cache
    CacheHit,
}

/// Outcome of one named schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaResult {
    /// Schema name as requested
    pub schema: String,
    /// Whether the payload satisfied the schema
    pub valid: bool,
    /// One issue per violated constraint
    pub issues: Vec<SchemaIssue>,
}

/// Status of one custom rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    /// Predicate returned a pass
    Passed,
    /// Predicate returned a failure
    Failed,
    /// Not evaluated: a dependency did not pass, the predicate errored, or
    /// the error budget ran out
    Skipped,
}

/// Outcome of one custom rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule identifier
    pub rule_id: String,
    /// Human name
    pub rule_name: String,
    /// Target field, `None` for whole-record rules
    pub field: Option<String>,
    /// Pass, fail or skip
    pub status: RuleStatus,
    /// Rule severity
    pub severity: ValidationSeverity,
    /// Rule category
    pub category: RuleCategory,
    /// Failure message or skip reason
    pub message: Option<String>,
    /// Non-authoritative replacement value
    pub suggested_fix: Option<Value>,
}

impl RuleResult {
    /// Whether this result invalidates the record
    #[must_use]
    pub fn is_blocking(&self, strict: bool) -> bool {
        self.status == RuleStatus::Failed && self.severity.is_blocking(strict)
    }
}

/// Counters kept by the rule executor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExecutionStats {
    /// Rules whose predicate ran to completion
    pub rules_evaluated: usize,
    /// Rules that were not evaluated
    pub rules_skipped: usize,
    /// Rules that passed
    pub rules_passed: usize,
    /// Rules that failed
    pub rules_failed: usize,
    /// Distinct field paths inspected by evaluated rules
    pub fields_touched: usize,
}

/// Output of the custom-rule stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRuleStage {
    /// Whether no blocking failure occurred
    pub valid: bool,
    /// Per-rule results in execution order
    pub results: Vec<RuleResult>,
    /// Messages of failed error/critical rules
    pub errors: Vec<String>,
    /// Messages of failed warning rules
    pub warnings: Vec<String>,
    /// Messages of failed info rules
    pub info: Vec<String>,
    /// Suggested replacement values keyed by field path
    pub suggested_fixes: IndexMap<String, Value>,
    /// Execution counters
    pub stats: RuleExecutionStats,
}

impl Default for CustomRuleStage {
    fn default() -> Self {
        Self {
            valid: true,
            results: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
            suggested_fixes: IndexMap::new(),
            stats: RuleExecutionStats::default(),
        }
    }
}

/// Outcome of one named cross-validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    /// Rule name as requested
    pub rule: String,
    /// Whether the check passed
    pub valid: bool,
    /// Whether the name resolved to a known rule
    pub known: bool,
    /// Severity of a failure
    pub severity: ValidationSeverity,
    /// Explanation
    pub message: Option<String>,
}

/// Results of all three stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageResults {
    /// Schema stage
    pub schema: Vec<SchemaResult>,
    /// Custom-rule stage
    pub custom: CustomRuleStage,
    /// Cross-validation stage
    pub cross: Vec<CrossValidationResult>,
}

impl StageResults {
    /// Logical AND over every stage's results
    #[must_use]
    pub fn all_passing(&self) -> bool {
        self.schema.iter().all(|r| r.valid)
            && self.custom.valid
            && self.cross.iter().all(|r| r.valid)
    }
}

/// Stage timings and counters for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// Preprocessing time in microseconds
    pub preprocessing_us: u64,
    /// Schema stage time in microseconds
    pub schema_us: u64,
    /// Custom-rule stage time in microseconds
    pub custom_rules_us: u64,
    /// Cross-validation stage time in microseconds
    pub cross_validation_us: u64,
    /// Whether the result came from the cache
    pub cache_hit: bool,
    /// Custom-rule counters
    pub rules: RuleExecutionStats,
}

/// Kind of advisory recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Validation is slow; caching would help
    Performance,
    /// Suggested fixes are available
    DataQuality,
    /// Rules were skipped
    RuleCoverage,
    /// Configuration looks questionable
    Configuration,
}

/// Advisory, never gating, recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Kind
    pub kind: RecommendationKind,
    /// Text for the caller
    pub message: String,
}

impl Recommendation {
    /// Create a new recommendation
    pub fn new(kind: RecommendationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Flattened failing entry, as surfaced to end users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultIssue {
    /// Stage that produced the entry (`schema`, `custom`, `cross`, `pipeline`)
    pub stage: String,
    /// Field path, rule name or diagnostic code
    pub location: String,
    /// Message
    pub message: String,
    /// Severity
    pub severity: ValidationSeverity,
}

/// Merged result of a validation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Request identifier
    pub request_id: String,
    /// When the result was produced
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration in microseconds
    pub duration_us: u64,
    /// Terminal status
    pub status: ResultStatus,
    /// True iff every stage result passes and no blocking diagnostic exists
    pub overall_valid: bool,
    /// Stage results
    pub results: StageResults,
    /// Orchestrator-level findings
    pub diagnostics: Vec<Diagnostic>,
    /// Timings and counters
    pub metrics: ValidationMetrics,
    /// Advisory recommendations
    pub recommendations: Vec<Recommendation>,
}

impl ValidationResult {
    /// Empty result for a request, to be filled in by the pipeline
    pub fn empty(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: Utc::now(),
            duration_us: 0,
            status: ResultStatus::Success,
            overall_valid: true,
            results: StageResults::default(),
            diagnostics: Vec::new(),
            metrics: ValidationMetrics::default(),
            recommendations: Vec::new(),
        }
    }

    /// Whether the result may be stored in the result cache
    ///
    /// Only successful verdicts are cached.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.overall_valid && matches!(self.status, ResultStatus::Success | ResultStatus::Warning)
    }

    /// Every failing entry across stages and diagnostics
    #[must_use]
    pub fn issues(&self) -> Vec<ResultIssue> {
        let mut issues = Vec::new();

        for schema in &self.results.schema {
            for issue in &schema.issues {
                issues.push(ResultIssue {
                    stage: "schema".to_string(),
                    location: if issue.path.is_empty() {
                        schema.schema.clone()
                    } else {
                        issue.path.clone()
                    },
                    message: issue.message.clone(),
                    severity: issue.severity,
                });
            }
        }

        for rule in &self.results.custom.results {
            if rule.status == RuleStatus::Failed {
                issues.push(ResultIssue {
                    stage: "custom".to_string(),
                    location: rule.field.clone().unwrap_or_else(|| rule.rule_id.clone()),
                    message: rule
                        .message
                        .clone()
                        .unwrap_or_else(|| format!("Rule '{}' failed", rule.rule_id)),
                    severity: rule.severity,
                });
            }
        }

        for cross in self.results.cross.iter().filter(|c| !c.valid) {
            issues.push(ResultIssue {
                stage: "cross".to_string(),
                location: cross.rule.clone(),
                message: cross
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Cross-validation '{}' failed", cross.rule)),
                severity: cross.severity,
            });
        }

        for diagnostic in &self.diagnostics {
            issues.push(ResultIssue {
                stage: "pipeline".to_string(),
                location: diagnostic.code.clone(),
                message: diagnostic.message.clone(),
                severity: diagnostic.severity,
            });
        }

        issues
    }

    /// Counts of failing entries by severity
    #[must_use]
    pub fn summary(&self) -> SeveritySummary {
        let mut summary = SeveritySummary::default();
        for issue in self.issues() {
            summary.add(issue.severity);
        }
        summary
    }
}
