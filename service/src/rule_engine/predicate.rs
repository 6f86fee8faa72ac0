//! Rule predicates
//!
//! A predicate is the capability a rule carries: given the targeted value,
//! the whole record and the call context it decides pass or fail, and may
//! propose a replacement value. Built-in predicates are driven by
//! [`PredicateSpec`] data; arbitrary predicates implement [`RulePredicate`]
//! directly and may suspend (e.g. for referential lookups).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use validation_core::error::Result;
use validation_core::types::{PredicateSpec, ValidationContext};

use crate::json_path;

/// Outcome of evaluating a predicate
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    /// Whether the value satisfied the predicate
    pub passed: bool,
    /// Explanation of a failure
    pub message: Option<String>,
    /// Suggested replacement value for the targeted field
    pub suggested_fix: Option<Value>,
}

impl RuleOutcome {
    /// Passing outcome
    #[must_use]
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
            suggested_fix: None,
        }
    }

    /// Failing outcome with a message
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
            suggested_fix: None,
        }
    }

    /// Attach a suggested replacement value
    #[must_use]
    pub fn with_fix(mut self, fix: Value) -> Self {
        self.suggested_fix = Some(fix);
        self
    }
}

/// Error raised while evaluating a predicate
///
/// The executor records these as skips; they never abort a batch.
#[derive(Error, Debug)]
pub enum RuleError {
    /// A value the predicate needs is missing or malformed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A lookup against another system failed
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

/// Capability carried by every validation rule
#[async_trait]
pub trait RulePredicate: Send + Sync {
    /// Evaluate the predicate
    ///
    /// `value` is the targeted field (`None` if absent), or the whole record
    /// for whole-record rules.
    async fn evaluate(
        &self,
        value: Option<&Value>,
        record: &Value,
        context: &ValidationContext,
    ) -> std::result::Result<RuleOutcome, RuleError>;

    /// Short description for audit output
    fn describe(&self) -> String;
}

/// Predicate backed by a [`PredicateSpec`]
pub struct BuiltinPredicate {
    spec: PredicateSpec,
    pattern: Option<Regex>,
}

impl BuiltinPredicate {
    /// Build a predicate from its specification
    ///
    /// # Errors
    ///
    /// Returns `SolarValidationError::ConfigError` if a pattern does not compile
    pub fn new(spec: PredicateSpec) -> Result<Self> {
        let pattern = match &spec {
            PredicateSpec::Pattern { pattern } => Some(Regex::new(pattern)?),
            _ => None,
        };
        Ok(Self { spec, pattern })
    }

    /// The underlying specification
    #[must_use]
    pub fn spec(&self) -> &PredicateSpec {
        &self.spec
    }

    fn check(
        &self,
        value: Option<&Value>,
        record: &Value,
        context: &ValidationContext,
    ) -> RuleOutcome {
        let value = match value {
            Some(Value::Null) | None => {
                return if matches!(self.spec, PredicateSpec::Required) {
                    RuleOutcome::fail("Value is required")
                } else {
                    // absence is the `required` predicate's concern
                    RuleOutcome::pass()
                };
            }
            Some(value) => value,
        };

        match &self.spec {
            PredicateSpec::Required => RuleOutcome::pass(),
            PredicateSpec::PositiveNumber => match value.as_f64() {
                Some(n) if n > 0.0 => RuleOutcome::pass(),
                Some(n) if n < 0.0 => {
                    RuleOutcome::fail(format!("Value must be positive, got {value}"))
                        .with_fix(number_like(n.abs(), value))
                }
                Some(_) => RuleOutcome::fail("Value must be positive, got 0"),
                None => RuleOutcome::fail(format!("Value must be a number, got {value}")),
            },
            PredicateSpec::NonNegative => match value.as_f64() {
                Some(n) if n >= 0.0 => RuleOutcome::pass(),
                Some(_) => RuleOutcome::fail(format!("Value must not be negative, got {value}"))
                    .with_fix(number_like(0.0, value)),
                None => RuleOutcome::fail(format!("Value must be a number, got {value}")),
            },
            PredicateSpec::Range { min, max } => {
                let Some(n) = value.as_f64() else {
                    return RuleOutcome::fail(format!("Value must be a number, got {value}"));
                };
                if let Some(min) = min {
                    if n < *min {
                        return RuleOutcome::fail(format!(
                            "Value {value} is below the minimum of {min}"
                        ))
                        .with_fix(number_like(*min, value));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return RuleOutcome::fail(format!(
                            "Value {value} is above the maximum of {max}"
                        ))
                        .with_fix(number_like(*max, value));
                    }
                }
                RuleOutcome::pass()
            }
            PredicateSpec::MinLength { min } => match value.as_str() {
                Some(s) if s.chars().count() >= *min => RuleOutcome::pass(),
                Some(_) => RuleOutcome::fail(format!("Value must be at least {min} characters")),
                None => RuleOutcome::fail("Value must be a string"),
            },
            PredicateSpec::MaxLength { max } => match value.as_str() {
                Some(s) if s.chars().count() <= *max => RuleOutcome::pass(),
                Some(s) => RuleOutcome::fail(format!("Value must be at most {max} characters"))
                    .with_fix(Value::String(s.chars().take(*max).collect())),
                None => RuleOutcome::fail("Value must be a string"),
            },
            PredicateSpec::Pattern { pattern } => match (value.as_str(), &self.pattern) {
                (Some(s), Some(re)) if re.is_match(s) => RuleOutcome::pass(),
                (Some(s), _) => {
                    RuleOutcome::fail(format!("Value '{s}' does not match pattern {pattern}"))
                }
                (None, _) => RuleOutcome::fail("Value must be a string"),
            },
            PredicateSpec::OneOf { values } => {
                if values.contains(value) {
                    RuleOutcome::pass()
                } else {
                    RuleOutcome::fail(format!("Value {value} is not one of the allowed values"))
                }
            }
            PredicateSpec::NonEmptyArray => match value.as_array() {
                Some(items) if !items.is_empty() => RuleOutcome::pass(),
                Some(_) => RuleOutcome::fail("At least one entry is required"),
                None => RuleOutcome::fail("Value must be an array"),
            },
            PredicateSpec::IsoDate => match value.as_str().and_then(parse_date) {
                Some(_) => RuleOutcome::pass(),
                None => RuleOutcome::fail(format!("Value {value} is not an ISO 8601 date")),
            },
            PredicateSpec::NotFutureDate => match value.as_str().and_then(parse_date) {
                Some(date) if date <= context.timestamp => RuleOutcome::pass(),
                Some(_) => RuleOutcome::fail(format!("Date {value} lies in the future")),
                None => RuleOutcome::fail(format!("Value {value} is not an ISO 8601 date")),
            },
            PredicateSpec::FieldLessOrEqual { other } => {
                let Some(n) = value.as_f64() else {
                    return RuleOutcome::fail(format!("Value must be a number, got {value}"));
                };
                match json_path::lookup(record, other) {
                    Some(limit) => match limit.as_f64() {
                        Some(bound) if n <= bound => RuleOutcome::pass(),
                        Some(_) => {
                            RuleOutcome::fail(format!("Value {value} exceeds {other} ({limit})"))
                                .with_fix(limit.clone())
                        }
                        None => RuleOutcome::fail(format!("Field {other} is not a number")),
                    },
                    // nothing to compare against
                    None => RuleOutcome::pass(),
                }
            }
        }
    }
}

#[async_trait]
impl RulePredicate for BuiltinPredicate {
    async fn evaluate(
        &self,
        value: Option<&Value>,
        record: &Value,
        context: &ValidationContext,
    ) -> std::result::Result<RuleOutcome, RuleError> {
        Ok(self.check(value, record, context))
    }

    fn describe(&self) -> String {
        serde_json::to_string(&self.spec).unwrap_or_else(|_| format!("{:?}", self.spec))
    }
}

impl fmt::Debug for BuiltinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinPredicate")
            .field("spec", &self.spec)
            .finish()
    }
}

type PredicateResult = std::result::Result<RuleOutcome, RuleError>;

type PredicateFn =
    dyn Fn(Option<&Value>, &Value, &ValidationContext) -> PredicateResult + Send + Sync;

/// Predicate backed by a synchronous closure
pub struct FnPredicate {
    description: String,
    func: Arc<PredicateFn>,
}

impl FnPredicate {
    /// Wrap a closure
    pub fn new<F>(description: impl Into<String>, func: F) -> Self
    where
        F: Fn(Option<&Value>, &Value, &ValidationContext) -> PredicateResult
            + Send
            + Sync
            + 'static,
    {
        Self {
            description: description.into(),
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl RulePredicate for FnPredicate {
    async fn evaluate(
        &self,
        value: Option<&Value>,
        record: &Value,
        context: &ValidationContext,
    ) -> std::result::Result<RuleOutcome, RuleError> {
        (self.func)(value, record, context)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Render `n` as an integer when the original value was an integer
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn number_like(n: f64, original: &Value) -> Value {
    let integral = original.is_i64() || original.is_u64();
    if integral && n.fract() == 0.0 && n.abs() < 9.0e15 {
        return json!(n as i64);
    }
    json!(n)
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
