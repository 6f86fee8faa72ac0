//! Rule execution
//!
//! Runs a dependency-ordered rule list against a record. A rule whose
//! dependency did not pass is skipped; a predicate that errors or panics is
//! recorded as a skip with its cause logged, so one faulty rule never stops
//! the others. Results are written into the caller's [`CustomRuleStage`] as
//! they are produced, which keeps partial results available when the
//! surrounding pipeline times out.

use futures::FutureExt;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};
use validation_core::report::{CustomRuleStage, RuleResult, RuleStatus};
use validation_core::types::ValidationContext;
use validation_core::validation::ValidationSeverity;

use super::ValidationRule;
use crate::json_path;

/// Key used for suggested fixes and touched fields of whole-record rules
const WHOLE_RECORD: &str = "*";

/// Executor for custom validation rules
#[derive(Debug, Clone, Copy)]
pub struct RuleExecutor {
    /// Treat warning-level failures as blocking
    strict: bool,
    /// Blocking failures tolerated before remaining rules are skipped; 0 = no limit
    max_errors: usize,
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new(false, 0)
    }
}

impl RuleExecutor {
    /// Create a new rule executor
    #[must_use]
    pub fn new(strict: bool, max_errors: usize) -> Self {
        Self { strict, max_errors }
    }

    /// Execute `rules`, which must already be in dependency order
    ///
    /// Rules are awaited one at a time in the given order. The executor
    /// yields to the runtime before each rule, so a deadline around the
    /// call can fire even when every predicate completes synchronously.
    pub async fn execute(
        &self,
        rules: &[Arc<ValidationRule>],
        record: &Value,
        context: &ValidationContext,
        stage: &mut CustomRuleStage,
    ) {
        let present: HashSet<&str> = rules.iter().map(|rule| rule.id.as_str()).collect();
        let mut statuses: HashMap<String, RuleStatus> = HashMap::with_capacity(rules.len());
        let mut touched: HashSet<String> = HashSet::new();
        let mut blocking_failures = 0usize;

        for rule in rules {
            tokio::task::yield_now().await;

            if self.max_errors > 0 && blocking_failures >= self.max_errors {
                let reason = format!("Skipped: error budget of {} exhausted", self.max_errors);
                self.record(stage, Self::skipped(rule, reason));
                statuses.insert(rule.id.clone(), RuleStatus::Skipped);
                continue;
            }

            let unmet = rule.dependencies.iter().find(|dependency| {
                present.contains(dependency.as_str())
                    && statuses.get(dependency.as_str()) != Some(&RuleStatus::Passed)
            });
            if let Some(dependency) = unmet {
                debug!(
                    rule_id = %rule.id,
                    dependency = %dependency,
                    "Skipping rule with unmet dependency"
                );
                self.record(
                    stage,
                    Self::skipped(rule, format!("Skipped: dependency '{dependency}' did not pass")),
                );
                statuses.insert(rule.id.clone(), RuleStatus::Skipped);
                continue;
            }

            let value = match rule.target_field() {
                Some(path) => json_path::lookup(record, path),
                None => Some(record),
            };

            let evaluation = AssertUnwindSafe(rule.predicate.evaluate(value, record, context))
                .catch_unwind()
                .await;

            let outcome = match evaluation {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => {
                    warn!(
                        rule_id = %rule.id,
                        error = %err,
                        "Rule predicate failed; recording as skipped"
                    );
                    self.record(stage, Self::skipped(rule, format!("Skipped: {err}")));
                    statuses.insert(rule.id.clone(), RuleStatus::Skipped);
                    continue;
                }
                Err(panic) => {
                    let cause = panic_message(panic.as_ref());
                    warn!(
                        rule_id = %rule.id,
                        cause = %cause,
                        "Rule predicate panicked; recording as skipped"
                    );
                    let reason = format!("Skipped: predicate panicked: {cause}");
                    self.record(stage, Self::skipped(rule, reason));
                    statuses.insert(rule.id.clone(), RuleStatus::Skipped);
                    continue;
                }
            };

            stage.stats.rules_evaluated += 1;
            touched.insert(rule.target_field().unwrap_or(WHOLE_RECORD).to_string());
            stage.stats.fields_touched = touched.len();

            let status = if outcome.passed {
                RuleStatus::Passed
            } else {
                RuleStatus::Failed
            };
            let message = if outcome.passed {
                None
            } else {
                rule.failure_message
                    .clone()
                    .or(outcome.message)
                    .or_else(|| Some(format!("Rule '{}' failed", rule.name)))
            };

            let result = RuleResult {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                field: rule.target_field().map(str::to_string),
                status,
                severity: rule.severity,
                category: rule.category,
                message,
                suggested_fix: outcome.suggested_fix,
            };
            if result.is_blocking(self.strict) {
                blocking_failures += 1;
            }

            debug!(rule_id = %rule.id, ?status, "Evaluated rule");
            statuses.insert(rule.id.clone(), status);
            self.record(stage, result);
        }
    }

    /// Append a result to the stage, updating buckets, fixes and counters
    fn record(&self, stage: &mut CustomRuleStage, result: RuleResult) {
        match result.status {
            RuleStatus::Passed => stage.stats.rules_passed += 1,
            RuleStatus::Skipped => stage.stats.rules_skipped += 1,
            RuleStatus::Failed => {
                stage.stats.rules_failed += 1;
                let text = format!(
                    "{}: {}",
                    result.rule_id,
                    result.message.as_deref().unwrap_or("failed")
                );
                match result.severity {
                    ValidationSeverity::Critical | ValidationSeverity::Error => {
                        stage.errors.push(text);
                    }
                    ValidationSeverity::Warning => stage.warnings.push(text),
                    ValidationSeverity::Info => stage.info.push(text),
                }
                if let Some(fix) = &result.suggested_fix {
                    let key = result.field.as_deref().unwrap_or(WHOLE_RECORD).to_string();
                    stage.suggested_fixes.insert(key, fix.clone());
                }
            }
        }

        if result.is_blocking(self.strict) {
            stage.valid = false;
        }
        stage.results.push(result);
    }

    fn skipped(rule: &ValidationRule, reason: String) -> RuleResult {
        RuleResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            field: rule.target_field().map(str::to_string),
            status: RuleStatus::Skipped,
            severity: rule.severity,
            category: rule.category,
            message: Some(reason),
            suggested_fix: None,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_engine::{DependencyResolver, FnPredicate, RuleError, RuleOutcome};
    use serde_json::json;
    use validation_core::types::{ContextType, PredicateSpec, RuleSpec};

    fn spec_rule(spec: RuleSpec) -> Arc<ValidationRule> {
        Arc::new(ValidationRule::from_spec(spec).expect("valid spec"))
    }

    async fn run(
        rules: Vec<Arc<ValidationRule>>,
        record: Value,
        executor: RuleExecutor,
    ) -> CustomRuleStage {
        let ordered = DependencyResolver::new().resolve(&rules).expect("acyclic");
        let context = ValidationContext::new(ContextType::UserInput);
        let mut stage = CustomRuleStage::default();
        executor.execute(&ordered, &record, &context, &mut stage).await;
        stage
    }

    #[tokio::test]
    async fn test_failed_dependency_skips_dependent() {
        let rules = vec![
            spec_rule(RuleSpec::new("cost-positive", Some("cost"), PredicateSpec::PositiveNumber)),
            spec_rule(
                RuleSpec::new(
                    "cost-cap",
                    Some("cost"),
                    PredicateSpec::Range {
                        min: None,
                        max: Some(1e6),
                    },
                )
                .depends_on("cost-positive"),
            ),
        ];
        let stage = run(rules, json!({ "cost": -5 }), RuleExecutor::default()).await;

        assert!(!stage.valid);
        assert_eq!(stage.stats.rules_failed, 1);
        assert_eq!(stage.stats.rules_skipped, 1);
        assert_eq!(stage.stats.rules_evaluated, 1);
        assert_eq!(stage.results[1].status, RuleStatus::Skipped);
        assert_eq!(stage.suggested_fixes.get("cost"), Some(&json!(5)));
        assert_eq!(stage.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_erroring_predicate_is_skipped_and_others_run() {
        let failing = ValidationRule::new(
            "lookup",
            FnPredicate::new("always errors", |_, _, _| {
                Err(RuleError::Lookup("registry unreachable".to_string()))
            }),
        );
        let panicking = ValidationRule::new(
            "boom",
            FnPredicate::new("always panics", |_, _, _| panic!("predicate bug")),
        );
        let fine = ValidationRule::new(
            "fine",
            FnPredicate::new("always passes", |_, _, _| Ok(RuleOutcome::pass())),
        );

        let stage = run(
            vec![Arc::new(failing), Arc::new(panicking), Arc::new(fine)],
            json!({}),
            RuleExecutor::default(),
        )
        .await;

        assert!(stage.valid);
        assert_eq!(stage.stats.rules_skipped, 2);
        assert_eq!(stage.stats.rules_passed, 1);
        let reason = stage.results[1].message.clone().unwrap_or_default();
        assert!(reason.contains("predicate bug"));
    }

    #[tokio::test]
    async fn test_warnings_block_only_in_strict_mode() {
        let rule = || {
            spec_rule(
                RuleSpec::new(
                    "tilt",
                    Some("tilt"),
                    PredicateSpec::Range {
                        min: Some(0.0),
                        max: Some(60.0),
                    },
                )
                .with_severity(ValidationSeverity::Warning),
            )
        };
        let lenient = run(vec![rule()], json!({ "tilt": 75 }), RuleExecutor::new(false, 0)).await;
        assert!(lenient.valid);
        assert_eq!(lenient.warnings.len(), 1);

        let strict = run(vec![rule()], json!({ "tilt": 75 }), RuleExecutor::new(true, 0)).await;
        assert!(!strict.valid);
    }

    #[tokio::test]
    async fn test_error_budget_skips_remaining_rules() {
        let rules = (0..4)
            .map(|i| {
                spec_rule(RuleSpec::new(format!("r{i}"), Some("x"), PredicateSpec::PositiveNumber))
            })
            .collect();
        let stage = run(rules, json!({ "x": -1 }), RuleExecutor::new(false, 2)).await;
        assert_eq!(stage.stats.rules_failed, 2);
        assert_eq!(stage.stats.rules_skipped, 2);
    }

    #[tokio::test]
    async fn test_fields_touched_counts_distinct_paths() {
        let rules = vec![
            spec_rule(RuleSpec::new("a", Some("wattage"), PredicateSpec::Required)),
            spec_rule(RuleSpec::new("b", Some("wattage"), PredicateSpec::PositiveNumber)),
            spec_rule(RuleSpec::new("c", Some("voltage"), PredicateSpec::PositiveNumber)),
        ];
        let record = json!({ "wattage": 400, "voltage": 40 });
        let stage = run(rules, record, RuleExecutor::default()).await;
        assert!(stage.valid);
        assert_eq!(stage.stats.rules_passed, 3);
        assert_eq!(stage.stats.fields_touched, 2);
    }

    #[tokio::test]
    async fn test_deadline_interrupts_synchronous_rules() {
        let rules: Vec<Arc<ValidationRule>> = (0..50)
            .map(|i| spec_rule(RuleSpec::new(format!("r{i}"), Some("x"), PredicateSpec::Required)))
            .collect();
        let context = ValidationContext::new(ContextType::UserInput);
        let record = json!({ "x": 1 });
        let mut stage = CustomRuleStage::default();

        let outcome = tokio::time::timeout(
            std::time::Duration::ZERO,
            RuleExecutor::default().execute(&rules, &record, &context, &mut stage),
        )
        .await;

        assert!(outcome.is_err());
        assert!(stage.results.len() < rules.len());
    }
}
