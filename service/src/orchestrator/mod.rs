//! Validation orchestrator
//!
//! The single entry point of the engine. A request passes through
//!
//! ```text
//! received -> cache check -> preprocessing -> schema stage -> custom-rule stage
//!          -> cross-validation stage -> aggregation -> cache write -> metrics
//! ```
//!
//! and always comes back as a [`ValidationResult`]: internal failures are
//! folded into a critical diagnostic, and a request that runs out of time
//! returns the stage results gathered so far with status `timeout`.

pub mod preprocess;
mod recommendations;

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use validation_core::configuration::EngineConfig;
use validation_core::error::{Result, SolarValidationError};
use validation_core::report::{ResultStatus, StageResults, ValidationMetrics, ValidationResult};
use validation_core::types::{ContextType, CustomRuleRef, ValidationRequest};
use validation_core::validation::{Diagnostic, ValidationSeverity};

use crate::cache::{ValidationCache, cache_key};
use crate::cross_validation::CrossValidationEngine;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::rule_engine::{DependencyResolver, RuleExecutor, RuleRegistry, ValidationRule};
use crate::schema::{SchemaRegistry, SchemaValidator};

/// Diagnostic code for a registered rule id that is not in the registry
pub const RULE_NOT_FOUND: &str = "rule_not_found";

/// Diagnostic code for an inline rule that could not be built
pub const INVALID_RULE: &str = "invalid_rule";

/// Validation orchestrator
///
/// Construct once and share; `validate` takes `&self` and may be called
/// from concurrent tasks.
#[derive(Debug)]
pub struct Orchestrator {
    rules: Arc<RuleRegistry>,
    schemas: SchemaValidator,
    cross: CrossValidationEngine,
    resolver: DependencyResolver,
    cache: ValidationCache,
    metrics: MetricsCollector,
    config: EngineConfig,
}

/// Mutable state threaded through the stages
///
/// Lives outside the timed future so that whatever was gathered before a
/// timeout is still available afterwards.
#[derive(Debug, Default)]
struct Progress {
    stages: StageResults,
    metrics: ValidationMetrics,
    diagnostics: Vec<Diagnostic>,
}

impl Orchestrator {
    /// Create an orchestrator over the given registries
    #[must_use]
    pub fn new(
        rules: Arc<RuleRegistry>,
        schemas: Arc<SchemaRegistry>,
        config: EngineConfig,
    ) -> Self {
        info!(
            rules = rules.len(),
            schemas = schemas.len(),
            cache_entries = config.cache.max_entries,
            "Validation orchestrator initialized"
        );
        Self {
            rules,
            schemas: SchemaValidator::new(schemas),
            cross: CrossValidationEngine::new(config.cross_validation.clone()),
            resolver: DependencyResolver::new(),
            cache: ValidationCache::new(config.cache.max_entries),
            metrics: MetricsCollector::new(),
            config,
        }
    }

    /// Engine configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rule registry
    #[must_use]
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Result cache
    #[must_use]
    pub fn cache(&self) -> &ValidationCache {
        &self.cache
    }

    /// Remove every cached result
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Current process-wide metrics
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Zero the process-wide metrics
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Validate a request
    ///
    /// Never fails: every outcome, including internal errors and timeouts,
    /// is reported through the returned result.
    #[instrument(
        skip_all,
        fields(
            request_id = %request.id,
            category = %request.category,
            context = %request.context.context_type
        )
    )]
    pub async fn validate(&self, mut request: ValidationRequest) -> ValidationResult {
        let started = Instant::now();
        debug!("Validation request received");
        request.config.apply_defaults(&self.config.defaults);

        // Batch jobs and clock-dependent monitoring verdicts are never cached
        let caching = self.config.cache.enabled
            && request.config.enable_caching
            && !matches!(
                request.context.context_type,
                ContextType::BatchProcessing | ContextType::RealTimeMonitoring
            );

        if let Err(err) = preprocess::authenticate(&request, &self.config.preprocessing) {
            warn!(error = %err, "Rejecting unauthenticated request");
            let mut result = ValidationResult::empty(request.id.clone());
            result.diagnostics.push(Diagnostic::critical(&err));
            return self.finish(&request, result, started, caching, None);
        }

        let key = if caching { cache_key(&request) } else { None };
        if let Some(key) = &key {
            if let Some(mut cached) = self.cache.get(key) {
                debug!("Serving cached result");
                cached.request_id.clone_from(&request.id);
                cached.timestamp = Utc::now();
                cached.duration_us = elapsed_us(started);
                cached.status = ResultStatus::CacheHit;
                cached.metrics.cache_hit = true;
                if request.config.enable_metrics {
                    self.metrics.record(request.category, cached.status, &cached.metrics);
                }
                return cached;
            }
        }

        let mut progress = Progress::default();
        let timeout_ms = request.config.timeout_ms_or(&self.config.defaults);
        let budget = Duration::from_millis(timeout_ms);
        let pipeline =
            tokio::time::timeout(budget, self.run_pipeline(&request, &mut progress)).await;

        let mut result = ValidationResult::empty(request.id.clone());
        let timed_out = match pipeline {
            // A pipeline that never suspended can finish past its deadline
            Ok(Ok(())) => started.elapsed() > budget,
            Ok(Err(err)) => {
                error!(error = %err, "Validation pipeline failed");
                progress.diagnostics.push(Diagnostic::critical(&err));
                false
            }
            Err(_) => true,
        };
        if timed_out {
            let err = SolarValidationError::Timeout(timeout_ms);
            warn!(timeout_ms, "Validation timed out; returning partial results");
            progress
                .diagnostics
                .push(Diagnostic::new(err.code(), ValidationSeverity::Error, err.to_string()));
        }

        result.results = progress.stages;
        result.diagnostics = progress.diagnostics;
        result.metrics = progress.metrics;
        result.metrics.rules = result.results.custom.stats;
        if timed_out {
            result.status = ResultStatus::Timeout;
        }

        self.finish(&request, result, started, caching, key)
    }

    /// Aggregate, recommend, cache and record metrics
    fn finish(
        &self,
        request: &ValidationRequest,
        mut result: ValidationResult,
        started: Instant,
        caching: bool,
        key: Option<String>,
    ) -> ValidationResult {
        let strict = request.config.strict_mode;
        let blocking_diagnostic = result
            .diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity.is_blocking(strict));
        result.overall_valid = result.results.all_passing() && !blocking_diagnostic;

        if result.status == ResultStatus::Timeout {
            result.overall_valid = false;
        } else if !result.overall_valid {
            result.status = ResultStatus::Error;
        } else if result.summary().warning_count > 0 {
            result.status = ResultStatus::Warning;
        } else {
            result.status = ResultStatus::Success;
        }

        result.timestamp = Utc::now();
        result.duration_us = elapsed_us(started);

        let rules = &request.rules;
        let nothing_requested = rules.schemas.is_empty()
            && rules.custom_rules.is_empty()
            && rules.cross_validations.is_empty();
        result.recommendations = recommendations::recommend(
            &result,
            caching,
            nothing_requested,
            &self.config.recommendations,
        );

        if let Some(key) = key {
            let stored = self.cache.put(key, &result);
            debug!(stored, "Cache write");
        }

        if request.config.enable_metrics {
            self.metrics.record(request.category, result.status, &result.metrics);
        }

        info!(
            status = ?result.status,
            valid = result.overall_valid,
            duration_us = result.duration_us,
            "Validation complete"
        );
        result
    }

    /// Preprocess and run the three stages in order
    async fn run_pipeline(
        &self,
        request: &ValidationRequest,
        progress: &mut Progress,
    ) -> Result<()> {
        let stage_start = Instant::now();
        let prepared = preprocess::prepare(request, &self.config.preprocessing);
        progress.diagnostics.extend(prepared.diagnostics);
        let payload: &Value = &prepared.payload;
        progress.metrics.preprocessing_us = elapsed_us(stage_start);

        let strict = request.config.strict_mode;
        let context_type = request.context.context_type;

        let stage_start = Instant::now();
        for name in &request.rules.schemas {
            progress
                .stages
                .schema
                .push(self.schemas.validate(name, payload, context_type, strict));
            tokio::task::yield_now().await;
        }
        progress.metrics.schema_us = elapsed_us(stage_start);
        debug!(
            schemas = request.rules.schemas.len(),
            elapsed_us = progress.metrics.schema_us,
            "Schema stage done"
        );

        let stage_start = Instant::now();
        let rules = self.collect_rules(request, &mut progress.diagnostics);
        let ordered = self.resolver.resolve(&rules)?;
        RuleExecutor::new(strict, request.config.max_errors_or(&self.config.defaults))
            .execute(&ordered, payload, &request.context, &mut progress.stages.custom)
            .await;
        progress.metrics.custom_rules_us = elapsed_us(stage_start);
        debug!(
            rules = ordered.len(),
            elapsed_us = progress.metrics.custom_rules_us,
            "Custom-rule stage done"
        );
        tokio::task::yield_now().await;

        let stage_start = Instant::now();
        let strict_cross = request
            .config
            .strict_cross_validation
            .unwrap_or(self.config.cross_validation.strict_unknown_rules);
        progress.stages.cross = self
            .cross
            .validate(&request.rules.cross_validations, payload, strict_cross);
        progress.metrics.cross_validation_us = elapsed_us(stage_start);
        debug!(
            rules = request.rules.cross_validations.len(),
            elapsed_us = progress.metrics.cross_validation_us,
            "Cross-validation stage done"
        );

        Ok(())
    }

    /// Resolve the request's custom rule references
    ///
    /// Unknown ids and unbuildable inline rules become error diagnostics.
    fn collect_rules(
        &self,
        request: &ValidationRequest,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Arc<ValidationRule>> {
        let mut rules = Vec::with_capacity(request.rules.custom_rules.len());
        for reference in &request.rules.custom_rules {
            match reference {
                CustomRuleRef::Registered { id } => match self.rules.get(id) {
                    Some(rule) => rules.push(rule),
                    None => diagnostics.push(Diagnostic::new(
                        RULE_NOT_FOUND,
                        ValidationSeverity::Error,
                        format!("Rule '{id}' is not registered"),
                    )),
                },
                CustomRuleRef::Inline(spec) => match ValidationRule::from_spec(spec.clone()) {
                    Ok(rule) => rules.push(Arc::new(rule)),
                    Err(err) => diagnostics.push(Diagnostic::new(
                        INVALID_RULE,
                        ValidationSeverity::Error,
                        format!("Inline rule '{}' is invalid: {err}", spec.id),
                    )),
                },
            }
        }
        rules
    }
}

fn elapsed_us(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use validation_core::report::RuleStatus;
    use validation_core::types::{PredicateSpec, RecordCategory, RuleSpec, ValidationContext};

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(RuleRegistry::new()),
            Arc::new(SchemaRegistry::new()),
            EngineConfig::testing(),
        )
    }

    #[tokio::test]
    async fn test_empty_request_succeeds_with_recommendation() {
        let request = ValidationRequest::new(
            ValidationContext::new(ContextType::UserInput),
            RecordCategory::Project,
            json!({}),
        );
        let result = orchestrator().validate(request).await;
        assert!(result.overall_valid);
        assert_eq!(result.status, ResultStatus::Success);
        assert!(!result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_registered_rule_invalidates() {
        let request = ValidationRequest::new(
            ValidationContext::new(ContextType::UserInput),
            RecordCategory::Project,
            json!({}),
        )
        .with_registered_rule("nope");
        let result = orchestrator().validate(request).await;
        assert!(!result.overall_valid);
        assert_eq!(result.status, ResultStatus::Error);
        assert_eq!(result.diagnostics[0].code, RULE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_warning_status() {
        let request = ValidationRequest::new(
            ValidationContext::new(ContextType::UserInput),
            RecordCategory::EquipmentSpec,
            json!({ "tilt": 75 }),
        )
        .with_rule(CustomRuleRef::Inline(
            RuleSpec::new(
                "tilt",
                Some("tilt"),
                PredicateSpec::Range {
                    min: Some(0.0),
                    max: Some(60.0),
                },
            )
            .with_severity(ValidationSeverity::Warning),
        ));
        let result = orchestrator().validate(request).await;
        assert!(result.overall_valid);
        assert_eq!(result.status, ResultStatus::Warning);
    }

    #[tokio::test]
    async fn test_metrics_recorded_only_when_enabled() {
        let engine = orchestrator();
        let base = ValidationRequest::new(
            ValidationContext::new(ContextType::BatchProcessing),
            RecordCategory::SensorReading,
            json!({}),
        );

        engine.validate(base.clone()).await;
        let mut quiet = base;
        quiet.config.enable_metrics = false;
        engine.validate(quiet).await;

        let snapshot = engine.metrics();
        assert_eq!(snapshot.requests, 1);
        assert_eq!(snapshot.by_category.get("sensor_reading"), Some(&1));

        engine.reset_metrics();
        assert_eq!(engine.metrics().requests, 0);
    }

    #[tokio::test]
    async fn test_engine_defaults_reach_deserialized_requests()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut config = EngineConfig::testing();
        config.defaults.max_errors = 1;
        let engine = Orchestrator::new(
            Arc::new(RuleRegistry::new()),
            Arc::new(SchemaRegistry::new()),
            config,
        );

        let request: ValidationRequest = serde_json::from_value(json!({
            "context": { "type": "user_input" },
            "category": "project",
            "data": { "payload": { "cost": -5, "fee": -1 } },
            "rules": { "custom_rules": [
                {
                    "kind": "inline", "id": "cost", "field": "cost",
                    "predicate": { "type": "positive_number" }
                },
                {
                    "kind": "inline", "id": "fee", "field": "fee",
                    "predicate": { "type": "positive_number" }
                }
            ] }
        }))?;
        assert_eq!(request.config.max_errors, None);

        let result = engine.validate(request).await;
        let custom = &result.results.custom;
        assert_eq!(custom.results[0].status, RuleStatus::Failed);
        assert_eq!(custom.results[1].status, RuleStatus::Skipped);
        assert_eq!(custom.stats.rules_skipped, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_monitoring_results_are_not_cached() {
        let engine = orchestrator();
        let reading = || {
            ValidationRequest::new(
                ValidationContext::new(ContextType::RealTimeMonitoring),
                RecordCategory::SensorReading,
                json!({ "timestamp": Utc::now().to_rfc3339(), "power_kw": 3.1 }),
            )
        };

        assert_eq!(engine.validate(reading()).await.status, ResultStatus::Success);
        assert_eq!(engine.validate(reading()).await.status, ResultStatus::Success);
        assert!(engine.cache().is_empty());
    }
}
