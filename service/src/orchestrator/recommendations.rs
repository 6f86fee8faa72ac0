//! Advisory recommendations derived from a finished result

use validation_core::configuration::RecommendationConfig;
use validation_core::report::{Recommendation, RecommendationKind, ResultStatus, ValidationResult};

/// Build recommendations for `result`
///
/// Recommendations never affect validity.
pub(crate) fn recommend(
    result: &ValidationResult,
    caching_enabled: bool,
    no_rules_requested: bool,
    config: &RecommendationConfig,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let elapsed_ms = result.duration_us / 1000;

    if result.status == ResultStatus::Timeout {
        recommendations.push(Recommendation::new(
            RecommendationKind::Performance,
            "Validation exceeded its time budget; raise timeout_ms or enable caching",
        ));
    } else if elapsed_ms >= config.slow_validation_ms && !caching_enabled {
        recommendations.push(Recommendation::new(
            RecommendationKind::Performance,
            format!("Validation took {elapsed_ms} ms; consider enabling caching"),
        ));
    }

    let fixes = result.results.custom.suggested_fixes.len();
    if fixes > 0 {
        recommendations.push(Recommendation::new(
            RecommendationKind::DataQuality,
            format!("{fixes} suggested fix(es) available; review them before resubmitting"),
        ));
    }

    let issues = result.summary().total();
    if issues >= config.high_issue_count {
        recommendations.push(Recommendation::new(
            RecommendationKind::DataQuality,
            format!("Record has {issues} findings; check the data source"),
        ));
    }

    let skipped = result.metrics.rules.rules_skipped;
    if skipped > 0 {
        recommendations.push(Recommendation::new(
            RecommendationKind::RuleCoverage,
            format!("{skipped} rule(s) were skipped; fix failing prerequisites to run them"),
        ));
    }

    for unknown in result.results.cross.iter().filter(|c| !c.known) {
        recommendations.push(Recommendation::new(
            RecommendationKind::Configuration,
            format!("Unknown cross-validation rule '{}'; check the name", unknown.rule),
        ));
    }

    if no_rules_requested {
        recommendations.push(Recommendation::new(
            RecommendationKind::Configuration,
            "No schemas or rules were requested; nothing was validated",
        ));
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slow_validation_suggests_caching() {
        let config = RecommendationConfig::default();
        let mut result = ValidationResult::empty("req");
        result.duration_us = (config.slow_validation_ms + 5) * 1000;

        let without_cache = recommend(&result, false, false, &config);
        assert_eq!(without_cache.len(), 1);
        assert_eq!(without_cache[0].kind, RecommendationKind::Performance);

        assert!(recommend(&result, true, false, &config).is_empty());
    }

    #[test]
    fn test_fixes_and_skips() {
        let mut result = ValidationResult::empty("req");
        result.results.custom.suggested_fixes.insert("cost".to_string(), json!(5));
        result.metrics.rules.rules_skipped = 2;

        let kinds: Vec<_> = recommend(&result, true, false, &RecommendationConfig::default())
            .into_iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![RecommendationKind::DataQuality, RecommendationKind::RuleCoverage]
        );
    }
}
