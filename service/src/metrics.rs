//! Process-wide validation metrics

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use validation_core::report::{ResultStatus, ValidationMetrics};
use validation_core::types::RecordCategory;

/// Counters accumulated across requests
///
/// Lock-free; safe to update from concurrent requests.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    cache_hits: AtomicU64,
    stage_time_us: AtomicU64,
    by_category: DashMap<RecordCategory, u64>,
}

/// Point-in-time copy of the collector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Requests recorded
    pub requests: u64,
    /// Requests with status `success` or `warning`
    pub successes: u64,
    /// Requests with status `error`
    pub failures: u64,
    /// Requests with status `timeout`
    pub timeouts: u64,
    /// Requests served from the cache
    pub cache_hits: u64,
    /// Cumulative time spent in preprocessing and the three stages
    pub stage_time_us: u64,
    /// Requests per record category
    pub by_category: BTreeMap<String, u64>,
}

impl MetricsCollector {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished request
    pub fn record(
        &self,
        category: RecordCategory,
        status: ResultStatus,
        metrics: &ValidationMetrics,
    ) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            ResultStatus::Success | ResultStatus::Warning => &self.successes,
            ResultStatus::Error => &self.failures,
            ResultStatus::Timeout => &self.timeouts,
            ResultStatus::CacheHit => &self.cache_hits,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let stage_time = metrics.preprocessing_us
            + metrics.schema_us
            + metrics.custom_rules_us
            + metrics.cross_validation_us;
        self.stage_time_us.fetch_add(stage_time, Ordering::Relaxed);

        *self.by_category.entry(category).or_insert(0) += 1;
    }

    /// Copy the current counters
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            stage_time_us: self.stage_time_us.load(Ordering::Relaxed),
            by_category: self
                .by_category
                .iter()
                .map(|entry| (entry.key().to_string(), *entry.value()))
                .collect(),
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.requests,
            &self.successes,
            &self.failures,
            &self.timeouts,
            &self.cache_hits,
            &self.stage_time_us,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.by_category.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_reset() {
        let collector = MetricsCollector::new();
        let metrics = ValidationMetrics {
            schema_us: 40,
            custom_rules_us: 60,
            ..Default::default()
        };

        collector.record(RecordCategory::EquipmentSpec, ResultStatus::Success, &metrics);
        collector.record(RecordCategory::EquipmentSpec, ResultStatus::Error, &metrics);
        collector.record(
            RecordCategory::SensorReading,
            ResultStatus::CacheHit,
            &ValidationMetrics::default(),
        );

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.requests, 3);
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.stage_time_us, 200);
        assert_eq!(snapshot.by_category.get("equipment_spec"), Some(&2));

        collector.reset();
        assert_eq!(collector.snapshot(), MetricsSnapshot::default());
    }
}
