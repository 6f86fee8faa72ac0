//! Engine configuration
//!
//! Every threshold the engine uses is externalized here; the per-request
//! [`RequestConfig`](crate::types::RequestConfig) takes its defaults from
//! the `defaults` section.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, SolarValidationError};

/// Main engine configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Result cache configuration
    pub cache: CacheConfig,

    /// Context-specific preprocessing
    pub preprocessing: PreprocessingConfig,

    /// Cross-validation thresholds and policy
    pub cross_validation: CrossValidationConfig,

    /// Request defaults
    pub defaults: RequestDefaults,

    /// Recommendation heuristics
    pub recommendations: RecommendationConfig,
}

/// Result cache configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether requests cache by default
    pub enabled: bool,

    /// Maximum cached results; the oldest entry is evicted beyond this
    pub max_entries: usize,
}

/// Preprocessing configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Monitoring payloads older than this are marked stale
    #[serde(with = "humantime_serde")]
    pub freshness_window: Duration,

    /// Payload field holding the reading timestamp
    pub timestamp_field: String,

    /// Metadata key that must carry a token for `api_request` contexts
    pub auth_metadata_key: String,
}

/// Cross-validation configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    /// Fail unknown rule names instead of passing them
    pub strict_unknown_rules: bool,

    /// Absolute tolerance when comparing monetary sums
    pub sum_tolerance: f64,

    /// Lowest plausible annual yield in kWh per installed kW
    pub min_specific_yield: f64,

    /// Highest plausible annual yield in kWh per installed kW
    pub max_specific_yield: f64,

    /// Lowest acceptable DC/AC ratio
    pub min_dc_ac_ratio: f64,

    /// Highest acceptable DC/AC ratio
    pub max_dc_ac_ratio: f64,
}

/// Defaults applied to requests that don't override them
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestDefaults {
    /// Pipeline time budget in milliseconds
    pub timeout_ms: u64,

    /// Blocking custom-rule failures tolerated before the rest are skipped
    pub max_errors: usize,
}

/// Recommendation heuristics
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Validations slower than this suggest enabling caching
    pub slow_validation_ms: u64,

    /// Records with at least this many findings suggest reviewing the source
    pub high_issue_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
        }
    }
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(300),
            timestamp_field: String::from("timestamp"),
            auth_metadata_key: String::from("auth_token"),
        }
    }
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            strict_unknown_rules: false,
            sum_tolerance: 0.01,
            min_specific_yield: 800.0,
            max_specific_yield: 2000.0,
            min_dc_ac_ratio: 0.8,
            max_dc_ac_ratio: 1.5,
        }
    }
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_errors: 100,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            slow_validation_ms: 1000,
            high_issue_count: 10,
        }
    }
}

impl EngineConfig {
    /// Check the configuration for values the engine cannot work with
    ///
    /// # Errors
    ///
    /// Returns `SolarValidationError::ConfigError` naming the first bad value
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(SolarValidationError::config(
                "cache.max_entries must be greater than zero",
            ));
        }
        if self.defaults.timeout_ms == 0 {
            return Err(SolarValidationError::config(
                "defaults.timeout_ms must be greater than zero",
            ));
        }
        if self.preprocessing.auth_metadata_key.is_empty() {
            return Err(SolarValidationError::config(
                "preprocessing.auth_metadata_key must not be empty",
            ));
        }

        let cross = &self.cross_validation;
        if cross.sum_tolerance < 0.0 {
            return Err(SolarValidationError::config(
                "cross_validation.sum_tolerance must not be negative",
            ));
        }
        if cross.min_specific_yield > cross.max_specific_yield {
            return Err(SolarValidationError::config(format!(
                "cross_validation yield band is inverted ({} > {})",
                cross.min_specific_yield, cross.max_specific_yield
            )));
        }
        if cross.min_dc_ac_ratio > cross.max_dc_ac_ratio {
            return Err(SolarValidationError::config(format!(
                "cross_validation DC/AC ratio band is inverted ({} > {})",
                cross.min_dc_ac_ratio, cross.max_dc_ac_ratio
            )));
        }

        Ok(())
    }

    /// Development environment configuration
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.cache.max_entries = 100;
        config.cross_validation.strict_unknown_rules = true;
        config.recommendations.slow_validation_ms = 250;
        config
    }

    /// Testing environment configuration
    #[must_use]
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.cache.max_entries = 10;
        config.defaults.timeout_ms = 1000;
        config
    }

    /// Production environment configuration
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.cache.max_entries = 10_000;
        config.defaults.timeout_ms = 2000;
        config
    }
}
