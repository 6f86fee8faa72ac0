//! Configuration loading for the validation engine
//!
//! This module provides configuration loading from YAML files with
//! environment variable substitution support.

use serde::Deserialize;
use std::env;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;
use validation_core::configuration::EngineConfig;
use validation_core::error::{Result, SolarValidationError};
use validation_core::types::RuleSpec;

use crate::rule_engine::RuleRegistry;

/// `${VAR}` or `${VAR:-default}`
static ENV_VAR_PATTERN: LazyLock<Option<regex::Regex>> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}:]+)(?::(-)?([^}]*))?\}").ok());

/// Load configuration from a `YAML` file with environment variable substitution
///
/// # Errors
///
/// Returns `SolarValidationError::IoError` if the file cannot be read
/// Returns `SolarValidationError::ConfigError` if the YAML cannot be parsed
pub fn load_config<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    let substituted = substitute_env_vars(&contents);

    serde_yaml::from_str(&substituted).map_err(|e| {
        SolarValidationError::config(format!(
            "Failed to parse YAML config {}: {e}",
            path.display()
        ))
    })
}

/// Load and check an engine configuration file
///
/// Sections missing from the file take their defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if
/// [`EngineConfig::validate`] rejects it
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let config: EngineConfig = load_config(path)?;
    config.validate()?;
    debug!(path = %path.display(), "Loaded engine configuration");
    Ok(config)
}

/// Load a YAML list of rule specifications into a registry
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a predicate cannot
/// be built, or a rule id repeats
pub fn load_rule_registry(path: &Path) -> Result<RuleRegistry> {
    let specs: Vec<RuleSpec> = load_config(path)?;
    let registry = RuleRegistry::from_specs(specs)?;
    debug!(path = %path.display(), rules = registry.len(), "Loaded rule definitions");
    Ok(registry)
}

/// Substitute environment variables in the format `${VAR:-default}`
///
/// Unset variables without a default become the empty string.
fn substitute_env_vars(content: &str) -> String {
    let Some(re) = ENV_VAR_PATTERN.as_ref() else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default_value = caps.get(3).map_or("", |m| m.as_str());

        env::var(var_name).unwrap_or_else(|_| default_value.to_string())
    })
    .to_string()
}
