//! Loading configuration, rules and schemas from disk

use pretty_assertions::assert_eq;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use validation_service::cli::{self, Cli, OutputFormat, Preset};
use validation_service::config::{load_engine_config, load_rule_registry};
use validation_service::prelude::*;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[test]
fn engine_config_with_env_defaults() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("engine.yaml");
    fs::write(
        &path,
        r"
cache:
  max_entries: ${SOLAR_VALIDATION_TEST_UNSET_CACHE:-42}
preprocessing:
  freshness_window: 90s
  auth_metadata_key: api_key
cross_validation:
  strict_unknown_rules: true
",
    )?;

    let config = load_engine_config(&path)?;
    assert_eq!(config.cache.max_entries, 42);
    assert_eq!(config.preprocessing.freshness_window, Duration::from_secs(90));
    assert_eq!(config.preprocessing.auth_metadata_key, "api_key");
    assert!(config.cross_validation.strict_unknown_rules);
    assert_eq!(config.defaults, EngineConfig::default().defaults);
    Ok(())
}

#[test]
fn invalid_engine_config_is_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("engine.yaml");
    fs::write(&path, "cache:\n  max_entries: 0\n")?;

    let err = load_engine_config(&path).unwrap_err();
    assert!(matches!(err, SolarValidationError::ConfigError(_)));
    assert!(err.to_string().contains("max_entries"));

    let missing = load_engine_config(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(missing, SolarValidationError::IoError(_)));
    Ok(())
}

#[test]
fn rule_definitions_load_into_a_registry() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("rules.yaml");
    fs::write(
        &path,
        r#"
- id: wattage-present
  field: wattage
  category: integrity
  predicate: { type: required }
- id: wattage-range
  field: wattage
  severity: warning
  dependencies: [wattage-present]
  predicate: { type: range, min: 50, max: 800 }
- id: model-format
  field: model
  category: format
  predicate: { type: pattern, pattern: "^[A-Z0-9-]+$" }
"#,
    )?;

    let registry = load_rule_registry(&path)?;
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.for_field("wattage").len(), 2);
    assert_eq!(
        registry.get("wattage-range").map(|rule| rule.severity),
        Some(ValidationSeverity::Warning)
    );
    Ok(())
}

#[test]
fn duplicate_rule_ids_fail_loading() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("rules.yaml");
    fs::write(
        &path,
        concat!(
            "- { id: a, predicate: { type: required } }\n",
            "- { id: a, predicate: { type: non_empty_array } }\n",
        ),
    )?;
    assert!(matches!(
        load_rule_registry(&path),
        Err(SolarValidationError::DuplicateRule(id)) if id == "a"
    ));
    Ok(())
}

#[tokio::test]
async fn cli_validates_a_request_file() -> TestResult {
    let dir = TempDir::new()?;
    let schemas = dir.path().join("schemas");
    fs::create_dir(&schemas)?;
    fs::write(
        schemas.join("inverter.yaml"),
        "name: inverter\nfields:\n  capacity_kw: { type: number, required: true, minimum: 0 }\n",
    )?;

    let request_path = dir.path().join("request.json");
    let write_request = |payload: &str| {
        fs::write(
            &request_path,
            format!(
                r#"{{
                    "context": {{ "type": "user_input" }},
                    "category": "equipment_spec",
                    "data": {{ "payload": {payload} }},
                    "rules": {{ "schemas": ["inverter"] }}
                }}"#
            ),
        )
    };

    let cli_for = |path: &std::path::Path| Cli {
        request: path.to_path_buf(),
        config: None,
        preset: Preset::Testing,
        schemas: Some(schemas.clone()),
        rules: None,
        format: OutputFormat::Summary,
        verbose: 0,
    };

    write_request(r#"{ "capacity_kw": 7.6 }"#)?;
    assert!(cli::run(cli_for(&request_path)).await?);

    write_request(r#"{ "capacity_kw": -1 }"#)?;
    assert!(!cli::run(cli_for(&request_path)).await?);
    Ok(())
}
