//! `solar-validate` command-line interface
//!
//! Validates a single request file against schemas and rules loaded from
//! disk and prints the result.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use validation_core::configuration::EngineConfig;
use validation_core::report::ValidationResult;
use validation_core::types::ValidationRequest;

use crate::config::{load_engine_config, load_rule_registry};
use crate::orchestrator::Orchestrator;
use crate::rule_engine::RuleRegistry;
use crate::schema::SchemaRegistry;
use crate::telemetry;

/// Validate solar marketplace records
#[derive(Parser, Debug)]
#[command(name = "solar-validate", version, about = "Validate solar marketplace records")]
pub struct Cli {
    /// Request file (JSON, or YAML by extension)
    pub request: PathBuf,

    /// Engine configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Built-in configuration preset, used when no file is given
    #[arg(long, value_enum, default_value = "production")]
    pub preset: Preset,

    /// Directory of schema definitions
    #[arg(short, long)]
    pub schemas: Option<PathBuf>,

    /// YAML list of rule definitions to register
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Configuration presets
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Preset {
    /// Small cache, strict unknown cross rules
    Development,
    /// Tiny cache, short timeout
    Testing,
    /// Large cache
    Production,
}

/// Output formats
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON result
    Json,
    /// One line per finding
    Summary,
}

/// Parse arguments, validate the request and print the result
///
/// Returns whether the record was valid.
///
/// # Errors
///
/// Returns an error if configuration, schemas, rules or the request cannot
/// be loaded
pub async fn run(cli: Cli) -> Result<bool> {
    telemetry::init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_engine_config(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => match cli.preset {
            Preset::Development => EngineConfig::development(),
            Preset::Testing => EngineConfig::testing(),
            Preset::Production => EngineConfig::production(),
        },
    };

    let mut schemas = SchemaRegistry::new();
    if let Some(dir) = &cli.schemas {
        schemas
            .load_dir(dir)
            .with_context(|| format!("loading schemas from {}", dir.display()))?;
    }

    let rules = match &cli.rules {
        Some(path) => load_rule_registry(path)
            .with_context(|| format!("loading rules {}", path.display()))?,
        None => RuleRegistry::new(),
    };

    let request = read_request(&cli.request)?;
    let orchestrator = Orchestrator::new(Arc::new(rules), Arc::new(schemas), config);
    let result = orchestrator.validate(request).await;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Summary => print_summary(&result),
    }

    Ok(result.overall_valid)
}

fn read_request(path: &Path) -> Result<ValidationRequest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "yaml" | "yml"));

    let request = if is_yaml {
        serde_yaml::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };
    Ok(request)
}

fn print_summary(result: &ValidationResult) {
    println!(
        "{} status={:?} valid={} duration={}us",
        result.request_id, result.status, result.overall_valid, result.duration_us
    );
    for issue in result.issues() {
        println!(
            "  [{}] {} {}: {}",
            issue.severity, issue.stage, issue.location, issue.message
        );
    }
    for recommendation in &result.recommendations {
        println!("  hint: {}", recommendation.message);
    }
}
