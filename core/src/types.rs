//! Request-side types: contexts, rule specifications and validation requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::configuration::{EngineConfig, RequestDefaults};
use crate::validation::{RuleCategory, ValidationSeverity};

/// Why a validation call is being made
///
/// The orchestrator preprocesses payloads differently per context type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// Data typed by an end user into a web or mobile form
    #[default]
    UserInput,
    /// Data arriving through the public API
    ApiRequest,
    /// Data about to be written by a persistence layer
    DatabaseOperation,
    /// Live sensor or inverter telemetry
    RealTimeMonitoring,
    /// Bulk imports and offline-sync replays
    BatchProcessing,
    /// Calls made by the platform itself
    SystemInternal,
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserInput => "user_input",
            Self::ApiRequest => "api_request",
            Self::DatabaseOperation => "database_operation",
            Self::RealTimeMonitoring => "real_time_monitoring",
            Self::BatchProcessing => "batch_processing",
            Self::SystemInternal => "system_internal",
        };
        f.write_str(name)
    }
}

/// Kind of operation the record is subject to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// New record
    #[default]
    Create,
    /// Modified record
    Update,
    /// Record about to be removed
    Delete,
    /// Record being read back
    Read,
    /// Record rewritten by a schema migration
    Migration,
    /// Record submitted as part of a batch
    Batch,
}

/// Kind of solar-domain record being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    /// Panel, inverter or battery specification
    EquipmentSpec,
    /// Complete system design (array, strings, inverter)
    SystemConfiguration,
    /// Quote, invoice, loan or incentive record
    FinancialRecord,
    /// Telemetry sample from a monitored system
    SensorReading,
    /// Installation job and its milestones
    Installation,
    /// Customer project
    Project,
    /// Marketplace user profile
    UserProfile,
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EquipmentSpec => "equipment_spec",
            Self::SystemConfiguration => "system_configuration",
            Self::FinancialRecord => "financial_record",
            Self::SensorReading => "sensor_reading",
            Self::Installation => "installation",
            Self::Project => "project",
            Self::UserProfile => "user_profile",
        };
        f.write_str(name)
    }
}

/// Metadata describing why and how a validation call is made
///
/// Created fresh per request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationContext {
    /// Context type driving preprocessing
    #[serde(rename = "type")]
    pub context_type: ContextType,
    /// Collection the record belongs to
    #[serde(default)]
    pub collection: String,
    /// Operation kind
    #[serde(default)]
    pub operation: OperationKind,
    /// Environment tag (e.g. "production")
    #[serde(default = "default_environment")]
    pub environment: String,
    /// When the call was made
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Acting user or service, if known
    #[serde(default)]
    pub actor: Option<String>,
    /// Opaque caller metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_environment() -> String {
    "production".to_string()
}

impl ValidationContext {
    /// Create a context of the given type with defaults for everything else
    #[must_use]
    pub fn new(context_type: ContextType) -> Self {
        Self {
            context_type,
            collection: String::new(),
            operation: OperationKind::default(),
            environment: default_environment(),
            timestamp: Utc::now(),
            actor: None,
            metadata: Map::new(),
        }
    }

    /// Set the collection
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the operation kind
    #[must_use]
    pub fn with_operation(mut self, operation: OperationKind) -> Self {
        self.operation = operation;
        self
    }

    /// Set the environment tag
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Set the acting identity
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Built-in, data-driven predicate kinds
///
/// Every variant can be serialized, so rule sets can be stored, audited and
/// shipped with a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PredicateSpec {
    /// Value must be present and non-null
    Required,
    /// Value must be a number greater than zero; suggests the absolute value
    PositiveNumber,
    /// Value must be a number of at least zero; suggests zero
    NonNegative,
    /// Value must lie within `[min, max]`; suggests the violated bound
    Range {
        /// Inclusive lower bound
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive upper bound
        #[serde(default)]
        max: Option<f64>,
    },
    /// String must have at least `min` characters
    MinLength {
        /// Minimum character count
        min: usize,
    },
    /// String must have at most `max` characters; suggests the truncated string
    MaxLength {
        /// Maximum character count
        max: usize,
    },
    /// String must match a regular expression
    Pattern {
        /// Regular expression
        pattern: String,
    },
    /// Value must equal one of the listed values
    OneOf {
        /// Allowed values
        values: Vec<Value>,
    },
    /// Value must be a non-empty array
    NonEmptyArray,
    /// String must be an RFC 3339 timestamp or a `YYYY-MM-DD` date
    IsoDate,
    /// Date must not lie in the future
    NotFutureDate,
    /// Numeric value must not exceed the value at another field path
    FieldLessOrEqual {
        /// Dot-separated path of the other field
        other: String,
    },
}

/// Serializable description of a custom validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Unique identifier
    pub id: String,
    /// Human name
    #[serde(default)]
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Target field path; `None` or `"*"` means the whole record
    #[serde(default)]
    pub field: Option<String>,
    /// Severity of a failure
    #[serde(default = "default_rule_severity")]
    pub severity: ValidationSeverity,
    /// Rule category
    #[serde(default = "default_rule_category")]
    pub category: RuleCategory,
    /// Rules that must be evaluated first
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Message used when the rule fails
    #[serde(default)]
    pub message: Option<String>,
    /// Predicate to evaluate
    pub predicate: PredicateSpec,
}

fn default_rule_severity() -> ValidationSeverity {
    ValidationSeverity::Error
}

fn default_rule_category() -> RuleCategory {
    RuleCategory::Business
}

impl RuleSpec {
    /// Create a new rule specification targeting a field
    pub fn new(id: impl Into<String>, field: Option<&str>, predicate: PredicateSpec) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            field: field.map(str::to_string),
            severity: default_rule_severity(),
            category: default_rule_category(),
            dependencies: Vec::new(),
            message: None,
            predicate,
        }
    }

    /// Set the severity
    #[must_use]
    pub fn with_severity(mut self, severity: ValidationSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: RuleCategory) -> Self {
        self.category = category;
        self
    }

    /// Add a dependency
    #[must_use]
    pub fn depends_on(mut self, rule_id: impl Into<String>) -> Self {
        self.dependencies.push(rule_id.into());
        self
    }
}

/// A custom rule as referenced by a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomRuleRef {
    /// A rule already present in the engine's registry
    Registered {
        /// Registered rule id
        id: String,
    },
    /// A rule defined inline by the caller
    Inline(RuleSpec),
}

impl CustomRuleRef {
    /// Identifier of the referenced rule
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Registered { id } => id,
            Self::Inline(spec) => &spec.id,
        }
    }
}

/// The rules a request asks to apply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Named schemas
    #[serde(default)]
    pub schemas: Vec<String>,
    /// Custom rules, registered or inline
    #[serde(default)]
    pub custom_rules: Vec<CustomRuleRef>,
    /// Named cross-validation rules
    #[serde(default)]
    pub cross_validations: Vec<String>,
}

/// Per-request configuration block
///
/// `max_errors` and `timeout_ms` left unset take the engine's
/// [`RequestDefaults`] when the request is validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Treat warning-level failures as blocking
    pub strict_mode: bool,
    /// Stop evaluating custom rules after this many blocking failures
    pub max_errors: Option<usize>,
    /// Time budget for the whole pipeline in milliseconds
    pub timeout_ms: Option<u64>,
    /// Consult and populate the result cache
    pub enable_caching: bool,
    /// Record process-wide metrics for this request
    pub enable_metrics: bool,
    /// Override the engine's unknown cross-rule policy
    pub strict_cross_validation: Option<bool>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_errors: None,
            timeout_ms: None,
            enable_caching: true,
            enable_metrics: true,
            strict_cross_validation: None,
        }
    }
}

impl RequestConfig {
    /// Request configuration with every default taken from the engine
    #[must_use]
    pub fn from_engine(config: &EngineConfig) -> Self {
        let mut request = Self {
            enable_caching: config.cache.enabled,
            ..Self::default()
        };
        request.apply_defaults(&config.defaults);
        request
    }

    /// Fill unset limits from the engine defaults
    pub fn apply_defaults(&mut self, defaults: &RequestDefaults) {
        self.max_errors.get_or_insert(defaults.max_errors);
        self.timeout_ms.get_or_insert(defaults.timeout_ms);
    }

    /// Time budget, falling back to the engine default
    #[must_use]
    pub fn timeout_ms_or(&self, defaults: &RequestDefaults) -> u64 {
        self.timeout_ms.unwrap_or(defaults.timeout_ms)
    }

    /// Error budget, falling back to the engine default; 0 means no limit
    #[must_use]
    pub fn max_errors_or(&self, defaults: &RequestDefaults) -> usize {
        self.max_errors.unwrap_or(defaults.max_errors)
    }
}

/// Payload plus side metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    /// Record under test, possibly with sibling entities
    pub payload: Value,
    /// Side metadata (authentication token, source system, ...)
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A complete validation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// Request identifier
    #[serde(default = "new_request_id")]
    pub id: String,
    /// When the request was created
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Call context
    pub context: ValidationContext,
    /// Record category
    pub category: RecordCategory,
    /// Configuration block
    #[serde(default)]
    pub config: RequestConfig,
    /// Data to validate
    pub data: RequestData,
    /// Rules to apply
    #[serde(default)]
    pub rules: RuleSet,
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ValidationRequest {
    /// Create a request with a generated id and default configuration
    #[must_use]
    pub fn new(context: ValidationContext, category: RecordCategory, payload: Value) -> Self {
        Self {
            id: new_request_id(),
            timestamp: Utc::now(),
            context,
            category,
            config: RequestConfig::default(),
            data: RequestData {
                payload,
                metadata: Map::new(),
            },
            rules: RuleSet::default(),
        }
    }

    /// Apply a named schema
    #[must_use]
    pub fn with_schema(mut self, name: impl Into<String>) -> Self {
        self.rules.schemas.push(name.into());
        self
    }

    /// Apply a custom rule
    #[must_use]
    pub fn with_rule(mut self, rule: CustomRuleRef) -> Self {
        self.rules.custom_rules.push(rule);
        self
    }

    /// Apply a registered custom rule by id
    #[must_use]
    pub fn with_registered_rule(self, id: impl Into<String>) -> Self {
        self.with_rule(CustomRuleRef::Registered { id: id.into() })
    }

    /// Apply a named cross-validation rule
    #[must_use]
    pub fn with_cross_rule(mut self, name: impl Into<String>) -> Self {
        self.rules.cross_validations.push(name.into());
        self
    }

    /// Replace the configuration block
    #[must_use]
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a side-metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.metadata.insert(key.into(), value);
        self
    }
}
