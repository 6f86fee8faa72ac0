//! Context-specific payload preprocessing

use chrono::Utc;
use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;
use validation_core::configuration::PreprocessingConfig;
use validation_core::error::{Result, SolarValidationError};
use validation_core::types::{ContextType, ValidationRequest};
use validation_core::validation::{Diagnostic, ValidationSeverity};

use crate::json_path;
use crate::rule_engine::predicate::parse_date;

/// Diagnostic code for monitoring payloads older than the freshness window
pub const STALE_PAYLOAD: &str = "stale_payload";

/// Payload ready for the validation stages
#[derive(Debug)]
pub(crate) struct Prepared<'a> {
    pub(crate) payload: Cow<'a, Value>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

/// Fail `api_request` contexts whose metadata lacks an authentication token
///
/// # Errors
///
/// Returns `SolarValidationError::AuthenticationMissing` when the token is
/// absent, not a string, or blank
pub(crate) fn authenticate(
    request: &ValidationRequest,
    config: &PreprocessingConfig,
) -> Result<()> {
    if request.context.context_type != ContextType::ApiRequest {
        return Ok(());
    }
    let key = config.auth_metadata_key.as_str();
    let present = request
        .data
        .metadata
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|token| !token.trim().is_empty());
    if present {
        Ok(())
    } else {
        Err(SolarValidationError::AuthenticationMissing(format!(
            "api_request requires metadata '{key}'"
        )))
    }
}

/// Apply the preprocessing for the request's context type
pub(crate) fn prepare<'a>(
    request: &'a ValidationRequest,
    config: &PreprocessingConfig,
) -> Prepared<'a> {
    let payload = &request.data.payload;
    match request.context.context_type {
        ContextType::UserInput => Prepared {
            payload: Cow::Owned(sanitize(payload)),
            diagnostics: Vec::new(),
        },
        ContextType::RealTimeMonitoring => Prepared {
            payload: Cow::Borrowed(payload),
            diagnostics: staleness(request, config).into_iter().collect(),
        },
        _ => Prepared {
            payload: Cow::Borrowed(payload),
            diagnostics: Vec::new(),
        },
    }
}

/// Trim every string and strip angle brackets, recursively
#[must_use]
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(
            text.trim()
                .chars()
                .filter(|c| !matches!(c, '<' | '>'))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), sanitize(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn staleness(request: &ValidationRequest, config: &PreprocessingConfig) -> Option<Diagnostic> {
    let raw = json_path::lookup(&request.data.payload, &config.timestamp_field)?.as_str()?;
    let observed = parse_date(raw)?;
    let window = chrono::Duration::from_std(config.freshness_window).ok()?;
    let age = Utc::now() - observed;

    if age > window {
        debug!(
            request_id = %request.id,
            age_secs = age.num_seconds(),
            "Monitoring payload is stale"
        );
        Some(Diagnostic::new(
            STALE_PAYLOAD,
            ValidationSeverity::Warning,
            format!(
                "Payload timestamp {raw} is older than the freshness window of {}s",
                config.freshness_window.as_secs()
            ),
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use validation_core::types::{RecordCategory, ValidationContext};

    fn request(context: ContextType, payload: Value) -> ValidationRequest {
        ValidationRequest::new(
            ValidationContext::new(context),
            RecordCategory::SensorReading,
            payload,
        )
    }

    #[test]
    fn test_sanitize_is_recursive() {
        let dirty = json!({
            "name": "  <b>Rooftop</b> ",
            "tags": [" south ", "<script>"],
            "size": 8.2
        });
        assert_eq!(
            sanitize(&dirty),
            json!({ "name": "bRooftop/b", "tags": ["south", "script"], "size": 8.2 })
        );
    }

    #[test]
    fn test_api_request_requires_token() {
        let config = PreprocessingConfig::default();
        let bare = request(ContextType::ApiRequest, json!({}));
        assert!(matches!(
            authenticate(&bare, &config),
            Err(SolarValidationError::AuthenticationMissing(_))
        ));

        let blank = bare.clone().with_metadata("auth_token", json!("  "));
        assert!(authenticate(&blank, &config).is_err());

        let signed = bare.with_metadata("auth_token", json!("tok-123"));
        assert!(authenticate(&signed, &config).is_ok());

        let form = request(ContextType::UserInput, json!({}));
        assert!(authenticate(&form, &config).is_ok());
    }

    #[test]
    fn test_stale_monitoring_payload() {
        let config = PreprocessingConfig::default();
        let old = (Utc::now() - chrono::Duration::hours(2)).to_rfc3339();
        let stale = request(
            ContextType::RealTimeMonitoring,
            json!({ "timestamp": old, "power_kw": 4.2 }),
        );
        let prepared = prepare(&stale, &config);
        assert_eq!(prepared.diagnostics.len(), 1);
        assert_eq!(prepared.diagnostics[0].code, STALE_PAYLOAD);
        assert_eq!(prepared.diagnostics[0].severity, ValidationSeverity::Warning);

        let fresh = request(
            ContextType::RealTimeMonitoring,
            json!({ "timestamp": Utc::now().to_rfc3339(), "power_kw": 4.2 }),
        );
        assert!(prepare(&fresh, &config).diagnostics.is_empty());
    }
}
