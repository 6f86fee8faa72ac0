//! Field path navigation over JSON records
//!
//! Rules and schemas address fields with dot-separated paths such as
//! `system.inverter.max_input_voltage` or `line_items[2].amount`. Paths are
//! parsed once into segments and then resolved against a record.

use serde_json::Value;
use std::fmt;
use validation_core::error::{Result, SolarValidationError};

/// Parsed field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
    /// String representation for display
    string_repr: String,
}

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object property
    Property(String),
    /// Array index
    Index(usize),
}

impl FieldPath {
    /// Parse a dot-separated path
    ///
    /// An empty string and `*` both denote the whole record.
    ///
    /// # Errors
    ///
    /// Returns `SolarValidationError::ConfigError` for empty segments,
    /// unclosed brackets or non-numeric indices.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for part in trimmed.split('.') {
            let (name, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if name.is_empty() && rest.is_empty() {
                return Err(SolarValidationError::config(format!(
                    "Empty segment in field path: {path}"
                )));
            }
            if !name.is_empty() {
                segments.push(PathSegment::Property(name.to_string()));
            }

            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| {
                    SolarValidationError::config(format!("Unclosed index in field path: {path}"))
                })?;
                let index = rest[1..close].parse::<usize>().map_err(|_| {
                    SolarValidationError::config(format!(
                        "Invalid index '{}' in field path: {path}",
                        &rest[1..close]
                    ))
                })?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(SolarValidationError::config(format!(
                        "Unexpected characters after index in field path: {path}"
                    )));
                }
            }
        }

        Ok(Self {
            segments,
            string_repr: trimmed.to_string(),
        })
    }

    /// Path denoting the whole record
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
            string_repr: String::new(),
        }
    }

    /// Whether this path denotes the whole record
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path segments
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Resolve the path against a record
    #[must_use]
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for segment in &self.segments {
            current = match segment {
                PathSegment::Property(name) => current.as_object()?.get(name)?,
                PathSegment::Index(index) => current.as_array()?.get(*index)?,
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_repr)
    }
}

/// Resolve a path string against a record, treating malformed paths as absent
#[must_use]
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    FieldPath::parse(path).ok()?.resolve(record)
}

/// Numeric value at a path
#[must_use]
pub fn lookup_f64(record: &Value, path: &str) -> Option<f64> {
    lookup(record, path).and_then(Value::as_f64)
}
