//! Extraction schema handling.
//!
//! The `schema` argument of `extract_structured_data` is itself a JSON
//! Schema. It may arrive as an object or as a JSON-encoded string. It is
//! accepted only when it parses and compiles as a schema; anything else is
//! dropped and the extraction proceeds without one.

use serde_json::Value;
use thiserror::Error;

/// Reasons a raw schema argument is rejected
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema is empty")]
    Empty,

    #[error("Schema string is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a raw schema argument into a JSON value.
///
/// Falsy values (`null`, `false`, `0`, `""`) count as empty. Strings are
/// decoded as JSON; every other value is taken as-is.
pub fn parse_schema(raw: &Value) -> Result<Value, SchemaError> {
    match raw {
        Value::Null | Value::Bool(false) => Err(SchemaError::Empty),
        Value::Number(n) if n.as_f64() == Some(0.0) => Err(SchemaError::Empty),
        Value::String(s) if s.is_empty() => Err(SchemaError::Empty),
        Value::String(s) => Ok(serde_json::from_str(s)?),
        other => Ok(other.clone()),
    }
}

/// Check whether a value compiles as a JSON Schema
pub fn is_valid_json_schema(schema: &Value) -> bool {
    match jsonschema::validator_for(schema) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("Extraction schema rejected: {}", e);
            false
        }
    }
}

/// Resolve the optional `schema` argument to a usable schema, or `None`
pub fn resolve_extraction_schema(raw: Option<&Value>) -> Option<Value> {
    let parsed = match parse_schema(raw?) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Ignoring extraction schema: {}", e);
            return None;
        }
    };

    is_valid_json_schema(&parsed).then_some(parsed)
}
