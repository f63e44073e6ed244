//! Tool parameter records and their validation.
//!
//! Every tool receives loosely-typed JSON arguments. The parsers here turn
//! them into typed records, filling declared defaults and coercing scalars
//! leniently (numeric strings become numbers, `"true"`/`"false"` become
//! booleans), while enforcing shape and range constraints strictly. A
//! [`ParamError`] rejects the call before anything is sent to the backend.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::resolve_extraction_schema;
use super::session::SessionOptions;

/// Lower bound for `maxPages` and `maxSteps`
pub const MIN_BOUND: i64 = 1;

/// Upper bound for `maxPages` and `maxSteps`
pub const MAX_BOUND: i64 = 1000;

/// Default for `maxPages` and `maxSteps`
pub const DEFAULT_BOUND: u32 = 10;

/// Parameter validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("Arguments must be a JSON object")]
    NotAnObject,

    #[error("Missing required parameter '{0}'")]
    Missing(String),

    #[error("Invalid type for '{field}': expected {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },

    #[error("Invalid URL for '{field}': {reason}")]
    InvalidUrl { field: String, reason: String },

    #[error("'{field}' must be an integer between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        value: String,
    },

    #[error("'{0}' must contain at least one element")]
    Empty(String),

    #[error("Invalid value '{value}' for '{field}' (expected one of: {allowed})")]
    InvalidChoice {
        field: String,
        value: String,
        allowed: String,
    },
}

bitflags::bitflags! {
    /// Output formats requested from a scrape or crawl
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OutputFormats: u8 {
        const MARKDOWN = 1 << 0;
        const HTML = 1 << 1;
        const LINKS = 1 << 2;
        const SCREENSHOT = 1 << 3;
    }
}

impl OutputFormats {
    const NAMES: [(&'static str, OutputFormats); 4] = [
        ("markdown", OutputFormats::MARKDOWN),
        ("html", OutputFormats::HTML),
        ("links", OutputFormats::LINKS),
        ("screenshot", OutputFormats::SCREENSHOT),
    ];

    /// Look up a single format by its wire name
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, flag)| *flag)
    }

    /// Wire names of the contained formats, in canonical order
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(n, _)| *n)
            .collect()
    }

    fn parse(value: Option<&Value>, field: &str) -> Result<Self, ParamError> {
        let items = match value {
            None | Some(Value::Null) => return Err(ParamError::Missing(field.to_string())),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ParamError::InvalidType {
                    field: field.to_string(),
                    expected: "array of strings",
                })
            }
        };

        if items.is_empty() {
            return Err(ParamError::Empty(field.to_string()));
        }

        let mut formats = OutputFormats::empty();
        for (i, item) in items.iter().enumerate() {
            let name = item.as_str().ok_or_else(|| ParamError::InvalidType {
                field: format!("{}[{}]", field, i),
                expected: "string",
            })?;
            let flag = Self::from_wire(name).ok_or_else(|| ParamError::InvalidChoice {
                field: format!("{}[{}]", field, i),
                value: name.to_string(),
                allowed: "markdown, html, links, screenshot".to_string(),
            })?;
            formats |= flag;
        }
        Ok(formats)
    }
}

impl Serialize for OutputFormats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

/// Parameters for `scrape_webpage`
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeParams {
    pub url: String,
    pub api_key: Option<String>,
    pub session_options: Option<SessionOptions>,
    pub output_format: OutputFormats,
}

impl ScrapeParams {
    pub fn from_args(args: &Value) -> Result<Self, ParamError> {
        let obj = as_object(args)?;
        Ok(Self {
            url: required_url(obj, "url")?,
            api_key: optional_string(obj, "apiKey")?,
            session_options: SessionOptions::from_arg(obj.get("sessionOptions"))?,
            output_format: OutputFormats::parse(obj.get("outputFormat"), "outputFormat")?,
        })
    }
}

/// Parameters for `extract_structured_data`
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractParams {
    pub urls: Vec<String>,
    pub api_key: Option<String>,
    pub prompt: String,
    /// The extraction schema, absent when missing or not a valid JSON Schema
    pub schema: Option<Value>,
    pub session_options: Option<SessionOptions>,
}

impl ExtractParams {
    pub fn from_args(args: &Value) -> Result<Self, ParamError> {
        let obj = as_object(args)?;

        let urls = match obj.get("urls") {
            None | Some(Value::Null) => return Err(ParamError::Missing("urls".to_string())),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_url(item, &format!("urls[{}]", i)))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ParamError::InvalidType {
                    field: "urls".to_string(),
                    expected: "array of URLs",
                })
            }
        };

        Ok(Self {
            urls,
            api_key: optional_string(obj, "apiKey")?,
            prompt: required_string(obj, "prompt")?,
            schema: resolve_extraction_schema(obj.get("schema")),
            session_options: SessionOptions::from_arg(obj.get("sessionOptions"))?,
        })
    }
}

/// Parameters for `crawl_webpages`
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlParams {
    pub url: String,
    pub api_key: Option<String>,
    pub session_options: Option<SessionOptions>,
    pub output_format: OutputFormats,
    pub follow_links: bool,
    pub max_pages: u32,
    pub ignore_sitemap: bool,
}

impl CrawlParams {
    pub fn from_args(args: &Value) -> Result<Self, ParamError> {
        let obj = as_object(args)?;
        Ok(Self {
            url: required_url(obj, "url")?,
            api_key: optional_string(obj, "apiKey")?,
            session_options: SessionOptions::from_arg(obj.get("sessionOptions"))?,
            output_format: OutputFormats::parse(obj.get("outputFormat"), "outputFormat")?,
            follow_links: required_bool(obj, "followLinks")?,
            max_pages: bounded_int(obj, "maxPages")?,
            ignore_sitemap: optional_bool(obj, "ignoreSitemap")?.unwrap_or(false),
        })
    }
}

/// Parameters shared by the browser agent tools (`browser_use` and the
/// computer-use agents)
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTaskParams {
    pub task: String,
    pub api_key: Option<String>,
    pub session_options: Option<SessionOptions>,
    pub return_step_info: bool,
    pub max_steps: u32,
}

impl AgentTaskParams {
    pub fn from_args(args: &Value) -> Result<Self, ParamError> {
        let obj = as_object(args)?;
        Ok(Self {
            task: required_string(obj, "task")?,
            api_key: optional_string(obj, "apiKey")?,
            session_options: SessionOptions::from_arg(obj.get("sessionOptions"))?,
            return_step_info: optional_bool(obj, "returnStepInfo")?.unwrap_or(false),
            max_steps: bounded_int(obj, "maxSteps")?,
        })
    }
}

/// Parameters for `delete_profile`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteProfileParams {
    pub profile_id: String,
}

impl DeleteProfileParams {
    pub fn from_args(args: &Value) -> Result<Self, ParamError> {
        let obj = as_object(args)?;
        let profile_id = required_string(obj, "profileId")?;
        if profile_id.trim().is_empty() {
            return Err(ParamError::Missing("profileId".to_string()));
        }
        Ok(Self { profile_id })
    }
}

/// Parameters for `list_profiles`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListProfilesParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListProfilesParams {
    pub fn from_args(args: &Value) -> Result<Self, ParamError> {
        let obj = as_object(args)?;
        Ok(Self {
            page: optional_positive_int(obj, "page")?,
            limit: optional_positive_int(obj, "limit")?,
        })
    }
}

// A missing `arguments` member on tools/call arrives as null and is treated
// like an empty object.
fn as_object(args: &Value) -> Result<&Map<String, Value>, ParamError> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    match args {
        Value::Object(obj) => Ok(obj),
        Value::Null => Ok(EMPTY.get_or_init(Map::new)),
        _ => Err(ParamError::NotAnObject),
    }
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// Coerce a scalar into a string
fn coerce_string(value: &Value, field: &str) -> Result<String, ParamError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ParamError::InvalidType {
            field: field.to_string(),
            expected: "string",
        }),
    }
}

/// Coerce a boolean or a `"true"`/`"false"` string
pub(crate) fn coerce_bool(value: &Value, field: &str) -> Result<bool, ParamError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ParamError::InvalidType {
                field: field.to_string(),
                expected: "boolean",
            }),
        },
        _ => Err(ParamError::InvalidType {
            field: field.to_string(),
            expected: "boolean",
        }),
    }
}

/// Coerce a number or numeric string into an integer within `[min, max]`
fn coerce_int(value: &Value, field: &str, min: i64, max: i64) -> Result<u32, ParamError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ParamError::InvalidType {
        field: field.to_string(),
        expected: "integer",
    })?;

    if !number.is_finite() || number.fract() != 0.0 {
        return Err(ParamError::InvalidType {
            field: field.to_string(),
            expected: "integer",
        });
    }

    if number < min as f64 || number > max as f64 {
        return Err(ParamError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            value: number.to_string(),
        });
    }

    Ok(number as u32)
}

fn parse_url(value: &Value, field: &str) -> Result<String, ParamError> {
    let raw = value.as_str().ok_or_else(|| ParamError::InvalidType {
        field: field.to_string(),
        expected: "URL string",
    })?;
    url::Url::parse(raw.trim()).map_err(|e| ParamError::InvalidUrl {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    Ok(raw.trim().to_string())
}

fn required_url(obj: &Map<String, Value>, key: &str) -> Result<String, ParamError> {
    let value = present(obj, key).ok_or_else(|| ParamError::Missing(key.to_string()))?;
    parse_url(value, key)
}

fn required_string(obj: &Map<String, Value>, key: &str) -> Result<String, ParamError> {
    let value = present(obj, key).ok_or_else(|| ParamError::Missing(key.to_string()))?;
    coerce_string(value, key)
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, ParamError> {
    present(obj, key).map(|v| coerce_string(v, key)).transpose()
}

fn required_bool(obj: &Map<String, Value>, key: &str) -> Result<bool, ParamError> {
    let value = present(obj, key).ok_or_else(|| ParamError::Missing(key.to_string()))?;
    coerce_bool(value, key)
}

fn optional_bool(obj: &Map<String, Value>, key: &str) -> Result<Option<bool>, ParamError> {
    present(obj, key).map(|v| coerce_bool(v, key)).transpose()
}

fn bounded_int(obj: &Map<String, Value>, key: &str) -> Result<u32, ParamError> {
    match present(obj, key) {
        Some(v) => coerce_int(v, key, MIN_BOUND, MAX_BOUND),
        None => Ok(DEFAULT_BOUND),
    }
}

fn optional_positive_int(obj: &Map<String, Value>, key: &str) -> Result<Option<u32>, ParamError> {
    present(obj, key)
        .map(|v| coerce_int(v, key, 1, u32::MAX as i64))
        .transpose()
}
