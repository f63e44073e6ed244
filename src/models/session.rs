//! Browser session options shared by every browser-backed tool.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::params::{coerce_bool, ParamError};

/// Backend-side browser behavior toggles.
///
/// When a tool call carries a `sessionOptions` block, every omitted toggle
/// resolves to `false`. When the block is absent altogether, no options are
/// sent and the backend applies its own defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    /// Route traffic through a proxy
    pub use_proxy: bool,

    /// Enable stealth fingerprinting
    pub use_stealth: bool,

    /// Solve captchas automatically
    pub solve_captchas: bool,

    /// Dismiss cookie banners
    pub accept_cookies: bool,
}

impl SessionOptions {
    /// Resolve the optional `sessionOptions` argument.
    ///
    /// `None`/`null` yields `Ok(None)`; an object yields defaulted options;
    /// anything else is rejected.
    pub fn from_arg(value: Option<&Value>) -> Result<Option<Self>, ParamError> {
        let obj = match value {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(obj)) => obj,
            Some(_) => {
                return Err(ParamError::InvalidType {
                    field: "sessionOptions".to_string(),
                    expected: "object",
                })
            }
        };

        let flag = |key: &str| -> Result<bool, ParamError> {
            match obj.get(key) {
                None | Some(Value::Null) => Ok(false),
                Some(v) => coerce_bool(v, &format!("sessionOptions.{}", key)),
            }
        };

        Ok(Some(Self {
            use_proxy: flag("useProxy")?,
            use_stealth: flag("useStealth")?,
            solve_captchas: flag("solveCaptchas")?,
            accept_cookies: flag("acceptCookies")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_block_stays_absent() {
        assert_eq!(SessionOptions::from_arg(None).unwrap(), None);
        assert_eq!(SessionOptions::from_arg(Some(&Value::Null)).unwrap(), None);
    }

    #[test]
    fn test_omitted_fields_default_to_false() {
        let value = json!({ "useStealth": true });
        let options = SessionOptions::from_arg(Some(&value)).unwrap().unwrap();
        assert!(options.use_stealth);
        assert!(!options.use_proxy);
        assert!(!options.solve_captchas);
        assert!(!options.accept_cookies);

        let empty = json!({});
        assert_eq!(
            SessionOptions::from_arg(Some(&empty)).unwrap(),
            Some(SessionOptions::default())
        );
    }

    #[test]
    fn test_string_booleans_are_coerced() {
        let value = json!({ "useProxy": "true", "acceptCookies": "false" });
        let options = SessionOptions::from_arg(Some(&value)).unwrap().unwrap();
        assert!(options.use_proxy);
        assert!(!options.accept_cookies);
    }

    #[test]
    fn test_rejects_non_object() {
        let value = json!("proxy please");
        assert!(SessionOptions::from_arg(Some(&value)).is_err());

        let bad_flag = json!({ "useProxy": "sometimes" });
        assert!(SessionOptions::from_arg(Some(&bad_flag)).is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let options = SessionOptions {
            use_proxy: true,
            ..Default::default()
        };
        let value = serde_json::to_value(options).unwrap();
        assert_eq!(value["useProxy"], json!(true));
        assert_eq!(value["solveCaptchas"], json!(false));
    }
}
