//! Lenient scalar coercion for loosely-typed configuration maps

use crate::{Error, Result};
use serde_json::{Map, Value};

/// Read-only view over a raw configuration map.
///
/// Keys are matched exactly first, then case-insensitively. `null` values are
/// treated as absent.
pub(crate) struct Fields<'a> {
    raw: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(raw: &'a Map<String, Value>) -> Self {
        Self { raw }
    }

    /// Look up a key, ignoring `null`
    pub(crate) fn get(&self, key: &str) -> Option<&'a Value> {
        let value = self.raw.get(key).or_else(|| {
            self.raw
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })?;
        if value.is_null() {
            None
        } else {
            Some(value)
        }
    }

    /// Decode a string field, rendering numbers and booleans as text
    pub(crate) fn string(&self, key: &str) -> Result<Option<String>> {
        self.get(key).map(|v| to_string(key, v)).transpose()
    }

    /// Decode a boolean field, accepting numbers and boolean-like strings
    pub(crate) fn boolean(&self, key: &str) -> Result<Option<bool>> {
        self.get(key).map(|v| to_bool(key, v)).transpose()
    }
}

fn to_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("1".to_string()),
        Value::Bool(false) => Ok("0".to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(Error::Validation(format!(
            "'{}' expected a string, got {}",
            key,
            kind(value)
        ))),
    }
}

fn to_bool(key: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        Value::String(s) => parse_bool(s).ok_or_else(|| {
            Error::Validation(format!("cannot parse '{}' as bool: {:?}", key, s))
        }),
        Value::Null => Ok(false),
        Value::Array(_) | Value::Object(_) => Err(Error::Validation(format!(
            "'{}' expected a bool, got {}",
            key,
            kind(value)
        ))),
    }
}

/// Boolean spellings accepted by the configuration layer
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "" => Some(false),
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_string_coercion() {
        let raw = map(json!({"port": 8087, "host": "db", "flag": true, "gone": null}));
        let fields = Fields::new(&raw);
        assert_eq!(fields.string("port").unwrap(), Some("8087".to_string()));
        assert_eq!(fields.string("host").unwrap(), Some("db".to_string()));
        assert_eq!(fields.string("flag").unwrap(), Some("1".to_string()));
        assert_eq!(fields.string("gone").unwrap(), None);
        assert_eq!(fields.string("missing").unwrap(), None);
    }

    #[test]
    fn test_string_rejects_nested() {
        let raw = map(json!({"host": {"name": "db"}}));
        let err = Fields::new(&raw).string("host").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_bool_coercion() {
        let raw = map(json!({"a": "true", "b": 0, "c": "F", "d": "", "e": 2.5, "f": "maybe"}));
        let fields = Fields::new(&raw);
        assert_eq!(fields.boolean("a").unwrap(), Some(true));
        assert_eq!(fields.boolean("b").unwrap(), Some(false));
        assert_eq!(fields.boolean("c").unwrap(), Some(false));
        assert_eq!(fields.boolean("d").unwrap(), Some(false));
        assert_eq!(fields.boolean("e").unwrap(), Some(true));
        assert!(fields.boolean("f").is_err());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let raw = map(json!({"Host": "upper", "TOKEN": "t"}));
        let fields = Fields::new(&raw);
        assert_eq!(fields.string("host").unwrap(), Some("upper".to_string()));
        assert_eq!(fields.string("token").unwrap(), Some("t".to_string()));
    }

    #[test]
    fn test_exact_key_preferred() {
        let raw = map(json!({"HOST": "upper", "host": "lower"}));
        assert_eq!(
            Fields::new(&raw).string("host").unwrap(),
            Some("lower".to_string())
        );
    }
}
