//! Deploy variables: the key-value store a deploy reads its settings from
//! and writes its results back into.
//!
//! Values are plain JSON so target files, `--set` overrides and produced
//! values all share one representation. Typed getters convert on read and
//! report the offending key when a value has the wrong shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployVariables {
    values: BTreeMap<String, Value>,
}

impl DeployVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// True when the key was set, even to `null`.
    pub fn exists(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// String value. Scalars are stringified so `--set branch=1234` still
    /// names a branch.
    pub fn string(&self, key: &str) -> Result<Option<String>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(Error::config_invalid_value(
                key,
                Some(other.to_string()),
                "Expected a string",
            )),
        }
    }

    /// Non-empty string value, or a missing-key error.
    pub fn required_string(&self, key: &str) -> Result<String> {
        match self.string(key)? {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(Error::config_missing_key(key)),
        }
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Error::config_invalid_value(
                key,
                Some(other.to_string()),
                "Expected true or false",
            )),
        }
    }

    /// Integer value. Numeric strings are accepted.
    pub fn integer(&self, key: &str) -> Result<Option<i64>> {
        let invalid = |value: &Value| {
            Error::config_invalid_value(key, Some(value.to_string()), "Expected an integer")
        };

        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value @ Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| invalid(value)),
            Some(value @ Value::String(s)) => {
                s.trim().parse::<i64>().map(Some).map_err(|_| invalid(value))
            }
            Some(other) => Err(invalid(other)),
        }
    }

    /// Apply `key=value` assignments on top of the current values.
    pub fn apply_assignments(&mut self, assignments: &[String]) -> Result<()> {
        for assignment in assignments {
            let (key, value) = parse_assignment(assignment)?;
            self.values.insert(key, value);
        }
        Ok(())
    }
}

/// Parse `key=value` into a variable name and typed value.
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = assignment.split_once('=') else {
        return Err(Error::validation_invalid_argument(
            "set",
            format!("Expected key=value, got '{}'", assignment),
            None,
        ));
    };

    let key = key.trim();
    if key.is_empty() {
        return Err(Error::validation_invalid_argument(
            "set",
            format!("Missing variable name in '{}'", assignment),
            None,
        ));
    }

    Ok((key.to_string(), parse_value(raw)))
}

/// Parse a string value into appropriate JSON type.
/// Order: JSON literal → bool → number → string
///
/// Numbers are only taken when they print back as the same text, so values
/// like `1.10` or `007` stay strings.
pub fn parse_value(s: &str) -> Value {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Number(n)) if n.to_string() != s => Value::String(s.to_string()),
        Ok(v) => v,
        Err(_) => Value::String(s.to_string()),
    }
}
