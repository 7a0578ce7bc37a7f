use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::BatchError;

/// A scalar value stored in an [`ExecutionContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContextValue {
    String(String),
    Long(i64),
    /// NaN and infinities are kept: they are stored as `"NaN"`, `"Infinity"` and `"-Infinity"`.
    Double(#[serde(with = "double")] f64),
    Bool(bool),
}

/// JSON has no literal for non-finite numbers, they are written as strings.
mod double {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const NAN: &str = "NaN";
    const INFINITY: &str = "Infinity";
    const NEG_INFINITY: &str = "-Infinity";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str(INFINITY)
        } else if value.is_infinite() {
            serializer.serialize_str(NEG_INFINITY)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid double: {}", other))),
            },
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::String(value) => write!(f, "{}", value),
            ContextValue::Long(value) => write!(f, "{}", value),
            ContextValue::Double(value) => write!(f, "{}", value),
            ContextValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// Key/value state attached to a job execution or to a step execution.
///
/// Keys keep their insertion order. The job-scoped context is shared by all the
/// steps of one job execution, the step-scoped one is private to its step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    entries: IndexMap<String, ContextValue>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: ContextValue) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn put_string(&mut self, key: &str, value: &str) {
        self.put(key, ContextValue::String(value.to_string()));
    }

    pub fn put_long(&mut self, key: &str, value: i64) {
        self.put(key, ContextValue::Long(value));
    }

    pub fn put_double(&mut self, key: &str, value: f64) {
        self.put(key, ContextValue::Double(value));
    }

    pub fn put_bool(&mut self, key: &str, value: bool) {
        self.put(key, ContextValue::Bool(value));
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(ContextValue::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Reads a string, falling back to `default` when the key is absent or not a string.
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or(default).to_string()
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(ContextValue::Long(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_long_or(&self, key: &str, default: i64) -> i64 {
        self.get_long(key).unwrap_or(default)
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(ContextValue::Double(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_double_or(&self, key: &str, default: f64) -> f64 {
        self.get_double(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(ContextValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.entries.iter()
    }

    /// Copies every entry of `other` into this context, overriding existing keys.
    pub fn merge(&mut self, other: &ExecutionContext) {
        for (key, value) in other.iter() {
            self.put(key, value.clone());
        }
    }

    /// Serializes the entries, in order, to a JSON object.
    pub fn to_json(&self) -> Result<String, BatchError> {
        serde_json::to_string(self).map_err(|error| BatchError::JobRepository(error.to_string()))
    }

    /// Rebuilds a context from the output of [`ExecutionContext::to_json`].
    pub fn from_json(json: &str) -> Result<ExecutionContext, BatchError> {
        serde_json::from_str(json).map_err(|error| BatchError::JobRepository(error.to_string()))
    }
}
