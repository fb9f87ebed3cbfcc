// ── Reported property values ──
//
// The shadow reports untyped JSON. `RawValue` pins that down to the
// shapes devices actually report, and `Reading` is what a consumer gets
// after the data point's factor has been applied.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A property value exactly as the device reported it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
    /// Arrays and objects, passed through untouched.
    Other(Value),
}

impl RawValue {
    /// The value as `f64`, if it is numeric. Booleans are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Apply `factor` by multiplication when the value is numeric;
    /// anything else comes back unchanged.
    pub fn scaled(&self, factor: f64) -> Reading {
        match self.as_f64() {
            Some(n) => Reading::Numeric(n * factor),
            None => Reading::Raw(self.clone()),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            Value::Bool(b) => Self::Bool(b),
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

/// A consumer-facing value: scaled if numeric, raw otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Numeric(f64),
    Raw(RawValue),
}

impl Reading {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Raw(raw) => write!(f, "{raw}"),
        }
    }
}
