//! Scalar leaf values and device-response coercion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A terminal value stored at a leaf of the tree.
///
/// Serialized untagged, so a file holds plain JSON numbers and strings.
/// Variant order matters for deserialization: integers are tried before
/// floats so that `4` stays an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Coerce a raw device reply into a typed value.
    ///
    /// Tries a float parse first and collapses whole numbers to integers, so
    /// `"4.0"` becomes `Integer(4)`. This is lossy; instruments
    /// report integral settings in float notation. Anything that does not
    /// parse is kept as text, and so are `NAN` and `INF` replies: JSON has no
    /// number for them.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(f) if !f.is_finite() => ScalarValue::Text(trimmed.to_string()),
            Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                ScalarValue::Integer(f as i64)
            }
            Ok(f) => ScalarValue::Float(f),
            Err(_) => ScalarValue::Text(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Integer(i) => Some(*i as f64),
            ScalarValue::Float(f) => Some(*f),
            ScalarValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(i) => write!(f, "{}", i),
            // Keep a decimal point on whole floats so "1.0" and "1" stay distinct
            ScalarValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Integer(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Integer(i64::from(v))
    }
}

impl From<u32> for ScalarValue {
    fn from(v: u32) -> Self {
        ScalarValue::Integer(i64::from(v))
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Text(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::Text(v)
    }
}

impl From<&ScalarValue> for ScalarValue {
    fn from(v: &ScalarValue) -> Self {
        v.clone()
    }
}
