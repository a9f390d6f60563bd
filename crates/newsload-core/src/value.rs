//! Raw cell values and the total conversions that turn them into keys.
//!
//! Source data is free-form tabular input. Nothing downstream of this module
//! ever sees a missing or malformed scalar: [`to_int`] and [`to_text`] degrade
//! to `0` and `""` instead of failing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell as produced by the upstream reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  #[default]
  Null,
  Int(i64),
  Float(f64),
  Text(String),
}

impl Value {
  /// Build a value from a raw CSV field. Blank fields are missing values.
  pub fn from_field(field: &str) -> Self {
    if field.trim().is_empty() {
      Value::Null
    } else {
      Value::Text(field.to_owned())
    }
  }

  pub fn is_null(&self) -> bool {
    match self {
      Value::Null => true,
      Value::Float(f) => f.is_nan(),
      _ => false,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => Ok(()),
      Value::Int(i) => write!(f, "{i}"),
      Value::Float(x) => write!(f, "{x}"),
      Value::Text(s) => f.write_str(s),
    }
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Value::Float(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Value::Text(v.to_owned()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Value::Text(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Value::Null, Into::into) }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Coerce a cell to an integer key. Missing or unparseable input yields `0`.
///
/// Text is parsed as an integer first and then as a float, so `"3.0"` and
/// `"1e3"` both work. Floats truncate toward zero.
pub fn to_int(value: &Value) -> i64 {
  match value {
    Value::Null => 0,
    Value::Int(i) => *i,
    Value::Float(f) => float_to_int(*f),
    Value::Text(s) => {
      let s = s.trim();
      s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().map(float_to_int))
        .unwrap_or(0)
    }
  }
}

/// Coerce a cell to a trimmed string key. Missing input yields `""`.
pub fn to_text(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::Float(f) if f.is_nan() => String::new(),
    Value::Text(s) => s.trim().to_owned(),
    other => other.to_string().trim().to_owned(),
  }
}

fn float_to_int(f: f64) -> i64 {
  if f.is_finite() { f.trunc() as i64 } else { 0 }
}
