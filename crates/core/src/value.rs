use std::fmt;

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::Serialize;

/// Date format used when reading and displaying [`Value::Date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single field value.
///
/// `Null` is an explicit variant: a table never represents a missing value
/// by leaving a field out. Floats are wrapped in [`OrderedFloat`] so values
/// can be used as hash keys during joins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Str(String),
    Int(i64),
    Float(OrderedFloat<f64>),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Text used for name comparison. `None` for nulls.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Str(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Parse a raw cell, guessing the narrowest type.
    ///
    /// Integers, then floats, then `YYYY-MM-DD` dates; everything else stays text.
    /// Callers decide what an empty cell means, so this never returns `Null`.
    pub fn infer(raw: &str) -> Value {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(OrderedFloat(f));
            }
        }
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            return Value::Date(d);
        }
        Value::Str(raw.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            // Keep a fractional part so the text reads back as a float.
            Value::Float(x) if x.0.fract() == 0.0 && x.0.abs() < 1e15 => write!(f, "{:.1}", x.0),
            Value::Float(x) => write!(f, "{}", x.0),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(OrderedFloat(f))
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
