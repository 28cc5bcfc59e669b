use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_json::{json, Value as JsonValue};
use smol_str::SmolStr;
use std::borrow::Cow;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single field value inside a record.
///
/// `Null` doubles as "absent": the record model hands it out instead of
/// failing when a field is missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Text(SmolStr),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Category(SmolStr),
}

impl Value {
    /// Get value as string reference (text and category only)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Category(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get value as f64 (integer and decimal only)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Decimal(_))
    }

    /// Text rendering used by substring filters and exact-match filters.
    ///
    /// Absent values render as the empty string. Decimals without a
    /// fractional part render without one (`15.0` -> `"15"`).
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Text(s) | Value::Category(s) => Cow::Borrowed(s.as_str()),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Decimal(d) => Cow::Owned(d.to_string()),
            Value::Date(d) => Cow::Owned(d.format(DATE_FORMAT).to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(SmolStr::new(s))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// Loose conversion from stored JSON. Strings stay text; the schema decides
/// later whether they are dates, categories or mis-typed numbers.
impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Text(SmolStr::new(if b { "true" } else { "false" })),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Decimal(n.as_f64().unwrap_or(0.0)),
            },
            JsonValue::String(s) => Value::Text(SmolStr::from(s)),
            other => Value::Text(SmolStr::from(other.to_string())),
        }
    }
}

impl From<&Value> for JsonValue {
    fn from(val: &Value) -> Self {
        match val {
            Value::Null => JsonValue::Null,
            Value::Text(s) | Value::Category(s) => JsonValue::String(s.to_string()),
            Value::Integer(i) => json!(i),
            Value::Decimal(d) => json!(d),
            Value::Date(d) => JsonValue::String(d.format(DATE_FORMAT).to_string()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        JsonValue::from(self).serialize(serializer)
    }
}
