use crate::engine::types::{Record, Value};
use std::cmp::Ordering;

/// Compare two values by the natural ordering of their type.
///
/// Absent values sort first. Integers and decimals compare numerically
/// with each other; text and categories compare lexicographically; dates
/// chronologically. Mixed kinds fall back to a fixed type rank.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(vb)) => compare_values(Some(&Value::Null), Some(vb)),
        (Some(va), None) => compare_values(Some(va), Some(&Value::Null)),
        (Some(va), Some(vb)) => match (va, vb) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Integer(ia), Value::Integer(ib)) => ia.cmp(ib),
            (na, nb) if na.is_numeric() && nb.is_numeric() => {
                let (fa, fb) = (na.as_f64().unwrap_or(0.0), nb.as_f64().unwrap_or(0.0));
                fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
            }
            (Value::Date(da), Value::Date(db)) => da.cmp(db),
            (sa, sb) if sa.as_str().is_some() && sb.as_str().is_some() => {
                sa.as_str().cmp(&sb.as_str())
            }
            _ => type_rank(va).cmp(&type_rank(vb)),
        },
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Integer(_) | Value::Decimal(_) => 1,
        Value::Date(_) => 2,
        Value::Text(_) | Value::Category(_) => 3,
    }
}

/// Compare two records on one field.
#[inline]
pub fn compare_records(a: &Record, b: &Record, field: &str) -> Ordering {
    compare_values(a.get(field), b.get(field))
}

/// Case-insensitive substring match on the text rendering of a value.
/// `needle_lower` must already be lower-cased.
#[inline]
pub fn contains_folded(value: &Value, needle_lower: &str) -> bool {
    value.to_text().to_lowercase().contains(needle_lower)
}
