//! SQL ordering over values.

use std::cmp::Ordering;

use super::Value;

/// Compares two values with explicit NULL placement.
///
/// `nulls_first` controls whether NULL sorts before or after non-null
/// values; the SQL standard default is NULLS LAST.
///
/// # Float comparison and NaN handling
///
/// NaN values compare equal to each other and to any float, keeping the
/// sort order stable; use `nulls_first` to control where missing values
/// land instead.
#[must_use]
pub fn compare_values(a: &Value, b: &Value, nulls_first: bool) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => {
            if nulls_first {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (_, Value::Null) => {
            if nulls_first {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
