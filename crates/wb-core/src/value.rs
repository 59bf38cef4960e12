//! Cell values and boolean coercion

pub use serde_json::Value;

/// Coerce a value to a boolean the way rule conditions expect
///
/// `null`, `false`, numeric zero and the empty string are false. Every other
/// value, including empty arrays and objects, is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
