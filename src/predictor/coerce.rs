use serde_json::Value;

/// Numeric coercion for payload values.
///
/// Numbers pass through, booleans map to 1.0/0.0 and strings are parsed after
/// trimming surrounding whitespace. `null`, arrays, objects and anything that
/// parses to NaN or an infinity are not numeric: the fitted model cannot
/// consume them.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|v| v.is_finite())
}
