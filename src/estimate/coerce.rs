//! Numeric coercion for loosely-typed estimate fields.
//!
//! The engine reports sizes as JSON numbers, numeric strings, the literal
//! string `"NaN"`, or omits them entirely. Callers pick a `default` for values
//! that are missing or unparseable; an explicit `"NaN"` always stays NaN so
//! that "the estimator does not know" never collapses into the default.

use serde_json::Value;

/// Coerce an optional JSON value into an `f64`.
///
/// - numbers convert directly
/// - strings are trimmed and lower-cased; `"nan"` yields NaN, anything else is
///   parsed as a float and falls back to `default` on failure
/// - absent values and every other JSON type yield `default`
///
/// # Example
///
/// ```
/// use scanguard::estimate::coerce;
/// use serde_json::json;
///
/// assert!(coerce(Some(&json!("NaN")), 0.0).is_nan());
/// assert_eq!(coerce(Some(&json!(42)), 0.0), 42.0);
/// assert_eq!(coerce(None, 7.0), 7.0);
/// ```
pub fn coerce(value: Option<&Value>, default: f64) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => coerce_str(s, default),
        _ => default,
    }
}

/// Coerce a numeric-looking string into an `f64`.
pub fn coerce_str(s: &str, default: f64) -> f64 {
    let normalized = s.trim().to_lowercase();
    if normalized == "nan" {
        return f64::NAN;
    }
    normalized.parse::<f64>().unwrap_or(default)
}
