// ── Lenient JSON field coercion ──
//
// Panel payloads mix numbers, numeric strings, floats and nulls for the
// same field depending on the fork and version. Every helper here maps
// malformed or negative input to a safe default instead of failing.

use serde_json::Value;

pub(crate) const GIB: u64 = 1024 * 1024 * 1024;

/// Integer view of a JSON value. Floats are truncated, numeric strings
/// are parsed, anything else is `None`.
pub(crate) fn int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
        }
        _ => None,
    }
}

/// Float view of a JSON value (numbers and numeric strings).
pub(crate) fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

/// Non-negative byte count. Missing, malformed or negative → `0`.
pub(crate) fn bytes(value: Option<&Value>) -> u64 {
    value
        .and_then(int)
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}

/// A "GB" magnitude converted to bytes (×1024³). Non-positive → `0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
pub(crate) fn gigabytes(value: Option<&Value>) -> u64 {
    match value.and_then(float) {
        Some(gb) if gb > 0.0 => {
            let bytes = gb * GIB as f64;
            if bytes >= u64::MAX as f64 {
                u64::MAX
            } else {
                bytes as u64
            }
        }
        _ => 0,
    }
}

/// Boolean flag. Accepts bools, non-zero numbers and `"true"`/`"1"`.
pub(crate) fn flag(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => default,
    }
}

/// Trimmed, non-empty string.
pub(crate) fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn float_to_i64(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < 9.0e18).then(|| f.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bytes_accepts_numbers_and_strings() {
        assert_eq!(bytes(Some(&json!(42))), 42);
        assert_eq!(bytes(Some(&json!("42"))), 42);
        assert_eq!(bytes(Some(&json!(42.9))), 42);
        assert_eq!(bytes(Some(&json!("1e3"))), 1000);
    }

    #[test]
    fn bytes_coerces_garbage_to_zero() {
        assert_eq!(bytes(None), 0);
        assert_eq!(bytes(Some(&json!(-5))), 0);
        assert_eq!(bytes(Some(&json!("lots"))), 0);
        assert_eq!(bytes(Some(&json!(null))), 0);
        assert_eq!(bytes(Some(&json!([1]))), 0);
    }

    #[test]
    fn gigabytes_scale_by_gib() {
        assert_eq!(gigabytes(Some(&json!(1))), GIB);
        assert_eq!(gigabytes(Some(&json!(0.5))), GIB / 2);
        assert_eq!(gigabytes(Some(&json!(-1))), 0);
        assert_eq!(gigabytes(Some(&json!("2"))), 2 * GIB);
    }

    #[test]
    fn flags() {
        assert!(flag(None, true));
        assert!(!flag(Some(&json!(false)), true));
        assert!(flag(Some(&json!(1)), false));
        assert!(flag(Some(&json!("TRUE")), false));
        assert!(!flag(Some(&json!("no")), true));
    }
}
