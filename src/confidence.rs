//! Confidence arithmetic shared by the propagator, the evaluator and the
//! request boundary.
//!
//! Confidences are plain `f64` values in `[0.0, 1.0]`. Anything that enters
//! the engine from outside is clamped here first.

use serde_json::Value;

/// Confidence given to an observed concept that has no explicit weight.
pub const FULL_CONFIDENCE: f64 = 1.0;

/// Decimal places kept in reported rule scores.
pub const SCORE_PRECISION: i32 = 3;

/// Clamp a confidence into `[0.0, 1.0]`.
///
/// NaN clamps to `0.0` so a poisoned value can never satisfy a condition.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Round a score to [`SCORE_PRECISION`] decimal places.
pub fn round_score(x: f64) -> f64 {
    let scale = 10f64.powi(SCORE_PRECISION);
    (x * scale).round() / scale
}

/// Interpret a loosely-typed weight.
///
/// JSON numbers are taken as-is and strings are parsed as numbers. Everything
/// else (booleans, null, arrays, unparseable or non-finite strings) yields
/// `None`, which callers treat as "no weight given".
pub fn parse_weight(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => parse_weight_str(s),
        _ => None,
    }
}

/// Parse a textual weight such as `"0.75"` or `" 1 "`.
pub fn parse_weight_str(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}
