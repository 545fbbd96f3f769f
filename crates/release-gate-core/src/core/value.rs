// release-gate-core/src/core/value.rs
// ============================================================================
// Module: Release Gate Loose-JSON Helpers
// Description: Ordered key fallback and type coercion over untyped JSON.
// Purpose: Give every gate an explicit, deterministic view of legacy inputs.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Evidence documents arrive with multiple legacy key spellings. Each gate
//! declares an ordered fallback list per field and resolves it through these
//! helpers: pick the first present key, type-check it, and fall back to a
//! default. Booleans never coerce to numbers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Scalar Coercion
// ============================================================================

/// Returns the value as a finite float, rejecting booleans.
#[must_use]
pub fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

/// Returns the value as an integer, accepting integral floats.
#[must_use]
pub fn as_int(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(int) = number.as_i64() {
        return Some(int);
    }
    let raw = number.as_f64()?;
    if raw.fract() == 0.0 && raw.abs() < 9.007_199_254_740_992e15 {
        #[allow(clippy::cast_possible_truncation, reason = "integral value within i64 range")]
        return Some(raw as i64);
    }
    None
}

/// Returns the value as a non-empty trimmed string.
#[must_use]
pub fn as_nonempty_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.as_str()),
        _ => None,
    }
}

// ============================================================================
// SECTION: Ordered Key Fallback
// ============================================================================

/// Picks the first present key that coerces to a float.
#[must_use]
pub fn pick_number(payload: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    for key in keys {
        let Some(value) = payload.get(*key) else {
            continue;
        };
        if let Some(number) = as_float(value) {
            return Some(number);
        }
    }
    None
}

/// Picks the first present key that coerces to an integer.
#[must_use]
pub fn pick_int(payload: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    for key in keys {
        let Some(value) = payload.get(*key) else {
            continue;
        };
        if let Some(number) = as_int(value) {
            return Some(number);
        }
    }
    None
}

/// Picks the first present key holding a non-empty string.
#[must_use]
pub fn pick_string<'a>(payload: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    for key in keys {
        let Some(value) = payload.get(*key) else {
            continue;
        };
        if let Some(text) = as_nonempty_str(value) {
            return Some(text);
        }
    }
    None
}

// ============================================================================
// SECTION: Shape Helpers
// ============================================================================

/// Appends a value to a string list when not already present.
pub fn push_unique(values: &mut Vec<String>, candidate: String) {
    if !values.contains(&candidate) {
        values.push(candidate);
    }
}

/// De-duplicates a string list preserving first-seen order.
#[must_use]
pub fn dedup_preserving_order(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}
