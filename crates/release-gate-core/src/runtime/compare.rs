// release-gate-core/src/runtime/compare.rs
// ============================================================================
// Module: Release Gate Verdict Comparison
// Description: Structural validation and comparison of two verdicts.
// Purpose: Prove a reworked pipeline reproduces the baseline decision.
// Dependencies: serde, serde_json, crate::core::time
// ============================================================================

//! ## Overview
//! Both documents must satisfy the verdict type contract before comparison.
//! The comparison reports whether the results agree, the symmetric
//! difference of reason codes, and whether any configuration fingerprint
//! changed. Equivalence requires the same result and no codes present only
//! in the candidate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::time::utc_now_iso;

// ============================================================================
// SECTION: Type Contract
// ============================================================================

/// Fields every verdict document must carry, with their expected JSON types.
const REQUIRED_FIELDS: [(&str, JsonKind); 11] = [
    ("version", JsonKind::String),
    ("generatedAt", JsonKind::String),
    ("runId", JsonKind::String),
    ("result", JsonKind::String),
    ("decisionWeight", JsonKind::String),
    ("reasonCodes", JsonKind::Array),
    ("profileHash", JsonKind::String),
    ("thresholdsHash", JsonKind::String),
    ("statisticsLockHash", JsonKind::String),
    ("registryVersion", JsonKind::String),
    ("metricVersions", JsonKind::Object),
];

/// Admissible verdict result labels.
const RESULT_LABELS: [&str; 3] = ["NO_GO", "PAPER_ONLY_GO", "BLOCKED_WITH_RECOVERY_PLAN"];

/// JSON type expectation for a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonKind {
    /// Expect a string.
    String,
    /// Expect an array.
    Array,
    /// Expect an object.
    Object,
}

impl JsonKind {
    /// Returns the expectation's display name.
    const fn name(self) -> &'static str {
        match self {
            Self::String => "str",
            Self::Array => "list",
            Self::Object => "dict",
        }
    }

    /// Reports whether a value satisfies the expectation.
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// Returns the Python-style type name of a JSON value for error messages.
const fn observed_name(value: Option<&Value>) -> &'static str {
    match value {
        None | Some(Value::Null) => "NoneType",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "str",
        Some(Value::Array(_)) => "list",
        Some(Value::Object(_)) => "dict",
    }
}

/// Validates one verdict document, producing field-level errors.
#[must_use]
pub fn validate_verdict_payload(name: &str, payload: &Value) -> Vec<String> {
    let mut issues: Vec<String> = Vec::new();
    for (field, kind) in REQUIRED_FIELDS {
        let value = payload.get(field);
        if !value.is_some_and(|present| kind.matches(present)) {
            issues.push(format!(
                "{name}: field '{field}' must be {}, got {}",
                kind.name(),
                observed_name(value)
            ));
        }
    }

    if let Some(Value::String(result)) = payload.get("result") {
        if !RESULT_LABELS.contains(&result.as_str()) {
            issues.push(format!("{name}: result has invalid enum value '{result}'"));
        }
    }

    if let Some(Value::Array(codes)) = payload.get("reasonCodes") {
        if codes.iter().any(|code| !code.is_string()) {
            issues.push(format!("{name}: reasonCodes must contain only strings"));
        }
    }

    issues
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Reason-code difference between baseline and candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonCodeDiff {
    /// Distinct codes on the baseline side.
    pub baseline_count: usize,
    /// Distinct codes on the candidate side.
    pub candidate_count: usize,
    /// Codes present only in the baseline.
    pub only_in_baseline: Vec<String>,
    /// Codes present only in the candidate.
    pub only_in_candidate: Vec<String>,
}

/// Verdict comparison outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictComparison {
    /// Whether both documents reached the same result.
    pub same_result: bool,
    /// Baseline result label.
    pub baseline_result: Option<String>,
    /// Candidate result label.
    pub candidate_result: Option<String>,
    /// Reason-code difference.
    pub reason_codes: ReasonCodeDiff,
    /// Whether the profile hash changed.
    pub profile_hash_changed: bool,
    /// Whether the thresholds hash changed.
    pub thresholds_hash_changed: bool,
    /// Whether the statistics-lock hash changed.
    pub statistics_lock_hash_changed: bool,
}

impl VerdictComparison {
    /// Reports whether the candidate is equivalent to the baseline.
    #[must_use]
    pub fn is_equivalent(&self) -> bool {
        self.same_result && self.reason_codes.only_in_candidate.is_empty()
    }
}

/// Extracts the distinct string reason codes of a document.
fn reason_code_set(payload: &Value) -> BTreeSet<String> {
    match payload.get("reasonCodes") {
        Some(Value::Array(codes)) => codes
            .iter()
            .filter_map(|code| code.as_str().map(str::to_string))
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Compares two validated verdict documents.
#[must_use]
pub fn compare_verdicts(baseline: &Value, candidate: &Value) -> VerdictComparison {
    let baseline_result = baseline.get("result").and_then(Value::as_str).map(str::to_string);
    let candidate_result = candidate.get("result").and_then(Value::as_str).map(str::to_string);

    let baseline_codes = reason_code_set(baseline);
    let candidate_codes = reason_code_set(candidate);
    let only_in_baseline: Vec<String> =
        baseline_codes.difference(&candidate_codes).cloned().collect();
    let only_in_candidate: Vec<String> =
        candidate_codes.difference(&baseline_codes).cloned().collect();

    let hash_changed = |field: &str| baseline.get(field) != candidate.get(field);

    VerdictComparison {
        same_result: baseline_result == candidate_result,
        baseline_result,
        candidate_result,
        reason_codes: ReasonCodeDiff {
            baseline_count: baseline_codes.len(),
            candidate_count: candidate_codes.len(),
            only_in_baseline,
            only_in_candidate,
        },
        profile_hash_changed: hash_changed("profileHash"),
        thresholds_hash_changed: hash_changed("thresholdsHash"),
        statistics_lock_hash_changed: hash_changed("statisticsLockHash"),
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Comparison report (`migration_compare_report.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareReport {
    /// Report schema version.
    pub version: String,
    /// Emission stamp.
    pub generated_at: String,
    /// Baseline document path.
    pub baseline_path: String,
    /// Candidate document path.
    pub candidate_path: String,
    /// Whether both documents passed the type contract.
    pub valid: bool,
    /// Validation errors, empty when valid.
    pub errors: Vec<String>,
    /// Comparison outcome, present when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<VerdictComparison>,
}

/// Runs validation and comparison over two loaded documents.
#[must_use]
pub fn compare_documents(
    baseline_path: &str,
    candidate_path: &str,
    baseline: &Value,
    candidate: &Value,
) -> CompareReport {
    let mut errors = validate_verdict_payload("baseline", baseline);
    errors.extend(validate_verdict_payload("candidate", candidate));

    if errors.is_empty() {
        CompareReport {
            version: String::from("v1"),
            generated_at: utc_now_iso(),
            baseline_path: baseline_path.to_string(),
            candidate_path: candidate_path.to_string(),
            valid: true,
            errors,
            comparison: Some(compare_verdicts(baseline, candidate)),
        }
    } else {
        CompareReport {
            version: String::from("v1"),
            generated_at: utc_now_iso(),
            baseline_path: baseline_path.to_string(),
            candidate_path: candidate_path.to_string(),
            valid: false,
            errors,
            comparison: None,
        }
    }
}
