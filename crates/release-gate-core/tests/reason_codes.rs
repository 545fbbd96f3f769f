// release-gate-core/tests/reason_codes.rs
// ============================================================================
// Module: Reason-Code Catalog Tests
// Description: Tests for catalog lint, naming, and alias resolution.
// Purpose: Validate the canonicalization rules every emitted code obeys.
// Dependencies: release-gate-core, serde_json
// ============================================================================
//! ## Overview
//! The catalog lint enforces the severity-prefixed naming rule and rejects
//! duplicates and empty catalogs; deprecated aliases resolve onto canonical
//! codes before membership is tested.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use release_gate_core::ReasonCodeCatalog;
use release_gate_core::core::codes::is_well_formed;
use serde_json::json;

/// Parses a catalog document.
fn catalog(payload: serde_json::Value) -> ReasonCodeCatalog {
    serde_json::from_value(payload).unwrap()
}

/// Verifies the naming rule accepts severity-prefixed upper-case codes.
#[test]
fn naming_rule_accepts_canonical_spellings() {
    assert!(is_well_formed("HARD_THRESHOLD_BREACH"));
    assert!(is_well_formed("WARN_SOFT_CAP"));
    assert!(is_well_formed("INFO_NOTE_2"));
}

/// Verifies the naming rule rejects other spellings.
#[test]
fn naming_rule_rejects_malformed_spellings() {
    assert!(!is_well_formed("BAD_REASON_CODE"));
    assert!(!is_well_formed("hard_threshold_breach"));
    assert!(!is_well_formed("HARD_"));
    assert!(!is_well_formed("HARD-THRESHOLD"));
}

/// Verifies an empty catalog lints as a single structural issue.
#[test]
fn empty_catalog_fails_lint() {
    let issues = catalog(json!({"codes": []})).lint();
    assert_eq!(issues, vec![String::from("reason code file has empty or invalid 'codes' list")]);
}

/// Verifies duplicates and malformed names are both reported.
#[test]
fn duplicates_and_malformed_names_are_reported() {
    let issues = catalog(json!({
        "codes": [
            {"code": "HARD_A", "severity": "HARD", "hardGate": true},
            {"code": "HARD_A", "severity": "HARD", "hardGate": true},
            {"code": "bad_code", "severity": "INFO", "hardGate": false},
        ]
    }))
    .lint();
    assert!(issues.iter().any(|issue| issue.contains("duplicate reason code: HARD_A")));
    assert!(issues.iter().any(|issue| issue.contains("invalid reason code naming")));
}

/// Verifies required-code validation names each absentee.
#[test]
fn missing_required_codes_are_named() {
    let doc = catalog(json!({
        "codes": [{"code": "HARD_A", "severity": "HARD", "hardGate": true}]
    }));
    let issues = doc.missing_required(&[String::from("HARD_A"), String::from("HARD_B")]);
    assert_eq!(issues, vec![String::from("required code missing: HARD_B")]);
}

/// Verifies alias resolution and canonical membership.
#[test]
fn aliases_resolve_to_canonical_codes() {
    let doc = catalog(json!({
        "codes": [{"code": "HARD_THRESHOLD_BREACH", "severity": "HARD", "hardGate": true}],
        "deprecatedAliases": [
            {"alias": "HARD_LIMIT_BREACH", "canonical": "HARD_THRESHOLD_BREACH"}
        ],
    }));
    assert_eq!(doc.resolve("HARD_LIMIT_BREACH"), "HARD_THRESHOLD_BREACH");
    assert!(doc.is_canonical("HARD_LIMIT_BREACH"));
    assert!(doc.is_canonical("HARD_THRESHOLD_BREACH"));
    assert!(!doc.is_canonical("HARD_UNHEARD_OF"));
}
