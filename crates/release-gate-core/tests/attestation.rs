// release-gate-core/tests/attestation.rs
// ============================================================================
// Module: Attestation Validation Tests
// Description: Tests for dual-control attestation checks.
// Purpose: Validate allowlist membership, dual control, and payload shape.
// Dependencies: release-gate-core, serde_json
// ============================================================================
//! ## Overview
//! Exercises the attestation validator: both signers must be distinct active
//! owners, the mode must be recognized, stamps must be strings, and the
//! scope must be a non-empty list.

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

use release_gate_core::ActingOwners;
use release_gate_core::runtime::attestation::AttestationPayload;
use release_gate_core::runtime::attestation::validate_attestation;
use serde_json::json;

/// Builds an owners document with two active and one inactive owner.
fn owners() -> ActingOwners {
    serde_json::from_value(json!({
        "owners": [
            {"id": "alice", "active": true, "role": "research"},
            {"id": "bob", "active": true, "role": "ops"},
            {"id": "mallory", "active": false},
            {"id": "  ", "active": true},
        ]
    }))
    .unwrap()
}

/// Builds a well-formed dual-control payload.
fn valid_payload() -> AttestationPayload {
    serde_json::from_value(json!({
        "mode": "manual_attest",
        "attestedBy": "alice",
        "reviewedBy": "bob",
        "attestedAt": "2026-05-02T10:00:00Z",
        "reviewedAt": "2026-05-02T10:05:00Z",
        "scope": ["paper_only_release"],
    }))
    .unwrap()
}

/// Verifies the active-owner set ignores inactive and blank entries.
#[test]
fn active_ids_filter_inactive_and_blank() {
    let ids = owners().active_ids();
    assert!(ids.contains("alice"));
    assert!(ids.contains("bob"));
    assert_eq!(ids.len(), 2);
}

/// Verifies a well-formed dual-control payload passes.
#[test]
fn valid_dual_control_passes() {
    let (passed, issues) = validate_attestation(&valid_payload(), &owners());
    assert!(passed);
    assert!(issues.is_empty());
}

/// Verifies identical attester and reviewer fail even when both are listed.
#[test]
fn same_attester_and_reviewer_fails() {
    let mut payload = valid_payload();
    payload.reviewed_by = Some(String::from("alice"));
    let (passed, issues) = validate_attestation(&payload, &owners());
    assert!(!passed);
    assert!(issues.iter().any(|issue| issue.contains("must differ")));
}

/// Verifies an inactive owner is rejected.
#[test]
fn inactive_owner_is_rejected() {
    let mut payload = valid_payload();
    payload.attested_by = Some(String::from("mallory"));
    let (passed, issues) = validate_attestation(&payload, &owners());
    assert!(!passed);
    assert!(issues.iter().any(|issue| issue.contains("attestedBy")));
}

/// Verifies an unrecognized mode aborts with a single issue.
#[test]
fn invalid_mode_aborts_early() {
    let mut payload = valid_payload();
    payload.mode = Some(String::from("self_attest"));
    let (passed, issues) = validate_attestation(&payload, &owners());
    assert!(!passed);
    assert_eq!(issues, vec![String::from("attestation.mode invalid")]);
}

/// Verifies missing stamps and an empty scope are all reported.
#[test]
fn missing_stamps_and_scope_are_reported() {
    let payload: AttestationPayload = serde_json::from_value(json!({
        "mode": "key_signed_attest",
        "attestedBy": "alice",
        "reviewedBy": "bob",
        "scope": [],
    }))
    .unwrap();
    let (passed, issues) = validate_attestation(&payload, &owners());
    assert!(!passed);
    assert!(issues.iter().any(|issue| issue.contains("attestedAt")));
    assert!(issues.iter().any(|issue| issue.contains("reviewedAt")));
    assert!(issues.iter().any(|issue| issue.contains("scope")));
}
