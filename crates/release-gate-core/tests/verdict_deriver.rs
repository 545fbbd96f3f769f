// release-gate-core/tests/verdict_deriver.rs
// ============================================================================
// Module: Verdict Deriver Tests
// Description: Tests for checkpoint folding and policy overrides.
// Purpose: Validate the result ladder and the two output-restriction layers.
// Dependencies: release-gate-core, serde_json
// ============================================================================
//! ## Overview
//! Folds synthetic checkpoint sets into verdicts: tool errors block,
//! policy failures split between rejection and blocked-with-recovery, clean
//! runs admit, and the `allowed_outputs` and archive-only layers can force
//! the result with `HARD_RELEASE_GATE_BLOCKED`.

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

use std::collections::BTreeMap;

use release_gate_core::Checkpoint;
use release_gate_core::Gate;
use release_gate_core::GateStatus;
use release_gate_core::Profile;
use release_gate_core::ReasonCodeCatalog;
use release_gate_core::RunFingerprint;
use release_gate_core::SourceFallbackPolicy;
use release_gate_core::VerdictResult;
use release_gate_core::runtime::deriver::derive_verdict;
use serde_json::json;

/// Builds a checkpoint with a status and reason codes.
fn checkpoint(gate: Gate, status: GateStatus, codes: &[&str]) -> Checkpoint {
    Checkpoint {
        version: String::from("v1"),
        gate,
        run_id: String::from("run-derive"),
        attempt: 1,
        idempotency_key: String::from("key"),
        resumed_from: None,
        status,
        reason_codes: codes.iter().map(|code| (*code).to_string()).collect(),
        blocking_issues: Vec::new(),
        started_at: String::from("2026-05-02T10:00:00Z"),
        ended_at: String::from("2026-05-02T10:00:01Z"),
        duration_ms: 1_000,
        profile_hash: String::from("p-1"),
        thresholds_hash: String::from("t-1"),
        statistics_lock_hash: String::from("s-1"),
        registry_version: String::from("v1"),
        metric_versions: BTreeMap::new(),
        dataset_snapshot_hash: None,
        decision_weight: Some(String::from("limited")),
        attestation: None,
        details: json!({}),
    }
}

/// Builds the fingerprint matching the synthetic checkpoints.
fn fingerprint() -> RunFingerprint {
    RunFingerprint {
        profile_hash: String::from("p-1"),
        thresholds_hash: String::from("t-1"),
        statistics_lock_hash: String::from("s-1"),
        registry_version: String::from("v1"),
        metric_versions: BTreeMap::new(),
    }
}

/// Builds a catalog containing the given canonical codes.
fn catalog(codes: &[&str]) -> ReasonCodeCatalog {
    let entries: Vec<serde_json::Value> = codes
        .iter()
        .map(|code| json!({"code": code, "severity": "HARD", "hardGate": true}))
        .collect();
    serde_json::from_value(json!({"codes": entries, "deprecatedAliases": []})).unwrap()
}

/// Derives a verdict with a default profile and policy.
fn derive(
    checkpoints: &[Checkpoint],
    profile: &Profile,
    policy: &SourceFallbackPolicy,
    doc: &ReasonCodeCatalog,
) -> release_gate_core::Verdict {
    derive_verdict(checkpoints, profile, policy, doc, "run-derive", &fingerprint())
}

/// Verifies a clean run admits.
#[test]
fn all_pass_admits() {
    let profile = Profile::from_value(json!({})).unwrap();
    let checkpoints: Vec<Checkpoint> =
        Gate::ALL.iter().map(|gate| checkpoint(*gate, GateStatus::Pass, &[])).collect();
    let verdict = derive(
        &checkpoints,
        &profile,
        &SourceFallbackPolicy::default(),
        &catalog(&[]),
    );
    assert_eq!(verdict.result, VerdictResult::PaperOnlyGo);
    assert!(verdict.reason_codes.is_empty());
}

/// Verifies any tool error blocks with a recovery plan.
#[test]
fn tool_error_blocks() {
    let profile = Profile::from_value(json!({})).unwrap();
    let checkpoints = vec![
        checkpoint(Gate::G0, GateStatus::Pass, &[]),
        checkpoint(Gate::G1, GateStatus::ToolError, &["HARD_HARD_GATE_CHECK_FAILED"]),
    ];
    let verdict = derive(
        &checkpoints,
        &profile,
        &SourceFallbackPolicy::default(),
        &catalog(&["HARD_HARD_GATE_CHECK_FAILED"]),
    );
    assert_eq!(verdict.result, VerdictResult::BlockedWithRecoveryPlan);
}

/// Verifies a plain policy failure rejects.
#[test]
fn plain_policy_fail_rejects() {
    let profile = Profile::from_value(json!({})).unwrap();
    let checkpoints = vec![checkpoint(Gate::G3, GateStatus::PolicyFail, &["HARD_THRESHOLD_BREACH"])];
    let verdict = derive(
        &checkpoints,
        &profile,
        &SourceFallbackPolicy::default(),
        &catalog(&["HARD_THRESHOLD_BREACH"]),
    );
    assert_eq!(verdict.result, VerdictResult::NoGo);
}

/// Verifies recovery-class codes escalate a policy failure to blocked.
#[test]
fn recovery_class_codes_escalate() {
    let profile = Profile::from_value(json!({})).unwrap();
    let checkpoints =
        vec![checkpoint(Gate::G3, GateStatus::PolicyFail, &["HARD_BUDGET_HARD_CAP_HIT"])];
    let verdict = derive(
        &checkpoints,
        &profile,
        &SourceFallbackPolicy::default(),
        &catalog(&["HARD_BUDGET_HARD_CAP_HIT"]),
    );
    assert_eq!(verdict.result, VerdictResult::BlockedWithRecoveryPlan);
}

/// Verifies unknown codes escalate with the unknown-code marker.
#[test]
fn unknown_codes_add_marker() {
    let profile = Profile::from_value(json!({})).unwrap();
    let checkpoints = vec![checkpoint(Gate::G2, GateStatus::PolicyFail, &["BAD_REASON_CODE"])];
    let verdict = derive(
        &checkpoints,
        &profile,
        &SourceFallbackPolicy::default(),
        &catalog(&["HARD_REASON_CODE_UNKNOWN"]),
    );
    assert!(verdict.reason_codes.contains(&String::from("BAD_REASON_CODE")));
    assert!(verdict.reason_codes.contains(&String::from("HARD_REASON_CODE_UNKNOWN")));
    assert!(
        verdict.blocking_issues.iter().any(|issue| issue.contains("unknown reason code"))
    );
}

/// Verifies deprecated aliases resolve before membership testing.
#[test]
fn deprecated_aliases_resolve_cleanly() {
    let profile = Profile::from_value(json!({})).unwrap();
    let doc: ReasonCodeCatalog = serde_json::from_value(json!({
        "codes": [{"code": "HARD_THRESHOLD_BREACH", "severity": "HARD", "hardGate": true}],
        "deprecatedAliases": [
            {"alias": "HARD_LIMIT_BREACH", "canonical": "HARD_THRESHOLD_BREACH"}
        ],
    }))
    .unwrap();
    let checkpoints = vec![checkpoint(Gate::G3, GateStatus::PolicyFail, &["HARD_LIMIT_BREACH"])];
    let verdict = derive(&checkpoints, &profile, &SourceFallbackPolicy::default(), &doc);
    assert_eq!(verdict.reason_codes, vec![String::from("HARD_THRESHOLD_BREACH")]);
    assert_eq!(verdict.result, VerdictResult::NoGo);
}

/// Verifies the profile's allowed outputs force a rejection.
#[test]
fn allowed_outputs_restriction_forces_no_go() {
    let profile = Profile::from_value(json!({
        "decision": {"allowed_outputs": ["NO_GO"]}
    }))
    .unwrap();
    let checkpoints: Vec<Checkpoint> =
        Gate::ALL.iter().map(|gate| checkpoint(*gate, GateStatus::Pass, &[])).collect();
    let verdict = derive(
        &checkpoints,
        &profile,
        &SourceFallbackPolicy::default(),
        &catalog(&["HARD_RELEASE_GATE_BLOCKED"]),
    );
    assert_eq!(verdict.result, VerdictResult::NoGo);
    assert!(verdict.reason_codes.contains(&String::from("HARD_RELEASE_GATE_BLOCKED")));
}

/// Verifies archive-only mode blocks a disallowed admit.
#[test]
fn archive_only_blocks_disallowed_admit() {
    let profile = Profile::from_value(json!({})).unwrap();
    let policy: SourceFallbackPolicy = serde_json::from_value(json!({
        "mode": "archive_only",
        "archiveOnly": {"allowedOutputs": ["NO_GO", "BLOCKED_WITH_RECOVERY_PLAN"]},
    }))
    .unwrap();
    let checkpoints: Vec<Checkpoint> =
        Gate::ALL.iter().map(|gate| checkpoint(*gate, GateStatus::Pass, &[])).collect();
    let verdict = derive(
        &checkpoints,
        &profile,
        &policy,
        &catalog(&["HARD_RELEASE_GATE_BLOCKED"]),
    );
    assert_eq!(verdict.result, VerdictResult::BlockedWithRecoveryPlan);
    assert!(verdict.blocking_issues.contains(&String::from("archive_only forbids this verdict")));
}

/// Verifies skipped checkpoints do not demote a clean run.
#[test]
fn skipped_checkpoints_keep_admit() {
    let profile = Profile::from_value(json!({})).unwrap();
    let checkpoints = vec![
        checkpoint(Gate::G0, GateStatus::Pass, &[]),
        checkpoint(Gate::G1, GateStatus::Skipped, &[]),
    ];
    let verdict = derive(
        &checkpoints,
        &profile,
        &SourceFallbackPolicy::default(),
        &catalog(&[]),
    );
    assert_eq!(verdict.result, VerdictResult::PaperOnlyGo);
}
