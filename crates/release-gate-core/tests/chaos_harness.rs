// release-gate-core/tests/chaos_harness.rs
// ============================================================================
// Module: Chaos Harness Tests
// Description: Tests for isolated fault-injection pipeline runs.
// Purpose: Validate isolation guardrails and injected failure outcomes.
// Dependencies: release-gate-core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Chaos runs execute the real supervisor in an isolated root. These tests
//! verify the isolation refusal, the marker file, and that each injected
//! fault surfaces through the contracted reason codes and exit codes.

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

use std::path::Path;
use std::path::PathBuf;

use release_gate_core::ActingOwners;
use release_gate_core::ChaosScenario;
use release_gate_core::EvidencePaths;
use release_gate_core::GateContext;
use release_gate_core::MetricRegistry;
use release_gate_core::Profile;
use release_gate_core::ReasonCodeCatalog;
use release_gate_core::RunnerGuardPolicy;
use release_gate_core::SourceFallbackPolicy;
use release_gate_core::runtime::chaos::ChaosError;
use release_gate_core::runtime::chaos::run_chaos;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

/// Writes a JSON evidence file.
fn write_json(path: &Path, payload: &Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string(payload).unwrap()).unwrap();
}

/// Builds a context whose five gates pass hermetically.
fn passing_context(dir: &TempDir) -> GateContext {
    let repo_root = dir.path().join("repo");
    std::fs::create_dir_all(&repo_root).unwrap();

    let cards = repo_root.join("cards.json");
    write_json(
        &cards,
        &json!({
            "card_count": 1,
            "cards": [{
                "card_id": "card-1",
                "source_paper_id": "paper-1",
                "source_title": "Momentum decay",
                "conflict_status": "resolved",
            }],
        }),
    );
    let admission = repo_root.join("admission.json");
    write_json(&admission, &json!({"total_candidates": 2, "rows": [{"main_eligible": true}]}));
    let external = repo_root.join("external.json");
    write_json(&external, &json!({"baseline": {"net_trim10_mean": 1.0}}));
    let health = repo_root.join("health.json");
    write_json(
        &health,
        &json!({
            "stale_watch_minutes": 1.0,
            "stale_optimize_minutes": 1.0,
            "stale_queue_drain_minutes": 1.0,
            "queue_length": 1,
            "queue_legacy_ratio": 0.0,
        }),
    );
    let metrics = repo_root.join("strategy_metrics.json");
    write_json(
        &metrics,
        &json!({
            "min_trades": 500,
            "min_backtest_days": 120,
            "min_effective_observations": 5_000,
            "pbo": 0.05,
            "dsr_probability": 0.99,
            "fdr_q": 0.01,
            "baseline_net_trim10_mean": 1.0,
            "candidate_net_trim10_mean": 0.99,
        }),
    );
    let budget = repo_root.join("budget.json");
    write_json(&budget, &json!({"daily_tokens": 10, "per_task_tokens": 1, "daily_cost_usd": 0.1}));
    let attestation = repo_root.join("attestation.json");
    write_json(
        &attestation,
        &json!({
            "mode": "manual_attest",
            "attestedBy": "alice",
            "reviewedBy": "bob",
            "attestedAt": "2026-05-02T10:00:00Z",
            "reviewedAt": "2026-05-02T10:05:00Z",
            "scope": ["paper_only_release"],
        }),
    );

    let profile = Profile::from_value(json!({
        "g0": {
            "require_command_availability": false,
            "require_clock_drift": false,
            "require_secrets_hygiene": false,
        },
        "g1": {
            "env_lock_command": ["sh", "-c", "exit 0"],
            "freeze_manifest_command": ["sh", "-c", "exit 0"],
            "post_pull_sync_command": ["sh", "-c", "exit 0"],
        },
        "strategy": {"min_poc_count": 1, "pass_candidates_min": 1},
        "timeouts_minutes": {"G0": 1, "G1": 1, "G2": 1, "G3": 1, "G4": 1},
    }))
    .unwrap();

    let catalog: ReasonCodeCatalog = serde_json::from_value(json!({
        "codes": [
            {"code": "HARD_REASON_CODE_UNKNOWN", "severity": "HARD", "hardGate": true},
            {"code": "HARD_HARD_GATE_CHECK_FAILED", "severity": "HARD", "hardGate": true},
            {"code": "HARD_DATASET_SNAPSHOT_DRIFT", "severity": "HARD", "hardGate": true},
        ],
        "deprecatedAliases": [],
    }))
    .unwrap();
    let owners: ActingOwners = serde_json::from_value(json!({
        "owners": [{"id": "alice", "active": true}, {"id": "bob", "active": true}]
    }))
    .unwrap();

    GateContext {
        repo_root,
        run_id: String::new(),
        run_dir: PathBuf::new(),
        profile,
        registry: MetricRegistry::default(),
        catalog,
        owners,
        source_fallback: SourceFallbackPolicy::default(),
        evidence: EvidencePaths {
            research_cards: cards.clone(),
            admission_report: admission.clone(),
            external_report: external.clone(),
            health_report: health.clone(),
            strategy_metrics: metrics,
            budget_usage: budget,
            dataset: cards,
            features: external,
            labels: admission,
            split: health,
        },
        attestation_path: Some(attestation),
        subcheck_timeout_seconds: 10,
    }
}

/// Verifies the harness refuses a non-isolated root.
#[test]
fn refuses_repo_root_as_isolated_root() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = passing_context(&dir);
    let repo_root = ctx.repo_root.clone();
    let err =
        run_chaos(ctx, RunnerGuardPolicy::default(), &repo_root, ChaosScenario::MissingAttestation, None)
            .unwrap_err();
    assert!(matches!(err, ChaosError::NotIsolated));
}

/// Verifies the missing-attestation scenario fails G4 and rejects.
#[test]
fn missing_attestation_scenario_rejects() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = passing_context(&dir);
    let isolated = dir.path().join("chaos");
    let report = run_chaos(
        ctx,
        RunnerGuardPolicy::default(),
        &isolated,
        ChaosScenario::MissingAttestation,
        None,
    )
    .unwrap();

    assert_eq!(report.result, "NO_GO");
    assert_eq!(report.exit_code, 2);
    assert!(isolated.join(".chaos_isolated").exists());
    assert!(isolated.join("chaos_gate_runner_report.json").exists());
}

/// Verifies the unknown-reason-code scenario escalates the marker code.
#[test]
fn unknown_reason_code_scenario_escalates() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = passing_context(&dir);
    let isolated = dir.path().join("chaos");
    let report = run_chaos(
        ctx,
        RunnerGuardPolicy::default(),
        &isolated,
        ChaosScenario::UnknownReasonCode,
        None,
    )
    .unwrap();

    assert_eq!(report.exit_code, 2);
    assert!(isolated.join("reason_codes_override.json").exists());

    let verdict: Value =
        serde_json::from_str(&std::fs::read_to_string(&report.verdict_path).unwrap()).unwrap();
    let codes: Vec<String> = verdict["reasonCodes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|code| code.as_str().map(str::to_string))
        .collect();
    assert!(codes.contains(&String::from("HARD_REASON_CODE_UNKNOWN")));
}

/// Verifies the missing-snapshot scenario surfaces dataset drift.
#[test]
fn missing_snapshot_inputs_scenario_drifts() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = passing_context(&dir);
    let isolated = dir.path().join("chaos");
    let report = run_chaos(
        ctx,
        RunnerGuardPolicy::default(),
        &isolated,
        ChaosScenario::MissingDatasetSnapshotInput,
        None,
    )
    .unwrap();

    assert_eq!(report.exit_code, 2);
    let verdict: Value =
        serde_json::from_str(&std::fs::read_to_string(&report.verdict_path).unwrap()).unwrap();
    let codes: Vec<String> = verdict["reasonCodes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|code| code.as_str().map(str::to_string))
        .collect();
    assert!(codes.contains(&String::from("HARD_DATASET_SNAPSHOT_DRIFT")));
}
