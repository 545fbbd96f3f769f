// release-gate-core/tests/research_gate.rs
// ============================================================================
// Module: Research-Card Gate Tests
// Description: Tests for G2 card-quality ratio checks.
// Purpose: Validate threshold boundaries and missing-evidence handling.
// Dependencies: release-gate-core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Runs the G2 check directly against card fixtures: missing and empty
//! documents, each ratio family, and the at-threshold boundary where a ratio
//! equal to its limit still passes.

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

use std::path::PathBuf;

use release_gate_core::ActingOwners;
use release_gate_core::EvidencePaths;
use release_gate_core::GateCheck;
use release_gate_core::GateContext;
use release_gate_core::GateOutcome;
use release_gate_core::GateStatus;
use release_gate_core::MetricRegistry;
use release_gate_core::Profile;
use release_gate_core::ReasonCodeCatalog;
use release_gate_core::SourceFallbackPolicy;
use release_gate_core::runtime::gates::g2::G2Check;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

/// Runs G2 against a cards document under a research config.
fn run_g2(dir: &TempDir, cards: Option<&Value>, research: Value) -> GateOutcome {
    let cards_path = dir.path().join("research_cards.json");
    if let Some(payload) = cards {
        std::fs::write(&cards_path, serde_json::to_string(payload).unwrap()).unwrap();
    }

    let profile = Profile::from_value(json!({"research": research})).unwrap();
    let missing = PathBuf::from("unused.json");
    let ctx = GateContext {
        repo_root: dir.path().to_path_buf(),
        run_id: String::from("run-g2"),
        run_dir: dir.path().join("out"),
        profile,
        registry: MetricRegistry::default(),
        catalog: ReasonCodeCatalog {
            version: None,
            codes: Vec::new(),
            deprecated_aliases: Vec::new(),
        },
        owners: ActingOwners::default(),
        source_fallback: SourceFallbackPolicy::default(),
        evidence: EvidencePaths {
            research_cards: cards_path,
            admission_report: missing.clone(),
            external_report: missing.clone(),
            health_report: missing.clone(),
            strategy_metrics: missing.clone(),
            budget_usage: missing.clone(),
            dataset: missing.clone(),
            features: missing.clone(),
            labels: missing.clone(),
            split: missing,
        },
        attestation_path: None,
        subcheck_timeout_seconds: 5,
    };
    G2Check.run(&ctx)
}

/// Two complete, fully traceable cards.
fn complete_cards() -> Value {
    json!({
        "card_count": 2,
        "cards": [
            {
                "card_id": "card-1",
                "source_paper_id": "paper-1",
                "source_title": "Momentum decay",
                "conflict_status": "resolved",
            },
            {
                "card_id": "card-2",
                "source_paper_id": "paper-2",
                "source_title": "Carry under stress",
                "conflict_status": "resolved",
            },
        ],
    })
}

/// Strict research config requiring full coverage.
fn strict_research() -> Value {
    json!({
        "min_cards": 1,
        "required_fields": ["card_id", "source_paper_id", "source_title"],
        "required_field_missing_ratio_max": 0.0,
        "unresolved_conflict_ratio_max": 0.0,
        "traceability_ratio_min": 1.0,
        "citation_parse_ratio_min": 1.0,
    })
}

/// Verifies complete cards pass a strict config.
#[test]
fn complete_cards_pass() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run_g2(&dir, Some(&complete_cards()), strict_research());
    assert_eq!(outcome.status, GateStatus::Pass);
    assert!(outcome.reason_codes.is_empty());
}

/// Verifies a missing cards file is a metric-missing policy failure.
#[test]
fn missing_cards_file_is_metric_missing() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run_g2(&dir, None, strict_research());
    assert_eq!(outcome.status, GateStatus::PolicyFail);
    assert_eq!(outcome.reason_codes, vec![String::from("HARD_METRIC_MISSING")]);
}

/// Verifies an empty cards list is a metric-missing policy failure.
#[test]
fn empty_cards_list_is_metric_missing() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = run_g2(&dir, Some(&json!({"card_count": 0, "cards": []})), strict_research());
    assert_eq!(outcome.status, GateStatus::PolicyFail);
    assert!(outcome.reason_codes.contains(&String::from("HARD_METRIC_MISSING")));
}

/// Verifies a card count below the floor breaches.
#[test]
fn card_count_below_minimum_breaches() {
    let dir = tempfile::tempdir().unwrap();
    let mut research = strict_research();
    research["min_cards"] = json!(5);
    let outcome = run_g2(&dir, Some(&complete_cards()), research);
    assert_eq!(outcome.status, GateStatus::PolicyFail);
    assert!(outcome.reason_codes.contains(&String::from("HARD_THRESHOLD_BREACH")));
    assert!(outcome.blocking_issues.iter().any(|issue| issue.contains("card_count")));
}

/// Verifies unresolved conflicts above the ceiling breach.
#[test]
fn unresolved_conflicts_breach() {
    let dir = tempfile::tempdir().unwrap();
    let mut cards = complete_cards();
    cards["cards"][0]["conflict_status"] = json!("open");
    let outcome = run_g2(&dir, Some(&cards), strict_research());
    assert_eq!(outcome.status, GateStatus::PolicyFail);
    assert!(
        outcome.blocking_issues.iter().any(|issue| issue.contains("unresolved_conflict_ratio"))
    );
}

/// Verifies a blank traceability field lowers the ratio below the floor.
#[test]
fn blank_traceability_field_breaches() {
    let dir = tempfile::tempdir().unwrap();
    let mut cards = complete_cards();
    cards["cards"][1]["source_title"] = json!("  ");
    let outcome = run_g2(&dir, Some(&cards), strict_research());
    assert_eq!(outcome.status, GateStatus::PolicyFail);
    assert!(outcome.blocking_issues.iter().any(|issue| issue.contains("traceability_ratio")));
}

/// Verifies a ratio exactly at its ceiling still passes.
#[test]
fn ratio_at_threshold_passes() {
    let dir = tempfile::tempdir().unwrap();
    let mut cards = complete_cards();
    cards["cards"][0]["conflict_status"] = json!("open");
    let mut research = strict_research();
    // One of two cards unresolved: ratio is exactly 0.5.
    research["unresolved_conflict_ratio_max"] = json!(0.5);
    let outcome = run_g2(&dir, Some(&cards), research);
    assert_eq!(outcome.status, GateStatus::Pass);
}

/// Verifies missing required fields aggregate into the missing ratio.
#[test]
fn missing_required_fields_breach() {
    let dir = tempfile::tempdir().unwrap();
    let cards = json!({
        "card_count": 2,
        "cards": [
            {
                "card_id": "card-1",
                "source_paper_id": "paper-1",
                "source_title": "Momentum decay",
                "conflict_status": "resolved",
            },
            {"card_id": "card-2", "conflict_status": "resolved"},
        ],
    });
    let mut research = strict_research();
    research["traceability_ratio_min"] = json!(0.0);
    research["citation_parse_ratio_min"] = json!(0.0);
    let outcome = run_g2(&dir, Some(&cards), research);
    assert_eq!(outcome.status, GateStatus::PolicyFail);
    assert!(
        outcome.blocking_issues.iter().any(|issue| issue.contains("required_field_missing_ratio"))
    );
    assert_eq!(outcome.details["missingFieldCount"], json!(2));
}
