// release-gate-core/tests/runner_guard.rs
// ============================================================================
// Module: Runner Guard Tests
// Description: Tests for guard rates, transitions, and persistence.
// Purpose: Validate the circuit breaker's contract over history NDJSON.
// Dependencies: release-gate-core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Covers the rate computation over synthetic checkpoint rows, the full
//! closed/open/half_open transition table, learning-mode behavior, and the
//! closed fallback for missing or corrupt state files.

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

use release_gate_core::GuardMode;
use release_gate_core::GuardState;
use release_gate_core::RunnerGuardPolicy;
use release_gate_core::core::policy::GuardThresholds;
use release_gate_core::runtime::guard::compute_rates;
use release_gate_core::runtime::guard::evaluate_runner_guard;
use release_gate_core::runtime::guard::load_history;
use release_gate_core::runtime::guard::load_state;
use release_gate_core::runtime::guard::transition_state;
use serde_json::Value;
use serde_json::json;

/// Builds an enforced policy with the given rate ceilings.
fn enforced(fail_rate_max: f64, timeout_rate_max: f64) -> RunnerGuardPolicy {
    RunnerGuardPolicy {
        mode: GuardMode::Enforced,
        thresholds: GuardThresholds {
            fail_rate_max,
            timeout_rate_max,
            retry_storm_max: 9_999.0,
        },
    }
}

/// Builds a history row with a status and blocking issues.
fn row(status: &str, issues: &[&str]) -> Value {
    json!({"status": status, "blockingIssues": issues})
}

/// Verifies an empty history yields all-zero rates.
#[test]
fn empty_history_has_zero_rates() {
    let rates = compute_rates(&[]);
    assert_eq!(rates.total, 0.0);
    assert_eq!(rates.fail_rate, 0.0);
    assert_eq!(rates.timeout_rate, 0.0);
    assert_eq!(rates.retry_storm_rate, 0.0);
}

/// Verifies failure, timeout, and retry-storm counting.
#[test]
fn rates_count_statuses_and_issue_text() {
    let history = vec![
        row("pass", &[]),
        row("tool_error", &["G1 timeout exceeded: budget spent"]),
        row("policy_fail", &["retry storm detected on G3"]),
        row("pass", &[]),
    ];
    let rates = compute_rates(&history);
    assert_eq!(rates.total, 4.0);
    assert!((rates.fail_rate - 0.5).abs() < 1e-12);
    assert!((rates.timeout_rate - 0.25).abs() < 1e-12);
    assert!((rates.retry_storm_rate - 0.25).abs() < 1e-12);
}

/// Verifies closed plus breach opens the circuit.
#[test]
fn closed_breach_opens() {
    let history = vec![row("tool_error", &[]), row("tool_error", &[])];
    let rates = compute_rates(&history);
    let (next, issues) = transition_state(GuardState::Closed, &enforced(0.5, 1.0), &rates);
    assert_eq!(next, GuardState::Open);
    assert!(!issues.is_empty());
}

/// Verifies an open circuit with a clean evaluation moves to half-open.
#[test]
fn open_without_breach_half_opens() {
    let rates = compute_rates(&[row("pass", &[])]);
    let (next, _) = transition_state(GuardState::Open, &enforced(0.5, 1.0), &rates);
    assert_eq!(next, GuardState::HalfOpen);
}

/// Verifies half-open with a clean evaluation closes.
#[test]
fn half_open_without_breach_closes() {
    let rates = compute_rates(&[row("pass", &[])]);
    let (next, _) = transition_state(GuardState::HalfOpen, &enforced(0.5, 1.0), &rates);
    assert_eq!(next, GuardState::Closed);
}

/// Verifies half-open with a breach returns to open.
#[test]
fn half_open_with_breach_reopens() {
    let history = vec![row("policy_fail", &[]), row("policy_fail", &[])];
    let rates = compute_rates(&history);
    let (next, _) = transition_state(GuardState::HalfOpen, &enforced(0.5, 1.0), &rates);
    assert_eq!(next, GuardState::Open);
}

/// Verifies learning mode reports issues but never opens.
#[test]
fn learning_mode_never_opens() {
    let policy = RunnerGuardPolicy {
        mode: GuardMode::Learning,
        thresholds: GuardThresholds {
            fail_rate_max: 0.1,
            timeout_rate_max: 0.1,
            retry_storm_max: 0.1,
        },
    };
    let history = vec![row("tool_error", &["timeout while running check"])];
    let rates = compute_rates(&history);
    let (next, issues) = transition_state(GuardState::Closed, &policy, &rates);
    assert_eq!(next, GuardState::Closed);
    assert!(issues.iter().any(|issue| issue.starts_with("learning:")));
}

/// Verifies a missing state file reads as closed.
#[test]
fn missing_state_file_reads_closed() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(load_state(&dir.path().join("absent.json")), GuardState::Closed);
}

/// Verifies a corrupt state file reads as closed.
#[test]
fn corrupt_state_file_reads_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runner_guard_state.json");
    std::fs::write(&path, "{not json").unwrap();
    assert_eq!(load_state(&path), GuardState::Closed);
}

/// Verifies malformed history lines are skipped, not fatal.
#[test]
fn malformed_history_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.ndjson");
    std::fs::write(&path, "{\"status\":\"pass\"}\nnot json\n42\n\n{\"status\":\"tool_error\"}\n")
        .unwrap();
    let history = load_history(&path);
    assert_eq!(history.len(), 2);
}

/// Verifies the evaluation report carries mode, states, and rates.
#[test]
fn evaluation_report_shape() {
    let history = vec![row("tool_error", &[])];
    let report = evaluate_runner_guard(&enforced(0.1, 1.0), &history, GuardState::Closed);
    assert_eq!(report.previous_state, GuardState::Closed);
    assert_eq!(report.state, GuardState::Open);
    assert!(report.hard_open());
    assert_eq!(report.rates.total, 1.0);
}
