// release-gate-core/tests/state_replay.rs
// ============================================================================
// Module: State-Machine Replay Tests
// Description: Tests for runtime state log validation.
// Purpose: Validate transition rules, legacy key fallbacks, and idempotence.
// Dependencies: release-gate-core, tempfile
// ============================================================================
//! ## Overview
//! Replays synthetic logs through the fixed five-state machine: allowed and
//! disallowed edges, legacy key spellings, ordering warnings, and the empty
//! and missing log cases.

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

use release_gate_core::runtime::replay::replay_log;

/// Writes a log file with the given lines and returns its path.
fn write_log(dir: &tempfile::TempDir, lines: &[&str]) -> PathBuf {
    let path = dir.path().join("state_machine_log.jsonl");
    std::fs::write(&path, format!("{}\n", lines.join("\n"))).unwrap();
    path
}

/// Verifies the self-loop-then-watch-then-back scenario validates.
#[test]
fn normal_watch_normal_round_trip_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        &dir,
        &[
            r#"{"from": "NORMAL", "to": "NORMAL"}"#,
            r#"{"from": "NORMAL", "to": "WATCH"}"#,
            r#"{"from": "WATCH", "to": "NORMAL"}"#,
        ],
    );
    let report = replay_log(&path).unwrap();
    assert!(report.valid);
    assert_eq!(report.final_state.as_deref(), Some("NORMAL"));
    assert_eq!(report.transition_count, 3);
}

/// Verifies a disallowed edge fails validation.
#[test]
fn disallowed_edge_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, &[r#"{"from": "NORMAL", "to": "RECOVERY_SHADOW"}"#]);
    let report = replay_log(&path).unwrap();
    assert!(!report.valid);
    assert!(report.errors[0].contains("invalid transition NORMAL -> RECOVERY_SHADOW"));
}

/// Verifies unknown state tokens fail validation.
#[test]
fn unknown_state_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, &[r#"{"to": "LIMBO"}"#]);
    let report = replay_log(&path).unwrap();
    assert!(!report.valid);
    assert!(report.errors[0].contains("unknown state 'LIMBO'"));
}

/// Verifies legacy key spellings resolve through the ordered fallbacks.
#[test]
fn legacy_key_spellings_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        &dir,
        &[
            r#"{"state": "normal"}"#,
            r#"{"fromState": "NORMAL", "nextState": "watch"}"#,
            r#"{"prevState": "WATCH", "toState": "PAUSE_NEW_OPENS"}"#,
        ],
    );
    let report = replay_log(&path).unwrap();
    assert!(report.valid);
    assert_eq!(report.final_state.as_deref(), Some("PAUSE_NEW_OPENS"));
}

/// Verifies a missing `from` defaults to the running tracker state.
#[test]
fn missing_from_uses_tracker_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        &dir,
        &[r#"{"to": "DEGRADE_H0"}"#, r#"{"to": "RECOVERY_SHADOW"}"#, r#"{"to": "WATCH"}"#],
    );
    let report = replay_log(&path).unwrap();
    // DEGRADE_H0 -> RECOVERY_SHADOW is allowed; RECOVERY_SHADOW -> WATCH is not.
    assert!(!report.valid);
    assert_eq!(report.transition_count, 3);
    assert!(report.errors[0].contains("RECOVERY_SHADOW -> WATCH"));
}

/// Verifies out-of-order timestamps warn without invalidating.
#[test]
fn out_of_order_timestamps_warn_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        &dir,
        &[
            r#"{"to": "NORMAL", "timestamp": "2026-05-02T10:00:00Z"}"#,
            r#"{"to": "WATCH", "timestamp": "2026-05-02T09:00:00Z"}"#,
        ],
    );
    let report = replay_log(&path).unwrap();
    assert!(report.valid);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("out-of-order"));
}

/// Verifies an empty log is invalid.
#[test]
fn empty_log_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(&dir, &[""]);
    let report = replay_log(&path).unwrap();
    assert!(!report.valid);
    assert_eq!(report.errors, vec![String::from("state machine log has no events.")]);
}

/// Verifies a missing log file is invalid rather than an error.
#[test]
fn missing_log_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let report = replay_log(&dir.path().join("absent.jsonl")).unwrap();
    assert!(!report.valid);
    assert!(report.errors[0].contains("log file not found"));
}

/// Verifies replay is idempotent apart from its stamp.
#[test]
fn replay_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(
        &dir,
        &[r#"{"to": "NORMAL"}"#, r#"{"to": "WATCH"}"#, r#"{"to": "DEGRADE_H0"}"#],
    );
    let mut first = replay_log(&path).unwrap();
    let mut second = replay_log(&path).unwrap();
    first.generated_at = String::new();
    second.generated_at = String::new();
    assert_eq!(first, second);
}
