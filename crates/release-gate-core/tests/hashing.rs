// release-gate-core/tests/hashing.rs
// ============================================================================
// Module: Canonical Hashing Tests
// Description: Tests for canonical JSON hashing and idempotency keys.
// Purpose: Validate fingerprint determinism across key order and reruns.
// Dependencies: release-gate-core, serde_json
// ============================================================================
//! ## Overview
//! Ensures canonical hashes ignore key order, stay stable across reruns, and
//! that checkpoint idempotency keys depend only on their four inputs.

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

use release_gate_core::Gate;
use release_gate_core::core::checkpoint::Checkpoint;
use release_gate_core::core::hashing::canonical_json_hash;
use release_gate_core::core::hashing::sha256_text;
use serde_json::json;

/// Verifies key order does not affect the canonical hash.
#[test]
fn canonical_hash_ignores_key_order() {
    let first = json!({"b": 2, "a": 1, "nested": {"y": true, "x": false}});
    let second = json!({"nested": {"x": false, "y": true}, "a": 1, "b": 2});
    assert_eq!(
        canonical_json_hash(&first).unwrap(),
        canonical_json_hash(&second).unwrap()
    );
}

/// Verifies the canonical hash is stable across reruns.
#[test]
fn canonical_hash_is_deterministic() {
    let payload = json!({"runId": "r-1", "values": [1, 2, 3], "flag": true});
    let first = canonical_json_hash(&payload).unwrap();
    let second = canonical_json_hash(&payload).unwrap();
    assert_eq!(first, second);
}

/// Verifies distinct payloads produce distinct hashes.
#[test]
fn canonical_hash_distinguishes_payloads() {
    let first = canonical_json_hash(&json!({"a": 1})).unwrap();
    let second = canonical_json_hash(&json!({"a": 2})).unwrap();
    assert_ne!(first, second);
}

/// Verifies text hashing matches the SHA-256 of the UTF-8 bytes.
#[test]
fn sha256_text_known_vector() {
    assert_eq!(
        sha256_text(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

/// Verifies the idempotency key depends only on its four inputs.
#[test]
fn idempotency_key_depends_only_on_inputs() {
    let first = Checkpoint::idempotency_key("run-1", Gate::G2, 1, "hash-a").unwrap();
    let second = Checkpoint::idempotency_key("run-1", Gate::G2, 1, "hash-a").unwrap();
    assert_eq!(first, second);

    let other_attempt = Checkpoint::idempotency_key("run-1", Gate::G2, 2, "hash-a").unwrap();
    assert_ne!(first, other_attempt);
    let other_gate = Checkpoint::idempotency_key("run-1", Gate::G3, 1, "hash-a").unwrap();
    assert_ne!(first, other_gate);
    let other_profile = Checkpoint::idempotency_key("run-1", Gate::G2, 1, "hash-b").unwrap();
    assert_ne!(first, other_profile);
}
