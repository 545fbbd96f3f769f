// release-gate-core/src/core/checkpoint.rs
// ============================================================================
// Module: Release Gate Checkpoints
// Description: Gate identifiers, attempt statuses, and checkpoint records.
// Purpose: Capture one durable, idempotent record per gate attempt.
// Dependencies: serde, serde_json, crate::core::hashing
// ============================================================================

//! ## Overview
//! A checkpoint is the durable record of one gate attempt. Every checkpoint
//! carries the run's configuration fingerprints so a verdict can be audited
//! without the original config files, and an idempotency key derived solely
//! from `(runId, gate, attempt, profileHash)`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_hash;

// ============================================================================
// SECTION: Gates
// ============================================================================

/// The five sequential admission gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gate {
    /// Fail-fast checks.
    G0,
    /// Environment integrity.
    G1,
    /// Research-card quality.
    G2,
    /// Strategy, health, and budget thresholds.
    G3,
    /// Attestation and release policy.
    G4,
}

impl Gate {
    /// All gates in execution order.
    pub const ALL: [Self; 5] = [Self::G0, Self::G1, Self::G2, Self::G3, Self::G4];

    /// Returns the stable gate label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::G0 => "G0",
            Self::G1 => "G1",
            Self::G2 => "G2",
            Self::G3 => "G3",
            Self::G4 => "G4",
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Attempt Status
// ============================================================================

/// Outcome status of one gate attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// The gate's policy checks all passed.
    Pass,
    /// A policy check failed; recoverable through human action.
    PolicyFail,
    /// The attempt itself failed: malformed input, timeout, IO failure.
    ToolError,
    /// The gate never ran because a predecessor did not pass.
    Skipped,
}

impl GateStatus {
    /// Returns the stable status label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::PolicyFail => "policy_fail",
            Self::ToolError => "tool_error",
            Self::Skipped => "skipped",
        }
    }
}

// ============================================================================
// SECTION: Run Fingerprint
// ============================================================================

/// Configuration fingerprints stamped on every checkpoint of a run.
///
/// # Invariants
/// - Identical for every checkpoint within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    /// Canonical hash of the whole profile document.
    pub profile_hash: String,
    /// Canonical hash of the profile's thresholds subtree.
    pub thresholds_hash: String,
    /// Canonical hash of the registry's statistics lock.
    pub statistics_lock_hash: String,
    /// Registry version tag.
    pub registry_version: String,
    /// Declared metric versions.
    pub metric_versions: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Attestation Summary
// ============================================================================

/// Attestation outcome recorded on the G4 checkpoint and the verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttestationSummary {
    /// Declared attestation mode.
    pub mode: Option<String>,
    /// Identifier of the attesting owner.
    pub attested_by: Option<String>,
    /// Identifier of the reviewing owner.
    pub reviewed_by: Option<String>,
    /// Whether the attestation validated.
    pub passed: bool,
    /// Validation issues, empty when passed.
    pub issues: Vec<String>,
}

// ============================================================================
// SECTION: Checkpoint Record
// ============================================================================

/// Durable record of one gate attempt.
///
/// # Invariants
/// - `idempotency_key` depends only on `(run_id, gate, attempt,
///   profile_hash)`.
/// - `reason_codes` are de-duplicated preserving first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Checkpoint schema version.
    pub version: String,
    /// Gate this attempt belongs to.
    pub gate: Gate,
    /// Run identifier.
    pub run_id: String,
    /// Attempt ordinal, starting at 1.
    pub attempt: u32,
    /// Hash of `(runId, gate, attempt, profileHash)`.
    pub idempotency_key: String,
    /// Previous run identifier when this run resumes another.
    pub resumed_from: Option<String>,
    /// Attempt status.
    pub status: GateStatus,
    /// Canonical reason codes explaining the status.
    pub reason_codes: Vec<String>,
    /// Human-readable blocking issues.
    pub blocking_issues: Vec<String>,
    /// Attempt start stamp.
    pub started_at: String,
    /// Attempt end stamp.
    pub ended_at: String,
    /// Attempt duration in milliseconds.
    pub duration_ms: u64,
    /// Canonical hash of the whole profile document.
    pub profile_hash: String,
    /// Canonical hash of the profile's thresholds subtree.
    pub thresholds_hash: String,
    /// Canonical hash of the registry's statistics lock.
    pub statistics_lock_hash: String,
    /// Registry version tag.
    pub registry_version: String,
    /// Declared metric versions.
    pub metric_versions: BTreeMap<String, String>,
    /// Hash of the dataset snapshot lock, when G3 produced one.
    pub dataset_snapshot_hash: Option<String>,
    /// Decision weight carried from the profile.
    pub decision_weight: Option<String>,
    /// Attestation summary, present on G4 attempts.
    pub attestation: Option<AttestationSummary>,
    /// Gate-specific detail payload.
    pub details: Value,
}

impl Checkpoint {
    /// Checkpoint schema version tag.
    pub const VERSION: &'static str = "v1";

    /// Computes the idempotency key for a gate attempt.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn idempotency_key(
        run_id: &str,
        gate: Gate,
        attempt: u32,
        profile_hash: &str,
    ) -> Result<String, HashError> {
        canonical_json_hash(&json!({
            "runId": run_id,
            "gate": gate.as_str(),
            "attempt": attempt,
            "profileHash": profile_hash,
        }))
    }

    /// File name of the per-attempt checkpoint artifact.
    #[must_use]
    pub fn artifact_name(gate: Gate, attempt: u32) -> String {
        format!("{}_attempt{attempt}.json", gate.as_str())
    }
}

/// Ordered checkpoint collection artifact (`gate_checkpoints.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSet {
    /// Collection schema version.
    pub version: String,
    /// Checkpoints sorted by `(gate, attempt)`.
    pub items: Vec<Checkpoint>,
}

impl CheckpointSet {
    /// Builds the collection artifact, sorting by `(gate, attempt)`.
    #[must_use]
    pub fn from_items(mut items: Vec<Checkpoint>) -> Self {
        items.sort_by_key(|item| (item.gate, item.attempt));
        Self {
            version: String::from(Checkpoint::VERSION),
            items,
        }
    }
}
