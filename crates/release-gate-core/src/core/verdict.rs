// release-gate-core/src/core/verdict.rs
// ============================================================================
// Module: Release Gate Verdict
// Description: Final admission decision document and exit-code mapping.
// Purpose: Define the machine-readable verdict emitted after all gates.
// Dependencies: serde, crate::core::checkpoint
// ============================================================================

//! ## Overview
//! The verdict is the last artifact written for a run. It aggregates reason
//! codes and blocking issues across every checkpoint, restates the run's
//! configuration fingerprints, and maps onto the process exit code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::checkpoint::AttestationSummary;

// ============================================================================
// SECTION: Verdict Result
// ============================================================================

/// Final admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictResult {
    /// Release may proceed in paper-trading mode only.
    PaperOnlyGo,
    /// Release is rejected.
    NoGo,
    /// Release is blocked pending recovery actions.
    BlockedWithRecoveryPlan,
}

impl VerdictResult {
    /// Returns the stable result label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PaperOnlyGo => "PAPER_ONLY_GO",
            Self::NoGo => "NO_GO",
            Self::BlockedWithRecoveryPlan => "BLOCKED_WITH_RECOVERY_PLAN",
        }
    }

    /// Maps the result onto the process exit code.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::PaperOnlyGo => 0,
            Self::NoGo | Self::BlockedWithRecoveryPlan => 2,
        }
    }
}

impl std::fmt::Display for VerdictResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Verdict Document
// ============================================================================

/// Final verdict document (`verdict.v2.json`).
///
/// # Invariants
/// - `reason_codes` and `blocking_issues` preserve first-occurrence order
///   across checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Verdict schema version.
    pub version: String,
    /// Emission stamp.
    pub generated_at: String,
    /// Run identifier.
    pub run_id: String,
    /// Final admission decision.
    pub result: VerdictResult,
    /// Decision weight carried from the profile.
    pub decision_weight: String,
    /// Aggregated canonical reason codes.
    pub reason_codes: Vec<String>,
    /// Aggregated blocking issues.
    pub blocking_issues: Vec<String>,
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
    /// Attestation summary from the G4 checkpoint, when one ran.
    pub attestation_summary: Option<AttestationSummary>,
}

impl Verdict {
    /// Verdict schema version tag.
    pub const VERSION: &'static str = "v2";
}
