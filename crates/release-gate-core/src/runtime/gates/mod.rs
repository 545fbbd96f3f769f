// release-gate-core/src/runtime/gates/mod.rs
// ============================================================================
// Module: Release Gate Per-Gate Checks
// Description: The gate capability seam and the five gate implementations.
// Purpose: Let the supervisor drive any gate through one uniform contract.
// Dependencies: serde, crate::core, crate::runtime submodules
// ============================================================================

//! ## Overview
//! Each gate exposes exactly one capability: `run(ctx) -> GateOutcome`. The
//! supervisor is generic over this seam; gates never write checkpoints or
//! touch the history file themselves. Outcomes carry reason codes, blocking
//! issues, and a detail payload, and may attach a dataset-snapshot hash (G3)
//! or an attestation summary (G4).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod g0;
pub mod g1;
pub mod g2;
pub mod g3;
pub mod g4;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde_json::Map;
use serde_json::Value;

use crate::core::checkpoint::AttestationSummary;
use crate::core::checkpoint::Gate;
use crate::core::checkpoint::GateStatus;
use crate::core::codes::ReasonCodeCatalog;
use crate::core::owners::ActingOwners;
use crate::core::policy::SourceFallbackPolicy;
use crate::core::profile::Profile;
use crate::core::registry::MetricRegistry;
use crate::core::value::dedup_preserving_order;

// ============================================================================
// SECTION: Evidence Paths
// ============================================================================

/// Filesystem locations of every evidence artifact a run consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidencePaths {
    /// Research cards document.
    pub research_cards: PathBuf,
    /// Strategy admission report.
    pub admission_report: PathBuf,
    /// External benchmark report.
    pub external_report: PathBuf,
    /// Source-health report.
    pub health_report: PathBuf,
    /// Strategy metrics document.
    pub strategy_metrics: PathBuf,
    /// Budget usage document.
    pub budget_usage: PathBuf,
    /// Dataset snapshot input.
    pub dataset: PathBuf,
    /// Features snapshot input.
    pub features: PathBuf,
    /// Labels snapshot input.
    pub labels: PathBuf,
    /// Split snapshot input.
    pub split: PathBuf,
}

// ============================================================================
// SECTION: Gate Context
// ============================================================================

/// Everything a gate may consult while running.
///
/// # Invariants
/// - Immutable for the duration of a run; attempts see identical context.
#[derive(Debug, Clone)]
pub struct GateContext {
    /// Repository root the run validates.
    pub repo_root: PathBuf,
    /// Run identifier.
    pub run_id: String,
    /// Per-run output directory.
    pub run_dir: PathBuf,
    /// Frozen profile.
    pub profile: Profile,
    /// Metric registry.
    pub registry: MetricRegistry,
    /// Reason-code catalog.
    pub catalog: ReasonCodeCatalog,
    /// Acting owners allowlist.
    pub owners: ActingOwners,
    /// Source-fallback policy.
    pub source_fallback: SourceFallbackPolicy,
    /// Evidence artifact paths.
    pub evidence: EvidencePaths,
    /// Attestation payload path, when supplied.
    pub attestation_path: Option<PathBuf>,
    /// Per-attempt timeout for G1 sub-check children, in seconds.
    pub subcheck_timeout_seconds: u64,
}

// ============================================================================
// SECTION: Gate Outcome
// ============================================================================

/// Result of one gate execution, before checkpoint wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    /// Attempt status.
    pub status: GateStatus,
    /// Reason codes, de-duplicated preserving first-seen order.
    pub reason_codes: Vec<String>,
    /// Human-readable blocking issues.
    pub blocking_issues: Vec<String>,
    /// Gate-specific detail payload.
    pub details: Value,
    /// Dataset-snapshot hash, attached by G3.
    pub dataset_snapshot_hash: Option<String>,
    /// Attestation summary, attached by G4.
    pub attestation: Option<AttestationSummary>,
}

impl GateOutcome {
    /// Builds an outcome from collected reasons and issues.
    ///
    /// Status is `pass` exactly when no blocking issue was collected; reason
    /// codes are de-duplicated preserving order.
    #[must_use]
    pub fn from_findings(
        reason_codes: Vec<String>,
        blocking_issues: Vec<String>,
        details: Map<String, Value>,
    ) -> Self {
        let status = if blocking_issues.is_empty() {
            GateStatus::Pass
        } else {
            GateStatus::PolicyFail
        };
        Self {
            status,
            reason_codes: dedup_preserving_order(&reason_codes),
            blocking_issues,
            details: Value::Object(details),
            dataset_snapshot_hash: None,
            attestation: None,
        }
    }

    /// Builds a `policy_fail` outcome with one reason and one issue.
    #[must_use]
    pub fn policy_fail(reason: &str, issue: String, details: Map<String, Value>) -> Self {
        Self {
            status: GateStatus::PolicyFail,
            reason_codes: vec![reason.to_string()],
            blocking_issues: vec![issue],
            details: Value::Object(details),
            dataset_snapshot_hash: None,
            attestation: None,
        }
    }
}

// ============================================================================
// SECTION: Gate Capability
// ============================================================================

/// The single capability every gate exposes to the supervisor.
pub trait GateCheck: Send + Sync {
    /// Returns the gate this check implements.
    fn gate(&self) -> Gate;

    /// Runs the gate's policy logic against the run context.
    fn run(&self, ctx: &GateContext) -> GateOutcome;
}
