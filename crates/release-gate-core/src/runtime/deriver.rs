// release-gate-core/src/runtime/deriver.rs
// ============================================================================
// Module: Release Gate Verdict Derivation
// Description: Fold checkpoints and policy into the final verdict.
// Purpose: Make the admission decision a pure function of the audit trail.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The deriver aggregates reason codes and blocking issues across every
//! checkpoint in first-occurrence order, resolving deprecated aliases as it
//! goes. Any `tool_error` blocks with a recovery plan; policy failures split
//! between `NO_GO` and blocked depending on which codes fired; a clean run
//! is `PAPER_ONLY_GO`. Two policy layers can then override the result: the
//! profile's `decision.allowed_outputs` and the archive-only source-fallback
//! constraint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::checkpoint::Checkpoint;
use crate::core::checkpoint::Gate;
use crate::core::checkpoint::GateStatus;
use crate::core::checkpoint::RunFingerprint;
use crate::core::codes::CODE_RELEASE_GATE_BLOCKED;
use crate::core::codes::CODE_UNKNOWN;
use crate::core::codes::ReasonCodeCatalog;
use crate::core::policy::SourceFallbackPolicy;
use crate::core::profile::Profile;
use crate::core::time::utc_now_iso;
use crate::core::value::push_unique;
use crate::core::verdict::Verdict;
use crate::core::verdict::VerdictResult;

// ============================================================================
// SECTION: Blocking Codes
// ============================================================================

/// Policy-failure codes that escalate `NO_GO` into a blocked verdict.
const BLOCKING_CODES: [&str; 3] = [
    "HARD_SOURCE_HEALTH_FAIL",
    "HARD_BUDGET_HARD_CAP_HIT",
    "HARD_GATE_RUNNER_SELF_HEALTH_FAIL",
];

// ============================================================================
// SECTION: Derivation
// ============================================================================

/// Derives the final verdict from a run's checkpoints and policies.
#[must_use]
pub fn derive_verdict(
    checkpoints: &[Checkpoint],
    profile: &Profile,
    source_fallback: &SourceFallbackPolicy,
    catalog: &ReasonCodeCatalog,
    run_id: &str,
    fingerprint: &RunFingerprint,
) -> Verdict {
    let decision_cfg = &profile.config.decision;

    let mut reasons: Vec<String> = Vec::new();
    let mut issues: Vec<String> = Vec::new();
    let mut attestation_summary = None;
    for checkpoint in checkpoints {
        for code in &checkpoint.reason_codes {
            push_unique(&mut reasons, catalog.resolve(code).to_string());
        }
        for issue in &checkpoint.blocking_issues {
            push_unique(&mut issues, issue.clone());
        }
        if checkpoint.gate == Gate::G4 {
            if let Some(summary) = &checkpoint.attestation {
                attestation_summary = Some(summary.clone());
            }
        }
    }

    if reasons.iter().any(|code| !catalog.is_canonical(code)) {
        push_unique(&mut reasons, String::from(CODE_UNKNOWN));
        push_unique(&mut issues, String::from("unknown reason code detected in checkpoints"));
    }

    let mut result = fold_statuses(checkpoints, &reasons);

    if let Some(allowed) = &decision_cfg.allowed_outputs {
        if !allowed.iter().any(|entry| entry == result.as_str()) {
            result = VerdictResult::NoGo;
            push_unique(&mut reasons, String::from(CODE_RELEASE_GATE_BLOCKED));
            push_unique(&mut issues, String::from("result not in decision.allowed_outputs"));
        }
    }

    if source_fallback.is_archive_only() {
        let allowed = source_fallback
            .archive_only
            .as_ref()
            .map(|policy| policy.allowed_outputs.clone())
            .unwrap_or_default();
        if !allowed.is_empty() && !allowed.iter().any(|entry| entry == result.as_str()) {
            result = VerdictResult::BlockedWithRecoveryPlan;
            push_unique(&mut reasons, String::from(CODE_RELEASE_GATE_BLOCKED));
            push_unique(&mut issues, String::from("archive_only forbids this verdict"));
        }
    }

    Verdict {
        version: String::from(Verdict::VERSION),
        generated_at: utc_now_iso(),
        run_id: run_id.to_string(),
        result,
        decision_weight: decision_cfg.default_decision_weight.clone(),
        reason_codes: reasons,
        blocking_issues: issues,
        profile_hash: fingerprint.profile_hash.clone(),
        thresholds_hash: fingerprint.thresholds_hash.clone(),
        statistics_lock_hash: fingerprint.statistics_lock_hash.clone(),
        registry_version: fingerprint.registry_version.clone(),
        metric_versions: fingerprint.metric_versions.clone(),
        attestation_summary,
    }
}

/// Folds checkpoint statuses into the base result before policy overrides.
fn fold_statuses(checkpoints: &[Checkpoint], reasons: &[String]) -> VerdictResult {
    if checkpoints.iter().any(|item| item.status == GateStatus::ToolError) {
        return VerdictResult::BlockedWithRecoveryPlan;
    }
    if checkpoints.iter().any(|item| item.status == GateStatus::PolicyFail) {
        if reasons.iter().any(|code| BLOCKING_CODES.contains(&code.as_str())) {
            return VerdictResult::BlockedWithRecoveryPlan;
        }
        return VerdictResult::NoGo;
    }
    VerdictResult::PaperOnlyGo
}
