// release-gate-core/src/runtime/gates/g4.rs
// ============================================================================
// Module: Release Gate G4 Attestation and Release Policy
// Description: Dual-control sign-off validation and policy annotation.
// Purpose: Require two distinct active owners behind every release.
// Dependencies: serde_json, crate::core, crate::runtime::{attestation, gates}
// ============================================================================

//! ## Overview
//! G4 validates the supplied attestation against the active-owner allowlist
//! and records its summary on the checkpoint. The source-fallback policy is
//! read only to annotate details; policy enforcement happens in the verdict
//! deriver, not here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::checkpoint::Gate;
use crate::core::checkpoint::GateStatus;
use crate::core::codes::CODE_HARD_GATE_CHECK_FAILED;
use crate::runtime::attestation::AttestationPayload;
use crate::runtime::attestation::summarize;
use crate::runtime::attestation::validate_attestation;
use crate::runtime::gates::GateCheck;
use crate::runtime::gates::GateContext;
use crate::runtime::gates::GateOutcome;

// ============================================================================
// SECTION: Gate Implementation
// ============================================================================

/// G4 attestation and release-policy gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct G4Check;

impl GateCheck for G4Check {
    fn gate(&self) -> Gate {
        Gate::G4
    }

    fn run(&self, ctx: &GateContext) -> GateOutcome {
        let mut reasons: Vec<String> = Vec::new();
        let mut issues: Vec<String> = Vec::new();
        let mut details: Map<String, Value> = Map::new();
        let mut attestation_summary = None;

        match &ctx.attestation_path {
            None => {
                issues.push(String::from("missing attestation path"));
                reasons.push(String::from(CODE_HARD_GATE_CHECK_FAILED));
            }
            Some(path) if !path.exists() => {
                issues.push(format!("attestation file not found: {}", path.display()));
                reasons.push(String::from(CODE_HARD_GATE_CHECK_FAILED));
            }
            Some(path) => match load_payload(path) {
                Ok(payload) => {
                    let (passed, attestation_issues) =
                        validate_attestation(&payload, &ctx.owners);
                    details.insert(
                        String::from("attestationPath"),
                        json!(path.display().to_string()),
                    );
                    if !passed {
                        issues.extend(attestation_issues.clone());
                        reasons.push(String::from(CODE_HARD_GATE_CHECK_FAILED));
                    }
                    attestation_summary = Some(summarize(&payload, passed, attestation_issues));
                }
                Err(message) => {
                    issues.push(message);
                    reasons.push(String::from(CODE_HARD_GATE_CHECK_FAILED));
                }
            },
        }

        details.insert(
            String::from("sourceFallbackMode"),
            ctx.source_fallback.mode.clone().map_or(Value::Null, Value::String),
        );
        if ctx.source_fallback.is_archive_only() {
            let allowed = ctx
                .source_fallback
                .archive_only
                .as_ref()
                .map(|policy| policy.allowed_outputs.clone())
                .unwrap_or_default();
            details.insert(String::from("archiveOnlyAllowedOutputs"), json!(allowed));
        }

        let status = if issues.is_empty() { GateStatus::Pass } else { GateStatus::PolicyFail };
        GateOutcome {
            status,
            reason_codes: reasons,
            blocking_issues: issues,
            details: Value::Object(details),
            dataset_snapshot_hash: None,
            attestation: attestation_summary,
        }
    }
}

// ============================================================================
// SECTION: Payload Loading
// ============================================================================

/// Loads and types the attestation payload.
fn load_payload(path: &std::path::Path) -> Result<AttestationPayload, String> {
    let value = crate::core::io::read_json_object(path)
        .map_err(|err| format!("attestation unreadable: {err}"))?;
    serde_json::from_value(value).map_err(|err| format!("attestation malformed: {err}"))
}
