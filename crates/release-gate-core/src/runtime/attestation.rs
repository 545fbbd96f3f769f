// release-gate-core/src/runtime/attestation.rs
// ============================================================================
// Module: Release Gate Attestation Validation
// Description: Dual-control sign-off validation against acting owners.
// Purpose: Back G4 with an explicit, order-stable issue list.
// Dependencies: serde, crate::core::{checkpoint, owners}
// ============================================================================

//! ## Overview
//! An attestation names who signed off and who reviewed. Both must be active
//! owners and must differ; the mode, stamps, and scope must be well formed.
//! Validation never short-circuits past the mode check so the issue list is
//! stable for auditing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::checkpoint::AttestationSummary;
use crate::core::owners::ActingOwners;

// ============================================================================
// SECTION: Attestation Payload
// ============================================================================

/// Attestation modes accepted by G4.
const VALID_MODES: [&str; 3] = ["manual_attest", "key_signed_attest", "service_attest"];

/// Attestation payload as supplied by the release operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttestationPayload {
    /// Declared attestation mode.
    pub mode: Option<String>,
    /// Identifier of the attesting owner.
    pub attested_by: Option<String>,
    /// Identifier of the reviewing owner.
    pub reviewed_by: Option<String>,
    /// Attestation stamp.
    pub attested_at: Option<Value>,
    /// Review stamp.
    pub reviewed_at: Option<Value>,
    /// Scope entries the sign-off covers.
    pub scope: Option<Value>,
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates an attestation against the active-owner allowlist.
///
/// Returns the pass flag and the ordered issue list. An invalid mode aborts
/// early, mirroring the payload being unclassifiable.
#[must_use]
pub fn validate_attestation(
    payload: &AttestationPayload,
    owners: &ActingOwners,
) -> (bool, Vec<String>) {
    let mut issues: Vec<String> = Vec::new();

    let mode_valid =
        payload.mode.as_deref().is_some_and(|mode| VALID_MODES.contains(&mode));
    if !mode_valid {
        issues.push(String::from("attestation.mode invalid"));
        return (false, issues);
    }

    let allowed = owners.active_ids();
    let attested_by = payload.attested_by.as_deref();
    let reviewed_by = payload.reviewed_by.as_deref();
    if !attested_by.is_some_and(|id| allowed.contains(id)) {
        issues.push(String::from("attestedBy not in active owner allowlist"));
    }
    if !reviewed_by.is_some_and(|id| allowed.contains(id)) {
        issues.push(String::from("reviewedBy not in active owner allowlist"));
    }
    if let (Some(attester), Some(reviewer)) = (attested_by, reviewed_by) {
        if attester == reviewer {
            issues.push(String::from("attestedBy must differ from reviewedBy"));
        }
    }

    if !matches!(payload.attested_at, Some(Value::String(_))) {
        issues.push(String::from("attestedAt missing"));
    }
    if !matches!(payload.reviewed_at, Some(Value::String(_))) {
        issues.push(String::from("reviewedAt missing"));
    }
    let scope_ok = matches!(&payload.scope, Some(Value::Array(entries)) if !entries.is_empty());
    if !scope_ok {
        issues.push(String::from("scope must be non-empty list"));
    }

    (issues.is_empty(), issues)
}

/// Builds the checkpoint summary for a validated attestation.
#[must_use]
pub fn summarize(payload: &AttestationPayload, passed: bool, issues: Vec<String>) -> AttestationSummary {
    AttestationSummary {
        mode: payload.mode.clone(),
        attested_by: payload.attested_by.clone(),
        reviewed_by: payload.reviewed_by.clone(),
        passed,
        issues,
    }
}
