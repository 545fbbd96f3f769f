// release-gate-core/src/runtime/stress.rs
// ============================================================================
// Module: Release Gate Stress Metric
// Description: The pinned stress-decline formula with stable id and hash.
// Purpose: Keep the stress comparison reproducible across releases.
// Dependencies: crate::core::hashing
// ============================================================================

//! ## Overview
//! Exactly one stress formula exists and it is pinned: its identifier and the
//! SHA-256 of its textual definition travel in G3 details so an auditor can
//! confirm which formula produced the number.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::OnceLock;

use crate::core::hashing::sha256_text;

// ============================================================================
// SECTION: Formula Identity
// ============================================================================

/// Stable identifier of the pinned formula.
pub const FORMULA_ID: &str = "stress_net_trim10_decline_v1";

/// Textual definition the formula hash is computed over.
const FORMULA_EXPR: &str = "max(0, (baseline_net_trim10_mean - candidate_net_trim10_mean) / \
                            max(abs(baseline_net_trim10_mean), 1e-9))";

/// Returns the SHA-256 of the formula text.
#[must_use]
pub fn formula_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| sha256_text(FORMULA_EXPR))
}

// ============================================================================
// SECTION: Formula
// ============================================================================

/// Computes the stress decline between baseline and candidate means.
///
/// Negative declines (candidate above baseline) clamp to zero; the
/// denominator is floored at `1e-9` so a zero baseline stays defined.
#[must_use]
pub fn stress_net_trim10_decline(baseline: f64, candidate: f64) -> f64 {
    let denom = baseline.abs().max(1e-9);
    ((baseline - candidate) / denom).max(0.0)
}
