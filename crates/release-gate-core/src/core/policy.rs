// release-gate-core/src/core/policy.rs
// ============================================================================
// Module: Release Gate Auxiliary Policies
// Description: Source-fallback and runner-guard policy documents.
// Purpose: Type the policies consulted by G4 annotation and the guard.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Two small policy documents ride alongside the profile. The source-fallback
//! policy can restrict which verdicts are permitted in `archive_only` mode;
//! the runner-guard policy configures the circuit breaker's mode and
//! thresholds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Source Fallback Policy
// ============================================================================

/// Archive-only constraints within the source-fallback policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveOnlyPolicy {
    /// Verdict results permitted while archive-only is in force.
    #[serde(rename = "allowedOutputs")]
    pub allowed_outputs: Vec<String>,
}

/// Source-fallback policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFallbackPolicy {
    /// Active fallback mode.
    pub mode: Option<String>,
    /// Archive-only constraints, set when `mode == "archive_only"`.
    #[serde(rename = "archiveOnly")]
    pub archive_only: Option<ArchiveOnlyPolicy>,
}

impl SourceFallbackPolicy {
    /// Reports whether archive-only mode is in force.
    #[must_use]
    pub fn is_archive_only(&self) -> bool {
        self.mode.as_deref() == Some("archive_only")
    }
}

// ============================================================================
// SECTION: Runner Guard Policy
// ============================================================================

/// Runner-guard enforcement mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Report breaches without opening the circuit.
    #[default]
    Learning,
    /// Open the circuit on breach.
    Enforced,
}

/// Runner-guard rate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardThresholds {
    /// Maximum tolerated failure rate.
    #[serde(rename = "failRateMax")]
    pub fail_rate_max: f64,
    /// Maximum tolerated timeout rate.
    #[serde(rename = "timeoutRateMax")]
    pub timeout_rate_max: f64,
    /// Maximum tolerated retry-storm rate.
    #[serde(rename = "retryStormAttemptsPerGateMax")]
    pub retry_storm_max: f64,
}

impl Default for GuardThresholds {
    fn default() -> Self {
        Self {
            fail_rate_max: 1.0,
            timeout_rate_max: 1.0,
            retry_storm_max: 9_999.0,
        }
    }
}

/// Runner-guard policy document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerGuardPolicy {
    /// Enforcement mode.
    pub mode: GuardMode,
    /// Rate thresholds.
    pub thresholds: GuardThresholds,
}
