// release-gate-core/src/runtime/chaos.rs
// ============================================================================
// Module: Release Gate Chaos Harness
// Description: Supervised pipeline runs with injected fault scenarios.
// Purpose: Prove failure-mode discipline without touching production roots.
// Dependencies: serde, crate::core, crate::runtime::supervisor
// ============================================================================

//! ## Overview
//! The chaos harness executes the full supervisor inside an isolated output
//! root with exactly one injected fault: an unknown reason code in the
//! catalog, missing dataset-snapshot inputs, or a withheld attestation. It
//! refuses to run when the isolated root equals the repository root and
//! drops a marker file so the root is recognizably chaos-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::core::codes::DeprecatedAlias;
use crate::core::codes::ReasonCode;
use crate::core::codes::ReasonCodeCatalog;
use crate::core::codes::Severity;
use crate::core::io::IoError;
use crate::core::io::write_json_pretty;
use crate::core::time::utc_now_iso;
use crate::core::time::utc_now_run_id;
use crate::runtime::gates::GateContext;
use crate::runtime::supervisor::GateSupervisor;
use crate::runtime::supervisor::SupervisorConfig;
use crate::runtime::supervisor::SupervisorError;

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// Fault scenarios the harness can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosScenario {
    /// Replace the catalog with one malformed, non-canonical code.
    UnknownReasonCode,
    /// Point every snapshot input at a missing file.
    MissingDatasetSnapshotInput,
    /// Withhold the attestation payload from G4.
    MissingAttestation,
}

impl ChaosScenario {
    /// Returns the stable scenario label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownReasonCode => "unknown_reason_code",
            Self::MissingDatasetSnapshotInput => "missing_dataset_snapshot_input",
            Self::MissingAttestation => "missing_attestation",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort a chaos run before the pipeline starts.
#[derive(Debug, Error)]
pub enum ChaosError {
    /// The isolated root points at the repository root.
    #[error("isolated-root must differ from repo-root")]
    NotIsolated,
    /// A harness artifact could not be written.
    #[error(transparent)]
    Io(#[from] IoError),
    /// The supervised pipeline aborted.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    /// The isolated root could not be prepared.
    #[error("failed to prepare isolated root {path}: {message}")]
    Prepare {
        /// Isolated root path.
        path: String,
        /// Short failure description.
        message: String,
    },
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Chaos run report (`chaos_gate_runner_report.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosReport {
    /// Report schema version.
    pub version: String,
    /// Emission stamp.
    pub generated_at: String,
    /// Injected scenario.
    pub scenario: ChaosScenario,
    /// Repository root the pipeline validated.
    pub repo_root: String,
    /// Isolated output root.
    pub isolated_root: String,
    /// Run identifier the pipeline used.
    pub run_id: String,
    /// Verdict result label.
    pub result: String,
    /// Verdict artifact path.
    pub verdict_path: String,
    /// Exit code the equivalent CLI invocation would return.
    pub exit_code: u8,
    /// Scenario-specific artifacts.
    pub artifacts: serde_json::Value,
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Runs the supervisor in an isolated root with one injected fault.
///
/// The provided context is rewired into the isolated root; the caller's
/// production output root is never touched.
///
/// # Errors
///
/// Returns [`ChaosError`] when isolation is violated, the root cannot be
/// prepared, or the pipeline aborts.
pub fn run_chaos(
    mut ctx: GateContext,
    guard_policy: crate::core::policy::RunnerGuardPolicy,
    isolated_root: &Path,
    scenario: ChaosScenario,
    report_output: Option<&Path>,
) -> Result<ChaosReport, ChaosError> {
    if isolated_root == ctx.repo_root {
        return Err(ChaosError::NotIsolated);
    }
    fs::create_dir_all(isolated_root).map_err(|err| ChaosError::Prepare {
        path: isolated_root.display().to_string(),
        message: err.to_string(),
    })?;

    // Guardrail marker: chaos roots are recognizable and never production.
    let marker = isolated_root.join(".chaos_isolated");
    if !marker.exists() {
        fs::write(&marker, "chaos-only\n").map_err(|err| ChaosError::Prepare {
            path: marker.display().to_string(),
            message: err.to_string(),
        })?;
    }

    let mut artifacts = serde_json::Map::new();
    match scenario {
        ChaosScenario::UnknownReasonCode => {
            let override_catalog = bad_code_catalog();
            let override_path = isolated_root.join("reason_codes_override.json");
            write_json_pretty(&override_path, &override_catalog)?;
            artifacts.insert(
                String::from("reasonCodesOverride"),
                json!(override_path.display().to_string()),
            );
            ctx.catalog = override_catalog;
        }
        ChaosScenario::MissingDatasetSnapshotInput => {
            ctx.evidence.dataset = isolated_root.join("missing_dataset.json");
            ctx.evidence.features = isolated_root.join("missing_features.json");
            ctx.evidence.labels = isolated_root.join("missing_labels.json");
            ctx.evidence.split = isolated_root.join("missing_split.json");
        }
        ChaosScenario::MissingAttestation => {
            ctx.attestation_path = None;
        }
    }

    let output_root = isolated_root.join("runtime").join("gates");
    let run_id = utc_now_run_id();
    ctx.run_id.clone_from(&run_id);
    ctx.run_dir = output_root.join(&run_id);

    let config = SupervisorConfig {
        output_root: output_root.clone(),
        history_path: output_root.join("history.ndjson"),
        verdict_output: None,
        resumed_from: None,
        profile_path: PathBuf::from("chaos"),
        registry_path: PathBuf::from("chaos"),
        reason_codes_path: PathBuf::from("chaos"),
    };
    let repo_root = ctx.repo_root.clone();
    let supervisor = GateSupervisor::new(ctx, guard_policy, config);
    let outcome = supervisor.execute()?;

    let report = ChaosReport {
        version: String::from("v1"),
        generated_at: utc_now_iso(),
        scenario,
        repo_root: repo_root.display().to_string(),
        isolated_root: isolated_root.display().to_string(),
        run_id: outcome.run_id.clone(),
        result: outcome.verdict.result.as_str().to_string(),
        verdict_path: outcome.verdict_path.display().to_string(),
        exit_code: outcome.verdict.result.exit_code(),
        artifacts: serde_json::Value::Object(artifacts),
    };
    let report_path = report_output
        .map_or_else(|| isolated_root.join("chaos_gate_runner_report.json"), Path::to_path_buf);
    write_json_pretty(&report_path, &report)?;
    Ok(report)
}

/// Builds the deliberately non-canonical catalog override.
fn bad_code_catalog() -> ReasonCodeCatalog {
    ReasonCodeCatalog {
        version: Some(String::from("v1")),
        codes: vec![ReasonCode {
            code: String::from("BAD_REASON_CODE"),
            severity: Severity::Hard,
            hard_gate: true,
            descriptions: std::collections::BTreeMap::new(),
        }],
        deprecated_aliases: Vec::<DeprecatedAlias>::new(),
    }
}
