// release-gate-core/src/runtime/supervisor.rs
// ============================================================================
// Module: Release Gate Supervisor
// Description: G0-G4 pipeline ordering, retries, timeouts, and emission.
// Purpose: Drive every gate attempt and keep the audit trail durable.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! The supervisor is the single execution path for a run. Gates execute
//! strictly in order; a gate runs only when the last attempt of its
//! predecessor passed, and every unexecuted gate still records a synthetic
//! `skipped` checkpoint. Each attempt runs on a worker thread under a
//! wall-clock deadline; an overrunning attempt's result is discarded and
//! recorded as `tool_error`. Checkpoints are written per attempt and
//! appended to the history NDJSON before the verdict is derived, so the
//! verdict is always backed by durable records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::checkpoint::Checkpoint;
use crate::core::checkpoint::CheckpointSet;
use crate::core::checkpoint::Gate;
use crate::core::checkpoint::GateStatus;
use crate::core::checkpoint::RunFingerprint;
use crate::core::codes::CODE_HARD_GATE_CHECK_FAILED;
use crate::core::codes::CODE_RUNNER_SELF_HEALTH_FAIL;
use crate::core::hashing::HashError;
use crate::core::io::IoError;
use crate::core::io::append_ndjson;
use crate::core::io::write_json_pretty;
use crate::core::policy::RunnerGuardPolicy;
use crate::core::time::utc_now_iso;
use crate::core::verdict::Verdict;
use crate::runtime::deriver::derive_verdict;
use crate::runtime::gates::GateCheck;
use crate::runtime::gates::GateContext;
use crate::runtime::gates::GateOutcome;
use crate::runtime::gates::g0::G0Check;
use crate::runtime::gates::g1::G1Check;
use crate::runtime::gates::g2::G2Check;
use crate::runtime::gates::g3::G3Check;
use crate::runtime::gates::g4::G4Check;
use crate::runtime::guard::GuardReport;
use crate::runtime::guard::evaluate_runner_guard;
use crate::runtime::guard::load_history;
use crate::runtime::guard::load_state;
use crate::runtime::guard::persist_evaluation;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort a pipeline run.
///
/// Per the failure-mode contract, individual gate faults are converted into
/// checkpoints; only configuration hashing and artifact persistence abort.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Canonical hashing of a config document failed.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// A durable artifact could not be written.
    #[error(transparent)]
    Io(#[from] IoError),
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Filesystem layout and provenance for one supervised run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Root directory holding run folders and guard state.
    pub output_root: PathBuf,
    /// Append-only checkpoint history NDJSON.
    pub history_path: PathBuf,
    /// Explicit verdict output path, when overridden.
    pub verdict_output: Option<PathBuf>,
    /// Previous run identifier when resuming.
    pub resumed_from: Option<String>,
    /// Profile path recorded in the run summary.
    pub profile_path: PathBuf,
    /// Registry path recorded in the run summary.
    pub registry_path: PathBuf,
    /// Reason-codes path recorded in the run summary.
    pub reason_codes_path: PathBuf,
}

// ============================================================================
// SECTION: Run Summary
// ============================================================================

/// Run summary artifact (`run_summary.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Summary schema version.
    pub version: String,
    /// Emission stamp.
    pub generated_at: String,
    /// Run identifier.
    pub run_id: String,
    /// Profile document path.
    pub profile_path: String,
    /// Registry document path.
    pub registry_path: String,
    /// Reason-codes document path.
    pub reason_codes_path: String,
    /// Verdict artifact path.
    pub verdict_path: String,
    /// Final verdict result label.
    pub result: String,
    /// Number of checkpoints recorded.
    pub checkpoint_count: usize,
    /// Checkpoint collection artifact path.
    pub checkpoints_path: String,
}

/// Everything a completed pipeline run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Run identifier.
    pub run_id: String,
    /// Derived verdict.
    pub verdict: Verdict,
    /// Verdict artifact path.
    pub verdict_path: PathBuf,
    /// All checkpoints sorted by `(gate, attempt)`.
    pub checkpoints: Vec<Checkpoint>,
    /// Runner-guard evaluation for this run.
    pub guard_report: GuardReport,
}

// ============================================================================
// SECTION: Supervisor
// ============================================================================

/// Sequential G0-G4 pipeline supervisor.
pub struct GateSupervisor {
    /// Immutable run context shared with every gate attempt.
    ctx: Arc<GateContext>,
    /// Runner-guard policy evaluated before G0.
    guard_policy: RunnerGuardPolicy,
    /// Run layout and provenance.
    config: SupervisorConfig,
    /// Gate implementations in execution order.
    gates: Vec<Arc<dyn GateCheck>>,
}

impl GateSupervisor {
    /// Creates a supervisor with the standard five gates.
    #[must_use]
    pub fn new(ctx: GateContext, guard_policy: RunnerGuardPolicy, config: SupervisorConfig) -> Self {
        Self::with_gates(
            ctx,
            guard_policy,
            config,
            vec![
                Arc::new(G0Check),
                Arc::new(G1Check),
                Arc::new(G2Check),
                Arc::new(G3Check),
                Arc::new(G4Check),
            ],
        )
    }

    /// Creates a supervisor with a custom gate set.
    #[must_use]
    pub fn with_gates(
        ctx: GateContext,
        guard_policy: RunnerGuardPolicy,
        config: SupervisorConfig,
        gates: Vec<Arc<dyn GateCheck>>,
    ) -> Self {
        Self {
            ctx: Arc::new(ctx),
            guard_policy,
            config,
            gates,
        }
    }

    /// Executes the whole pipeline and derives the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError`] when config hashing fails or a durable
    /// artifact cannot be written.
    pub fn execute(&self) -> Result<RunOutcome, SupervisorError> {
        let fingerprint = self.fingerprint()?;
        let checkpoints_dir = self.ctx.run_dir.join("checkpoints");

        let guard_report = self.evaluate_guard()?;
        write_json_pretty(&self.ctx.run_dir.join("runner_guard_report.json"), &guard_report)?;

        let mut checkpoints: Vec<Checkpoint> = Vec::new();
        let mut previous_passed = true;
        for check in &self.gates {
            if !previous_passed {
                break;
            }
            let last = self.run_gate_with_retry(
                Arc::clone(check),
                &fingerprint,
                &checkpoints_dir,
                &guard_report,
                &mut checkpoints,
            )?;
            previous_passed = last == GateStatus::Pass;
        }

        // Synthetic skipped checkpoints for every unexecuted gate.
        for gate in Gate::ALL {
            if checkpoints.iter().any(|item| item.gate == gate) {
                continue;
            }
            let skipped = self.build_checkpoint(
                gate,
                1,
                &fingerprint,
                GateOutcome {
                    status: GateStatus::Skipped,
                    reason_codes: Vec::new(),
                    blocking_issues: vec![String::from("skipped because previous gate failed")],
                    details: Value::Object(serde_json::Map::new()),
                    dataset_snapshot_hash: None,
                    attestation: None,
                },
                utc_now_iso(),
                utc_now_iso(),
                0,
            )?;
            self.persist_checkpoint(&checkpoints_dir, &skipped)?;
            checkpoints.push(skipped);
        }

        let set = CheckpointSet::from_items(checkpoints);
        write_json_pretty(&self.ctx.run_dir.join("gate_checkpoints.json"), &set)?;

        let verdict = derive_verdict(
            &set.items,
            &self.ctx.profile,
            &self.ctx.source_fallback,
            &self.ctx.catalog,
            &self.ctx.run_id,
            &fingerprint,
        );
        let verdict_path = self
            .config
            .verdict_output
            .clone()
            .unwrap_or_else(|| self.ctx.run_dir.join("verdict.v2.json"));
        write_json_pretty(&verdict_path, &verdict)?;

        let summary = RunSummary {
            version: String::from("v1"),
            generated_at: utc_now_iso(),
            run_id: self.ctx.run_id.clone(),
            profile_path: self.config.profile_path.display().to_string(),
            registry_path: self.config.registry_path.display().to_string(),
            reason_codes_path: self.config.reason_codes_path.display().to_string(),
            verdict_path: verdict_path.display().to_string(),
            result: verdict.result.as_str().to_string(),
            checkpoint_count: set.items.len(),
            checkpoints_path: self.ctx.run_dir.join("gate_checkpoints.json").display().to_string(),
        };
        write_json_pretty(&self.ctx.run_dir.join("run_summary.json"), &summary)?;

        Ok(RunOutcome {
            run_id: self.ctx.run_id.clone(),
            verdict,
            verdict_path,
            checkpoints: set.items,
            guard_report,
        })
    }

    /// Computes the run fingerprint from the loaded config documents.
    fn fingerprint(&self) -> Result<RunFingerprint, SupervisorError> {
        Ok(RunFingerprint {
            profile_hash: self.ctx.profile.profile_hash()?,
            thresholds_hash: self.ctx.profile.thresholds_hash()?,
            statistics_lock_hash: self.ctx.registry.statistics_lock_hash()?,
            registry_version: self.ctx.registry.version(),
            metric_versions: self.ctx.registry.metric_versions(),
        })
    }

    /// Evaluates the runner guard and persists its state and reports.
    fn evaluate_guard(&self) -> Result<GuardReport, SupervisorError> {
        let state_path = self.config.output_root.join("runner_guard_state.json");
        let report_path = self.config.output_root.join("runner_guard_latest_report.json");
        let history = load_history(&self.config.history_path);
        let previous = load_state(&state_path);
        let report = evaluate_runner_guard(&self.guard_policy, &history, previous);
        persist_evaluation(&report, &state_path, &report_path)?;
        Ok(report)
    }

    /// Runs one gate through its retry budget, emitting every checkpoint.
    ///
    /// Returns the terminal attempt status.
    fn run_gate_with_retry(
        &self,
        check: Arc<dyn GateCheck>,
        fingerprint: &RunFingerprint,
        checkpoints_dir: &std::path::Path,
        guard_report: &GuardReport,
        checkpoints: &mut Vec<Checkpoint>,
    ) -> Result<GateStatus, SupervisorError> {
        let gate = check.gate();
        let retry_cfg = self.ctx.profile.retry_config(gate);
        let timeout_seconds = self.ctx.profile.timeout_seconds(gate);
        let total_attempts = 1 + retry_cfg.max_attempts;
        let mut last_status = GateStatus::ToolError;

        for attempt in 1..=total_attempts {
            let started_at = utc_now_iso();
            let started = Instant::now();
            let mut outcome = if gate == Gate::G0 && guard_report.hard_open() {
                guard_blocked_outcome(guard_report)
            } else {
                run_attempt(Arc::clone(&check), Arc::clone(&self.ctx), timeout_seconds)
            };
            annotate_timeout_budget(&mut outcome, timeout_seconds);
            let ended_at = utc_now_iso();
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let checkpoint = self.build_checkpoint(
                gate,
                attempt,
                fingerprint,
                outcome,
                started_at,
                ended_at,
                duration_ms,
            )?;
            self.persist_checkpoint(checkpoints_dir, &checkpoint)?;
            last_status = checkpoint.status;
            checkpoints.push(checkpoint);

            if last_status == GateStatus::Pass {
                break;
            }
            let should_retry =
                self.ctx.profile.retries_on(last_status) && attempt < total_attempts;
            if !should_retry {
                break;
            }
            if retry_cfg.interval_seconds > 0 {
                std::thread::sleep(Duration::from_secs(retry_cfg.interval_seconds));
            }
        }

        Ok(last_status)
    }

    /// Wraps a gate outcome into its durable checkpoint record.
    #[allow(clippy::too_many_arguments, reason = "checkpoint fields are one flat record")]
    fn build_checkpoint(
        &self,
        gate: Gate,
        attempt: u32,
        fingerprint: &RunFingerprint,
        outcome: GateOutcome,
        started_at: String,
        ended_at: String,
        duration_ms: u64,
    ) -> Result<Checkpoint, SupervisorError> {
        let idempotency_key = Checkpoint::idempotency_key(
            &self.ctx.run_id,
            gate,
            attempt,
            &fingerprint.profile_hash,
        )?;
        Ok(Checkpoint {
            version: String::from(Checkpoint::VERSION),
            gate,
            run_id: self.ctx.run_id.clone(),
            attempt,
            idempotency_key,
            resumed_from: self.config.resumed_from.clone(),
            status: outcome.status,
            reason_codes: outcome.reason_codes,
            blocking_issues: outcome.blocking_issues,
            started_at,
            ended_at,
            duration_ms,
            profile_hash: fingerprint.profile_hash.clone(),
            thresholds_hash: fingerprint.thresholds_hash.clone(),
            statistics_lock_hash: fingerprint.statistics_lock_hash.clone(),
            registry_version: fingerprint.registry_version.clone(),
            metric_versions: fingerprint.metric_versions.clone(),
            dataset_snapshot_hash: outcome.dataset_snapshot_hash,
            decision_weight: Some(
                self.ctx.profile.config.decision.default_decision_weight.clone(),
            ),
            attestation: outcome.attestation,
            details: outcome.details,
        })
    }

    /// Writes the per-attempt artifact and appends to the history NDJSON.
    fn persist_checkpoint(
        &self,
        checkpoints_dir: &std::path::Path,
        checkpoint: &Checkpoint,
    ) -> Result<(), SupervisorError> {
        let artifact = checkpoints_dir.join(Checkpoint::artifact_name(
            checkpoint.gate,
            checkpoint.attempt,
        ));
        write_json_pretty(&artifact, checkpoint)?;
        append_ndjson(&self.config.history_path, checkpoint)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Attempt Execution
// ============================================================================

/// Runs one gate attempt on a worker thread under a wall-clock deadline.
///
/// A zero budget disables the deadline. On overrun the worker's eventual
/// result is discarded; a worker that dies without reporting reads as an
/// unhandled gate failure.
fn run_attempt(
    check: Arc<dyn GateCheck>,
    ctx: Arc<GateContext>,
    timeout_seconds: u64,
) -> GateOutcome {
    let gate = check.gate();
    if timeout_seconds == 0 {
        return check.run(&ctx);
    }

    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        let outcome = check.run(&ctx);
        let _ = sender.send(outcome);
    });

    match receiver.recv_timeout(Duration::from_secs(timeout_seconds)) {
        Ok(outcome) => outcome,
        Err(mpsc::RecvTimeoutError::Timeout) => timeout_outcome(gate, timeout_seconds),
        Err(mpsc::RecvTimeoutError::Disconnected) => GateOutcome {
            status: GateStatus::ToolError,
            reason_codes: vec![String::from(CODE_HARD_GATE_CHECK_FAILED)],
            blocking_issues: vec![format!("unhandled gate exception in {gate}")],
            details: Value::Object(serde_json::Map::new()),
            dataset_snapshot_hash: None,
            attestation: None,
        },
    }
}

/// Builds the `tool_error` outcome for a timed-out attempt.
fn timeout_outcome(gate: Gate, timeout_seconds: u64) -> GateOutcome {
    GateOutcome {
        status: GateStatus::ToolError,
        reason_codes: vec![String::from(CODE_HARD_GATE_CHECK_FAILED)],
        blocking_issues: vec![format!(
            "{gate} timeout exceeded: gate execution timed out after {timeout_seconds}s"
        )],
        details: json!({"timeoutSeconds": timeout_seconds}),
        dataset_snapshot_hash: None,
        attestation: None,
    }
}

/// Records the attempt's timeout budget on the outcome details.
fn annotate_timeout_budget(outcome: &mut GateOutcome, timeout_seconds: u64) {
    if let Value::Object(details) = &mut outcome.details {
        details.insert(String::from("gateTimeoutSeconds"), json!(timeout_seconds));
    }
}

/// Builds the forced G0 outcome when the runner guard is hard-open.
fn guard_blocked_outcome(report: &GuardReport) -> GateOutcome {
    GateOutcome {
        status: GateStatus::PolicyFail,
        reason_codes: vec![String::from(CODE_RUNNER_SELF_HEALTH_FAIL)],
        blocking_issues: vec![String::from("runner guard state is open; gate pipeline blocked")],
        details: json!({
            "runnerGuardState": report.state.as_str(),
            "runnerGuardMode": report.mode,
        }),
        dataset_snapshot_hash: None,
        attestation: None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
