// release-gate-core/src/runtime/gates/g1.rs
// ============================================================================
// Module: Release Gate G1 Environment Integrity
// Description: Environment-lock, freeze-manifest, and sync sub-checks.
// Purpose: Classify three external verifiers into one gate outcome.
// Dependencies: serde_json, crate::core, crate::runtime::gates
// ============================================================================

//! ## Overview
//! G1 delegates to three external programs, each writing its own report file
//! under the run directory. Exit 0 classifies as `pass`, exit 2 as
//! `policy_fail`, anything else (spawn failure and timeout included) as
//! `tool_error`. A sub-check whose `require_*` flag is off still runs for
//! its report but cannot affect the gate status. Children that outlive the
//! per-attempt budget are killed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::checkpoint::Gate;
use crate::core::checkpoint::GateStatus;
use crate::core::value::dedup_preserving_order;
use crate::runtime::gates::GateCheck;
use crate::runtime::gates::GateContext;
use crate::runtime::gates::GateOutcome;

// ============================================================================
// SECTION: Sub-Check Specification
// ============================================================================

/// Reason code mapped to a failed environment-lock sub-check.
const REASON_ENV: &str = "HARD_ENV_MISMATCH";
/// Reason code mapped to a failed freeze-manifest sub-check.
const REASON_FREEZE: &str = "HARD_FREEZE_MANIFEST_INVALID";
/// Reason code mapped to a failed synchronizer sub-check.
const REASON_SYNC: &str = "HARD_HARD_GATE_CHECK_FAILED";

/// One configured sub-check.
struct SubCheckSpec {
    /// Stable sub-check name used in reports and report file names.
    name: &'static str,
    /// Whether a non-pass outcome affects the gate status.
    required: bool,
    /// Reason code recorded when the sub-check does not pass.
    reason_code: &'static str,
    /// Command argv, program first.
    argv: Vec<String>,
}

/// Builds the three sub-check specs from the profile's `g1` group.
fn build_specs(ctx: &GateContext) -> Vec<SubCheckSpec> {
    let cfg = &ctx.profile.config.g1;
    let default_argv =
        |script: &str| vec![ctx.repo_root.join("scripts").join(script).display().to_string()];

    vec![
        SubCheckSpec {
            name: "verify_environment_lock",
            required: cfg.require_env_lock_passed,
            reason_code: REASON_ENV,
            argv: cfg
                .env_lock_command
                .clone()
                .unwrap_or_else(|| default_argv("verify_environment_lock")),
        },
        SubCheckSpec {
            name: "verify_freeze_manifest",
            required: cfg.require_freeze_manifest_passed,
            reason_code: REASON_FREEZE,
            argv: cfg
                .freeze_manifest_command
                .clone()
                .unwrap_or_else(|| default_argv("verify_freeze_manifest")),
        },
        SubCheckSpec {
            name: "post_pull_sync",
            required: cfg.require_post_pull_sync_passed,
            reason_code: REASON_SYNC,
            argv: cfg
                .post_pull_sync_command
                .clone()
                .unwrap_or_else(|| default_argv("post_pull_sync")),
        },
    ]
}

// ============================================================================
// SECTION: Sub-Check Execution
// ============================================================================

/// Outcome of one sub-check child process.
struct SubCheckResult {
    /// Classified status.
    status: GateStatus,
    /// Child exit code, absent on spawn failure or timeout.
    exit_code: Option<i32>,
    /// Wall-clock duration in milliseconds.
    duration_ms: u64,
    /// Last lines of the child's stdout.
    stdout_tail: String,
    /// Last lines of the child's stderr.
    stderr_tail: String,
    /// Blocking issue, set on spawn failure or timeout.
    blocking_issue: Option<String>,
}

/// Returns the last `max_lines` lines of a text blob.
fn tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Drains a child stream on a helper thread.
fn drain_stream<R: Read + Send + 'static>(stream: Option<R>) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buffer = String::new();
        if let Some(mut reader) = stream {
            let _ = reader.read_to_string(&mut buffer);
        }
        buffer
    })
}

/// Waits for a child within the deadline, killing it on overrun.
fn wait_with_deadline(child: &mut Child, deadline: Duration) -> Option<i32> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            // A signal death reads as a generic non-zero exit.
            Ok(Some(status)) => return Some(status.code().unwrap_or(-1)),
            Ok(None) => {
                if started.elapsed() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        }
    }
}

/// Runs one sub-check command with an output report path appended.
fn run_subcheck(
    spec: &SubCheckSpec,
    repo_root: &Path,
    report_path: &Path,
    timeout_seconds: u64,
) -> SubCheckResult {
    let started = Instant::now();
    let Some((program, args)) = spec.argv.split_first() else {
        return SubCheckResult {
            status: GateStatus::ToolError,
            exit_code: None,
            duration_ms: 0,
            stdout_tail: String::new(),
            stderr_tail: String::from("empty command"),
            blocking_issue: Some(format!("tool_error while running {}: empty command", spec.name)),
        };
    };

    let spawned = Command::new(program)
        .args(args)
        .arg("--output")
        .arg(report_path)
        .current_dir(repo_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            return SubCheckResult {
                status: GateStatus::ToolError,
                exit_code: None,
                duration_ms: elapsed_ms(started),
                stdout_tail: String::new(),
                stderr_tail: err.to_string(),
                blocking_issue: Some(format!(
                    "tool_error while running {}: {err}",
                    spec.argv.join(" ")
                )),
            };
        }
    };

    let stdout_handle = drain_stream(child.stdout.take());
    let stderr_handle = drain_stream(child.stderr.take());
    let exit_code = wait_with_deadline(&mut child, Duration::from_secs(timeout_seconds));
    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    let duration_ms = elapsed_ms(started);

    let Some(code) = exit_code else {
        return SubCheckResult {
            status: GateStatus::ToolError,
            exit_code: None,
            duration_ms,
            stdout_tail: tail(&stdout, 20),
            stderr_tail: String::from("timeout"),
            blocking_issue: Some(format!("timeout while running {}", spec.argv.join(" "))),
        };
    };

    let status = match code {
        0 => GateStatus::Pass,
        2 => GateStatus::PolicyFail,
        _ => GateStatus::ToolError,
    };
    SubCheckResult {
        status,
        exit_code: Some(code),
        duration_ms,
        stdout_tail: tail(&stdout, 20),
        stderr_tail: tail(&stderr, 20),
        blocking_issue: None,
    }
}

/// Returns elapsed milliseconds since an instant.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Gate Implementation
// ============================================================================

/// G1 environment-integrity gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct G1Check;

impl GateCheck for G1Check {
    fn gate(&self) -> Gate {
        Gate::G1
    }

    fn run(&self, ctx: &GateContext) -> GateOutcome {
        let specs = build_specs(ctx);
        let mut checks: Vec<Value> = Vec::new();
        let mut reasons: Vec<String> = Vec::new();
        let mut issues: Vec<String> = Vec::new();
        let mut status = GateStatus::Pass;

        for spec in &specs {
            let report_path: PathBuf = ctx.run_dir.join(format!("g1_{}_report.json", short_name(spec.name)));
            let result =
                run_subcheck(spec, &ctx.repo_root, &report_path, ctx.subcheck_timeout_seconds);

            checks.push(json!({
                "name": spec.name,
                "status": result.status.as_str(),
                "exitCode": result.exit_code,
                "durationMs": result.duration_ms,
                "stdoutTail": result.stdout_tail,
                "stderrTail": result.stderr_tail,
                "blockingIssue": result.blocking_issue,
            }));

            if !spec.required || result.status == GateStatus::Pass {
                continue;
            }
            if result.status == GateStatus::ToolError {
                status = GateStatus::ToolError;
            } else if status != GateStatus::ToolError {
                status = GateStatus::PolicyFail;
            }
            reasons.push(spec.reason_code.to_string());
            issues.push(result.blocking_issue.unwrap_or_else(|| {
                format!("{} failed with status={}", spec.name, result.status.as_str())
            }));
        }

        let mut details: Map<String, Value> = Map::new();
        details.insert(String::from("checks"), Value::Array(checks));

        GateOutcome {
            status,
            reason_codes: dedup_preserving_order(&reasons),
            blocking_issues: issues,
            details: Value::Object(details),
            dataset_snapshot_hash: None,
            attestation: None,
        }
    }
}

/// Shortens a sub-check name for its report file.
fn short_name(name: &str) -> &'static str {
    match name {
        "verify_environment_lock" => "env_verify",
        "verify_freeze_manifest" => "freeze_verify",
        _ => "post_pull_sync",
    }
}
