// release-gate-core/src/runtime/gates/g0.rs
// ============================================================================
// Module: Release Gate G0 Fail-Fast Checks
// Description: Catalog lint, toolchain probe, clock drift, secrets hygiene.
// Purpose: Reject a run before any expensive gate spends its budget.
// Dependencies: crate::core, crate::runtime::secrets
// ============================================================================

//! ## Overview
//! G0 runs four cheap checks, each toggleable through `g0.require_*` flags
//! that default on. Failures map onto fixed reason codes and never abort the
//! remaining checks, so one attempt reports everything it found.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::process::Command;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::checkpoint::Gate;
use crate::core::value::push_unique;
use crate::runtime::gates::GateCheck;
use crate::runtime::gates::GateContext;
use crate::runtime::gates::GateOutcome;
use crate::runtime::secrets::scan_repo;

// ============================================================================
// SECTION: Gate Implementation
// ============================================================================

/// G0 fail-fast gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct G0Check;

impl GateCheck for G0Check {
    fn gate(&self) -> Gate {
        Gate::G0
    }

    fn run(&self, ctx: &GateContext) -> GateOutcome {
        let cfg = &ctx.profile.config.g0;
        let mut issues: Vec<String> = Vec::new();
        let mut reasons: Vec<String> = Vec::new();
        let mut details: Map<String, Value> = Map::new();

        if cfg.require_reason_code_lint {
            let lint_issues = ctx.catalog.lint();
            if !lint_issues.is_empty() {
                issues.extend(lint_issues);
                push_unique(&mut reasons, String::from("HARD_REASON_CODE_UNKNOWN"));
            }
            let required_issues =
                ctx.catalog.missing_required(&ctx.profile.config.hard_block_reason_codes_g3);
            if !required_issues.is_empty() {
                issues.extend(required_issues);
                push_unique(&mut reasons, String::from("HARD_REASON_CODE_UNKNOWN"));
            }
        } else {
            details.insert(String::from("reasonCodeLintSkipped"), Value::Bool(true));
        }

        if cfg.require_command_availability {
            let missing = missing_commands(&cfg.required_commands);
            details.insert(String::from("missingCommands"), json!(missing));
            if !missing.is_empty() {
                issues.push(format!("required commands missing: {}", missing.join(", ")));
                push_unique(&mut reasons, String::from("HARD_SOURCE_HEALTH_FAIL"));
            }
        } else {
            details.insert(String::from("missingCommands"), json!([]));
            details.insert(String::from("commandAvailabilitySkipped"), Value::Bool(true));
        }

        if cfg.require_clock_drift {
            let drift_ms = measure_clock_drift_ms();
            details.insert(String::from("clockDriftMs"), json!(drift_ms));
            if drift_ms > cfg.clock_drift_ms_max {
                issues.push(format!(
                    "clock drift exceeded: {drift_ms}ms > {}ms",
                    cfg.clock_drift_ms_max
                ));
                push_unique(&mut reasons, String::from("HARD_CLOCK_DRIFT_EXCEEDED"));
            }
        } else {
            details.insert(String::from("clockDriftSkipped"), Value::Bool(true));
        }

        if cfg.require_secrets_hygiene {
            let findings = scan_repo(&ctx.repo_root);
            details.insert(String::from("secretsFindingsCount"), json!(findings.len()));
            if !findings.is_empty() {
                issues.push(String::from("high-confidence secret findings detected"));
                push_unique(&mut reasons, String::from("HARD_SECRETS_HYGIENE_FAIL"));
            }
        } else {
            details.insert(String::from("secretsHygieneSkipped"), Value::Bool(true));
        }

        GateOutcome::from_findings(reasons, issues, details)
    }
}

// ============================================================================
// SECTION: Toolchain Probe
// ============================================================================

/// Returns the declared commands that do not resolve on `PATH`.
fn missing_commands(commands: &[String]) -> Vec<String> {
    commands.iter().filter(|cmd| !resolves_on_path(cmd)).cloned().collect()
}

/// Reports whether a command resolves to an executable on `PATH`.
fn resolves_on_path(command: &str) -> bool {
    if command.contains(std::path::MAIN_SEPARATOR) {
        return is_executable(Path::new(command));
    }
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| is_executable(&dir.join(command)))
}

/// Reports whether a path points at an executable file.
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

// ============================================================================
// SECTION: Clock Drift Probe
// ============================================================================

/// Measures absolute drift between process time and the shell clock.
///
/// A failed probe reads as zero drift: the probe exists to catch severe
/// local skew, not to make the gate depend on the probe command itself.
fn measure_clock_drift_ms() -> i64 {
    let process_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0);

    let Ok(output) = Command::new("date").args(["-u", "+%s"]).output() else {
        return 0;
    };
    if !output.status.success() {
        return 0;
    }
    let Ok(shell_secs) = String::from_utf8_lossy(&output.stdout).trim().parse::<i64>() else {
        return 0;
    };
    (process_ms - shell_secs.saturating_mul(1_000)).abs()
}
