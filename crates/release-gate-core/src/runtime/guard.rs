// release-gate-core/src/runtime/guard.rs
// ============================================================================
// Module: Release Gate Runner Guard
// Description: Circuit breaker over the checkpoint history NDJSON.
// Purpose: Block new runs while the pipeline itself is unhealthy.
// Dependencies: serde, crate::core::{io, policy, time}
// ============================================================================

//! ## Overview
//! The runner guard inspects the whole checkpoint history before G0 runs and
//! moves a persisted circuit through `closed`, `open`, and `half_open`. In
//! `learning` mode breaches are reported but the circuit never hard-opens; in
//! `enforced` mode an open circuit forces the pipeline into a self-health
//! failure. A missing or corrupt state file reads as `closed`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::io::IoError;
use crate::core::io::write_json_pretty;
use crate::core::policy::GuardMode;
use crate::core::policy::RunnerGuardPolicy;
use crate::core::time::utc_now_iso;

// ============================================================================
// SECTION: Guard State
// ============================================================================

/// Circuit state persisted between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// Healthy; runs proceed.
    #[default]
    Closed,
    /// Breached; runs are blocked under `enforced` mode.
    Open,
    /// Probation after an open circuit saw a clean evaluation.
    HalfOpen,
}

impl GuardState {
    /// Returns the stable state label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Persisted guard state document (`runner_guard_state.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardStateFile {
    /// Circuit state.
    pub state: GuardState,
    /// Last evaluation stamp.
    pub updated_at: String,
}

/// Loads the persisted state, treating missing or corrupt files as closed.
#[must_use]
pub fn load_state(path: &Path) -> GuardState {
    let Ok(text) = fs::read_to_string(path) else {
        return GuardState::Closed;
    };
    serde_json::from_str::<GuardStateFile>(&text).map_or(GuardState::Closed, |file| file.state)
}

// ============================================================================
// SECTION: History Rates
// ============================================================================

/// Failure and storm rates observed across the checkpoint history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardRates {
    /// Total checkpoint rows considered.
    pub total: f64,
    /// Share of rows with `tool_error` or `policy_fail` status.
    pub fail_rate: f64,
    /// Timeout mentions per row.
    pub timeout_rate: f64,
    /// Retry-storm mentions per row.
    pub retry_storm_rate: f64,
}

/// Loads checkpoint rows from a history NDJSON, skipping malformed lines.
#[must_use]
pub fn load_history(path: &Path) -> Vec<Value> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return None;
            }
            serde_json::from_str::<Value>(trimmed).ok().filter(Value::is_object)
        })
        .collect()
}

/// Computes guard rates over history rows.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "history counts stay far below 2^52")]
pub fn compute_rates(history: &[Value]) -> GuardRates {
    let total = history.len() as f64;
    if history.is_empty() {
        return GuardRates::default();
    }

    let mut fail_count = 0.0_f64;
    let mut timeout_count = 0.0_f64;
    let mut retry_storm_count = 0.0_f64;
    for row in history {
        let status = row.get("status").and_then(Value::as_str);
        if matches!(status, Some("tool_error" | "policy_fail")) {
            fail_count += 1.0;
        }
        if let Some(Value::Array(issues)) = row.get("blockingIssues") {
            for issue in issues {
                let Some(text) = issue.as_str() else {
                    continue;
                };
                let low = text.to_lowercase();
                if low.contains("timeout") {
                    timeout_count += 1.0;
                }
                if low.contains("retry storm") {
                    retry_storm_count += 1.0;
                }
            }
        }
    }

    GuardRates {
        total,
        fail_rate: fail_count / total,
        timeout_rate: timeout_count / total,
        retry_storm_rate: retry_storm_count / total,
    }
}

// ============================================================================
// SECTION: Transitions
// ============================================================================

/// Computes the next circuit state and the issues observed.
#[must_use]
pub fn transition_state(
    previous: GuardState,
    policy: &RunnerGuardPolicy,
    rates: &GuardRates,
) -> (GuardState, Vec<String>) {
    let mut issues: Vec<String> = Vec::new();
    let thresholds = policy.thresholds;

    if policy.mode == GuardMode::Learning {
        if rates.fail_rate > thresholds.fail_rate_max {
            issues.push(format!(
                "learning: failRate {:.4} > configured {:.4}",
                rates.fail_rate, thresholds.fail_rate_max
            ));
        }
        if rates.timeout_rate > thresholds.timeout_rate_max {
            issues.push(format!(
                "learning: timeoutRate {:.4} > configured {:.4}",
                rates.timeout_rate, thresholds.timeout_rate_max
            ));
        }
        if rates.retry_storm_rate > thresholds.retry_storm_max {
            issues.push(format!(
                "learning: retryStormRate {:.4} > configured {:.4}",
                rates.retry_storm_rate, thresholds.retry_storm_max
            ));
        }
        return (previous, issues);
    }

    let breach = rates.fail_rate > thresholds.fail_rate_max
        || rates.timeout_rate > thresholds.timeout_rate_max;
    if breach {
        issues.push(format!(
            "guard threshold breach: failRate={:.4}, timeoutRate={:.4}",
            rates.fail_rate, rates.timeout_rate
        ));
        return (GuardState::Open, issues);
    }

    let next = match previous {
        GuardState::Open => GuardState::HalfOpen,
        GuardState::HalfOpen | GuardState::Closed => GuardState::Closed,
    };
    (next, issues)
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Guard evaluation report (`runner_guard_latest_report.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardReport {
    /// Evaluation stamp.
    pub generated_at: String,
    /// Policy mode in force.
    pub mode: GuardMode,
    /// State loaded before evaluation.
    pub previous_state: GuardState,
    /// State after evaluation.
    pub state: GuardState,
    /// Observed history rates.
    pub rates: GuardRates,
    /// Breach descriptions, empty when healthy.
    pub issues: Vec<String>,
}

impl GuardReport {
    /// Reports whether the circuit hard-blocks the pipeline.
    #[must_use]
    pub fn hard_open(&self) -> bool {
        self.state == GuardState::Open && self.mode != GuardMode::Learning
    }
}

/// Evaluates the guard over a history file and previous state.
#[must_use]
pub fn evaluate_runner_guard(
    policy: &RunnerGuardPolicy,
    history: &[Value],
    previous: GuardState,
) -> GuardReport {
    let rates = compute_rates(history);
    let (state, issues) = transition_state(previous, policy, &rates);
    GuardReport {
        generated_at: utc_now_iso(),
        mode: policy.mode,
        previous_state: previous,
        state,
        rates,
        issues,
    }
}

/// Persists the evaluated state and report next to the history file.
///
/// # Errors
///
/// Returns [`IoError`] when either artifact cannot be written.
pub fn persist_evaluation(
    report: &GuardReport,
    state_path: &Path,
    report_path: &Path,
) -> Result<(), IoError> {
    write_json_pretty(report_path, report)?;
    write_json_pretty(
        state_path,
        &GuardStateFile {
            state: report.state,
            updated_at: report.generated_at.clone(),
        },
    )?;
    Ok(())
}
