// release-gate-core/src/runtime/replay.rs
// ============================================================================
// Module: Release Gate State-Machine Replay
// Description: Validate an external runtime state log against the machine.
// Purpose: Prove a transition log only ever moved along allowed edges.
// Dependencies: serde, serde_json, crate::core::{io, time}
// ============================================================================

//! ## Overview
//! The runtime state machine has five states and a fixed transition table
//! with self-loops on every state. Replay resolves each event's `to` and
//! `from` through ordered legacy-key fallbacks, tracks the running state,
//! and reports every disallowed edge. Out-of-order timestamps warn; they do
//! not invalidate the log. Replaying the same log twice yields the same
//! report apart from its stamp.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::time::parse_iso;
use crate::core::time::utc_now_iso;

// ============================================================================
// SECTION: Runtime States
// ============================================================================

/// The runtime state alphabet.
const STATE_SET: [&str; 5] =
    ["NORMAL", "WATCH", "DEGRADE_H0", "PAUSE_NEW_OPENS", "RECOVERY_SHADOW"];

/// Allowed transitions per state, excluding the universal self-loop.
const ALLOWED_TRANSITIONS: [(&str, &[&str]); 5] = [
    ("NORMAL", &["WATCH", "DEGRADE_H0", "PAUSE_NEW_OPENS"]),
    ("WATCH", &["NORMAL", "DEGRADE_H0", "PAUSE_NEW_OPENS"]),
    ("DEGRADE_H0", &["RECOVERY_SHADOW", "PAUSE_NEW_OPENS"]),
    ("PAUSE_NEW_OPENS", &["WATCH", "DEGRADE_H0", "RECOVERY_SHADOW"]),
    ("RECOVERY_SHADOW", &["NORMAL", "DEGRADE_H0", "PAUSE_NEW_OPENS"]),
];

/// Reports whether a state token belongs to the alphabet.
fn is_known_state(token: &str) -> bool {
    STATE_SET.contains(&token)
}

/// Reports whether an edge is allowed, counting self-loops.
fn is_allowed(from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }
    ALLOWED_TRANSITIONS
        .iter()
        .find(|(state, _)| *state == from)
        .is_some_and(|(_, targets)| targets.contains(&to))
}

// ============================================================================
// SECTION: Key Fallbacks
// ============================================================================

/// Ordered key fallbacks for the destination state.
const TO_KEYS: [&str; 4] = ["to", "toState", "nextState", "state"];
/// Ordered key fallbacks for the origin state.
const FROM_KEYS: [&str; 4] = ["from", "fromState", "prevState", "previousState"];
/// Ordered key fallbacks for the event timestamp.
const TIME_KEYS: [&str; 4] = ["timestamp", "at", "createdAt", "time"];

/// Resolves a state token through ordered key fallbacks, normalized.
fn coalesce_state(record: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(Value::String(raw)) = record.get(*key) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_uppercase());
            }
        }
    }
    None
}

/// Resolves the event timestamp through ordered key fallbacks.
fn coalesce_timestamp(record: &Value) -> Option<OffsetDateTime> {
    for key in TIME_KEYS {
        if let Some(Value::String(raw)) = record.get(key) {
            if let Some(parsed) = parse_iso(raw) {
                return Some(parsed);
            }
        }
    }
    None
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// One replayed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayTransition {
    /// Log line the event came from, 1-indexed.
    pub line: usize,
    /// Origin state, absent for an initialization record.
    pub from: Option<String>,
    /// Destination state.
    pub to: String,
    /// Whether the edge is allowed.
    pub allowed: bool,
    /// Optional event tag carried on the record.
    pub event: Option<Value>,
}

/// Replay report (`replay_report.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    /// Emission stamp.
    pub generated_at: String,
    /// Whether the whole log validated.
    pub valid: bool,
    /// Log file the report covers.
    pub log_file: String,
    /// Number of replayed transitions.
    pub transition_count: usize,
    /// Final tracked state, when any event resolved.
    pub final_state: Option<String>,
    /// Validation errors.
    pub errors: Vec<String>,
    /// Ordering warnings.
    pub warnings: Vec<String>,
    /// Replayed transitions.
    pub transitions: Vec<ReplayTransition>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort replay entirely.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The log file could not be read.
    #[error("failed to read {path}: {message}")]
    Unreadable {
        /// Log path.
        path: String,
        /// Short failure description.
        message: String,
    },
}

// ============================================================================
// SECTION: Replay
// ============================================================================

/// Replays a state-machine log file and produces a validation report.
///
/// A missing or empty log yields an invalid report, not an error; only an
/// unreadable file aborts.
///
/// # Errors
///
/// Returns [`ReplayError::Unreadable`] when the log exists but cannot be
/// read.
pub fn replay_log(log_path: &Path) -> Result<ReplayReport, ReplayError> {
    let path_text = log_path.display().to_string();
    if !log_path.exists() {
        return Ok(invalid_report(&path_text, vec![format!("log file not found: {path_text}")]));
    }

    let text = fs::read_to_string(log_path).map_err(|err| ReplayError::Unreadable {
        path: path_text.clone(),
        message: err.to_string(),
    })?;

    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut transitions: Vec<ReplayTransition> = Vec::new();
    let mut current_state: Option<String> = None;
    let mut last_ts: Option<OffsetDateTime> = None;
    let mut event_count = 0_usize;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        event_count += 1;

        let record: Value = match serde_json::from_str(trimmed) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => {
                errors.push(format!("line {line_no} must be JSON object."));
                continue;
            }
            Err(err) => {
                errors.push(format!("line {line_no}: invalid_replay_input: {err}"));
                continue;
            }
        };

        let Some(to_state) = coalesce_state(&record, &TO_KEYS) else {
            errors.push(format!("line {line_no}: cannot determine to-state."));
            continue;
        };
        if !is_known_state(&to_state) {
            errors.push(format!("line {line_no}: unknown state '{to_state}'."));
            continue;
        }

        let mut from_state = coalesce_state(&record, &FROM_KEYS);
        if from_state.is_none() {
            from_state.clone_from(&current_state);
        }
        if let Some(origin) = from_state.as_deref() {
            if !is_known_state(origin) {
                errors.push(format!("line {line_no}: unknown from-state '{origin}'."));
                continue;
            }
        }

        if let Some(ts) = coalesce_timestamp(&record) {
            if last_ts.is_some_and(|previous| ts < previous) {
                warnings.push(format!("line {line_no}: timestamp is out-of-order."));
            }
            last_ts = Some(ts);
        }

        let event = record.get("event").cloned();
        match from_state {
            None => {
                // First resolvable event initializes the tracker.
                transitions.push(ReplayTransition {
                    line: line_no,
                    from: None,
                    to: to_state.clone(),
                    allowed: true,
                    event,
                });
                current_state = Some(to_state);
            }
            Some(origin) => {
                let allowed = is_allowed(&origin, &to_state);
                if !allowed {
                    errors.push(format!(
                        "line {line_no}: invalid transition {origin} -> {to_state}."
                    ));
                }
                transitions.push(ReplayTransition {
                    line: line_no,
                    from: Some(origin),
                    to: to_state.clone(),
                    allowed,
                    event,
                });
                current_state = Some(to_state);
            }
        }
    }

    if event_count == 0 {
        return Ok(invalid_report(
            &path_text,
            vec![String::from("state machine log has no events.")],
        ));
    }

    let valid = errors.is_empty();
    Ok(ReplayReport {
        generated_at: utc_now_iso(),
        valid,
        log_file: path_text,
        transition_count: transitions.len(),
        final_state: current_state,
        errors,
        warnings,
        transitions,
    })
}

/// Builds an invalid report with no transitions.
fn invalid_report(log_file: &str, errors: Vec<String>) -> ReplayReport {
    ReplayReport {
        generated_at: utc_now_iso(),
        valid: false,
        log_file: log_file.to_string(),
        transition_count: 0,
        final_state: None,
        errors,
        warnings: Vec::new(),
        transitions: Vec::new(),
    }
}
