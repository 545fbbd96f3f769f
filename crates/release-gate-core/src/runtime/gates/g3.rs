// release-gate-core/src/runtime/gates/g3.rs
// ============================================================================
// Module: Release Gate G3 Strategy, Health, and Budget
// Description: Admission counts, strategy thresholds, stress metric, source
//              health, budget caps, and dataset-snapshot integrity.
// Purpose: Enforce every quantitative admission threshold in one gate.
// Dependencies: serde_json, crate::core, crate::runtime::{snapshot, stress}
// ============================================================================

//! ## Overview
//! G3 is the widest gate. It consumes five evidence documents plus the four
//! snapshot inputs, resolves legacy key spellings through ordered fallbacks,
//! and maps every breach onto its fixed reason code. `strict` validation
//! mode turns missing evidence into hard failures; `tolerant` mode degrades
//! them to warnings recorded in details.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::checkpoint::Gate;
use crate::core::hashing::canonical_json_hash;
use crate::core::hashing::sha256_file;
use crate::core::io::read_optional_json_object;
use crate::core::value::pick_int;
use crate::core::value::pick_number;
use crate::core::value::push_unique;
use crate::runtime::gates::GateCheck;
use crate::runtime::gates::GateContext;
use crate::runtime::gates::GateOutcome;
use crate::runtime::snapshot::SnapshotError;
use crate::runtime::snapshot::SnapshotInputs;
use crate::runtime::snapshot::build_snapshot;
use crate::runtime::snapshot::drift_fields;
use crate::runtime::snapshot::load_or_create_snapshot;
use crate::runtime::stress::FORMULA_ID;
use crate::runtime::stress::formula_hash;
use crate::runtime::stress::stress_net_trim10_decline;

// ============================================================================
// SECTION: Reason Codes
// ============================================================================

/// Sample-size breach reason code.
const REASON_SAMPLE: &str = "HARD_INSUFFICIENT_SAMPLE";
/// Threshold breach reason code.
const REASON_BREACH: &str = "HARD_THRESHOLD_BREACH";
/// Undefined stress metric reason code.
const REASON_STRESS_UNDEFINED: &str = "HARD_STRESS_METRIC_UNDEFINED";
/// Leakage detection reason code.
const REASON_LEAKAGE: &str = "HARD_LEAKAGE_DETECTED";
/// Source-health failure reason code.
const REASON_HEALTH: &str = "HARD_SOURCE_HEALTH_FAIL";
/// Budget hard-cap reason code.
const REASON_BUDGET: &str = "HARD_BUDGET_HARD_CAP_HIT";
/// Missing metric reason code.
const REASON_MISSING: &str = "HARD_METRIC_MISSING";
/// Statistics-lock mismatch reason code.
const REASON_STAT_MISMATCH: &str = "HARD_STAT_METHOD_MISMATCH";
/// Dataset-snapshot drift reason code.
const REASON_DRIFT: &str = "HARD_DATASET_SNAPSHOT_DRIFT";

// ============================================================================
// SECTION: Gate Implementation
// ============================================================================

/// G3 strategy, health, and budget gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct G3Check;

impl GateCheck for G3Check {
    fn gate(&self) -> Gate {
        Gate::G3
    }

    #[allow(clippy::too_many_lines, reason = "single pass over every G3 threshold family")]
    fn run(&self, ctx: &GateContext) -> GateOutcome {
        let strict = ctx.profile.config.validation_mode.is_strict();
        let strategy_cfg = &ctx.profile.config.strategy;

        let mut reasons: Vec<String> = Vec::new();
        let mut issues: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut missing_metrics: Vec<String> = Vec::new();
        let mut metrics: Map<String, Value> = Map::new();
        let mut details: Map<String, Value> = Map::new();
        details.insert(
            String::from("formula"),
            json!({"id": FORMULA_ID, "hash": formula_hash()}),
        );

        let strategy_metrics = load_evidence(&ctx.evidence.strategy_metrics, "strategyMetricsPath", &mut details);
        let admission = load_evidence(&ctx.evidence.admission_report, "admissionReportPath", &mut details);
        let external = load_evidence(&ctx.evidence.external_report, "externalReportPath", &mut details);
        let health = load_evidence(&ctx.evidence.health_report, "healthReportPath", &mut details);
        let budget_usage = load_evidence(&ctx.evidence.budget_usage, "budgetUsagePath", &mut details);

        // Admission counting.
        let rows: Vec<Value> = match admission.get("rows") {
            Some(Value::Array(entries)) => entries.clone(),
            _ => Vec::new(),
        };
        let poc_count = pick_int(&admission, &["total_candidates"])
            .unwrap_or_else(|| i64::try_from(rows.len()).unwrap_or(i64::MAX));
        let pass_candidates = rows
            .iter()
            .filter(|row| {
                row.get("main_eligible") == Some(&Value::Bool(true))
                    || row.get("transfer_pass") == Some(&Value::Bool(true))
            })
            .count();
        let pass_candidates = i64::try_from(pass_candidates).unwrap_or(i64::MAX);

        if poc_count < strategy_cfg.min_poc_count {
            issues.push(format!(
                "min_poc_count not met: {poc_count} < {}",
                strategy_cfg.min_poc_count
            ));
            push_unique(&mut reasons, String::from(REASON_SAMPLE));
        }
        if pass_candidates < strategy_cfg.pass_candidates_min {
            issues.push(format!(
                "pass_candidates_min not met: {pass_candidates} < {}",
                strategy_cfg.pass_candidates_min
            ));
            push_unique(&mut reasons, String::from(REASON_SAMPLE));
        }

        // Integer floor metrics.
        let int_metric_mapping: [(&str, &[&str], i64); 3] = [
            ("min_trades", &["min_trades", "trade_count", "trades"], strategy_cfg.min_trades),
            (
                "min_backtest_days",
                &["min_backtest_days", "backtest_days", "days"],
                strategy_cfg.min_backtest_days,
            ),
            (
                "min_effective_observations",
                &["min_effective_observations", "effective_observations", "effective_n"],
                strategy_cfg.min_effective_observations,
            ),
        ];
        for (metric_name, aliases, floor) in int_metric_mapping {
            let Some(value) = pick_int(&strategy_metrics, aliases) else {
                missing_metrics.push(metric_name.to_string());
                continue;
            };
            metrics.insert(metric_name.to_string(), json!(value));
            if value < floor {
                issues.push(format!("{metric_name} not met: {value} < {floor}"));
                push_unique(&mut reasons, String::from(REASON_SAMPLE));
            }
        }

        // Float threshold metrics.
        let float_metric_mapping: [(&str, &[&str]); 3] = [
            ("pbo", &["pbo", "meanPbo"]),
            ("dsr_probability", &["dsr_probability", "meanDsrProbability"]),
            ("fdr_q", &["fdr_q", "fdrQ"]),
        ];
        for (metric_name, aliases) in float_metric_mapping {
            match pick_number(&strategy_metrics, aliases) {
                Some(value) => {
                    metrics.insert(metric_name.to_string(), json!(value));
                }
                None => missing_metrics.push(metric_name.to_string()),
            }
        }

        let metric_value = |metrics: &Map<String, Value>, name: &str| {
            metrics.get(name).and_then(Value::as_f64)
        };
        if let (Some(limit), Some(value)) = (strategy_cfg.pbo_max, metric_value(&metrics, "pbo")) {
            if value > limit {
                issues.push(format!("pbo exceeds threshold: {value:.6} > {limit:.6}"));
                push_unique(&mut reasons, String::from(REASON_BREACH));
            }
        }
        if let (Some(limit), Some(value)) =
            (strategy_cfg.dsr_probability_min, metric_value(&metrics, "dsr_probability"))
        {
            if value < limit {
                issues.push(format!("dsr_probability below threshold: {value:.6} < {limit:.6}"));
                push_unique(&mut reasons, String::from(REASON_BREACH));
            }
        }
        if let (Some(limit), Some(value)) = (strategy_cfg.fdr_q_max, metric_value(&metrics, "fdr_q"))
        {
            if value > limit {
                issues.push(format!("fdr_q exceeds threshold: {value:.6} > {limit:.6}"));
                push_unique(&mut reasons, String::from(REASON_BREACH));
            }
        }

        // Stress metric.
        let baseline = pick_number(&strategy_metrics, &["baseline_net_trim10_mean"]).or_else(|| {
            external
                .get("baseline")
                .and_then(Value::as_object)
                .and_then(|map| pick_number(map, &["net_trim10_mean"]))
        });
        let candidate = pick_number(&strategy_metrics, &["candidate_net_trim10_mean"])
            .or_else(|| best_aggregate_candidate(&external));

        if let (Some(baseline), Some(candidate)) = (baseline, candidate) {
            let decline = stress_net_trim10_decline(baseline, candidate);
            metrics.insert(String::from("stress_net_trim10_decline"), json!(decline));
            if let Some(limit) = strategy_cfg.stress_net_trim10_decline_max {
                if decline > limit {
                    issues.push(format!(
                        "stress_net_trim10_decline exceeds threshold: {decline:.6} > {limit:.6}"
                    ));
                    push_unique(&mut reasons, String::from(REASON_BREACH));
                }
            }
        } else {
            missing_metrics.push(String::from("stress_net_trim10_decline"));
            push_unique(&mut reasons, String::from(REASON_STRESS_UNDEFINED));
            issues.push(String::from("stress metric inputs missing (baseline/candidate)"));
        }

        if strategy_metrics.get("leakage_detected") == Some(&Value::Bool(true)) {
            issues.push(String::from("leakage_detected=true"));
            push_unique(&mut reasons, String::from(REASON_LEAKAGE));
        }

        // Source health.
        let health_cfg = &ctx.profile.config.source_health;
        if health.is_empty() {
            if strict {
                issues.push(format!(
                    "missing source health report: {}",
                    ctx.evidence.health_report.display()
                ));
                push_unique(&mut reasons, String::from(REASON_HEALTH));
            }
        } else {
            let health_checks: [(&str, Option<f64>); 5] = [
                ("stale_watch_minutes", health_cfg.stale_watch_minutes_max),
                ("stale_optimize_minutes", health_cfg.stale_optimize_minutes_max),
                ("stale_queue_drain_minutes", health_cfg.stale_queue_drain_minutes_max),
                ("queue_length", health_cfg.queue_length_max),
                ("queue_legacy_ratio", health_cfg.legacy_ratio_max),
            ];
            for (name, threshold) in health_checks {
                let Some(limit) = threshold else {
                    continue;
                };
                let Some(value) = pick_number(&health, &[name]) else {
                    let message = format!("source health metric missing: {name}");
                    if strict {
                        issues.push(message);
                        push_unique(&mut reasons, String::from(REASON_HEALTH));
                    } else {
                        warnings.push(message);
                    }
                    continue;
                };
                if value > limit {
                    issues.push(format!("source health threshold breach: {name}={value} > {limit}"));
                    push_unique(&mut reasons, String::from(REASON_HEALTH));
                }
            }
        }

        // Budget caps.
        let budget_cfg = &ctx.profile.config.budget;
        if budget_usage.is_empty() {
            if strict {
                issues.push(format!(
                    "missing budget usage report: {}",
                    ctx.evidence.budget_usage.display()
                ));
                push_unique(&mut reasons, String::from(REASON_MISSING));
            }
        } else {
            let daily_tokens = pick_number(
                &budget_usage,
                &["daily_tokens", "daily_token_usage", "dailyTokenUsage", "dailyTokens"],
            );
            let per_task_tokens = pick_number(
                &budget_usage,
                &["per_task_tokens", "per_task_token_usage", "perTaskTokenUsage"],
            );
            let daily_cost = pick_number(
                &budget_usage,
                &["daily_cost_usd", "dailyCostUsd", "cost_usd", "daily_cost"],
            );

            if let (Some(value), Some(cap)) = (daily_tokens, budget_cfg.daily_token_hard_cap) {
                if value > cap {
                    issues.push(format!("daily token hard cap breach: {value:.0} > {cap:.0}"));
                    push_unique(&mut reasons, String::from(REASON_BUDGET));
                }
            }
            if let (Some(value), Some(cap)) = (per_task_tokens, budget_cfg.per_task_token_hard_cap)
            {
                if value > cap {
                    issues.push(format!("per-task token hard cap breach: {value:.0} > {cap:.0}"));
                    push_unique(&mut reasons, String::from(REASON_BUDGET));
                }
            }
            if let (Some(value), Some(cap)) = (daily_cost, budget_cfg.cost_hard_cap_usd) {
                if value > cap {
                    issues.push(format!("daily cost hard cap breach: {value:.4} > {cap:.4}"));
                    push_unique(&mut reasons, String::from(REASON_BUDGET));
                }
            }
            if let (Some(value), Some(cap)) = (daily_tokens, budget_cfg.daily_token_soft_cap) {
                if value > cap {
                    warnings.push(format!("daily token soft cap exceeded: {value:.0} > {cap:.0}"));
                }
            }
            if let (Some(value), Some(cap)) = (daily_cost, budget_cfg.cost_soft_cap_usd) {
                if value > cap {
                    warnings.push(format!("daily cost soft cap exceeded: {value:.4} > {cap:.4}"));
                }
            }
        }

        // Statistics-lock consistency.
        if let (Some(candidate_lock @ Value::Object(_)), Some(registry_lock @ Value::Object(_))) = (
            strategy_metrics.get("statistics_lock"),
            ctx.registry.statistics_lock.as_ref(),
        ) {
            let candidate_hash = canonical_json_hash(candidate_lock).ok();
            let registry_hash = canonical_json_hash(registry_lock).ok();
            if candidate_hash != registry_hash {
                issues.push(String::from(
                    "statistics_lock mismatch between registry and strategy metrics",
                ));
                push_unique(&mut reasons, String::from(REASON_STAT_MISMATCH));
            }
        }

        // Dataset-snapshot integrity.
        let lock_path = ctx.run_dir.join("dataset_snapshot_lock.json");
        check_snapshot_drift(ctx, &lock_path, &mut issues, &mut reasons);

        // Aggregated missing metrics.
        if !missing_metrics.is_empty() {
            let mut sorted: Vec<String> = missing_metrics.clone();
            sorted.sort();
            sorted.dedup();
            let message = format!("missing metrics: {}", sorted.join(", "));
            if strict {
                issues.push(message);
                push_unique(&mut reasons, String::from(REASON_MISSING));
            } else {
                warnings.push(message);
            }
        }

        details.insert(String::from("strategyMetrics"), Value::Object(metrics));
        details.insert(String::from("warnings"), json!(warnings));
        details.insert(String::from("pocCount"), json!(poc_count));
        details.insert(String::from("passCandidates"), json!(pass_candidates));
        details.insert(
            String::from("statisticsLockHash"),
            json!(ctx.registry.statistics_lock_hash().unwrap_or_default()),
        );
        details.insert(
            String::from("thresholdsHash"),
            json!(ctx.profile.thresholds_hash().unwrap_or_default()),
        );

        let mut dataset_snapshot_hash = None;
        if lock_path.exists() {
            details.insert(
                String::from("datasetSnapshotLockPath"),
                json!(lock_path.display().to_string()),
            );
            if let Ok(hash) = sha256_file(&lock_path) {
                details.insert(String::from("datasetSnapshotHash"), json!(hash));
                dataset_snapshot_hash = Some(hash);
            }
        }

        let mut outcome = GateOutcome::from_findings(reasons, issues, details);
        outcome.dataset_snapshot_hash = dataset_snapshot_hash;
        outcome
    }
}

// ============================================================================
// SECTION: Evidence Loading
// ============================================================================

/// Loads an optional evidence document, annotating its path in details.
///
/// Missing or unreadable documents read as empty objects; strictness about
/// absence is applied per evidence family, not at load time.
fn load_evidence(
    path: &Path,
    detail_key: &str,
    details: &mut Map<String, Value>,
) -> Map<String, Value> {
    match read_optional_json_object(path) {
        Ok(Some(Value::Object(map))) => {
            details.insert(detail_key.to_string(), json!(path.display().to_string()));
            map
        }
        _ => Map::new(),
    }
}

/// Finds the best candidate mean across the external aggregate rows.
fn best_aggregate_candidate(external: &Map<String, Value>) -> Option<f64> {
    let Some(Value::Array(rows)) = external.get("aggregate") else {
        return None;
    };
    rows.iter()
        .filter_map(|row| row.as_object())
        .filter_map(|row| pick_number(row, &["net_trim10_mean"]))
        .fold(None, |best: Option<f64>, value| {
            Some(best.map_or(value, |current| current.max(value)))
        })
}

// ============================================================================
// SECTION: Snapshot Integrity
// ============================================================================

/// Loads or freezes the snapshot lock and reports drift against live inputs.
fn check_snapshot_drift(
    ctx: &GateContext,
    lock_path: &Path,
    issues: &mut Vec<String>,
    reasons: &mut Vec<String>,
) {
    let inputs = SnapshotInputs {
        dataset: ctx.evidence.dataset.clone(),
        features: ctx.evidence.features.clone(),
        labels: ctx.evidence.labels.clone(),
        split: ctx.evidence.split.clone(),
    };

    let outcome = load_or_create_snapshot(&ctx.run_id, &inputs, lock_path)
        .and_then(|stored| build_snapshot(&ctx.run_id, &inputs).map(|live| (stored, live)));
    match outcome {
        Ok((stored, live)) => {
            if let Some(field) = drift_fields(&stored, &live).first() {
                issues.push(format!("dataset snapshot drift on {field}"));
                push_unique(reasons, String::from(REASON_DRIFT));
            }
        }
        Err(SnapshotError::InputMissing(path)) => {
            issues.push(format!("snapshot input missing: {}", path.display()));
            push_unique(reasons, String::from(REASON_DRIFT));
        }
        Err(err) => {
            issues.push(format!("dataset snapshot tool_error: {err}"));
            push_unique(reasons, String::from(REASON_DRIFT));
        }
    }
}
