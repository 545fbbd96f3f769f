// release-gate-core/src/core/profile.rs
// ============================================================================
// Module: Release Gate Profile
// Description: Frozen run configuration: thresholds, timeouts, retries.
// Purpose: Give gates a typed view of the profile while hashing the document.
// Dependencies: serde, serde_json, crate::core::hashing
// ============================================================================

//! ## Overview
//! The profile is immutable within a run. The raw document is retained so
//! `profileHash` covers exactly what was loaded, while the typed projection
//! drives gate behavior. The `strategy` subtree doubles as the thresholds
//! document and is hashed separately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::checkpoint::Gate;
use crate::core::checkpoint::GateStatus;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_hash;

// ============================================================================
// SECTION: Validation Mode
// ============================================================================

/// Strictness applied to missing evidence and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Missing evidence is a hard failure.
    #[default]
    Strict,
    /// Missing evidence downgrades to warnings.
    Tolerant,
}

impl ValidationMode {
    /// Reports whether missing evidence must fail the gate.
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

// ============================================================================
// SECTION: Gate Group Configuration
// ============================================================================

/// G0 fail-fast configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct G0Config {
    /// Require the reason-code catalog lint.
    pub require_reason_code_lint: bool,
    /// Require the toolchain availability probe.
    pub require_command_availability: bool,
    /// Require the clock-drift probe.
    pub require_clock_drift: bool,
    /// Require the secrets-hygiene scan.
    pub require_secrets_hygiene: bool,
    /// Maximum tolerated absolute clock drift in milliseconds.
    pub clock_drift_ms_max: i64,
    /// Commands that must resolve on `PATH`.
    pub required_commands: Vec<String>,
}

impl Default for G0Config {
    fn default() -> Self {
        Self {
            require_reason_code_lint: true,
            require_command_availability: true,
            require_clock_drift: true,
            require_secrets_hygiene: true,
            clock_drift_ms_max: 2_000,
            required_commands: vec![String::from("git"), String::from("date")],
        }
    }
}

/// G1 environment-integrity configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct G1Config {
    /// Require the environment-lock sub-check.
    pub require_env_lock_passed: bool,
    /// Require the freeze-manifest sub-check.
    pub require_freeze_manifest_passed: bool,
    /// Require the post-pull synchronizer sub-check.
    pub require_post_pull_sync_passed: bool,
    /// Override argv for the environment-lock sub-check.
    pub env_lock_command: Option<Vec<String>>,
    /// Override argv for the freeze-manifest sub-check.
    pub freeze_manifest_command: Option<Vec<String>>,
    /// Override argv for the post-pull synchronizer sub-check.
    pub post_pull_sync_command: Option<Vec<String>>,
}

impl Default for G1Config {
    fn default() -> Self {
        Self {
            require_env_lock_passed: true,
            require_freeze_manifest_passed: true,
            require_post_pull_sync_passed: true,
            env_lock_command: None,
            freeze_manifest_command: None,
            post_pull_sync_command: None,
        }
    }
}

/// G2 research-card quality configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Minimum card count.
    pub min_cards: i64,
    /// Fields every card must populate.
    pub required_fields: Vec<String>,
    /// Maximum aggregate missing-field ratio.
    pub required_field_missing_ratio_max: f64,
    /// Maximum unresolved-conflict ratio.
    pub unresolved_conflict_ratio_max: f64,
    /// Minimum traceability ratio.
    pub traceability_ratio_min: f64,
    /// Minimum citation-parse ratio.
    pub citation_parse_ratio_min: f64,
}

/// G3 strategy threshold configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Minimum proof-of-concept candidate count.
    pub min_poc_count: i64,
    /// Minimum passing candidate count.
    pub pass_candidates_min: i64,
    /// Minimum trade count.
    pub min_trades: i64,
    /// Minimum backtest-day count.
    pub min_backtest_days: i64,
    /// Minimum effective-observation count.
    pub min_effective_observations: i64,
    /// Maximum probability of backtest overfitting.
    pub pbo_max: Option<f64>,
    /// Minimum deflated Sharpe ratio probability.
    pub dsr_probability_min: Option<f64>,
    /// Maximum false-discovery-rate q value.
    pub fdr_q_max: Option<f64>,
    /// Maximum stress decline.
    pub stress_net_trim10_decline_max: Option<f64>,
}

/// G3 source-health threshold configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceHealthConfig {
    /// Maximum watch staleness in minutes.
    pub stale_watch_minutes_max: Option<f64>,
    /// Maximum optimizer staleness in minutes.
    pub stale_optimize_minutes_max: Option<f64>,
    /// Maximum queue-drain staleness in minutes.
    pub stale_queue_drain_minutes_max: Option<f64>,
    /// Maximum queue length.
    pub queue_length_max: Option<f64>,
    /// Maximum legacy-entry ratio in the queue.
    pub legacy_ratio_max: Option<f64>,
}

/// G3 budget cap configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Hard cap on daily tokens.
    pub daily_token_hard_cap: Option<f64>,
    /// Hard cap on per-task tokens.
    pub per_task_token_hard_cap: Option<f64>,
    /// Hard cap on daily cost in USD.
    pub cost_hard_cap_usd: Option<f64>,
    /// Soft cap on daily tokens.
    pub daily_token_soft_cap: Option<f64>,
    /// Soft cap on daily cost in USD.
    pub cost_soft_cap_usd: Option<f64>,
}

/// Release decision configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Default decision weight recorded on checkpoints and verdicts.
    pub default_decision_weight: String,
    /// Verdict results the profile permits, when restricted.
    pub allowed_outputs: Option<Vec<String>>,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            default_decision_weight: String::from("limited"),
            allowed_outputs: None,
        }
    }
}

/// Per-gate retry configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first.
    pub max_attempts: u32,
    /// Seconds to wait between attempts.
    pub interval_seconds: u64,
}

// ============================================================================
// SECTION: Profile Document
// ============================================================================

/// Typed projection of the profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// G0 fail-fast group.
    pub g0: G0Config,
    /// G1 environment-integrity group.
    pub g1: G1Config,
    /// G2 research-card group.
    pub research: ResearchConfig,
    /// G3 strategy threshold group.
    pub strategy: StrategyConfig,
    /// G3 source-health group.
    pub source_health: SourceHealthConfig,
    /// G3 budget group.
    pub budget: BudgetConfig,
    /// Release decision group.
    pub decision: DecisionConfig,
    /// Per-gate timeout budget in minutes.
    pub timeouts_minutes: BTreeMap<String, u64>,
    /// Per-gate retry configuration.
    pub retries: BTreeMap<String, RetryConfig>,
    /// Statuses eligible for retry.
    pub retry_on_status: Vec<GateStatus>,
    /// Strictness applied to missing evidence.
    pub validation_mode: ValidationMode,
    /// Codes that must exist in the catalog before G3 may rely on them.
    pub hard_block_reason_codes_g3: Vec<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            g0: G0Config::default(),
            g1: G1Config::default(),
            research: ResearchConfig::default(),
            strategy: StrategyConfig::default(),
            source_health: SourceHealthConfig::default(),
            budget: BudgetConfig::default(),
            decision: DecisionConfig::default(),
            timeouts_minutes: BTreeMap::new(),
            retries: BTreeMap::new(),
            retry_on_status: vec![GateStatus::ToolError],
            validation_mode: ValidationMode::Strict,
            hard_block_reason_codes_g3: Vec::new(),
        }
    }
}

/// Frozen profile: raw document plus typed projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Raw document as loaded, hashed for `profileHash`.
    raw: Value,
    /// Typed projection driving gate behavior.
    pub config: ProfileConfig,
}

impl Profile {
    /// Default per-attempt timeout when the profile is silent.
    pub const DEFAULT_TIMEOUT_MINUTES: u64 = 60;

    /// Builds a profile from a loaded document.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when the document does not fit the
    /// profile shape.
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let config: ProfileConfig = serde_json::from_value(raw.clone())?;
        Ok(Self {
            raw,
            config,
        })
    }

    /// Returns the raw document.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    /// Canonical hash of the whole profile document.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn profile_hash(&self) -> Result<String, HashError> {
        canonical_json_hash(&self.raw)
    }

    /// Canonical hash of the `strategy` thresholds subtree.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn thresholds_hash(&self) -> Result<String, HashError> {
        let subtree = self.raw.get("strategy").cloned().unwrap_or_else(|| Value::Object(
            serde_json::Map::new(),
        ));
        canonical_json_hash(&subtree)
    }

    /// Per-attempt timeout budget for a gate, in seconds.
    #[must_use]
    pub fn timeout_seconds(&self, gate: Gate) -> u64 {
        let minutes = self
            .config
            .timeouts_minutes
            .get(gate.as_str())
            .copied()
            .filter(|value| *value > 0)
            .unwrap_or(Self::DEFAULT_TIMEOUT_MINUTES);
        minutes * 60
    }

    /// Retry configuration for a gate.
    #[must_use]
    pub fn retry_config(&self, gate: Gate) -> RetryConfig {
        self.config.retries.get(gate.as_str()).copied().unwrap_or_default()
    }

    /// Reports whether a status is eligible for retry.
    #[must_use]
    pub fn retries_on(&self, status: GateStatus) -> bool {
        self.config.retry_on_status.contains(&status)
    }
}
