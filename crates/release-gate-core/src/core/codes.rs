// release-gate-core/src/core/codes.rs
// ============================================================================
// Module: Release Gate Reason Codes
// Description: Canonical reason-code catalog, naming lint, and alias map.
// Purpose: Keep every emitted reason code resolvable to a canonical entry.
// Dependencies: regex, serde
// ============================================================================

//! ## Overview
//! Reason codes are the only vocabulary gates may use to explain outcomes.
//! The catalog declares the canonical set and a deprecated-alias map; codes
//! must match `^(HARD|WARN|INFO)_[A-Z0-9_]+$`. Anything unresolvable is
//! escalated to `HARD_REASON_CODE_UNKNOWN` by the verdict deriver rather than
//! crashing the run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Well-Known Codes
// ============================================================================

/// Escalation code attached when a non-canonical code is observed.
pub const CODE_UNKNOWN: &str = "HARD_REASON_CODE_UNKNOWN";
/// Generic hard-gate failure code used for tool errors and timeouts.
pub const CODE_HARD_GATE_CHECK_FAILED: &str = "HARD_HARD_GATE_CHECK_FAILED";
/// Runner-guard self-health failure code.
pub const CODE_RUNNER_SELF_HEALTH_FAIL: &str = "HARD_GATE_RUNNER_SELF_HEALTH_FAIL";
/// Release policy rejection code.
pub const CODE_RELEASE_GATE_BLOCKED: &str = "HARD_RELEASE_GATE_BLOCKED";

// ============================================================================
// SECTION: Catalog Documents
// ============================================================================

/// Severity band carried by a canonical reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Blocks release until resolved.
    Hard,
    /// Surfaced but not blocking on its own.
    Warn,
    /// Informational only.
    Info,
}

/// One canonical reason-code declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonCode {
    /// Canonical code string.
    pub code: String,
    /// Severity band.
    pub severity: Severity,
    /// Whether the code participates in hard-gate enforcement.
    #[serde(rename = "hardGate")]
    pub hard_gate: bool,
    /// Free-form description fields keyed by language or audience.
    #[serde(flatten)]
    pub descriptions: BTreeMap<String, serde_json::Value>,
}

/// Deprecated alias mapping onto a canonical code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecatedAlias {
    /// Retired code spelling.
    pub alias: String,
    /// Canonical replacement.
    pub canonical: String,
}

/// Reason-code catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonCodeCatalog {
    /// Document version tag.
    #[serde(default)]
    pub version: Option<String>,
    /// Canonical code declarations.
    #[serde(default)]
    pub codes: Vec<ReasonCode>,
    /// Deprecated alias map.
    #[serde(rename = "deprecatedAliases", default)]
    pub deprecated_aliases: Vec<DeprecatedAlias>,
}

// ============================================================================
// SECTION: Naming Rule
// ============================================================================

/// Returns the compiled reason-code naming pattern.
fn naming_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
        let pattern = Regex::new("^(HARD|WARN|INFO)_[A-Z0-9_]+$").unwrap();
        pattern
    })
}

/// Reports whether a code satisfies the canonical naming rule.
#[must_use]
pub fn is_well_formed(code: &str) -> bool {
    naming_pattern().is_match(code)
}

// ============================================================================
// SECTION: Catalog Operations
// ============================================================================

impl ReasonCodeCatalog {
    /// Returns the canonical code set.
    #[must_use]
    pub fn canonical_set(&self) -> BTreeSet<String> {
        self.codes.iter().map(|entry| entry.code.clone()).collect()
    }

    /// Resolves a possibly deprecated code to its canonical spelling.
    ///
    /// Unknown codes are returned unchanged; membership is the caller's
    /// concern.
    #[must_use]
    pub fn resolve<'a>(&'a self, code: &'a str) -> &'a str {
        self.deprecated_aliases
            .iter()
            .find(|entry| entry.alias == code)
            .map_or(code, |entry| entry.canonical.as_str())
    }

    /// Reports whether a code resolves into the canonical set.
    #[must_use]
    pub fn is_canonical(&self, code: &str) -> bool {
        let resolved = self.resolve(code);
        self.codes.iter().any(|entry| entry.code == resolved)
    }

    /// Lints the catalog: non-empty, well-formed, duplicate-free codes.
    #[must_use]
    pub fn lint(&self) -> Vec<String> {
        let mut issues: Vec<String> = Vec::new();
        if self.codes.is_empty() {
            return vec![String::from("reason code file has empty or invalid 'codes' list")];
        }
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for entry in &self.codes {
            if !is_well_formed(&entry.code) {
                issues.push(format!("invalid reason code naming: '{}'", entry.code));
                continue;
            }
            if !seen.insert(entry.code.as_str()) {
                issues.push(format!("duplicate reason code: {}", entry.code));
            }
        }
        issues
    }

    /// Verifies that every required code exists in the catalog.
    #[must_use]
    pub fn missing_required(&self, required: &[String]) -> Vec<String> {
        let existing = self.canonical_set();
        required
            .iter()
            .filter(|code| !existing.contains(*code))
            .map(|code| format!("required code missing: {code}"))
            .collect()
    }
}
