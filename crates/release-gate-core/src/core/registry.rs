// release-gate-core/src/core/registry.rs
// ============================================================================
// Module: Release Gate Metric Registry
// Description: Metric versions and the pinned statistics lock.
// Purpose: Stamp every checkpoint with the statistical method fingerprint.
// Dependencies: serde, serde_json, crate::core::hashing
// ============================================================================

//! ## Overview
//! The registry declares which version of each metric the evidence was
//! computed with and pins the statistical methods and seed set behind a
//! `statistics_lock` subtree. The lock's canonical hash travels on every
//! checkpoint and verdict, and G3 compares it against the lock embedded in
//! the strategy metrics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_hash;

// ============================================================================
// SECTION: Registry Document
// ============================================================================

/// One metric declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSpec {
    /// Declared metric version.
    pub metric_version: Option<String>,
}

/// Metric registry document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricRegistry {
    /// Registry version tag.
    pub registry_version: Option<String>,
    /// Pinned statistical-method identifiers and seed set.
    pub statistics_lock: Option<Value>,
    /// Metric declarations keyed by metric name.
    pub metrics: BTreeMap<String, MetricSpec>,
}

impl MetricRegistry {
    /// Returns the registry version, defaulting to `unknown`.
    #[must_use]
    pub fn version(&self) -> String {
        self.registry_version.clone().unwrap_or_else(|| String::from("unknown"))
    }

    /// Returns the declared metric versions.
    #[must_use]
    pub fn metric_versions(&self) -> BTreeMap<String, String> {
        self.metrics
            .iter()
            .filter_map(|(name, spec)| {
                spec.metric_version.as_ref().map(|version| (name.clone(), version.clone()))
            })
            .collect()
    }

    /// Returns the statistics-lock subtree, defaulting to an empty object.
    #[must_use]
    pub fn statistics_lock_value(&self) -> Value {
        self.statistics_lock
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }

    /// Canonical hash of the statistics-lock subtree.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn statistics_lock_hash(&self) -> Result<String, HashError> {
        canonical_json_hash(&self.statistics_lock_value())
    }
}
