// release-gate-core/src/runtime/snapshot.rs
// ============================================================================
// Module: Release Gate Dataset Snapshot Lock
// Description: Frozen hashes of the dataset, features, labels, and split.
// Purpose: Pin G3's inputs per run and detect drift on retries.
// Dependencies: serde, crate::core::{hashing, io, time}
// ============================================================================

//! ## Overview
//! The first G3 attempt of a run freezes the four input hashes into
//! `dataset_snapshot_lock.json`. Later attempts of the same `runId` reuse the
//! stored lock verbatim and compare it against a live snapshot; any hash
//! mismatch is drift. The lock is a pure function of the input bytes apart
//! from its `frozenAt` stamp.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::sha256_file;
use crate::core::io::IoError;
use crate::core::io::write_json_pretty;
use crate::core::time::utc_now_iso;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building or loading snapshot locks.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A snapshot input file does not exist.
    #[error("snapshot input missing: {0}")]
    InputMissing(PathBuf),
    /// Hashing an input failed.
    #[error("snapshot hashing failed: {0}")]
    Hashing(String),
    /// Reading or writing the lock artifact failed.
    #[error(transparent)]
    Io(#[from] IoError),
    /// The stored lock does not parse as a snapshot document.
    #[error("stored snapshot lock is malformed: {0}")]
    Malformed(String),
}

// ============================================================================
// SECTION: Snapshot Inputs
// ============================================================================

/// The four artifact paths a snapshot freezes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInputs {
    /// Dataset artifact path.
    pub dataset: PathBuf,
    /// Features artifact path.
    pub features: PathBuf,
    /// Labels artifact path.
    pub labels: PathBuf,
    /// Split artifact path.
    pub split: PathBuf,
}

// ============================================================================
// SECTION: Snapshot Lock Document
// ============================================================================

/// Frozen dataset snapshot lock (`dataset_snapshot_lock.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLock {
    /// Lock schema version.
    pub version: String,
    /// Run identifier the lock belongs to.
    pub run_id: String,
    /// Freeze stamp.
    pub frozen_at: String,
    /// Dataset artifact path.
    pub dataset_path: String,
    /// Features artifact path.
    pub features_path: String,
    /// Labels artifact path.
    pub labels_path: String,
    /// Split artifact path.
    pub split_path: String,
    /// Dataset bytes hash.
    pub dataset_hash: String,
    /// Features bytes hash.
    pub features_hash: String,
    /// Labels bytes hash.
    #[serde(rename = "labelHash")]
    pub label_hash: String,
    /// Split bytes hash.
    pub split_hash: String,
}

impl SnapshotLock {
    /// Lock schema version tag.
    pub const VERSION: &'static str = "v1";

    /// Returns the hash fields that participate in drift detection.
    #[must_use]
    pub fn hash_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("datasetHash", self.dataset_hash.as_str()),
            ("featuresHash", self.features_hash.as_str()),
            ("labelHash", self.label_hash.as_str()),
            ("splitHash", self.split_hash.as_str()),
        ]
    }
}

// ============================================================================
// SECTION: Snapshot Operations
// ============================================================================

/// Builds a live snapshot from the current input bytes.
///
/// # Errors
///
/// Returns [`SnapshotError::InputMissing`] when any input is absent and
/// [`SnapshotError::Hashing`] when reading an input fails.
pub fn build_snapshot(run_id: &str, inputs: &SnapshotInputs) -> Result<SnapshotLock, SnapshotError> {
    for path in [&inputs.dataset, &inputs.features, &inputs.labels, &inputs.split] {
        if !path.exists() {
            return Err(SnapshotError::InputMissing(path.clone()));
        }
    }

    let hash = |path: &Path| sha256_file(path).map_err(|err| SnapshotError::Hashing(err.to_string()));
    Ok(SnapshotLock {
        version: String::from(SnapshotLock::VERSION),
        run_id: run_id.to_string(),
        frozen_at: utc_now_iso(),
        dataset_path: inputs.dataset.display().to_string(),
        features_path: inputs.features.display().to_string(),
        labels_path: inputs.labels.display().to_string(),
        split_path: inputs.split.display().to_string(),
        dataset_hash: hash(&inputs.dataset)?,
        features_hash: hash(&inputs.features)?,
        label_hash: hash(&inputs.labels)?,
        split_hash: hash(&inputs.split)?,
    })
}

/// Loads the stored lock for a run, or freezes a new one.
///
/// A stored lock is reused only when its `runId` matches; a lock left behind
/// by a different run is replaced.
///
/// # Errors
///
/// Returns [`SnapshotError`] when inputs are missing or the artifact cannot
/// be read or written.
pub fn load_or_create_snapshot(
    run_id: &str,
    inputs: &SnapshotInputs,
    lock_path: &Path,
) -> Result<SnapshotLock, SnapshotError> {
    if lock_path.exists() {
        let value = crate::core::io::read_json_object(lock_path)?;
        if value.get("runId").and_then(serde_json::Value::as_str) == Some(run_id) {
            let stored: SnapshotLock = serde_json::from_value(value)
                .map_err(|err| SnapshotError::Malformed(err.to_string()))?;
            return Ok(stored);
        }
    }

    let lock = build_snapshot(run_id, inputs)?;
    write_json_pretty(lock_path, &lock)?;
    Ok(lock)
}

/// Compares a stored lock against a live snapshot, naming drifted fields.
#[must_use]
pub fn drift_fields(stored: &SnapshotLock, live: &SnapshotLock) -> Vec<&'static str> {
    stored
        .hash_fields()
        .iter()
        .zip(live.hash_fields().iter())
        .filter(|(lhs, rhs)| lhs.1 != rhs.1)
        .map(|(lhs, _)| lhs.0)
        .collect()
}
