// release-gate-core/src/core/owners.rs
// ============================================================================
// Module: Release Gate Acting Owners
// Description: Controlled list of individuals allowed to attest releases.
// Purpose: Back the G4 dual-control check with an explicit allowlist.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The acting-owners document lists every person who may appear in an
//! attestation. Only entries flagged `active` with a non-empty `id` count.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Owner Documents
// ============================================================================

/// One acting-owner entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Owner {
    /// Owner identifier referenced by attestations.
    pub id: Option<String>,
    /// Whether the owner is currently active.
    pub active: bool,
    /// Additional descriptive fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Acting-owners document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActingOwners {
    /// Declared owners.
    pub owners: Vec<Owner>,
}

impl ActingOwners {
    /// Returns the active-owner identifier set.
    #[must_use]
    pub fn active_ids(&self) -> BTreeSet<String> {
        self.owners
            .iter()
            .filter(|owner| owner.active)
            .filter_map(|owner| owner.id.as_ref())
            .filter(|id| !id.trim().is_empty())
            .cloned()
            .collect()
    }
}
