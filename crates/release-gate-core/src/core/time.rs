// release-gate-core/src/core/time.rs
// ============================================================================
// Module: Release Gate Time Model
// Description: UTC timestamp formatting and parsing for audit records.
// Purpose: Provide the single wall-clock representation used across artifacts.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Every durable artifact stamps wall-clock time as a second-precision UTC
//! string with a `Z` suffix. Parsing accepts full RFC 3339 values so that
//! externally produced logs (state-machine events, resumed runs) can be
//! ordered even when they carry offsets or fractional seconds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Second-precision UTC format used by every emitted artifact.
const UTC_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Returns the current UTC time as a second-precision `...Z` string.
#[must_use]
pub fn utc_now_iso() -> String {
    format_utc_seconds(OffsetDateTime::now_utc())
}

/// Formats a timestamp as a second-precision UTC `...Z` string.
#[must_use]
pub fn format_utc_seconds(value: OffsetDateTime) -> String {
    value.format(UTC_SECONDS).unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

/// Returns a compact run identifier derived from the current UTC time.
#[must_use]
pub fn utc_now_run_id() -> String {
    const COMPACT: &[BorrowedFormatItem<'static>] =
        format_description!("[year][month][day]_[hour][minute][second]");
    OffsetDateTime::now_utc()
        .format(COMPACT)
        .unwrap_or_else(|_| String::from("19700101_000000"))
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses an RFC 3339 timestamp, returning `None` for non-timestamp input.
#[must_use]
pub fn parse_iso(value: &str) -> Option<OffsetDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    OffsetDateTime::parse(trimmed, &Rfc3339).ok()
}
