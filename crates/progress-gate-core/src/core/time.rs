// crates/progress-gate-core/src/core/time.rs
// ============================================================================
// Module: Progress Gate Time Model
// Description: Canonical timestamp representation for progress records.
// Purpose: Provide deterministic, caller-supplied time values across records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Progress Gate uses explicit time values embedded in records to keep
//! decisions reproducible. The core engine never reads wall-clock time
//! directly; hosts must supply timestamps on every record they submit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in progress records.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }

    /// Parses an RFC3339 date-time string supplied by the web layer.
    ///
    /// Accepts full date-time values (`2026-01-15T09:30:00Z`) and date-only
    /// values (`2026-01-15`, resolved to midnight UTC). Returns `None` for
    /// anything else; callers must treat that as invalid input, not as a
    /// default time.
    #[must_use]
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
            let millis = parsed.unix_timestamp().checked_mul(1_000)?;
            return Some(Self::UnixMillis(millis));
        }
        let date = parse_rfc3339_date(value)?;
        let midnight = date.midnight().assume_utc();
        let millis = midnight.unix_timestamp().checked_mul(1_000)?;
        Some(Self::UnixMillis(millis))
    }
}

/// Parses an RFC3339 date-only value (YYYY-MM-DD).
fn parse_rfc3339_date(value: &str) -> Option<time::Date> {
    let mut parts = value.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let month = time::Month::try_from(month).ok()?;
    time::Date::from_calendar_date(year, month, day).ok()
}
