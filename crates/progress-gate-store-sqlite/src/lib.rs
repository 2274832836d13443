// crates/progress-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Progress Gate SQLite Store Library
// Description: Durable identity directory and record store backed by SQLite.
// Purpose: Provide the reference storage collaborator for Progress Gate.
// Dependencies: progress-gate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate implements the storage collaborator side of Progress Gate: a
//! durable [`progress_gate_core::IdentityStore`], scope-predicate-filtered
//! listing, and execution of guarded mutations. The store trusts the
//! mutation guard as the sole writer-side gate and applies only record-level
//! data validation (score bounds) on top of it.
//!
//! Security posture: database contents are untrusted on load; lookups fail
//! closed on malformed rows.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteDirectory;
pub use store::SqliteDirectoryConfig;
pub use store::SqliteDirectoryError;
pub use store::SqliteDirectoryMode;
