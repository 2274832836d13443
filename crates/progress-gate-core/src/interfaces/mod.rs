// crates/progress-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Progress Gate Interfaces
// Description: Backend-agnostic interfaces for identity lookup and observability.
// Purpose: Define the contract surfaces used by the Progress Gate runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Progress Gate integrates with external systems
//! without embedding backend-specific details. Implementations must be
//! deterministic and fail closed on missing or invalid data.
//!
//! The engine itself never issues queries: the identity store is consulted
//! exactly once per resolution, before any rule runs, and list filtering is
//! delegated to the storage collaborator via scope predicates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::DenyReason;
use crate::core::Operation;
use crate::core::PrincipalId;
use crate::core::ResourceKind;
use crate::core::Role;
use crate::core::SchoolId;
use crate::core::StudentProfile;
use crate::core::TeacherProfile;

// ============================================================================
// SECTION: Identity Store
// ============================================================================

/// Identity store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Error messages avoid embedding raw profile data.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Store I/O error.
    #[error("identity store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("identity store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("identity store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("identity store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("identity store error: {0}")]
    Store(String),
}

/// Backend-agnostic identity store consulted by the resolver.
///
/// Implementations perform one lookup per call and return snapshots; the
/// resolver never caches them across requests.
pub trait IdentityStore {
    /// Looks up the teacher profile owned by the principal, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the lookup fails.
    fn teacher_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<TeacherProfile>, DirectoryError>;

    /// Looks up the student profile owned by the principal, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the lookup fails.
    fn student_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<StudentProfile>, DirectoryError>;

    /// Reports whether the school exists.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the lookup fails.
    fn school_exists(&self, school_id: SchoolId) -> Result<bool, DirectoryError>;
}

impl<T: IdentityStore + ?Sized> IdentityStore for &T {
    fn teacher_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<TeacherProfile>, DirectoryError> {
        (**self).teacher_by_principal(principal_id)
    }

    fn student_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<StudentProfile>, DirectoryError> {
        (**self).student_by_principal(principal_id)
    }

    fn school_exists(&self, school_id: SchoolId) -> Result<bool, DirectoryError> {
        (**self).school_exists(school_id)
    }
}

// ============================================================================
// SECTION: Decision Sink
// ============================================================================

/// Observable outcome of one engine evaluation.
///
/// # Invariants
/// - Carries labels only, never record payloads or identity data beyond the
///   role label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEvent {
    /// Resource type that was evaluated.
    pub resource: ResourceKind,
    /// Operation that was evaluated.
    pub operation: Operation,
    /// Role of the requesting principal.
    pub role: Role,
    /// Whether access was granted.
    pub allowed: bool,
    /// Denial reason, when access was denied.
    pub reason: Option<DenyReason>,
}

/// Sink receiving one event per engine evaluation.
///
/// Denials are the normal outcome of policy enforcement; sinks must not
/// report them at error level. Implementations plug metrics or audit
/// pipelines in without adding dependencies to this crate.
pub trait DecisionSink: Send + Sync {
    /// Records an evaluation outcome.
    fn record(&self, event: &DecisionEvent);
}

/// No-op decision sink.
///
/// # Invariants
/// - Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDecisionSink;

impl DecisionSink for NoopDecisionSink {
    fn record(&self, _event: &DecisionEvent) {}
}
