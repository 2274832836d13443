// crates/progress-gate-core/src/core/request.rs
// ============================================================================
// Module: Progress Gate Access Requests
// Description: Canonical access request shape produced by the resource descriptor.
// Purpose: Normalize resource/operation/payload triples for rule evaluation.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! The resource descriptor normalizes every resource type and operation into
//! one canonical [`AccessRequest`] shape. Requests are pure containers; the
//! engine validates them at the decision boundary and denies anything it
//! does not recognize.
//!
//! A collection read carries no owner and is treated as a scoped list
//! request: the engine answers with a [`crate::core::scope::ScopePredicate`]
//! instead of a row-by-row verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ClassName;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::SchoolId;
use crate::core::identifiers::StudentProfileId;
use crate::core::identifiers::Subject;
use crate::core::identifiers::TeacherProfileId;

// ============================================================================
// SECTION: Resource Kinds and Operations
// ============================================================================

/// Resource types protected by the policy engine.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// School record.
    School,
    /// Teacher profile record.
    TeacherProfile,
    /// Student profile record.
    StudentProfile,
    /// Progress entry record.
    ProgressEntry,
}

impl ResourceKind {
    /// Returns a stable label for the resource kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::School => "school",
            Self::TeacherProfile => "teacher_profile",
            Self::StudentProfile => "student_profile",
            Self::ProgressEntry => "progress_entry",
        }
    }
}

/// Operations evaluated by the policy engine.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Read a record or list a collection.
    Read,
    /// Create a record.
    Create,
    /// Update an existing record.
    Update,
    /// Delete an existing record.
    Delete,
}

impl Operation {
    /// Returns a stable label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Whether a request targets one record or a collection.
///
/// # Invariants
/// - Collection requests never carry an owner; they are scoped list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Single identified record.
    Record,
    /// Collection of records pre-filtered by a scope predicate.
    Collection,
}

// ============================================================================
// SECTION: Target Facts
// ============================================================================

/// Cross-record facts the descriptor extracts from the target payload.
///
/// # Invariants
/// - Facts are snapshots taken before evaluation; rules never fetch them.
/// - Absent facts make the affected rules fail closed, never open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFacts {
    /// Class of the student the target record relates to.
    pub student_class: Option<ClassName>,
    /// Student profile the target record relates to.
    pub student_id: Option<StudentProfileId>,
    /// Teacher recorded on the existing progress entry under mutation.
    pub entry_teacher: Option<TeacherProfileId>,
    /// Subject of the target record, when relevant.
    pub subject: Option<Subject>,
}

// ============================================================================
// SECTION: Access Request
// ============================================================================

/// Canonical access request evaluated by the policy engine.
///
/// # Invariants
/// - This is a pure request container; values are validated at the decision
///   boundary and unknown combinations are denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Resource type being accessed.
    pub resource: ResourceKind,
    /// Operation requested.
    pub operation: Operation,
    /// School of the target record, when known.
    pub school_id: Option<SchoolId>,
    /// Principal that owns the target record, when known.
    pub owner: Option<PrincipalId>,
    /// Single-record or collection request.
    pub selection: Selection,
    /// Cross-record facts extracted from the target payload.
    pub facts: TargetFacts,
}

impl AccessRequest {
    /// Describes a scoped list request for a collection.
    #[must_use]
    pub fn list(resource: ResourceKind) -> Self {
        Self {
            resource,
            operation: Operation::Read,
            school_id: None,
            owner: None,
            selection: Selection::Collection,
            facts: TargetFacts::default(),
        }
    }

    /// Describes a single-record request with the given operation.
    #[must_use]
    pub fn record(resource: ResourceKind, operation: Operation) -> Self {
        Self {
            resource,
            operation,
            school_id: None,
            owner: None,
            selection: Selection::Record,
            facts: TargetFacts::default(),
        }
    }
}
