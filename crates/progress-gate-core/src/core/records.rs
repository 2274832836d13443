// crates/progress-gate-core/src/core/records.rs
// ============================================================================
// Module: Progress Gate Records
// Description: School, profile, and progress entry records plus data checks.
// Purpose: Define the protected record shapes and their tenant invariants.
// Dependencies: crate::core::{identifiers, time}, serde, thiserror
// ============================================================================

//! ## Overview
//! Records are the resources the policy engine protects. Every record other
//! than [`School`] carries a `school_id`; cross-school references are always
//! an integrity violation, enforced by the mutation guard before any write
//! reaches storage.
//!
//! [`ProgressEntry::validate`] covers score bounds only. It is a
//! data-validation helper for the storage collaborator and is deliberately
//! not part of the access decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ClassName;
use crate::core::identifiers::EntryId;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::SchoolId;
use crate::core::identifiers::StudentProfileId;
use crate::core::identifiers::Subject;
use crate::core::identifiers::TeacherProfileId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: School
// ============================================================================

/// School record, the root of tenant isolation.
///
/// # Invariants
/// - Every other record must reference exactly one existing school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    /// School identifier.
    pub id: SchoolId,
    /// Display name.
    pub name: String,
}

// ============================================================================
// SECTION: Staff Role
// ============================================================================

/// Staff role stored on a teacher profile.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
/// - `head_teacher` widens scope within the same school; it is not a
///   separate hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Teacher scoped to assigned classes.
    Teacher,
    /// Head teacher with whole-school scope.
    HeadTeacher,
}

impl StaffRole {
    /// Returns a stable label for the staff role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::HeadTeacher => "head_teacher",
        }
    }
}

// ============================================================================
// SECTION: Profiles
// ============================================================================

/// Teacher profile record.
///
/// # Invariants
/// - `principal_id` owns at most one profile across both profile tables.
/// - `school_id` must reference an existing school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherProfile {
    /// Teacher profile identifier.
    pub id: TeacherProfileId,
    /// Owning principal.
    pub principal_id: PrincipalId,
    /// School the profile belongs to.
    pub school_id: SchoolId,
    /// Staff role stored on the profile.
    pub role: StaffRole,
    /// Classes assigned to the teacher.
    pub classes: BTreeSet<ClassName>,
    /// Subjects assigned to the teacher.
    pub subjects: BTreeSet<Subject>,
}

/// Student profile record.
///
/// # Invariants
/// - `principal_id` owns at most one profile across both profile tables.
/// - `school_id` must reference an existing school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Student profile identifier.
    pub id: StudentProfileId,
    /// Owning principal.
    pub principal_id: PrincipalId,
    /// School the profile belongs to.
    pub school_id: SchoolId,
    /// Class the student belongs to.
    pub class_name: ClassName,
    /// Year group of the student.
    pub year_group: u8,
}

// ============================================================================
// SECTION: Progress Entries
// ============================================================================

/// Progress entry record.
///
/// # Invariants
/// - `school_id` equals the student's school and, when set, the teacher's.
/// - `score <= max_score` and `max_score > 0` (see [`ProgressEntry::validate`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Progress entry identifier.
    pub id: EntryId,
    /// Student the entry belongs to.
    pub student_id: StudentProfileId,
    /// Teacher who recorded the entry, when known.
    pub teacher_id: Option<TeacherProfileId>,
    /// School the entry belongs to.
    pub school_id: SchoolId,
    /// Subject the entry was recorded for.
    pub subject: Subject,
    /// Achieved score.
    pub score: u32,
    /// Maximum achievable score.
    pub max_score: u32,
    /// Completion timestamp supplied by the caller.
    pub completed_at: Timestamp,
}

impl ProgressEntry {
    /// Validates score bounds for the entry.
    ///
    /// This is data validation for the storage collaborator, not an access
    /// rule; the mutation guard does not call it.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when `max_score` is zero or `score` exceeds
    /// `max_score`.
    pub const fn validate(&self) -> Result<(), RecordError> {
        if self.max_score == 0 {
            return Err(RecordError::ZeroMaxScore);
        }
        if self.score > self.max_score {
            return Err(RecordError::ScoreOutOfRange {
                score: self.score,
                max_score: self.max_score,
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Record Errors
// ============================================================================

/// Record-level data validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// `max_score` must be greater than zero.
    #[error("progress entry max_score must be greater than zero")]
    ZeroMaxScore,
    /// `score` exceeds `max_score`.
    #[error("progress entry score out of range: {score} > {max_score}")]
    ScoreOutOfRange {
        /// Achieved score.
        score: u32,
        /// Maximum achievable score.
        max_score: u32,
    },
}

/// Tenant and identity integrity violations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Integrity failures indicate a data problem and are always surfaced;
///   they must never be downgraded to an access denial.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// A principal owns both a teacher and a student profile.
    #[error("principal {principal_id} resolves to both a teacher and a student profile")]
    DualProfile {
        /// Principal with conflicting profiles.
        principal_id: PrincipalId,
    },
    /// Related records reference different schools.
    #[error("school mismatch on {field}: expected {expected}, found {found}")]
    SchoolMismatch {
        /// Field or relation that disagreed.
        field: &'static str,
        /// School required by the anchoring record.
        expected: SchoolId,
        /// School actually referenced.
        found: SchoolId,
    },
    /// A related record does not match the identifier the payload references.
    #[error("record mismatch: {0}")]
    Mismatch(String),
}
