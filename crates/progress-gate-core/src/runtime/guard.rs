// crates/progress-gate-core/src/runtime/guard.rs
// ============================================================================
// Module: Progress Gate Mutation Guard
// Description: Writer-side gate combining policy decisions with tenant checks.
// Purpose: Approve mutations only after access and integrity both hold.
// Dependencies: crate::core, crate::runtime::engine
// ============================================================================

//! ## Overview
//! The mutation guard is the sole writer-side gate. It derives the canonical
//! access request from a typed [`Mutation`], consults the policy engine, and
//! on allow validates the cross-record tenant invariants no pure access rule
//! can express: a progress entry's school must match the student's and, when
//! set, the teacher's; created profiles must reference an existing school.
//!
//! Denials pass through untouched for the caller to surface. Integrity
//! violations and unresolvable related records are distinct failures and are
//! never downgraded to a denial. On success the guard returns an
//! [`ApprovedMutation`] token wrapping the validated payload; executing it
//! atomically is the storage collaborator's responsibility.
//!
//! Score-range validation is deliberately absent here: it is data validation
//! owned by the storage layer ([`crate::core::ProgressEntry::validate`]).

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AccessDecision;
use crate::core::AccessRequest;
use crate::core::EntryId;
use crate::core::IntegrityError;
use crate::core::Operation;
use crate::core::Principal;
use crate::core::ProgressEntry;
use crate::core::ResourceKind;
use crate::core::School;
use crate::core::SchoolId;
use crate::core::Selection;
use crate::core::StudentProfile;
use crate::core::TargetFacts;
use crate::core::TeacherProfile;
use crate::runtime::engine::evaluate;

// ============================================================================
// SECTION: Mutations
// ============================================================================

/// Typed write operation submitted to the guard.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
/// - School deletion is intentionally absent; the core never deletes a
///   school.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    /// Create a school.
    CreateSchool(School),
    /// Update a school.
    UpdateSchool(School),
    /// Create a teacher profile.
    CreateTeacherProfile(TeacherProfile),
    /// Update a teacher profile.
    UpdateTeacherProfile(TeacherProfile),
    /// Create a student profile.
    CreateStudentProfile(StudentProfile),
    /// Update a student profile.
    UpdateStudentProfile(StudentProfile),
    /// Create a progress entry.
    CreateProgressEntry(ProgressEntry),
    /// Update a progress entry.
    UpdateProgressEntry(ProgressEntry),
    /// Delete a progress entry.
    DeleteProgressEntry {
        /// Entry targeted for deletion.
        entry_id: EntryId,
    },
}

impl Mutation {
    /// Returns the resource kind the mutation targets.
    #[must_use]
    pub const fn resource(&self) -> ResourceKind {
        match self {
            Self::CreateSchool(_) | Self::UpdateSchool(_) => ResourceKind::School,
            Self::CreateTeacherProfile(_) | Self::UpdateTeacherProfile(_) => {
                ResourceKind::TeacherProfile
            }
            Self::CreateStudentProfile(_) | Self::UpdateStudentProfile(_) => {
                ResourceKind::StudentProfile
            }
            Self::CreateProgressEntry(_)
            | Self::UpdateProgressEntry(_)
            | Self::DeleteProgressEntry { .. } => ResourceKind::ProgressEntry,
        }
    }

    /// Returns the operation the mutation performs.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::CreateSchool(_)
            | Self::CreateTeacherProfile(_)
            | Self::CreateStudentProfile(_)
            | Self::CreateProgressEntry(_) => Operation::Create,
            Self::UpdateSchool(_)
            | Self::UpdateTeacherProfile(_)
            | Self::UpdateStudentProfile(_)
            | Self::UpdateProgressEntry(_) => Operation::Update,
            Self::DeleteProgressEntry { .. } => Operation::Delete,
        }
    }
}

// ============================================================================
// SECTION: Record Context
// ============================================================================

/// Related records the caller resolves before guarding a mutation.
///
/// # Invariants
/// - Values are snapshots fetched by the storage collaborator; the guard
///   itself never issues queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordContext {
    /// School referenced by the mutation payload.
    pub school: Option<School>,
    /// Student referenced by a progress entry payload.
    pub student: Option<StudentProfile>,
    /// Teacher referenced by a progress entry payload.
    pub teacher: Option<TeacherProfile>,
    /// Existing progress entry targeted by an update or delete.
    pub current_entry: Option<ProgressEntry>,
}

// ============================================================================
// SECTION: Guard Errors
// ============================================================================

/// Guard failure modes.
///
/// # Invariants
/// - `Denied` is the expected outcome of normal operation; `NotFound` and
///   `Integrity` indicate data problems and are always surfaced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// The policy engine denied the mutation.
    #[error("mutation denied")]
    Denied(AccessDecision),
    /// A related record the mutation depends on does not resolve.
    #[error("related {} record not found", .0.as_str())]
    NotFound(ResourceKind),
    /// A tenant or identity invariant does not hold.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

// ============================================================================
// SECTION: Approved Mutations
// ============================================================================

/// Token proving a mutation passed access and integrity checks.
///
/// # Invariants
/// - Only the guard constructs approved mutations; the payload inside is
///   exactly what was validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedMutation {
    /// Validated mutation payload.
    mutation: Mutation,
}

impl ApprovedMutation {
    /// Returns the validated mutation.
    #[must_use]
    pub const fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    /// Consumes the token and returns the validated mutation.
    #[must_use]
    pub fn into_mutation(self) -> Mutation {
        self.mutation
    }
}

// ============================================================================
// SECTION: Guard Evaluation
// ============================================================================

/// Guards a mutation: policy decision first, then tenant invariants.
///
/// # Errors
///
/// Returns [`GuardError::Denied`] with the engine decision untouched when
/// policy denies the mutation, [`GuardError::NotFound`] when a required
/// related record is absent from the context, and [`GuardError::Integrity`]
/// when related records violate tenant or identity invariants.
pub fn guard(
    principal: &Principal,
    mutation: Mutation,
    context: &RecordContext,
) -> Result<ApprovedMutation, GuardError> {
    let request = access_request_for(&mutation, context)?;
    let decision = evaluate(principal, &request);
    if !decision.is_allowed() {
        return Err(GuardError::Denied(decision));
    }
    check_invariants(&mutation, context)?;
    Ok(ApprovedMutation {
        mutation,
    })
}

/// Derives the canonical access request for a mutation.
///
/// Updates and deletes of progress entries are evaluated against the
/// existing row's tenant and author, so the current entry must resolve
/// before any rule runs.
fn access_request_for(
    mutation: &Mutation,
    context: &RecordContext,
) -> Result<AccessRequest, GuardError> {
    let mut request = AccessRequest {
        resource: mutation.resource(),
        operation: mutation.operation(),
        school_id: None,
        owner: None,
        selection: Selection::Record,
        facts: TargetFacts::default(),
    };
    match mutation {
        Mutation::CreateSchool(school) | Mutation::UpdateSchool(school) => {
            request.school_id = Some(school.id);
        }
        Mutation::CreateTeacherProfile(profile) | Mutation::UpdateTeacherProfile(profile) => {
            request.school_id = Some(profile.school_id);
            request.owner = Some(profile.principal_id);
        }
        Mutation::CreateStudentProfile(profile) | Mutation::UpdateStudentProfile(profile) => {
            request.school_id = Some(profile.school_id);
            request.owner = Some(profile.principal_id);
        }
        Mutation::CreateProgressEntry(entry) => {
            let student = context
                .student
                .as_ref()
                .ok_or(GuardError::NotFound(ResourceKind::StudentProfile))?;
            request.school_id = Some(entry.school_id);
            request.facts.student_id = Some(entry.student_id.clone());
            request.facts.subject = Some(entry.subject.clone());
            request.facts.student_class = Some(student.class_name.clone());
        }
        Mutation::UpdateProgressEntry(_) | Mutation::DeleteProgressEntry { .. } => {
            let current = context
                .current_entry
                .as_ref()
                .ok_or(GuardError::NotFound(ResourceKind::ProgressEntry))?;
            request.school_id = Some(current.school_id);
            request.facts.student_id = Some(current.student_id.clone());
            request.facts.entry_teacher = current.teacher_id.clone();
        }
    }
    Ok(request)
}

/// Validates cross-record tenant and identity invariants for the mutation.
fn check_invariants(mutation: &Mutation, context: &RecordContext) -> Result<(), GuardError> {
    match mutation {
        Mutation::CreateSchool(_) | Mutation::UpdateSchool(_) => Ok(()),
        Mutation::CreateTeacherProfile(profile) | Mutation::UpdateTeacherProfile(profile) => {
            require_school(context, profile.school_id)
        }
        Mutation::CreateStudentProfile(profile) | Mutation::UpdateStudentProfile(profile) => {
            require_school(context, profile.school_id)
        }
        Mutation::CreateProgressEntry(entry) => check_entry_references(entry, context),
        Mutation::UpdateProgressEntry(entry) => {
            let current = context
                .current_entry
                .as_ref()
                .ok_or(GuardError::NotFound(ResourceKind::ProgressEntry))?;
            if current.school_id != entry.school_id {
                return Err(GuardError::Integrity(IntegrityError::SchoolMismatch {
                    field: "progress_entry.school_id",
                    expected: current.school_id,
                    found: entry.school_id,
                }));
            }
            check_entry_references(entry, context)
        }
        Mutation::DeleteProgressEntry { .. } => {
            if context.current_entry.is_none() {
                return Err(GuardError::NotFound(ResourceKind::ProgressEntry));
            }
            Ok(())
        }
    }
}

/// Requires the referenced school to resolve with the expected identifier.
fn require_school(context: &RecordContext, school_id: SchoolId) -> Result<(), GuardError> {
    let school = context.school.as_ref().ok_or(GuardError::NotFound(ResourceKind::School))?;
    if school.id != school_id {
        return Err(GuardError::Integrity(IntegrityError::Mismatch(format!(
            "context school {} does not match referenced school {school_id}",
            school.id
        ))));
    }
    Ok(())
}

/// Validates a progress entry's student and teacher references.
fn check_entry_references(entry: &ProgressEntry, context: &RecordContext) -> Result<(), GuardError> {
    let student = context
        .student
        .as_ref()
        .ok_or(GuardError::NotFound(ResourceKind::StudentProfile))?;
    if student.id != entry.student_id {
        return Err(GuardError::Integrity(IntegrityError::Mismatch(format!(
            "context student {} does not match referenced student {}",
            student.id, entry.student_id
        ))));
    }
    if student.school_id != entry.school_id {
        return Err(GuardError::Integrity(IntegrityError::SchoolMismatch {
            field: "student_profile.school_id",
            expected: entry.school_id,
            found: student.school_id,
        }));
    }
    if let Some(teacher_id) = &entry.teacher_id {
        let teacher = context
            .teacher
            .as_ref()
            .ok_or(GuardError::NotFound(ResourceKind::TeacherProfile))?;
        if &teacher.id != teacher_id {
            return Err(GuardError::Integrity(IntegrityError::Mismatch(format!(
                "context teacher {} does not match referenced teacher {teacher_id}",
                teacher.id
            ))));
        }
        if teacher.school_id != entry.school_id {
            return Err(GuardError::Integrity(IntegrityError::SchoolMismatch {
                field: "teacher_profile.school_id",
                expected: entry.school_id,
                found: teacher.school_id,
            }));
        }
    }
    Ok(())
}
