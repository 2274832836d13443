// crates/progress-gate-core/src/core/principal.rs
// ============================================================================
// Module: Progress Gate Principal Model
// Description: Resolved caller identity, role, and role-specific scope data.
// Purpose: Provide the immutable per-request snapshot the policy engine evaluates.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A [`Principal`] is the fully resolved identity of the caller: account
//! identifier, school, and a tagged role scope carrying role-specific fields
//! only. Principals are immutable snapshots built fresh for each request;
//! nothing in the engine re-queries identity state mid-evaluation, which is
//! what keeps rule evaluation free of recursive lookups.
//!
//! Security posture: role claims arrive from untrusted wire input. Claims
//! that do not match a known role deserialize to [`Role::Unknown`] and are
//! denied fail-closed by the engine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ClassName;
use crate::core::identifiers::PrincipalId;
use crate::core::identifiers::SchoolId;
use crate::core::identifiers::StudentProfileId;
use crate::core::identifiers::Subject;
use crate::core::identifiers::TeacherProfileId;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Caller role evaluated by the policy engine.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
/// - Unrecognized wire values deserialize to [`Role::Unknown`] and must be
///   denied by the engine, never silently mapped to a known role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Student with class membership in exactly one school.
    Student,
    /// Teaching staff scoped to assigned classes within one school.
    Teacher,
    /// Teaching staff with unconditional whole-school scope.
    HeadTeacher,
    /// Trusted service account with school-scoped read-only access.
    Service,
    /// Unrecognized role claim; always denied.
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Returns a stable label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::HeadTeacher => "head_teacher",
            Self::Service => "service",
            Self::Unknown => "unknown",
        }
    }
}

// ============================================================================
// SECTION: Role Scope
// ============================================================================

/// Role-specific scope data carried by a principal.
///
/// # Invariants
/// - Each variant carries only the fields its role needs; there is no
///   field-presence duck typing anywhere in the engine.
/// - Values are snapshots resolved before evaluation; rules must not widen
///   them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoleScope {
    /// Student scope: own profile and class membership.
    Student {
        /// Student profile owned by the principal.
        profile_id: StudentProfileId,
        /// Class the student belongs to.
        class_name: ClassName,
        /// Year group of the student.
        year_group: u8,
    },
    /// Teaching staff scope: own profile, assigned classes and subjects.
    Teacher {
        /// Teacher profile owned by the principal.
        profile_id: TeacherProfileId,
        /// Classes assigned to the teacher.
        classes: BTreeSet<ClassName>,
        /// Subjects assigned to the teacher.
        subjects: BTreeSet<Subject>,
        /// Widens scope to the whole school when set.
        head: bool,
    },
    /// Trusted service scope: read-only access to a single school.
    Service,
    /// Unrecognized role claim; carries nothing and is always denied.
    Unknown,
}

// ============================================================================
// SECTION: Principal
// ============================================================================

/// Resolved identity of the caller making a request.
///
/// # Invariants
/// - Built fresh per request; never cached across requests or users.
/// - `school_id` is the single tenant the principal belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier from the authentication layer.
    pub id: PrincipalId,
    /// School the principal belongs to.
    pub school_id: SchoolId,
    /// Role-specific scope data.
    pub scope: RoleScope,
}

impl Principal {
    /// Creates a service principal scoped to a single school.
    ///
    /// Service principals are declared in deployment configuration; they are
    /// never resolved from the identity directory.
    #[must_use]
    pub const fn service(id: PrincipalId, school_id: SchoolId) -> Self {
        Self {
            id,
            school_id,
            scope: RoleScope::Service,
        }
    }

    /// Returns the role implied by the principal's scope.
    #[must_use]
    pub const fn role(&self) -> Role {
        match &self.scope {
            RoleScope::Student {
                ..
            } => Role::Student,
            RoleScope::Teacher {
                head,
                ..
            } => {
                if *head {
                    Role::HeadTeacher
                } else {
                    Role::Teacher
                }
            }
            RoleScope::Service => Role::Service,
            RoleScope::Unknown => Role::Unknown,
        }
    }

    /// Returns the student profile owned by the principal, if any.
    #[must_use]
    pub const fn student_profile(&self) -> Option<&StudentProfileId> {
        match &self.scope {
            RoleScope::Student {
                profile_id,
                ..
            } => Some(profile_id),
            _ => None,
        }
    }

    /// Returns the teacher profile owned by the principal, if any.
    #[must_use]
    pub const fn teacher_profile(&self) -> Option<&TeacherProfileId> {
        match &self.scope {
            RoleScope::Teacher {
                profile_id,
                ..
            } => Some(profile_id),
            _ => None,
        }
    }

    /// Returns the classes assigned to a teaching principal, if any.
    #[must_use]
    pub const fn classes(&self) -> Option<&BTreeSet<ClassName>> {
        match &self.scope {
            RoleScope::Teacher {
                classes,
                ..
            } => Some(classes),
            _ => None,
        }
    }
}
