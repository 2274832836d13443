// crates/progress-gate-core/src/core/scope.rs
// ============================================================================
// Module: Progress Gate Scope Predicates
// Description: Backend-agnostic visibility predicates for list requests.
// Purpose: Describe which records a read may return without issuing queries.
// Dependencies: crate::core::{identifiers, records}, serde
// ============================================================================

//! ## Overview
//! A [`ScopePredicate`] is a conjunction of typed clauses describing which
//! records a read operation may return. It is a data structure, never a SQL
//! string; each storage backend translates it to its native filter language.
//!
//! The class clause is join-scoped: it restricts progress entries by a
//! property of the related student profile. The clause is built from the
//! already-resolved principal snapshot, so no backend ever has to consult
//! the row set it is filtering to apply it.
//!
//! Admission helpers evaluate clauses against in-memory records. A clause
//! that does not apply to a record type admits nothing (fail closed).

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
use crate::core::records::ProgressEntry;
use crate::core::records::School;
use crate::core::records::StudentProfile;
use crate::core::records::TeacherProfile;

// ============================================================================
// SECTION: Scope Clauses
// ============================================================================

/// Single conjunct of a scope predicate.
///
/// # Invariants
/// - Variants are stable for serialization and backend translation.
/// - A clause that does not apply to the record type under filter admits
///   nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScopeClause {
    /// Record's school equals the given school.
    SchoolIs {
        /// Required school.
        school_id: SchoolId,
    },
    /// Record is owned by the given principal.
    OwnerIs {
        /// Required owning principal.
        principal_id: PrincipalId,
    },
    /// Record belongs to the given student profile.
    StudentIs {
        /// Required student profile.
        student_id: StudentProfileId,
    },
    /// Related student's class is one of the given classes (join-scoped).
    StudentClassIn {
        /// Admitted classes.
        classes: BTreeSet<ClassName>,
    },
}

// ============================================================================
// SECTION: Scope Predicate
// ============================================================================

/// Conjunction of scope clauses applied to a list request.
///
/// # Invariants
/// - An empty clause list admits every record ("all").
/// - Clauses combine with AND semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopePredicate {
    /// Conjunctive clauses; empty means unrestricted.
    pub clauses: Vec<ScopeClause>,
}

impl ScopePredicate {
    /// Predicate admitting every record.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Predicate restricting records to one school.
    #[must_use]
    pub fn school(school_id: SchoolId) -> Self {
        Self {
            clauses: vec![ScopeClause::SchoolIs {
                school_id,
            }],
        }
    }

    /// Predicate restricting records to one owning principal.
    #[must_use]
    pub fn owner(principal_id: PrincipalId) -> Self {
        Self {
            clauses: vec![ScopeClause::OwnerIs {
                principal_id,
            }],
        }
    }

    /// Predicate restricting records to one student profile.
    #[must_use]
    pub fn student(student_id: StudentProfileId) -> Self {
        Self {
            clauses: vec![ScopeClause::StudentIs {
                student_id,
            }],
        }
    }

    /// Predicate restricting records to one school and a set of classes.
    #[must_use]
    pub fn school_classes(school_id: SchoolId, classes: BTreeSet<ClassName>) -> Self {
        Self {
            clauses: vec![
                ScopeClause::SchoolIs {
                    school_id,
                },
                ScopeClause::StudentClassIn {
                    classes,
                },
            ],
        }
    }

    /// Returns true when the predicate admits every record.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns true when the predicate admits the school record.
    #[must_use]
    pub fn admits_school(&self, school: &School) -> bool {
        self.clauses.iter().all(|clause| match clause {
            ScopeClause::SchoolIs {
                school_id,
            } => *school_id == school.id,
            ScopeClause::OwnerIs {
                ..
            }
            | ScopeClause::StudentIs {
                ..
            }
            | ScopeClause::StudentClassIn {
                ..
            } => false,
        })
    }

    /// Returns true when the predicate admits the teacher profile.
    #[must_use]
    pub fn admits_teacher(&self, teacher: &TeacherProfile) -> bool {
        self.clauses.iter().all(|clause| match clause {
            ScopeClause::SchoolIs {
                school_id,
            } => *school_id == teacher.school_id,
            ScopeClause::OwnerIs {
                principal_id,
            } => *principal_id == teacher.principal_id,
            ScopeClause::StudentIs {
                ..
            }
            | ScopeClause::StudentClassIn {
                ..
            } => false,
        })
    }

    /// Returns true when the predicate admits the student profile.
    #[must_use]
    pub fn admits_student(&self, student: &StudentProfile) -> bool {
        self.clauses.iter().all(|clause| match clause {
            ScopeClause::SchoolIs {
                school_id,
            } => *school_id == student.school_id,
            ScopeClause::OwnerIs {
                principal_id,
            } => *principal_id == student.principal_id,
            ScopeClause::StudentIs {
                student_id,
            } => *student_id == student.id,
            ScopeClause::StudentClassIn {
                classes,
            } => classes.contains(&student.class_name),
        })
    }

    /// Returns true when the predicate admits the progress entry.
    ///
    /// The related student profile must be supplied by the caller for the
    /// join-scoped class clause; passing the wrong student is a caller bug
    /// the predicate cannot detect.
    #[must_use]
    pub fn admits_entry(&self, entry: &ProgressEntry, student: &StudentProfile) -> bool {
        self.clauses.iter().all(|clause| match clause {
            ScopeClause::SchoolIs {
                school_id,
            } => *school_id == entry.school_id,
            ScopeClause::OwnerIs {
                ..
            } => false,
            ScopeClause::StudentIs {
                student_id,
            } => *student_id == entry.student_id,
            ScopeClause::StudentClassIn {
                classes,
            } => entry.student_id == student.id && classes.contains(&student.class_name),
        })
    }
}
