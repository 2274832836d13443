// crates/progress-gate-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Adapters
// Description: In-memory identity directory and recording decision sink.
// Purpose: Provide deterministic adapters for tests and embedded use.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The in-memory directory implements [`IdentityStore`] plus scope-filtered
//! listing over plain maps, mirroring what a relational backend does with
//! translated predicates. Clones share state, so a test can hold one handle
//! while the resolver holds another.
//!
//! The recording sink collects decision events for assertions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::PrincipalId;
use crate::core::ProgressEntry;
use crate::core::School;
use crate::core::SchoolId;
use crate::core::ScopePredicate;
use crate::core::StudentProfile;
use crate::core::TeacherProfile;
use crate::interfaces::DecisionEvent;
use crate::interfaces::DecisionSink;
use crate::interfaces::DirectoryError;
use crate::interfaces::IdentityStore;

// ============================================================================
// SECTION: In-Memory Directory
// ============================================================================

/// Mutable interior of the in-memory directory.
#[derive(Debug, Default)]
struct DirectoryInner {
    /// Schools keyed by raw identifier.
    schools: BTreeMap<u64, School>,
    /// Teacher profiles keyed by profile identifier.
    teachers: BTreeMap<String, TeacherProfile>,
    /// Student profiles keyed by profile identifier.
    students: BTreeMap<String, StudentProfile>,
    /// Progress entries keyed by entry identifier.
    entries: BTreeMap<String, ProgressEntry>,
}

/// In-memory identity directory and record store.
///
/// # Invariants
/// - Clones share the same state.
/// - Listing applies scope predicates exactly as a backend must: clauses
///   combine with AND and unknown clauses admit nothing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    /// Shared directory state.
    inner: Arc<Mutex<DirectoryInner>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the interior state, surfacing poisoning as a store error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DirectoryInner>, DirectoryError> {
        self.inner
            .lock()
            .map_err(|_| DirectoryError::Store("directory mutex poisoned".to_string()))
    }

    /// Inserts or replaces a school.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the directory lock is poisoned.
    pub fn insert_school(&self, school: School) -> Result<(), DirectoryError> {
        self.lock()?.schools.insert(school.id.get(), school);
        Ok(())
    }

    /// Inserts or replaces a teacher profile.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the directory lock is poisoned.
    pub fn insert_teacher(&self, profile: TeacherProfile) -> Result<(), DirectoryError> {
        self.lock()?.teachers.insert(profile.id.as_str().to_string(), profile);
        Ok(())
    }

    /// Inserts or replaces a student profile.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the directory lock is poisoned.
    pub fn insert_student(&self, profile: StudentProfile) -> Result<(), DirectoryError> {
        self.lock()?.students.insert(profile.id.as_str().to_string(), profile);
        Ok(())
    }

    /// Inserts or replaces a progress entry.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the directory lock is poisoned.
    pub fn insert_entry(&self, entry: ProgressEntry) -> Result<(), DirectoryError> {
        self.lock()?.entries.insert(entry.id.as_str().to_string(), entry);
        Ok(())
    }

    /// Lists teacher profiles admitted by the scope predicate.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the directory lock is poisoned.
    pub fn list_teachers(
        &self,
        scope: &ScopePredicate,
    ) -> Result<Vec<TeacherProfile>, DirectoryError> {
        let inner = self.lock()?;
        Ok(inner
            .teachers
            .values()
            .filter(|teacher| scope.admits_teacher(teacher))
            .cloned()
            .collect())
    }

    /// Lists student profiles admitted by the scope predicate.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the directory lock is poisoned.
    pub fn list_students(
        &self,
        scope: &ScopePredicate,
    ) -> Result<Vec<StudentProfile>, DirectoryError> {
        let inner = self.lock()?;
        Ok(inner
            .students
            .values()
            .filter(|student| scope.admits_student(student))
            .cloned()
            .collect())
    }

    /// Lists progress entries admitted by the scope predicate.
    ///
    /// Entries whose student profile is missing are not admitted: the
    /// join-scoped class clause cannot be evaluated for them, and admission
    /// fails closed.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the directory lock is poisoned.
    pub fn list_entries(
        &self,
        scope: &ScopePredicate,
    ) -> Result<Vec<ProgressEntry>, DirectoryError> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .values()
            .filter(|entry| {
                inner
                    .students
                    .get(entry.student_id.as_str())
                    .is_some_and(|student| scope.admits_entry(entry, student))
            })
            .cloned()
            .collect())
    }
}

impl IdentityStore for InMemoryDirectory {
    fn teacher_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<TeacherProfile>, DirectoryError> {
        let inner = self.lock()?;
        Ok(inner
            .teachers
            .values()
            .find(|profile| profile.principal_id == principal_id)
            .cloned())
    }

    fn student_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<StudentProfile>, DirectoryError> {
        let inner = self.lock()?;
        Ok(inner
            .students
            .values()
            .find(|profile| profile.principal_id == principal_id)
            .cloned())
    }

    fn school_exists(&self, school_id: SchoolId) -> Result<bool, DirectoryError> {
        let inner = self.lock()?;
        Ok(inner.schools.contains_key(&school_id.get()))
    }
}

// ============================================================================
// SECTION: Recording Sink
// ============================================================================

/// Decision sink collecting events in memory.
///
/// # Invariants
/// - Clones share the same event buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingDecisionSink {
    /// Recorded events in evaluation order.
    events: Arc<Mutex<Vec<DecisionEvent>>>,
}

impl RecordingDecisionSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<DecisionEvent> {
        self.events.lock().map_or_else(|_| Vec::new(), |events| events.clone())
    }
}

impl DecisionSink for RecordingDecisionSink {
    fn record(&self, event: &DecisionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
