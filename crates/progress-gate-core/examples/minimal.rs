// crates/progress-gate-core/examples/minimal.rs
// ============================================================================
// Module: Progress Gate Minimal Example
// Description: Minimal resolve/decide/guard flow using the in-memory directory.
// Purpose: Demonstrate principal resolution, read scoping, and guarded writes.
// Dependencies: progress-gate-core
// ============================================================================

//! ## Overview
//! Seeds an in-memory directory with one school, one teacher, and one
//! student, then resolves the teacher, scopes a list request, and guards a
//! progress entry creation. Backend-agnostic and suitable for quick
//! verification.

use std::collections::BTreeSet;

use progress_gate_core::AccessRequest;
use progress_gate_core::ClassName;
use progress_gate_core::EntryId;
use progress_gate_core::PrincipalId;
use progress_gate_core::ProgressEntry;
use progress_gate_core::ResourceKind;
use progress_gate_core::School;
use progress_gate_core::SchoolId;
use progress_gate_core::StaffRole;
use progress_gate_core::StudentProfile;
use progress_gate_core::StudentProfileId;
use progress_gate_core::Subject;
use progress_gate_core::TeacherProfile;
use progress_gate_core::TeacherProfileId;
use progress_gate_core::Timestamp;
use progress_gate_core::runtime::IdentityResolver;
use progress_gate_core::runtime::InMemoryDirectory;
use progress_gate_core::runtime::Mutation;
use progress_gate_core::runtime::PolicyEngine;
use progress_gate_core::runtime::RecordContext;
use progress_gate_core::runtime::guard;

/// Error type for example preconditions.
#[derive(Debug)]
struct ExampleError(&'static str);

impl std::fmt::Display for ExampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ExampleError {}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let school_id = SchoolId::from_raw(1).ok_or(ExampleError("school id must be nonzero"))?;
    let teacher_principal =
        PrincipalId::from_raw(10).ok_or(ExampleError("principal id must be nonzero"))?;
    let student_principal =
        PrincipalId::from_raw(20).ok_or(ExampleError("principal id must be nonzero"))?;

    let directory = InMemoryDirectory::new();
    directory.insert_school(School {
        id: school_id,
        name: "Hillcrest Primary".to_string(),
    })?;

    let mut classes = BTreeSet::new();
    classes.insert(ClassName::new("5A"));
    let mut subjects = BTreeSet::new();
    subjects.insert(Subject::new("maths"));
    let teacher = TeacherProfile {
        id: TeacherProfileId::new("teacher-1"),
        principal_id: teacher_principal,
        school_id,
        role: StaffRole::Teacher,
        classes,
        subjects,
    };
    directory.insert_teacher(teacher.clone())?;

    let student = StudentProfile {
        id: StudentProfileId::new("student-1"),
        principal_id: student_principal,
        school_id,
        class_name: ClassName::new("5A"),
        year_group: 5,
    };
    directory.insert_student(student.clone())?;

    let resolver = IdentityResolver::new(directory.clone());
    let principal = resolver.resolve(teacher_principal)?;

    let engine = PolicyEngine::new();
    let decision = engine.decide(&principal, &AccessRequest::list(ResourceKind::ProgressEntry));
    let scope = decision.scope().ok_or(ExampleError("read decision must carry a scope"))?;
    let visible = directory.list_entries(scope)?;

    let entry = ProgressEntry {
        id: EntryId::new("entry-1"),
        student_id: student.id.clone(),
        teacher_id: Some(teacher.id.clone()),
        school_id,
        subject: Subject::new("maths"),
        score: 17,
        max_score: 20,
        completed_at: Timestamp::Logical(1),
    };
    let context = RecordContext {
        school: None,
        student: Some(student),
        teacher: Some(teacher),
        current_entry: None,
    };
    let approved = guard(&principal, Mutation::CreateProgressEntry(entry), &context)?;
    directory.insert_entry(match approved.into_mutation() {
        Mutation::CreateProgressEntry(entry) => entry,
        _ => return Err(Box::new(ExampleError("unexpected mutation kind"))),
    })?;

    let _ = visible;
    Ok(())
}
