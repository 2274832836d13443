// crates/progress-gate-core/tests/resolver_unit.rs
// ============================================================================
// Module: Identity Resolver Tests
// Description: Validate principal resolution and integrity failures.
// Purpose: Ensure exactly-one-profile resolution with fresh snapshots.
// Dependencies: progress-gate-core
// ============================================================================

//! Identity resolver tests: profile mapping, dual-profile rejection, and
//! snapshot freshness.

use std::collections::BTreeSet;

use progress_gate_core::ClassName;
use progress_gate_core::IntegrityError;
use progress_gate_core::PrincipalId;
use progress_gate_core::Role;
use progress_gate_core::RoleScope;
use progress_gate_core::SchoolId;
use progress_gate_core::StaffRole;
use progress_gate_core::StudentProfile;
use progress_gate_core::StudentProfileId;
use progress_gate_core::Subject;
use progress_gate_core::TeacherProfile;
use progress_gate_core::TeacherProfileId;
use progress_gate_core::runtime::IdentityResolver;
use progress_gate_core::runtime::InMemoryDirectory;
use progress_gate_core::runtime::ResolveError;

type TestResult = Result<(), String>;

/// Builds a school identifier from a raw value.
fn sid(raw: u64) -> Result<SchoolId, String> {
    SchoolId::from_raw(raw).ok_or_else(|| "school id must be nonzero".to_string())
}

/// Builds a principal identifier from a raw value.
fn pid(raw: u64) -> Result<PrincipalId, String> {
    PrincipalId::from_raw(raw).ok_or_else(|| "principal id must be nonzero".to_string())
}

/// Builds a teacher profile owned by the given principal.
fn teacher_record(principal: u64, role: StaffRole) -> Result<TeacherProfile, String> {
    Ok(TeacherProfile {
        id: TeacherProfileId::new(format!("teacher-{principal}")),
        principal_id: pid(principal)?,
        school_id: sid(1)?,
        role,
        classes: [ClassName::new("5A")].into_iter().collect::<BTreeSet<_>>(),
        subjects: [Subject::new("maths")].into_iter().collect::<BTreeSet<_>>(),
    })
}

/// Builds a student profile owned by the given principal.
fn student_record(principal: u64) -> Result<StudentProfile, String> {
    Ok(StudentProfile {
        id: StudentProfileId::new(format!("student-{principal}")),
        principal_id: pid(principal)?,
        school_id: sid(1)?,
        class_name: ClassName::new("5A"),
        year_group: 5,
    })
}

#[test]
fn resolve_teacher_maps_profile_fields() -> TestResult {
    let directory = InMemoryDirectory::new();
    directory.insert_teacher(teacher_record(11, StaffRole::Teacher)?).map_err(|err| err.to_string())?;
    let resolver = IdentityResolver::new(directory);
    let principal = resolver.resolve(pid(11)?).map_err(|err| err.to_string())?;
    if principal.role() != Role::Teacher {
        return Err(format!("expected teacher role, got {:?}", principal.role()));
    }
    if principal.school_id != sid(1)? {
        return Err("resolved principal must carry the profile school".to_string());
    }
    match &principal.scope {
        RoleScope::Teacher {
            profile_id,
            classes,
            head,
            ..
        } => {
            if profile_id.as_str() != "teacher-11" {
                return Err(format!("unexpected profile id {profile_id}"));
            }
            if *head {
                return Err("plain teacher must not resolve as head".to_string());
            }
            if !classes.contains(&ClassName::new("5A")) {
                return Err("assigned classes must be carried into the snapshot".to_string());
            }
            Ok(())
        }
        other => Err(format!("expected teacher scope, got {other:?}")),
    }
}

#[test]
fn resolve_head_teacher_sets_head_flag() -> TestResult {
    let directory = InMemoryDirectory::new();
    directory
        .insert_teacher(teacher_record(12, StaffRole::HeadTeacher)?)
        .map_err(|err| err.to_string())?;
    let resolver = IdentityResolver::new(directory);
    let principal = resolver.resolve(pid(12)?).map_err(|err| err.to_string())?;
    if principal.role() != Role::HeadTeacher {
        return Err(format!("expected head_teacher role, got {:?}", principal.role()));
    }
    Ok(())
}

#[test]
fn resolve_student_maps_profile_fields() -> TestResult {
    let directory = InMemoryDirectory::new();
    directory.insert_student(student_record(21)?).map_err(|err| err.to_string())?;
    let resolver = IdentityResolver::new(directory);
    let principal = resolver.resolve(pid(21)?).map_err(|err| err.to_string())?;
    if principal.role() != Role::Student {
        return Err(format!("expected student role, got {:?}", principal.role()));
    }
    match &principal.scope {
        RoleScope::Student {
            profile_id,
            class_name,
            year_group,
        } => {
            if profile_id.as_str() != "student-21" || class_name.as_str() != "5A" || *year_group != 5
            {
                return Err("student scope must mirror the profile record".to_string());
            }
            Ok(())
        }
        other => Err(format!("expected student scope, got {other:?}")),
    }
}

#[test]
fn resolve_dual_profile_is_integrity_error() -> TestResult {
    let directory = InMemoryDirectory::new();
    directory.insert_teacher(teacher_record(31, StaffRole::Teacher)?).map_err(|err| err.to_string())?;
    directory.insert_student(student_record(31)?).map_err(|err| err.to_string())?;
    let resolver = IdentityResolver::new(directory);
    match resolver.resolve(pid(31)?) {
        Err(ResolveError::Integrity(IntegrityError::DualProfile {
            principal_id,
        })) => {
            if principal_id != pid(31)? {
                return Err("dual-profile error must name the principal".to_string());
            }
            Ok(())
        }
        other => Err(format!("expected dual-profile integrity error, got {other:?}")),
    }
}

#[test]
fn resolve_unknown_principal_is_not_found() -> TestResult {
    let resolver = IdentityResolver::new(InMemoryDirectory::new());
    match resolver.resolve(pid(41)?) {
        Err(ResolveError::NotFound {
            principal_id,
        }) => {
            if principal_id != pid(41)? {
                return Err("not-found error must name the principal".to_string());
            }
            Ok(())
        }
        other => Err(format!("expected not-found, got {other:?}")),
    }
}

#[test]
fn resolve_builds_fresh_snapshots_without_caching() -> TestResult {
    let directory = InMemoryDirectory::new();
    directory.insert_teacher(teacher_record(11, StaffRole::Teacher)?).map_err(|err| err.to_string())?;
    let resolver = IdentityResolver::new(directory.clone());
    let before = resolver.resolve(pid(11)?).map_err(|err| err.to_string())?;
    if before.role() != Role::Teacher {
        return Err(format!("expected teacher role, got {:?}", before.role()));
    }

    directory
        .insert_teacher(teacher_record(11, StaffRole::HeadTeacher)?)
        .map_err(|err| err.to_string())?;
    let after = resolver.resolve(pid(11)?).map_err(|err| err.to_string())?;
    if after.role() != Role::HeadTeacher {
        return Err("role changes must be visible on the next resolution".to_string());
    }
    Ok(())
}
