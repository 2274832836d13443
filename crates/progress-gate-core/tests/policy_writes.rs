// crates/progress-gate-core/tests/policy_writes.rs
// ============================================================================
// Module: Write Policy Tests
// Description: Validate create/update/delete decisions per role.
// Purpose: Ensure authorship, class membership, and head authority rules hold.
// Dependencies: progress-gate-core
// ============================================================================

//! Write-side policy tests: entry authorship, class membership for creates,
//! head-teacher override, profile self-service, and fail-closed deletes.

use std::collections::BTreeSet;

use progress_gate_core::AccessRequest;
use progress_gate_core::ClassName;
use progress_gate_core::DenyReason;
use progress_gate_core::Operation;
use progress_gate_core::Principal;
use progress_gate_core::PrincipalId;
use progress_gate_core::ResourceKind;
use progress_gate_core::RoleScope;
use progress_gate_core::SchoolId;
use progress_gate_core::StudentProfileId;
use progress_gate_core::TeacherProfileId;
use progress_gate_core::runtime::evaluate;

type TestResult = Result<(), String>;

/// Builds a school identifier from a raw value.
fn sid(raw: u64) -> Result<SchoolId, String> {
    SchoolId::from_raw(raw).ok_or_else(|| "school id must be nonzero".to_string())
}

/// Builds a principal identifier from a raw value.
fn pid(raw: u64) -> Result<PrincipalId, String> {
    PrincipalId::from_raw(raw).ok_or_else(|| "principal id must be nonzero".to_string())
}

/// Builds a teaching principal.
fn teacher_principal(
    id: u64,
    school: u64,
    class_names: &[&str],
    head: bool,
) -> Result<Principal, String> {
    Ok(Principal {
        id: pid(id)?,
        school_id: sid(school)?,
        scope: RoleScope::Teacher {
            profile_id: TeacherProfileId::new(format!("teacher-{id}")),
            classes: class_names.iter().map(|name| ClassName::new(*name)).collect::<BTreeSet<_>>(),
            subjects: BTreeSet::new(),
            head,
        },
    })
}

/// Builds a student principal.
fn student_principal(id: u64, school: u64) -> Result<Principal, String> {
    Ok(Principal {
        id: pid(id)?,
        school_id: sid(school)?,
        scope: RoleScope::Student {
            profile_id: StudentProfileId::new(format!("student-{id}")),
            class_name: ClassName::new("5A"),
            year_group: 5,
        },
    })
}

/// Builds an entry-create request for the given school and student class.
fn entry_create_request(school: u64, student_class: &str) -> Result<AccessRequest, String> {
    let mut request = AccessRequest::record(ResourceKind::ProgressEntry, Operation::Create);
    request.school_id = Some(sid(school)?);
    request.facts.student_id = Some(StudentProfileId::new("student-1"));
    request.facts.student_class = Some(ClassName::new(student_class));
    Ok(request)
}

/// Builds an entry update/delete request authored by the given teacher.
fn entry_write_request(
    operation: Operation,
    school: u64,
    author: Option<&str>,
) -> Result<AccessRequest, String> {
    let mut request = AccessRequest::record(ResourceKind::ProgressEntry, operation);
    request.school_id = Some(sid(school)?);
    request.facts.entry_teacher = author.map(TeacherProfileId::new);
    Ok(request)
}

#[test]
fn teacher_create_entry_for_assigned_class_allowed() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let decision = evaluate(&principal, &entry_create_request(1, "5A")?);
    if !decision.is_allowed() {
        return Err(format!("expected allow, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn teacher_create_entry_outside_assigned_classes_denied_out_of_scope() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let decision = evaluate(&principal, &entry_create_request(1, "5B")?);
    if decision.deny_reason() != Some(DenyReason::OutOfScope) {
        return Err(format!("expected out_of_scope denial, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn teacher_create_entry_with_unknown_class_denied_out_of_scope() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let mut request = AccessRequest::record(ResourceKind::ProgressEntry, Operation::Create);
    request.school_id = Some(sid(1)?);
    let decision = evaluate(&principal, &request);
    if decision.deny_reason() != Some(DenyReason::OutOfScope) {
        return Err(format!("missing class facts must fail closed, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn head_teacher_create_entry_for_any_class_allowed() -> TestResult {
    let principal = teacher_principal(12, 1, &[], true)?;
    let decision = evaluate(&principal, &entry_create_request(1, "5B")?);
    if !decision.is_allowed() {
        return Err(format!("expected allow, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn student_create_entry_denied_out_of_scope() -> TestResult {
    let principal = student_principal(21, 1)?;
    let decision = evaluate(&principal, &entry_create_request(1, "5A")?);
    if decision.deny_reason() != Some(DenyReason::OutOfScope) {
        return Err(format!("expected out_of_scope denial, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn service_writes_denied_out_of_scope() -> TestResult {
    let principal = Principal::service(pid(99)?, sid(1)?);
    let create = evaluate(&principal, &entry_create_request(1, "5A")?);
    if create.deny_reason() != Some(DenyReason::OutOfScope) {
        return Err(format!("expected out_of_scope denial, got {create:?}"));
    }
    let update = evaluate(&principal, &AccessRequest::record(ResourceKind::School, Operation::Update));
    if update.deny_reason() != Some(DenyReason::OutOfScope) {
        return Err(format!("expected out_of_scope denial, got {update:?}"));
    }
    Ok(())
}

#[test]
fn entry_create_without_school_denied_tenant_mismatch() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let mut request = AccessRequest::record(ResourceKind::ProgressEntry, Operation::Create);
    request.facts.student_class = Some(ClassName::new("5A"));
    let decision = evaluate(&principal, &request);
    if decision.deny_reason() != Some(DenyReason::TenantMismatch) {
        return Err(format!("missing school must fail closed, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn teacher_update_own_entry_allowed() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let decision =
        evaluate(&principal, &entry_write_request(Operation::Update, 1, Some("teacher-11"))?);
    if !decision.is_allowed() {
        return Err(format!("expected allow, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn teacher_update_other_teachers_entry_denied_self_only() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let decision =
        evaluate(&principal, &entry_write_request(Operation::Update, 1, Some("teacher-12"))?);
    if decision.deny_reason() != Some(DenyReason::SelfOnly) {
        return Err(format!("expected self_only denial, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn teacher_update_unattributed_entry_denied_self_only() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let decision = evaluate(&principal, &entry_write_request(Operation::Update, 1, None)?);
    if decision.deny_reason() != Some(DenyReason::SelfOnly) {
        return Err(format!("expected self_only denial, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn head_teacher_updates_and_deletes_any_entry_in_school() -> TestResult {
    let principal = teacher_principal(12, 1, &[], true)?;
    let update =
        evaluate(&principal, &entry_write_request(Operation::Update, 1, Some("teacher-11"))?);
    if !update.is_allowed() {
        return Err(format!("expected allow, got {update:?}"));
    }
    let delete =
        evaluate(&principal, &entry_write_request(Operation::Delete, 1, Some("teacher-11"))?);
    if !delete.is_allowed() {
        return Err(format!("expected allow, got {delete:?}"));
    }
    Ok(())
}

#[test]
fn teacher_delete_own_entry_allowed() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let decision =
        evaluate(&principal, &entry_write_request(Operation::Delete, 1, Some("teacher-11"))?);
    if !decision.is_allowed() {
        return Err(format!("expected allow, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn student_update_entry_denied_out_of_scope() -> TestResult {
    let principal = student_principal(21, 1)?;
    let decision = evaluate(&principal, &entry_write_request(Operation::Update, 1, None)?);
    if decision.deny_reason() != Some(DenyReason::OutOfScope) {
        return Err(format!("expected out_of_scope denial, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn profile_updates_are_self_only() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let mut own = AccessRequest::record(ResourceKind::TeacherProfile, Operation::Update);
    own.school_id = Some(sid(1)?);
    own.owner = Some(pid(11)?);
    if !evaluate(&principal, &own).is_allowed() {
        return Err("teacher must update own profile".to_string());
    }
    let mut other = AccessRequest::record(ResourceKind::TeacherProfile, Operation::Update);
    other.school_id = Some(sid(1)?);
    other.owner = Some(pid(12)?);
    let decision = evaluate(&principal, &other);
    if decision.deny_reason() != Some(DenyReason::SelfOnly) {
        return Err(format!("expected self_only denial, got {decision:?}"));
    }

    let student = student_principal(21, 1)?;
    let mut own = AccessRequest::record(ResourceKind::StudentProfile, Operation::Update);
    own.school_id = Some(sid(1)?);
    own.owner = Some(pid(21)?);
    if !evaluate(&student, &own).is_allowed() {
        return Err("student must update own profile".to_string());
    }
    Ok(())
}

#[test]
fn profile_update_without_owner_denied_self_only() -> TestResult {
    let principal = teacher_principal(11, 1, &["5A"], false)?;
    let mut request = AccessRequest::record(ResourceKind::TeacherProfile, Operation::Update);
    request.school_id = Some(sid(1)?);
    let decision = evaluate(&principal, &request);
    if decision.deny_reason() != Some(DenyReason::SelfOnly) {
        return Err(format!("missing owner must fail closed, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn profile_creates_allowed_for_authenticated_roles() -> TestResult {
    let principals =
        vec![student_principal(21, 1)?, teacher_principal(11, 1, &["5A"], false)?];
    for principal in &principals {
        let teacher_create =
            evaluate(principal, &AccessRequest::record(ResourceKind::TeacherProfile, Operation::Create));
        if !teacher_create.is_allowed() {
            return Err(format!("expected allow for {:?}, got {teacher_create:?}", principal.role()));
        }
        let student_create =
            evaluate(principal, &AccessRequest::record(ResourceKind::StudentProfile, Operation::Create));
        if !student_create.is_allowed() {
            return Err(format!("expected allow for {:?}, got {student_create:?}", principal.role()));
        }
    }
    Ok(())
}

#[test]
fn school_writes_coarse_grained_and_deletes_unsupported() -> TestResult {
    let principal = student_principal(21, 1)?;
    let create = evaluate(&principal, &AccessRequest::record(ResourceKind::School, Operation::Create));
    if !create.is_allowed() {
        return Err(format!("expected allow, got {create:?}"));
    }
    let delete = evaluate(&principal, &AccessRequest::record(ResourceKind::School, Operation::Delete));
    if delete.deny_reason() != Some(DenyReason::Unsupported) {
        return Err(format!("expected unsupported denial, got {delete:?}"));
    }
    Ok(())
}

#[test]
fn profile_deletes_unsupported() -> TestResult {
    let principal = teacher_principal(12, 1, &[], true)?;
    let mut teacher_delete = AccessRequest::record(ResourceKind::TeacherProfile, Operation::Delete);
    teacher_delete.school_id = Some(sid(1)?);
    let decision = evaluate(&principal, &teacher_delete);
    if decision.deny_reason() != Some(DenyReason::Unsupported) {
        return Err(format!("expected unsupported denial, got {decision:?}"));
    }
    let mut student_delete = AccessRequest::record(ResourceKind::StudentProfile, Operation::Delete);
    student_delete.school_id = Some(sid(1)?);
    let decision = evaluate(&principal, &student_delete);
    if decision.deny_reason() != Some(DenyReason::Unsupported) {
        return Err(format!("expected unsupported denial, got {decision:?}"));
    }
    Ok(())
}
