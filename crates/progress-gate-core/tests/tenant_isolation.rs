// crates/progress-gate-core/tests/tenant_isolation.rs
// ============================================================================
// Module: Tenant Isolation Tests
// Description: Validate absolute school isolation across roles and operations.
// Purpose: Ensure no decision ever crosses a school boundary.
// Dependencies: progress-gate-core
// ============================================================================

//! Tenant isolation is absolute: a target in a different school is denied
//! before any role rule runs, for every role and every operation, and scope
//! predicates never admit foreign-school records.

use std::collections::BTreeSet;

use progress_gate_core::AccessRequest;
use progress_gate_core::ClassName;
use progress_gate_core::DenyReason;
use progress_gate_core::EntryId;
use progress_gate_core::Operation;
use progress_gate_core::Principal;
use progress_gate_core::PrincipalId;
use progress_gate_core::ProgressEntry;
use progress_gate_core::ResourceKind;
use progress_gate_core::RoleScope;
use progress_gate_core::SchoolId;
use progress_gate_core::StudentProfileId;
use progress_gate_core::Subject;
use progress_gate_core::TeacherProfileId;
use progress_gate_core::Timestamp;
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

/// Builds one principal of every role, all in school 1.
fn school_one_principals() -> Result<Vec<Principal>, String> {
    Ok(vec![
        Principal {
            id: pid(21)?,
            school_id: sid(1)?,
            scope: RoleScope::Student {
                profile_id: StudentProfileId::new("student-1"),
                class_name: ClassName::new("5A"),
                year_group: 5,
            },
        },
        Principal {
            id: pid(11)?,
            school_id: sid(1)?,
            scope: RoleScope::Teacher {
                profile_id: TeacherProfileId::new("teacher-11"),
                classes: [ClassName::new("5A")].into_iter().collect::<BTreeSet<_>>(),
                subjects: BTreeSet::new(),
                head: false,
            },
        },
        Principal {
            id: pid(12)?,
            school_id: sid(1)?,
            scope: RoleScope::Teacher {
                profile_id: TeacherProfileId::new("teacher-12"),
                classes: BTreeSet::new(),
                subjects: BTreeSet::new(),
                head: true,
            },
        },
        Principal::service(pid(99)?, sid(1)?),
    ])
}

#[test]
fn foreign_school_entry_reads_denied_for_every_role() -> TestResult {
    for principal in &school_one_principals()? {
        let mut request = AccessRequest::record(ResourceKind::ProgressEntry, Operation::Read);
        request.school_id = Some(sid(2)?);
        let decision = evaluate(principal, &request);
        if decision.deny_reason() != Some(DenyReason::TenantMismatch) {
            return Err(format!(
                "expected tenant_mismatch for {:?}, got {decision:?}",
                principal.role()
            ));
        }
    }
    Ok(())
}

#[test]
fn foreign_school_entry_writes_denied_for_every_role() -> TestResult {
    for principal in &school_one_principals()? {
        for operation in [Operation::Create, Operation::Update, Operation::Delete] {
            let mut request = AccessRequest::record(ResourceKind::ProgressEntry, operation);
            request.school_id = Some(sid(2)?);
            request.facts.student_class = Some(ClassName::new("5A"));
            request.facts.entry_teacher = Some(TeacherProfileId::new("teacher-11"));
            let decision = evaluate(principal, &request);
            if decision.is_allowed() {
                return Err(format!(
                    "cross-school {operation:?} must never be allowed for {:?}",
                    principal.role()
                ));
            }
        }
    }
    Ok(())
}

#[test]
fn head_teacher_gets_no_cross_school_override() -> TestResult {
    let head = Principal {
        id: pid(12)?,
        school_id: sid(1)?,
        scope: RoleScope::Teacher {
            profile_id: TeacherProfileId::new("teacher-12"),
            classes: BTreeSet::new(),
            subjects: BTreeSet::new(),
            head: true,
        },
    };
    let mut request = AccessRequest::record(ResourceKind::ProgressEntry, Operation::Update);
    request.school_id = Some(sid(2)?);
    request.facts.entry_teacher = Some(TeacherProfileId::new("teacher-31"));
    let decision = evaluate(&head, &request);
    if decision.deny_reason() != Some(DenyReason::TenantMismatch) {
        return Err(format!("expected tenant_mismatch, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn foreign_school_profile_reads_denied() -> TestResult {
    for principal in &school_one_principals()? {
        let mut teacher_read = AccessRequest::record(ResourceKind::TeacherProfile, Operation::Read);
        teacher_read.school_id = Some(sid(2)?);
        let decision = evaluate(principal, &teacher_read);
        if decision.deny_reason() != Some(DenyReason::TenantMismatch) {
            return Err(format!(
                "expected tenant_mismatch for {:?}, got {decision:?}",
                principal.role()
            ));
        }
        let mut student_read = AccessRequest::record(ResourceKind::StudentProfile, Operation::Read);
        student_read.school_id = Some(sid(2)?);
        let decision = evaluate(principal, &student_read);
        if decision.deny_reason() != Some(DenyReason::TenantMismatch) {
            return Err(format!(
                "expected tenant_mismatch for {:?}, got {decision:?}",
                principal.role()
            ));
        }
    }
    Ok(())
}

#[test]
fn profile_update_with_foreign_school_denied_before_ownership() -> TestResult {
    let teacher = Principal {
        id: pid(11)?,
        school_id: sid(1)?,
        scope: RoleScope::Teacher {
            profile_id: TeacherProfileId::new("teacher-11"),
            classes: BTreeSet::new(),
            subjects: BTreeSet::new(),
            head: false,
        },
    };
    let mut request = AccessRequest::record(ResourceKind::TeacherProfile, Operation::Update);
    request.school_id = Some(sid(2)?);
    request.owner = Some(pid(11)?);
    let decision = evaluate(&teacher, &request);
    if decision.deny_reason() != Some(DenyReason::TenantMismatch) {
        return Err(format!("tenant gate must run before ownership, got {decision:?}"));
    }
    Ok(())
}

#[test]
fn scope_predicates_never_admit_foreign_school_records() -> TestResult {
    let entry = ProgressEntry {
        id: EntryId::new("entry-foreign"),
        student_id: StudentProfileId::new("student-9"),
        teacher_id: None,
        school_id: sid(2)?,
        subject: Subject::new("maths"),
        score: 5,
        max_score: 10,
        completed_at: Timestamp::Logical(1),
    };
    let student = progress_gate_core::StudentProfile {
        id: StudentProfileId::new("student-9"),
        principal_id: pid(41)?,
        school_id: sid(2)?,
        class_name: ClassName::new("5A"),
        year_group: 5,
    };
    for principal in &school_one_principals()? {
        let decision = evaluate(principal, &AccessRequest::list(ResourceKind::ProgressEntry));
        let scope = decision.scope().ok_or("list decision must carry a scope")?;
        if scope.admits_entry(&entry, &student) {
            return Err(format!(
                "scope for {:?} must not admit a foreign-school entry",
                principal.role()
            ));
        }
    }
    Ok(())
}
