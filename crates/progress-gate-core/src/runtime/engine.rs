// crates/progress-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Progress Gate Policy Engine
// Description: Fixed-order rule evaluation for access requests.
// Purpose: Produce deterministic allow/deny decisions and read scopes.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The policy engine is a pure function of (principal, request). Rule
//! evaluation per resource type is statically ordered and terminates on the
//! first match; no rule consults stored state, so evaluation cannot recurse
//! into the row set it is deciding access to. Identical inputs always yield
//! identical decisions, which makes the engine safely callable from parallel
//! request handlers without coordination.
//!
//! Fail-closed defaults: unrecognized role claims are denied `UnknownRole`,
//! resource/operation combinations without a rule are denied `Unsupported`,
//! and a target school that differs from the principal's is denied
//! `TenantMismatch` before any role rule runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::AccessDecision;
use crate::core::AccessRequest;
use crate::core::DenyReason;
use crate::core::Operation;
use crate::core::Principal;
use crate::core::ResourceKind;
use crate::core::Role;
use crate::core::RoleScope;
use crate::core::ScopePredicate;
use crate::core::Selection;
use crate::interfaces::DecisionEvent;
use crate::interfaces::DecisionSink;
use crate::interfaces::NoopDecisionSink;

// ============================================================================
// SECTION: Evaluation Entry
// ============================================================================

/// Evaluates an access request against a resolved principal.
///
/// Pure and deterministic: no I/O, no clocks, no shared state. Rules run in
/// a fixed order and the first match decides.
#[must_use]
pub fn evaluate(principal: &Principal, request: &AccessRequest) -> AccessDecision {
    if principal.role() == Role::Unknown {
        return AccessDecision::deny(DenyReason::UnknownRole);
    }
    if principal.role() == Role::Service && request.operation != Operation::Read {
        return AccessDecision::deny(DenyReason::OutOfScope);
    }
    match request.resource {
        ResourceKind::School => decide_school(request),
        ResourceKind::TeacherProfile => decide_teacher_profile(principal, request),
        ResourceKind::StudentProfile => decide_student_profile(principal, request),
        ResourceKind::ProgressEntry => decide_progress_entry(principal, request),
    }
}

/// Denies requests whose known target school differs from the principal's.
///
/// Tenant isolation is absolute: this gate runs before any role rule for
/// every school-scoped resource.
fn tenant_gate(principal: &Principal, request: &AccessRequest) -> Option<AccessDecision> {
    match request.school_id {
        Some(school_id) if school_id != principal.school_id => {
            Some(AccessDecision::deny(DenyReason::TenantMismatch))
        }
        _ => None,
    }
}

// ============================================================================
// SECTION: School Rules
// ============================================================================

/// Decides access to school records.
///
/// Schools are not secret: reads are unrestricted for every authenticated
/// role. Writes are coarse-grained (no ownership concept); deletion is not a
/// policy decision this core supports.
fn decide_school(request: &AccessRequest) -> AccessDecision {
    match request.operation {
        Operation::Read => AccessDecision::allow_scoped(ScopePredicate::all()),
        Operation::Create | Operation::Update => AccessDecision::allow(),
        Operation::Delete => AccessDecision::deny(DenyReason::Unsupported),
    }
}

// ============================================================================
// SECTION: Teacher Profile Rules
// ============================================================================

/// Decides access to teacher profile records.
fn decide_teacher_profile(principal: &Principal, request: &AccessRequest) -> AccessDecision {
    if request.operation != Operation::Create
        && let Some(decision) = tenant_gate(principal, request)
    {
        return decision;
    }
    match request.operation {
        Operation::Read => {
            let scope = teacher_read_scope(principal);
            if request.selection == Selection::Record
                && principal.role() == Role::Student
                && request.owner.is_some_and(|owner| owner != principal.id)
            {
                return AccessDecision::deny(DenyReason::SelfOnly);
            }
            AccessDecision::allow_scoped(scope)
        }
        Operation::Create => AccessDecision::allow(),
        Operation::Update => {
            if request.owner == Some(principal.id) {
                AccessDecision::allow()
            } else {
                AccessDecision::deny(DenyReason::SelfOnly)
            }
        }
        Operation::Delete => AccessDecision::deny(DenyReason::Unsupported),
    }
}

/// Visibility scope for teacher profile reads.
fn teacher_read_scope(principal: &Principal) -> ScopePredicate {
    match &principal.scope {
        RoleScope::Teacher {
            ..
        }
        | RoleScope::Service => ScopePredicate::school(principal.school_id),
        RoleScope::Student {
            ..
        }
        | RoleScope::Unknown => ScopePredicate::owner(principal.id),
    }
}

// ============================================================================
// SECTION: Student Profile Rules
// ============================================================================

/// Decides access to student profile records.
fn decide_student_profile(principal: &Principal, request: &AccessRequest) -> AccessDecision {
    if request.operation != Operation::Create
        && let Some(decision) = tenant_gate(principal, request)
    {
        return decision;
    }
    match request.operation {
        Operation::Read => {
            if request.selection == Selection::Record
                && principal.role() == Role::Student
                && request.owner.is_some_and(|owner| owner != principal.id)
            {
                return AccessDecision::deny(DenyReason::SelfOnly);
            }
            AccessDecision::allow_scoped(student_read_scope(principal))
        }
        Operation::Create => AccessDecision::allow(),
        Operation::Update => {
            if request.owner == Some(principal.id) {
                AccessDecision::allow()
            } else {
                AccessDecision::deny(DenyReason::SelfOnly)
            }
        }
        Operation::Delete => AccessDecision::deny(DenyReason::Unsupported),
    }
}

/// Visibility scope for student profile reads.
///
/// A plain teacher is narrowed to assigned classes by the predicate, not by
/// denying the request; a head teacher sees the whole school.
fn student_read_scope(principal: &Principal) -> ScopePredicate {
    match &principal.scope {
        RoleScope::Teacher {
            classes,
            head,
            ..
        } => {
            if *head {
                ScopePredicate::school(principal.school_id)
            } else {
                ScopePredicate::school_classes(principal.school_id, classes.clone())
            }
        }
        RoleScope::Service => ScopePredicate::school(principal.school_id),
        RoleScope::Student {
            ..
        }
        | RoleScope::Unknown => ScopePredicate::owner(principal.id),
    }
}

// ============================================================================
// SECTION: Progress Entry Rules
// ============================================================================

/// Decides access to progress entry records.
///
/// The most involved rule set: three visibility tiers for reads, class
/// membership for non-head creates, and authorship (or head authority) for
/// updates and deletes.
fn decide_progress_entry(principal: &Principal, request: &AccessRequest) -> AccessDecision {
    if let Some(decision) = tenant_gate(principal, request) {
        return decision;
    }
    match request.operation {
        Operation::Read => decide_entry_read(principal, request),
        Operation::Create => decide_entry_create(principal, request),
        Operation::Update | Operation::Delete => decide_entry_write(principal, request),
    }
}

/// Decides progress entry reads and list scopes.
fn decide_entry_read(principal: &Principal, request: &AccessRequest) -> AccessDecision {
    match &principal.scope {
        RoleScope::Student {
            profile_id,
            ..
        } => {
            if request.selection == Selection::Record
                && request.facts.student_id.as_ref().is_some_and(|id| id != profile_id)
            {
                return AccessDecision::deny(DenyReason::SelfOnly);
            }
            AccessDecision::allow_scoped(ScopePredicate::student(profile_id.clone()))
        }
        RoleScope::Teacher {
            classes,
            head,
            ..
        } => {
            if *head {
                AccessDecision::allow_scoped(ScopePredicate::school(principal.school_id))
            } else {
                AccessDecision::allow_scoped(ScopePredicate::school_classes(
                    principal.school_id,
                    classes.clone(),
                ))
            }
        }
        RoleScope::Service => {
            AccessDecision::allow_scoped(ScopePredicate::school(principal.school_id))
        }
        RoleScope::Unknown => AccessDecision::deny(DenyReason::UnknownRole),
    }
}

/// Decides progress entry creation.
///
/// The target school must be known and equal to the principal's; a request
/// that cannot prove its tenant is denied rather than resolved later.
fn decide_entry_create(principal: &Principal, request: &AccessRequest) -> AccessDecision {
    let RoleScope::Teacher {
        classes,
        head,
        ..
    } = &principal.scope
    else {
        return AccessDecision::deny(DenyReason::OutOfScope);
    };
    if request.school_id.is_none() {
        return AccessDecision::deny(DenyReason::TenantMismatch);
    }
    if *head {
        return AccessDecision::allow();
    }
    let in_assigned_class = request
        .facts
        .student_class
        .as_ref()
        .is_some_and(|class_name| classes.contains(class_name));
    if in_assigned_class {
        AccessDecision::allow()
    } else {
        AccessDecision::deny(DenyReason::OutOfScope)
    }
}

/// Decides progress entry updates and deletes.
///
/// Allowed for the teacher who recorded the entry, or for any head teacher
/// in the same school regardless of authorship.
fn decide_entry_write(principal: &Principal, request: &AccessRequest) -> AccessDecision {
    let RoleScope::Teacher {
        profile_id,
        head,
        ..
    } = &principal.scope
    else {
        return AccessDecision::deny(DenyReason::OutOfScope);
    };
    if request.school_id.is_none() {
        return AccessDecision::deny(DenyReason::TenantMismatch);
    }
    if *head {
        return AccessDecision::allow();
    }
    if request.facts.entry_teacher.as_ref() == Some(profile_id) {
        AccessDecision::allow()
    } else {
        AccessDecision::deny(DenyReason::SelfOnly)
    }
}

// ============================================================================
// SECTION: Engine Wrapper
// ============================================================================

/// Policy engine wrapper reporting every outcome to a decision sink.
///
/// # Invariants
/// - Decisions come from [`evaluate`] unchanged; the sink observes, never
///   influences.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine<S: DecisionSink = NoopDecisionSink> {
    /// Sink receiving one event per evaluation.
    sink: S,
}

impl PolicyEngine<NoopDecisionSink> {
    /// Creates an engine without observability.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sink: NoopDecisionSink,
        }
    }
}

impl<S: DecisionSink> PolicyEngine<S> {
    /// Creates an engine reporting to the given sink.
    #[must_use]
    pub const fn with_sink(sink: S) -> Self {
        Self {
            sink,
        }
    }

    /// Evaluates a request and reports the outcome.
    #[must_use]
    pub fn decide(&self, principal: &Principal, request: &AccessRequest) -> AccessDecision {
        let decision = evaluate(principal, request);
        self.sink.record(&DecisionEvent {
            resource: request.resource,
            operation: request.operation,
            role: principal.role(),
            allowed: decision.is_allowed(),
            reason: decision.deny_reason(),
        });
        decision
    }
}
