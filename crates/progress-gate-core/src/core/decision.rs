// crates/progress-gate-core/src/core/decision.rs
// ============================================================================
// Module: Progress Gate Access Decisions
// Description: Allow/deny outcomes with stable deny reasons.
// Purpose: Carry the engine verdict and read scope back to the caller.
// Dependencies: crate::core::scope, serde
// ============================================================================

//! ## Overview
//! An [`AccessDecision`] is the engine's verdict for one request. Allows for
//! read operations always carry a scope predicate; allows for writes carry
//! none. Denials carry a reason from a closed enum so callers can translate
//! them into user-facing errors without string matching.
//!
//! A denial is the expected, recoverable outcome of normal operation; it is
//! not an error and must never be logged as one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::scope::ScopePredicate;

// ============================================================================
// SECTION: Deny Reasons
// ============================================================================

/// Stable reason attached to every denial.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The operation is restricted to the record owner.
    SelfOnly,
    /// The target is outside the principal's assigned scope.
    OutOfScope,
    /// The principal's role claim is not recognized.
    UnknownRole,
    /// The resource/operation combination has no rule.
    Unsupported,
    /// The target belongs to a different school than the principal.
    TenantMismatch,
}

impl DenyReason {
    /// Returns a stable label for the deny reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelfOnly => "self_only",
            Self::OutOfScope => "out_of_scope",
            Self::UnknownRole => "unknown_role",
            Self::Unsupported => "unsupported",
            Self::TenantMismatch => "tenant_mismatch",
        }
    }
}

// ============================================================================
// SECTION: Access Decision
// ============================================================================

/// Engine verdict for one access request.
///
/// # Invariants
/// - Read allows carry `Some(scope)`; write allows carry `None`.
/// - Identical (principal, request) inputs always produce identical
///   decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessDecision {
    /// Access granted.
    Allow {
        /// Visibility predicate for read operations.
        scope: Option<ScopePredicate>,
    },
    /// Access denied.
    Deny {
        /// Stable denial reason.
        reason: DenyReason,
    },
}

impl AccessDecision {
    /// Creates an allow decision without a scope (writes).
    #[must_use]
    pub const fn allow() -> Self {
        Self::Allow {
            scope: None,
        }
    }

    /// Creates an allow decision carrying a read scope.
    #[must_use]
    pub const fn allow_scoped(scope: ScopePredicate) -> Self {
        Self::Allow {
            scope: Some(scope),
        }
    }

    /// Creates a deny decision with the given reason.
    #[must_use]
    pub const fn deny(reason: DenyReason) -> Self {
        Self::Deny {
            reason,
        }
    }

    /// Returns true when the decision grants access.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Returns the read scope, if the decision carries one.
    #[must_use]
    pub const fn scope(&self) -> Option<&ScopePredicate> {
        match self {
            Self::Allow {
                scope,
            } => scope.as_ref(),
            Self::Deny {
                ..
            } => None,
        }
    }

    /// Returns the denial reason, if the decision is a denial.
    #[must_use]
    pub const fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allow {
                ..
            } => None,
            Self::Deny {
                reason,
            } => Some(*reason),
        }
    }
}
