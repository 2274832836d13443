// crates/progress-gate-core/src/runtime/resolver.rs
// ============================================================================
// Module: Progress Gate Identity Resolver
// Description: Principal resolution from the identity directory.
// Purpose: Build the immutable per-request principal snapshot.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The resolver maps an authenticated principal identifier to a fully
//! resolved [`Principal`] snapshot using exactly one lookup of each profile
//! table. It contains no decision logic.
//!
//! A principal must own exactly one profile: a dual-profile account is an
//! integrity failure and an account with no profile is not found. Both are
//! surfaced to the caller; neither is ever treated as lowest-privilege
//! access. Snapshots are built fresh per request; callers may cache one for
//! the duration of a single request only, never across requests or users.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::IntegrityError;
use crate::core::Principal;
use crate::core::PrincipalId;
use crate::core::RoleScope;
use crate::core::StaffRole;
use crate::interfaces::DirectoryError;
use crate::interfaces::IdentityStore;

// ============================================================================
// SECTION: Resolver Errors
// ============================================================================

/// Identity resolution errors.
///
/// # Invariants
/// - `NotFound` and `Integrity` are always surfaced to the caller; they are
///   authentication-layer concerns, not access denials.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No profile exists for the principal.
    #[error("no profile found for principal {principal_id}")]
    NotFound {
        /// Principal that failed to resolve.
        principal_id: PrincipalId,
    },
    /// The principal's profile data violates an integrity invariant.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    /// The identity store failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

// ============================================================================
// SECTION: Identity Resolver
// ============================================================================

/// Identity resolver over a backend-agnostic identity store.
///
/// # Invariants
/// - Pure lookup; performs no caching and no decision logic.
#[derive(Debug, Clone)]
pub struct IdentityResolver<S: IdentityStore> {
    /// Identity store consulted for profile lookups.
    store: S,
}

impl<S: IdentityStore> IdentityResolver<S> {
    /// Creates a resolver over the given identity store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
        }
    }

    /// Resolves a principal identifier into a fresh principal snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] when no profile exists,
    /// [`ResolveError::Integrity`] when the principal owns both profile
    /// types, and [`ResolveError::Directory`] when the store fails.
    pub fn resolve(&self, principal_id: PrincipalId) -> Result<Principal, ResolveError> {
        let teacher = self.store.teacher_by_principal(principal_id)?;
        let student = self.store.student_by_principal(principal_id)?;
        match (teacher, student) {
            (Some(_), Some(_)) => Err(ResolveError::Integrity(IntegrityError::DualProfile {
                principal_id,
            })),
            (Some(profile), None) => Ok(Principal {
                id: principal_id,
                school_id: profile.school_id,
                scope: RoleScope::Teacher {
                    profile_id: profile.id,
                    classes: profile.classes,
                    subjects: profile.subjects,
                    head: profile.role == StaffRole::HeadTeacher,
                },
            }),
            (None, Some(profile)) => Ok(Principal {
                id: principal_id,
                school_id: profile.school_id,
                scope: RoleScope::Student {
                    profile_id: profile.id,
                    class_name: profile.class_name,
                    year_group: profile.year_group,
                },
            }),
            (None, None) => Err(ResolveError::NotFound {
                principal_id,
            }),
        }
    }
}
