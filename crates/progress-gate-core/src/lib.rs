// crates/progress-gate-core/src/lib.rs
// ============================================================================
// Module: Progress Gate Core Library
// Description: Authorization decision service for school progress tracking.
// Purpose: Decide record access and gate mutations for the surrounding platform.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Progress Gate Core decides, for an authenticated principal and a target
//! record, whether the principal may read, create, update, or delete it, and
//! hands back the scope predicate list queries must apply. The engine is a
//! pure function over resolved snapshots:
//! - Principals are resolved once, before any rule runs; no rule re-queries
//!   the entity class it is deciding access to.
//! - Rule order per resource type is fixed and terminates on first match.
//! - Unrecognized roles, operations, and cross-school targets are denied.
//!
//! The crate performs no authentication and issues no queries; storage and
//! session management are external collaborators integrated through the
//! [`interfaces`] seams.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::AccessDecision;
pub use core::AccessRequest;
pub use core::ClassName;
pub use core::DenyReason;
pub use core::EntryId;
pub use core::IntegrityError;
pub use core::Operation;
pub use core::Principal;
pub use core::PrincipalId;
pub use core::ProgressEntry;
pub use core::RecordError;
pub use core::ResourceKind;
pub use core::Role;
pub use core::RoleScope;
pub use core::School;
pub use core::SchoolId;
pub use core::ScopeClause;
pub use core::ScopePredicate;
pub use core::Selection;
pub use core::StaffRole;
pub use core::StudentProfile;
pub use core::StudentProfileId;
pub use core::Subject;
pub use core::TargetFacts;
pub use core::TeacherProfile;
pub use core::TeacherProfileId;
pub use core::Timestamp;
pub use interfaces::DecisionEvent;
pub use interfaces::DecisionSink;
pub use interfaces::DirectoryError;
pub use interfaces::IdentityStore;
pub use interfaces::NoopDecisionSink;
