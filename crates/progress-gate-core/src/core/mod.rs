// crates/progress-gate-core/src/core/mod.rs
// ============================================================================
// Module: Progress Gate Core Types
// Description: Identifiers, principals, records, requests, scopes, decisions.
// Purpose: Define the pure data model the policy engine evaluates.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Core types are pure data: no I/O, no clocks, no hidden state. Everything
//! the engine needs to decide a request is resolved into these shapes before
//! evaluation begins.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod decision;
pub mod identifiers;
pub mod principal;
pub mod records;
pub mod request;
pub mod scope;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use decision::AccessDecision;
pub use decision::DenyReason;
pub use identifiers::ClassName;
pub use identifiers::EntryId;
pub use identifiers::PrincipalId;
pub use identifiers::SchoolId;
pub use identifiers::StudentProfileId;
pub use identifiers::Subject;
pub use identifiers::TeacherProfileId;
pub use principal::Principal;
pub use principal::Role;
pub use principal::RoleScope;
pub use records::IntegrityError;
pub use records::ProgressEntry;
pub use records::RecordError;
pub use records::School;
pub use records::StaffRole;
pub use records::StudentProfile;
pub use records::TeacherProfile;
pub use request::AccessRequest;
pub use request::Operation;
pub use request::ResourceKind;
pub use request::Selection;
pub use request::TargetFacts;
pub use scope::ScopeClause;
pub use scope::ScopePredicate;
pub use time::Timestamp;
