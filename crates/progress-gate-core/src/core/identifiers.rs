// crates/progress-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Progress Gate Identifiers
// Description: Canonical opaque identifiers for schools, principals, and records.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout
//! Progress Gate. Identifiers are opaque and serialize as numbers or strings
//! on the wire. Numeric identifiers enforce non-zero, 1-based invariants at
//! construction boundaries; string identifiers are opaque and unvalidated at
//! the type boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Numeric Identifier Types
// ============================================================================

/// School identifier, the root of tenant isolation.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolId(NonZeroU64);

impl SchoolId {
    /// Creates a new school identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Creates a school identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// Principal identifier assigned by the authentication layer.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
/// - Identifies an authenticated account, never a profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(NonZeroU64);

impl PrincipalId {
    /// Creates a new principal identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Creates a principal identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

// ============================================================================
// SECTION: String Identifier Types
// ============================================================================

/// Teacher profile identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeacherProfileId(String);

impl TeacherProfileId {
    /// Creates a new teacher profile identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeacherProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TeacherProfileId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TeacherProfileId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Student profile identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentProfileId(String);

impl StudentProfileId {
    /// Creates a new student profile identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for StudentProfileId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StudentProfileId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Progress entry identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Creates a new progress entry identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Class name used for class-membership scoping.
///
/// # Invariants
/// - Opaque UTF-8 string; comparison is exact (no case folding).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    /// Creates a new class name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the class name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ClassName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClassName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Subject name attached to teacher assignments and progress entries.
///
/// # Invariants
/// - Opaque UTF-8 string; comparison is exact (no case folding).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    /// Creates a new subject name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the subject as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Subject {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Subject {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
