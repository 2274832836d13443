// crates/progress-gate-config/src/lib.rs
// ============================================================================
// Module: Progress Gate Config Library
// Description: Canonical configuration model, loading, and validation.
// Purpose: Configure the identity directory and service principals.
// Dependencies: progress-gate-core, progress-gate-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Deployment configuration for Progress Gate: the identity directory
//! settings and the declarative service principals the analytics
//! collaborator exchanges for school-scoped read-only access. Loading is
//! strict and fail-closed: path, size, and encoding guards run before
//! parsing, unknown fields are rejected, and validation enforces explicit
//! limits with stable error strings.
//!
//! Security posture: configuration files are untrusted input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use progress_gate_core::Principal;
use progress_gate_core::PrincipalId;
use progress_gate_core::SchoolId;
use progress_gate_store_sqlite::SqliteDirectoryConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "progress-gate.toml";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_BYTES: usize = 1_048_576;
/// Maximum total config path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum number of declared service principals.
pub const MAX_SERVICE_PRINCIPALS: usize = 32;
/// Maximum length of a service principal name.
pub const MAX_SERVICE_NAME_LENGTH: usize = 64;
/// Maximum busy timeout accepted for the directory.
const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Display strings are stable; tests match on substrings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file I/O failure.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file failed parsing.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config failed a validation constraint.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Model
// ============================================================================

/// Declarative service principal granted school-scoped read-only access.
///
/// # Invariants
/// - `principal_id` and `school_id` are non-zero after validation.
/// - Names are unique, lowercase ASCII, and bounded in length.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicePrincipalConfig {
    /// Stable service name presented by the collaborator.
    pub name: String,
    /// Reserved principal identifier for the service.
    pub principal_id: u64,
    /// School the service may read.
    pub school_id: u64,
}

/// Canonical Progress Gate configuration.
///
/// # Invariants
/// - `validate` must pass before the config is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProgressGateConfig {
    /// Identity directory settings.
    #[serde(default)]
    pub directory: SqliteDirectoryConfig,
    /// Declared service principals.
    #[serde(default)]
    pub service_principals: Vec<ServicePrincipalConfig>,
}

impl ProgressGateConfig {
    /// Loads configuration from the given path, or defaults.
    ///
    /// With an explicit path the file must exist. With `None`, a missing
    /// `progress-gate.toml` in the working directory yields the default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when path guards fail, the file cannot be
    /// read, parsing fails, or validation rejects the content.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Path::new(DEFAULT_CONFIG_PATH).to_path_buf(), false),
        };
        validate_config_path(&path)?;
        if !path.exists() {
            if required {
                return Err(ConfigError::Io(format!(
                    "config file not found: {}",
                    path.to_string_lossy()
                )));
            }
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = std::fs::read(&path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let text = String::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file is not valid UTF-8".to_string()))?;
        let config: Self =
            toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every configuration constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("directory path must not be empty".to_string()));
        }
        if self.directory.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "directory busy timeout exceeds limit: {} ms (max {MAX_BUSY_TIMEOUT_MS})",
                self.directory.busy_timeout_ms
            )));
        }
        if self.service_principals.len() > MAX_SERVICE_PRINCIPALS {
            return Err(ConfigError::Invalid(format!(
                "too many service principals: {} (max {MAX_SERVICE_PRINCIPALS})",
                self.service_principals.len()
            )));
        }
        let mut names = BTreeSet::new();
        let mut principal_ids = BTreeSet::new();
        for service in &self.service_principals {
            validate_service_name(&service.name)?;
            if service.principal_id == 0 {
                return Err(ConfigError::Invalid(format!(
                    "service principal id must be nonzero: {}",
                    service.name
                )));
            }
            if service.school_id == 0 {
                return Err(ConfigError::Invalid(format!(
                    "service school id must be nonzero: {}",
                    service.name
                )));
            }
            if !names.insert(service.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate service principal name: {}",
                    service.name
                )));
            }
            if !principal_ids.insert(service.principal_id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate service principal id: {}",
                    service.principal_id
                )));
            }
        }
        Ok(())
    }

    /// Exchanges a configured service name for a school-scoped principal.
    ///
    /// Returns `None` for unknown names or entries that fail identifier
    /// construction; callers must treat that as an authentication failure,
    /// never as anonymous access.
    #[must_use]
    pub fn service_principal(&self, name: &str) -> Option<Principal> {
        let service = self.service_principals.iter().find(|service| service.name == name)?;
        let principal_id = PrincipalId::from_raw(service.principal_id)?;
        let school_id = SchoolId::from_raw(service.school_id)?;
        Some(Principal::service(principal_id, school_id))
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates the config path before any read.
fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    let rendered = path.to_string_lossy();
    if rendered.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a service principal name.
fn validate_service_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Invalid("service principal name must not be empty".to_string()));
    }
    if name.len() > MAX_SERVICE_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "service principal name too long: {} chars (max {MAX_SERVICE_NAME_LENGTH})",
            name.len()
        )));
    }
    let valid = name
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-');
    if !valid {
        return Err(ConfigError::Invalid(format!(
            "service principal name has invalid characters: {name}"
        )));
    }
    Ok(())
}
