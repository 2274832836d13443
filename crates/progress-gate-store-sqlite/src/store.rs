// crates/progress-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Identity Directory
// Description: Durable IdentityStore and record store backed by SQLite WAL.
// Purpose: Persist directory records and apply guarded mutations.
// Dependencies: progress-gate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`IdentityStore`] plus scope-filtered
//! listing using `SQLite`. Scope predicates translate into SQL filters; the
//! join-scoped class clause becomes a join against `student_profiles`, built
//! from the already-resolved principal snapshot, never from the rows being
//! filtered. Writes are accepted only as [`ApprovedMutation`] tokens and run
//! in a transaction.
//!
//! Security posture: database contents are untrusted; loads fail closed on
//! malformed rows and schema version mismatches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use progress_gate_core::ClassName;
use progress_gate_core::DirectoryError;
use progress_gate_core::EntryId;
use progress_gate_core::IdentityStore;
use progress_gate_core::PrincipalId;
use progress_gate_core::ProgressEntry;
use progress_gate_core::School;
use progress_gate_core::SchoolId;
use progress_gate_core::ScopeClause;
use progress_gate_core::ScopePredicate;
use progress_gate_core::StaffRole;
use progress_gate_core::StudentProfile;
use progress_gate_core::StudentProfileId;
use progress_gate_core::Subject;
use progress_gate_core::TeacherProfile;
use progress_gate_core::TeacherProfileId;
use progress_gate_core::Timestamp;
use progress_gate_core::runtime::ApprovedMutation;
use progress_gate_core::runtime::Mutation;
use progress_gate_core::runtime::RecordContext;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the directory.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteDirectoryMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteDirectoryMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

/// Configuration for the `SQLite` directory.
///
/// # Invariants
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteDirectoryConfig {
    /// Database file path.
    pub path: PathBuf,
    /// Journal mode pragma.
    #[serde(default)]
    pub journal_mode: SqliteDirectoryMode,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for SqliteDirectoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("progress-gate.db"),
            journal_mode: SqliteDirectoryMode::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Default busy timeout in milliseconds.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` directory errors.
///
/// # Invariants
/// - Error messages avoid embedding raw profile data.
#[derive(Debug, Error, Clone)]
pub enum SqliteDirectoryError {
    /// Store I/O error.
    #[error("sqlite directory io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite directory db error: {0}")]
    Db(String),
    /// Store corruption detected on load.
    #[error("sqlite directory corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite directory version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or rejected payload.
    #[error("sqlite directory invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteDirectoryError> for DirectoryError {
    fn from(error: SqliteDirectoryError) -> Self {
        match error {
            SqliteDirectoryError::Io(message) => Self::Io(message),
            SqliteDirectoryError::Db(message) => Self::Store(message),
            SqliteDirectoryError::Corrupt(message) => Self::Corrupt(message),
            SqliteDirectoryError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteDirectoryError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Directory
// ============================================================================

/// `SQLite`-backed identity directory and record store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Writes are accepted only as guard-approved mutations.
pub struct SqliteDirectory {
    /// Serialized `SQLite` connection.
    connection: Mutex<Connection>,
}

impl SqliteDirectory {
    /// Opens (or creates) the directory at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when the path is invalid, the
    /// database cannot be opened, or the schema version is unsupported.
    pub fn new(config: SqliteDirectoryConfig) -> Result<Self, SqliteDirectoryError> {
        validate_store_path(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Locks the connection, surfacing poisoning as an I/O error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteDirectoryError> {
        self.connection
            .lock()
            .map_err(|_| SqliteDirectoryError::Io("connection mutex poisoned".to_string()))
    }

    /// Loads a school by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when the lookup fails.
    pub fn school(&self, school_id: SchoolId) -> Result<Option<School>, SqliteDirectoryError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, name FROM schools WHERE id = ?1",
                params![school_ref(school_id)?],
                school_from_row,
            )
            .optional()
            .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?
            .transpose()
    }

    /// Loads a teacher profile by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when the lookup fails.
    pub fn teacher(
        &self,
        teacher_id: &TeacherProfileId,
    ) -> Result<Option<TeacherProfile>, SqliteDirectoryError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, principal_id, school_id, role, classes, subjects
                 FROM teacher_profiles WHERE id = ?1",
                params![teacher_id.as_str()],
                teacher_from_row,
            )
            .optional()
            .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?
            .transpose()
    }

    /// Loads a student profile by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when the lookup fails.
    pub fn student(
        &self,
        student_id: &StudentProfileId,
    ) -> Result<Option<StudentProfile>, SqliteDirectoryError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, principal_id, school_id, class_name, year_group
                 FROM student_profiles WHERE id = ?1",
                params![student_id.as_str()],
                student_from_row,
            )
            .optional()
            .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?
            .transpose()
    }

    /// Loads a progress entry by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when the lookup fails.
    pub fn entry(&self, entry_id: &EntryId) -> Result<Option<ProgressEntry>, SqliteDirectoryError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, student_id, teacher_id, school_id, subject, score, max_score,
                        completed_at
                 FROM progress_entries WHERE id = ?1",
                params![entry_id.as_str()],
                entry_from_row,
            )
            .optional()
            .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?
            .transpose()
    }

    /// Resolves the related records the mutation guard needs.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when any lookup fails; absent
    /// records stay `None` for the guard to classify.
    pub fn record_context_for(
        &self,
        mutation: &Mutation,
    ) -> Result<RecordContext, SqliteDirectoryError> {
        let mut context = RecordContext::default();
        match mutation {
            Mutation::CreateSchool(_) | Mutation::UpdateSchool(_) => {}
            Mutation::CreateTeacherProfile(profile) | Mutation::UpdateTeacherProfile(profile) => {
                context.school = self.school(profile.school_id)?;
            }
            Mutation::CreateStudentProfile(profile) | Mutation::UpdateStudentProfile(profile) => {
                context.school = self.school(profile.school_id)?;
            }
            Mutation::CreateProgressEntry(entry) => {
                context.student = self.student(&entry.student_id)?;
                if let Some(teacher_id) = &entry.teacher_id {
                    context.teacher = self.teacher(teacher_id)?;
                }
            }
            Mutation::UpdateProgressEntry(entry) => {
                context.student = self.student(&entry.student_id)?;
                if let Some(teacher_id) = &entry.teacher_id {
                    context.teacher = self.teacher(teacher_id)?;
                }
                context.current_entry = self.entry(&entry.id)?;
            }
            Mutation::DeleteProgressEntry { entry_id } => {
                context.current_entry = self.entry(entry_id)?;
            }
        }
        Ok(context)
    }

    /// Lists teacher profiles admitted by the scope predicate.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when the query fails.
    pub fn list_teachers(
        &self,
        scope: &ScopePredicate,
    ) -> Result<Vec<TeacherProfile>, SqliteDirectoryError> {
        let Some(filter) = teacher_filter(scope)? else {
            return Ok(Vec::new());
        };
        let guard = self.lock()?;
        let sql = format!(
            "SELECT id, principal_id, school_id, role, classes, subjects
             FROM teacher_profiles{} ORDER BY id",
            filter.where_sql()
        );
        let mut statement =
            guard.prepare(&sql).map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params_from_iter(filter.params), teacher_from_row)
            .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
        collect_rows(rows)
    }

    /// Lists student profiles admitted by the scope predicate.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when the query fails.
    pub fn list_students(
        &self,
        scope: &ScopePredicate,
    ) -> Result<Vec<StudentProfile>, SqliteDirectoryError> {
        let Some(filter) = student_filter(scope)? else {
            return Ok(Vec::new());
        };
        let guard = self.lock()?;
        let sql = format!(
            "SELECT id, principal_id, school_id, class_name, year_group
             FROM student_profiles{} ORDER BY id",
            filter.where_sql()
        );
        let mut statement =
            guard.prepare(&sql).map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params_from_iter(filter.params), student_from_row)
            .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
        collect_rows(rows)
    }

    /// Lists progress entries admitted by the scope predicate.
    ///
    /// The join-scoped class clause joins `student_profiles`; entries whose
    /// student row is missing are not admitted (the join fails closed).
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when the query fails.
    pub fn list_entries(
        &self,
        scope: &ScopePredicate,
    ) -> Result<Vec<ProgressEntry>, SqliteDirectoryError> {
        let Some(filter) = entry_filter(scope)? else {
            return Ok(Vec::new());
        };
        let guard = self.lock()?;
        let join = if filter.joins_students {
            " JOIN student_profiles ON student_profiles.id = progress_entries.student_id"
        } else {
            ""
        };
        let sql = format!(
            "SELECT progress_entries.id, progress_entries.student_id,
                    progress_entries.teacher_id, progress_entries.school_id,
                    progress_entries.subject, progress_entries.score,
                    progress_entries.max_score, progress_entries.completed_at
             FROM progress_entries{join}{} ORDER BY progress_entries.id",
            filter.where_sql()
        );
        let mut statement =
            guard.prepare(&sql).map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params_from_iter(filter.params), entry_from_row)
            .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
        collect_rows(rows)
    }

    /// Executes a guard-approved mutation in a transaction.
    ///
    /// Progress entry payloads are validated for score bounds here; that is
    /// the storage layer's data-validation duty, not the guard's.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteDirectoryError`] when validation or execution fails.
    pub fn apply(&self, approved: &ApprovedMutation) -> Result<(), SqliteDirectoryError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
        match approved.mutation() {
            Mutation::CreateSchool(school) => {
                tx.execute(
                    "INSERT INTO schools (id, name) VALUES (?1, ?2)",
                    params![school_ref(school.id)?, school.name],
                )
                .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
            }
            Mutation::UpdateSchool(school) => {
                let changed = tx
                    .execute(
                        "UPDATE schools SET name = ?2 WHERE id = ?1",
                        params![school_ref(school.id)?, school.name],
                    )
                    .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
                require_changed(changed, "school")?;
            }
            Mutation::CreateTeacherProfile(profile) => {
                tx.execute(
                    "INSERT INTO teacher_profiles
                         (id, principal_id, school_id, role, classes, subjects)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        profile.id.as_str(),
                        principal_ref(profile.principal_id)?,
                        school_ref(profile.school_id)?,
                        profile.role.as_str(),
                        encode_json(&profile.classes)?,
                        encode_json(&profile.subjects)?,
                    ],
                )
                .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
            }
            Mutation::UpdateTeacherProfile(profile) => {
                let changed = tx
                    .execute(
                        "UPDATE teacher_profiles
                         SET principal_id = ?2, school_id = ?3, role = ?4, classes = ?5,
                             subjects = ?6
                         WHERE id = ?1",
                        params![
                            profile.id.as_str(),
                            principal_ref(profile.principal_id)?,
                            school_ref(profile.school_id)?,
                            profile.role.as_str(),
                            encode_json(&profile.classes)?,
                            encode_json(&profile.subjects)?,
                        ],
                    )
                    .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
                require_changed(changed, "teacher profile")?;
            }
            Mutation::CreateStudentProfile(profile) => {
                tx.execute(
                    "INSERT INTO student_profiles
                         (id, principal_id, school_id, class_name, year_group)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        profile.id.as_str(),
                        principal_ref(profile.principal_id)?,
                        school_ref(profile.school_id)?,
                        profile.class_name.as_str(),
                        i64::from(profile.year_group),
                    ],
                )
                .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
            }
            Mutation::UpdateStudentProfile(profile) => {
                let changed = tx
                    .execute(
                        "UPDATE student_profiles
                         SET principal_id = ?2, school_id = ?3, class_name = ?4, year_group = ?5
                         WHERE id = ?1",
                        params![
                            profile.id.as_str(),
                            principal_ref(profile.principal_id)?,
                            school_ref(profile.school_id)?,
                            profile.class_name.as_str(),
                            i64::from(profile.year_group),
                        ],
                    )
                    .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
                require_changed(changed, "student profile")?;
            }
            Mutation::CreateProgressEntry(entry) => {
                entry.validate().map_err(|err| SqliteDirectoryError::Invalid(err.to_string()))?;
                tx.execute(
                    "INSERT INTO progress_entries
                         (id, student_id, teacher_id, school_id, subject, score, max_score,
                          completed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        entry.id.as_str(),
                        entry.student_id.as_str(),
                        entry.teacher_id.as_ref().map(TeacherProfileId::as_str),
                        school_ref(entry.school_id)?,
                        entry.subject.as_str(),
                        i64::from(entry.score),
                        i64::from(entry.max_score),
                        encode_json(&entry.completed_at)?,
                    ],
                )
                .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
            }
            Mutation::UpdateProgressEntry(entry) => {
                entry.validate().map_err(|err| SqliteDirectoryError::Invalid(err.to_string()))?;
                let changed = tx
                    .execute(
                        "UPDATE progress_entries
                         SET student_id = ?2, teacher_id = ?3, school_id = ?4, subject = ?5,
                             score = ?6, max_score = ?7, completed_at = ?8
                         WHERE id = ?1",
                        params![
                            entry.id.as_str(),
                            entry.student_id.as_str(),
                            entry.teacher_id.as_ref().map(TeacherProfileId::as_str),
                            school_ref(entry.school_id)?,
                            entry.subject.as_str(),
                            i64::from(entry.score),
                            i64::from(entry.max_score),
                            encode_json(&entry.completed_at)?,
                        ],
                    )
                    .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
                require_changed(changed, "progress entry")?;
            }
            Mutation::DeleteProgressEntry { entry_id } => {
                let changed = tx
                    .execute(
                        "DELETE FROM progress_entries WHERE id = ?1",
                        params![entry_id.as_str()],
                    )
                    .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
                require_changed(changed, "progress entry")?;
            }
        }
        tx.commit().map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
        Ok(())
    }
}

impl IdentityStore for SqliteDirectory {
    fn teacher_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<TeacherProfile>, DirectoryError> {
        let guard = self.lock().map_err(DirectoryError::from)?;
        let result = guard
            .query_row(
                "SELECT id, principal_id, school_id, role, classes, subjects
                 FROM teacher_profiles WHERE principal_id = ?1",
                params![principal_ref(principal_id).map_err(DirectoryError::from)?],
                teacher_from_row,
            )
            .optional()
            .map_err(|err| DirectoryError::Store(err.to_string()))?;
        result.transpose().map_err(DirectoryError::from)
    }

    fn student_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<StudentProfile>, DirectoryError> {
        let guard = self.lock().map_err(DirectoryError::from)?;
        let result = guard
            .query_row(
                "SELECT id, principal_id, school_id, class_name, year_group
                 FROM student_profiles WHERE principal_id = ?1",
                params![principal_ref(principal_id).map_err(DirectoryError::from)?],
                student_from_row,
            )
            .optional()
            .map_err(|err| DirectoryError::Store(err.to_string()))?;
        result.transpose().map_err(DirectoryError::from)
    }

    fn school_exists(&self, school_id: SchoolId) -> Result<bool, DirectoryError> {
        let guard = self.lock().map_err(DirectoryError::from)?;
        let found: Option<i64> = guard
            .query_row(
                "SELECT 1 FROM schools WHERE id = ?1",
                params![school_ref(school_id).map_err(DirectoryError::from)?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| DirectoryError::Store(err.to_string()))?;
        Ok(found.is_some())
    }
}

// ============================================================================
// SECTION: Scope Translation
// ============================================================================

/// Translated SQL filter for one list query.
struct SqlFilter {
    /// Conjunctive SQL fragments.
    fragments: Vec<String>,
    /// Positional parameter values.
    params: Vec<SqlValue>,
    /// Whether the entry query must join `student_profiles`.
    joins_students: bool,
}

impl SqlFilter {
    /// Creates an empty (unrestricted) filter.
    const fn unrestricted() -> Self {
        Self {
            fragments: Vec::new(),
            params: Vec::new(),
            joins_students: false,
        }
    }

    /// Renders the WHERE clause, empty when unrestricted.
    fn where_sql(&self) -> String {
        if self.fragments.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.fragments.join(" AND "))
        }
    }

    /// Appends an equality fragment with its parameter.
    fn push_eq(&mut self, column: &str, value: SqlValue) {
        self.params.push(value);
        self.fragments.push(format!("{column} = ?{}", self.params.len()));
    }

    /// Appends an IN fragment over a class set.
    fn push_class_in(&mut self, column: &str, classes: &BTreeSet<ClassName>) {
        let mut placeholders = Vec::with_capacity(classes.len());
        for class_name in classes {
            self.params.push(SqlValue::Text(class_name.as_str().to_string()));
            placeholders.push(format!("?{}", self.params.len()));
        }
        self.fragments.push(format!("{column} IN ({})", placeholders.join(", ")));
    }
}

/// Translates a scope predicate for teacher profile queries.
///
/// Returns `None` when a clause has no meaning for teacher rows; the list is
/// then empty (fail closed).
fn teacher_filter(scope: &ScopePredicate) -> Result<Option<SqlFilter>, SqliteDirectoryError> {
    let mut filter = SqlFilter::unrestricted();
    for clause in &scope.clauses {
        match clause {
            ScopeClause::SchoolIs {
                school_id,
            } => filter.push_eq("school_id", SqlValue::Integer(school_ref(*school_id)?)),
            ScopeClause::OwnerIs {
                principal_id,
            } => filter.push_eq("principal_id", SqlValue::Integer(principal_ref(*principal_id)?)),
            ScopeClause::StudentIs {
                ..
            }
            | ScopeClause::StudentClassIn {
                ..
            } => return Ok(None),
        }
    }
    Ok(Some(filter))
}

/// Translates a scope predicate for student profile queries.
fn student_filter(scope: &ScopePredicate) -> Result<Option<SqlFilter>, SqliteDirectoryError> {
    let mut filter = SqlFilter::unrestricted();
    for clause in &scope.clauses {
        match clause {
            ScopeClause::SchoolIs {
                school_id,
            } => filter.push_eq("school_id", SqlValue::Integer(school_ref(*school_id)?)),
            ScopeClause::OwnerIs {
                principal_id,
            } => filter.push_eq("principal_id", SqlValue::Integer(principal_ref(*principal_id)?)),
            ScopeClause::StudentIs {
                student_id,
            } => filter.push_eq("id", SqlValue::Text(student_id.as_str().to_string())),
            ScopeClause::StudentClassIn {
                classes,
            } => {
                if classes.is_empty() {
                    return Ok(None);
                }
                filter.push_class_in("class_name", classes);
            }
        }
    }
    Ok(Some(filter))
}

/// Translates a scope predicate for progress entry queries.
fn entry_filter(scope: &ScopePredicate) -> Result<Option<SqlFilter>, SqliteDirectoryError> {
    let mut filter = SqlFilter::unrestricted();
    for clause in &scope.clauses {
        match clause {
            ScopeClause::SchoolIs {
                school_id,
            } => filter
                .push_eq("progress_entries.school_id", SqlValue::Integer(school_ref(*school_id)?)),
            ScopeClause::StudentIs {
                student_id,
            } => filter.push_eq(
                "progress_entries.student_id",
                SqlValue::Text(student_id.as_str().to_string()),
            ),
            ScopeClause::StudentClassIn {
                classes,
            } => {
                if classes.is_empty() {
                    return Ok(None);
                }
                filter.joins_students = true;
                filter.push_class_in("student_profiles.class_name", classes);
            }
            ScopeClause::OwnerIs {
                ..
            } => return Ok(None),
        }
    }
    Ok(Some(filter))
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Collects mapped rows, flattening per-row decode failures.
fn collect_rows<T>(
    rows: impl Iterator<Item = Result<Result<T, SqliteDirectoryError>, rusqlite::Error>>,
) -> Result<Vec<T>, SqliteDirectoryError> {
    let mut out = Vec::new();
    for row in rows {
        let decoded = row.map_err(|err| SqliteDirectoryError::Db(err.to_string()))??;
        out.push(decoded);
    }
    Ok(out)
}

/// Maps a school row.
fn school_from_row(row: &Row<'_>) -> rusqlite::Result<Result<School, SqliteDirectoryError>> {
    let id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    Ok(decode_school_id(id).map(|id| School {
        id,
        name,
    }))
}

/// Maps a teacher profile row.
fn teacher_from_row(
    row: &Row<'_>,
) -> rusqlite::Result<Result<TeacherProfile, SqliteDirectoryError>> {
    let id: String = row.get(0)?;
    let principal_id: i64 = row.get(1)?;
    let school_id: i64 = row.get(2)?;
    let role: String = row.get(3)?;
    let classes: String = row.get(4)?;
    let subjects: String = row.get(5)?;
    Ok(decode_teacher(id, principal_id, school_id, &role, &classes, &subjects))
}

/// Decodes a teacher profile from raw column values.
fn decode_teacher(
    id: String,
    principal_id: i64,
    school_id: i64,
    role: &str,
    classes: &str,
    subjects: &str,
) -> Result<TeacherProfile, SqliteDirectoryError> {
    let role = match role {
        "teacher" => StaffRole::Teacher,
        "head_teacher" => StaffRole::HeadTeacher,
        other => {
            return Err(SqliteDirectoryError::Corrupt(format!("unknown staff role: {other}")));
        }
    };
    Ok(TeacherProfile {
        id: TeacherProfileId::new(id),
        principal_id: decode_principal_id(principal_id)?,
        school_id: decode_school_id(school_id)?,
        role,
        classes: decode_json(classes)?,
        subjects: decode_json(subjects)?,
    })
}

/// Maps a student profile row.
fn student_from_row(
    row: &Row<'_>,
) -> rusqlite::Result<Result<StudentProfile, SqliteDirectoryError>> {
    let id: String = row.get(0)?;
    let principal_id: i64 = row.get(1)?;
    let school_id: i64 = row.get(2)?;
    let class_name: String = row.get(3)?;
    let year_group: i64 = row.get(4)?;
    Ok(decode_student(id, principal_id, school_id, class_name, year_group))
}

/// Decodes a student profile from raw column values.
fn decode_student(
    id: String,
    principal_id: i64,
    school_id: i64,
    class_name: String,
    year_group: i64,
) -> Result<StudentProfile, SqliteDirectoryError> {
    let year_group = u8::try_from(year_group).map_err(|_| {
        SqliteDirectoryError::Corrupt(format!("year group out of range: {year_group}"))
    })?;
    Ok(StudentProfile {
        id: StudentProfileId::new(id),
        principal_id: decode_principal_id(principal_id)?,
        school_id: decode_school_id(school_id)?,
        class_name: ClassName::new(class_name),
        year_group,
    })
}

/// Maps a progress entry row.
fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Result<ProgressEntry, SqliteDirectoryError>> {
    let id: String = row.get(0)?;
    let student_id: String = row.get(1)?;
    let teacher_id: Option<String> = row.get(2)?;
    let school_id: i64 = row.get(3)?;
    let subject: String = row.get(4)?;
    let score: i64 = row.get(5)?;
    let max_score: i64 = row.get(6)?;
    let completed_at: String = row.get(7)?;
    Ok(decode_entry(id, student_id, teacher_id, school_id, subject, score, max_score, &completed_at))
}

/// Decodes a progress entry from raw column values.
#[allow(
    clippy::too_many_arguments,
    reason = "Column-per-argument keeps row decoding flat and auditable."
)]
fn decode_entry(
    id: String,
    student_id: String,
    teacher_id: Option<String>,
    school_id: i64,
    subject: String,
    score: i64,
    max_score: i64,
    completed_at: &str,
) -> Result<ProgressEntry, SqliteDirectoryError> {
    let score = u32::try_from(score)
        .map_err(|_| SqliteDirectoryError::Corrupt(format!("score out of range: {score}")))?;
    let max_score = u32::try_from(max_score).map_err(|_| {
        SqliteDirectoryError::Corrupt(format!("max score out of range: {max_score}"))
    })?;
    let completed_at: Timestamp = decode_json(completed_at)?;
    Ok(ProgressEntry {
        id: EntryId::new(id),
        student_id: StudentProfileId::new(student_id),
        teacher_id: teacher_id.map(TeacherProfileId::new),
        school_id: decode_school_id(school_id)?,
        subject: Subject::new(subject),
        score,
        max_score,
        completed_at,
    })
}

// ============================================================================
// SECTION: Value Encoding
// ============================================================================

/// Converts a school identifier into a SQL integer.
fn school_ref(school_id: SchoolId) -> Result<i64, SqliteDirectoryError> {
    i64::try_from(school_id.get()).map_err(|_| {
        SqliteDirectoryError::Invalid(format!("school id exceeds sqlite range: {school_id}"))
    })
}

/// Converts a principal identifier into a SQL integer.
fn principal_ref(principal_id: PrincipalId) -> Result<i64, SqliteDirectoryError> {
    i64::try_from(principal_id.get()).map_err(|_| {
        SqliteDirectoryError::Invalid(format!("principal id exceeds sqlite range: {principal_id}"))
    })
}

/// Decodes a stored school identifier.
fn decode_school_id(raw: i64) -> Result<SchoolId, SqliteDirectoryError> {
    u64::try_from(raw)
        .ok()
        .and_then(SchoolId::from_raw)
        .ok_or_else(|| SqliteDirectoryError::Corrupt(format!("invalid school id: {raw}")))
}

/// Decodes a stored principal identifier.
fn decode_principal_id(raw: i64) -> Result<PrincipalId, SqliteDirectoryError> {
    u64::try_from(raw)
        .ok()
        .and_then(PrincipalId::from_raw)
        .ok_or_else(|| SqliteDirectoryError::Corrupt(format!("invalid principal id: {raw}")))
}

/// Serializes a value into canonical JSON text.
fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, SqliteDirectoryError> {
    serde_json::to_string(value).map_err(|err| SqliteDirectoryError::Invalid(err.to_string()))
}

/// Deserializes a stored JSON column, failing closed on malformed data.
fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, SqliteDirectoryError> {
    serde_json::from_str(raw)
        .map_err(|err| SqliteDirectoryError::Corrupt(format!("malformed json column: {err}")))
}

/// Requires an update or delete to have changed exactly one row.
fn require_changed(changed: usize, record: &str) -> Result<(), SqliteDirectoryError> {
    if changed == 0 {
        return Err(SqliteDirectoryError::Invalid(format!("{record} does not exist")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Validates the configured database path.
fn validate_store_path(path: &Path) -> Result<(), SqliteDirectoryError> {
    let rendered = path.to_string_lossy();
    if rendered.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteDirectoryError::Invalid("store path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteDirectoryError::Invalid(
                "store path component too long".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteDirectoryError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteDirectoryConfig) -> Result<Connection, SqliteDirectoryError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteDirectoryConfig,
) -> Result<(), SqliteDirectoryError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteDirectoryError> {
    let tx = connection.transaction().map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS directory_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM directory_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO directory_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS schools (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS teacher_profiles (
                    id TEXT PRIMARY KEY,
                    principal_id INTEGER NOT NULL UNIQUE,
                    school_id INTEGER NOT NULL REFERENCES schools(id),
                    role TEXT NOT NULL,
                    classes TEXT NOT NULL,
                    subjects TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_teacher_profiles_school
                    ON teacher_profiles (school_id);
                CREATE TABLE IF NOT EXISTS student_profiles (
                    id TEXT PRIMARY KEY,
                    principal_id INTEGER NOT NULL UNIQUE,
                    school_id INTEGER NOT NULL REFERENCES schools(id),
                    class_name TEXT NOT NULL,
                    year_group INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_student_profiles_school_class
                    ON student_profiles (school_id, class_name);
                CREATE TABLE IF NOT EXISTS progress_entries (
                    id TEXT PRIMARY KEY,
                    student_id TEXT NOT NULL REFERENCES student_profiles(id),
                    teacher_id TEXT REFERENCES teacher_profiles(id),
                    school_id INTEGER NOT NULL REFERENCES schools(id),
                    subject TEXT NOT NULL,
                    score INTEGER NOT NULL,
                    max_score INTEGER NOT NULL,
                    completed_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_progress_entries_school
                    ON progress_entries (school_id);
                CREATE INDEX IF NOT EXISTS idx_progress_entries_student
                    ON progress_entries (student_id);",
            )
            .map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteDirectoryError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteDirectoryError::Db(err.to_string()))?;
    Ok(())
}
