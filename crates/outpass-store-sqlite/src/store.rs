// crates/outpass-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Outpass Store
// Description: Durable store interfaces backed by one SQLite database.
// Purpose: Persist students, policies, requests, trust, and gate logs with
//          schema-enforced invariants.
// Dependencies: outpass-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! One database file backs every store interface. Invariants live in the
//! schema: a partial unique index keeps one non-terminal request per student,
//! a unique `(request_id, action)` pair keeps gate logs idempotent, and
//! status transitions are conditional `UPDATE`s guarded by the expected
//! current status. Loads fail closed on unparseable rows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use outpass_core::ApprovalEvent;
use outpass_core::ApprovalStage;
use outpass_core::GateAction;
use outpass_core::GateLog;
use outpass_core::GateLogStore;
use outpass_core::GatePolicy;
use outpass_core::LogSource;
use outpass_core::NewPassRequest;
use outpass_core::PassKind;
use outpass_core::PassRequest;
use outpass_core::PassStatus;
use outpass_core::PolicyId;
use outpass_core::PolicyStore;
use outpass_core::RegNo;
use outpass_core::RequestId;
use outpass_core::RequestStore;
use outpass_core::StoreError;
use outpass_core::StudentCategory;
use outpass_core::StudentDirectory;
use outpass_core::StudentProfile;
use outpass_core::Timestamp;
use outpass_core::TrustEvent;
use outpass_core::TrustLedger;
use outpass_core::TrustReason;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// SQL fragment matching the terminal statuses.
const TERMINAL_SET: &str = "('completed', 'rejected', 'cancelled', 'expired')";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` Outpass store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a config with defaults for the given path.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or unparseable row.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Uniqueness conflict surfaced by the schema.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
        }
    }
}

/// Maps a `rusqlite` error to a store error, detecting conflicts.
fn db_err(err: &rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = err
        && failure.code == ErrorCode::ConstraintViolation
    {
        return SqliteStoreError::Conflict(err.to_string());
    }
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable Outpass store over one `SQLite` database.
///
/// Implements every store interface; clones of the handle are not supported,
/// wrap the store in an `Arc` to share it.
pub struct SqliteStore {
    /// Guarded database connection.
    connection: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] for unusable paths,
    /// [`SqliteStoreError::VersionMismatch`] for incompatible databases, and
    /// [`SqliteStoreError::Db`] for engine failures.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_path(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Enrolls or replaces a student record.
    ///
    /// The directory interface is read-only; enrollment is an administrative
    /// operation on the concrete store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the write fails.
    pub fn enroll_student(&self, profile: &StudentProfile) -> Result<(), SqliteStoreError> {
        let connection = self.conn()?;
        connection
            .execute(
                "INSERT INTO students (reg_no, name, category) VALUES (?1, ?2, ?3)
                 ON CONFLICT(reg_no) DO UPDATE SET name = ?2, category = ?3",
                params![profile.reg_no.as_str(), profile.name, profile.category.as_str()],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    /// Acquires the connection, mapping poisoning to a store error.
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("connection lock poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Maps a `requests` row to a [`PassRequest`], failing closed.
fn request_from_row(row: &Row<'_>) -> Result<PassRequest, rusqlite::Error> {
    let category: String = row.get("category")?;
    let status: String = row.get("status")?;
    let return_at: Option<i64> = row.get("return_at")?;
    Ok(PassRequest {
        id: RequestId::new(row.get("id")?),
        student_id: RegNo::new(row.get::<_, String>("student_id")?),
        category: StudentCategory::parse(&category)
            .ok_or_else(|| corrupt_row("category", &category))?,
        pass_kind: PassKind::new(row.get::<_, String>("pass_kind")?),
        reason: row.get("reason")?,
        departure_at: Timestamp::from_unix_millis(row.get("departure_at")?),
        return_at: return_at.map(Timestamp::from_unix_millis),
        status: PassStatus::parse(&status).ok_or_else(|| corrupt_row("status", &status))?,
        created_at: Timestamp::from_unix_millis(row.get("created_at")?),
        updated_at: Timestamp::from_unix_millis(row.get("updated_at")?),
    })
}

/// Maps an `approval_events` row to an [`ApprovalEvent`], failing closed.
fn event_from_row(row: &Row<'_>) -> Result<ApprovalEvent, rusqlite::Error> {
    let stage: String = row.get("stage")?;
    Ok(ApprovalEvent {
        request_id: RequestId::new(row.get("request_id")?),
        stage: ApprovalStage::parse(&stage).ok_or_else(|| corrupt_row("stage", &stage))?,
        actor_id: outpass_core::ActorId::new(row.get::<_, String>("actor_id")?),
        recorded_at: Timestamp::from_unix_millis(row.get("recorded_at")?),
        comments: row.get("comments")?,
    })
}

/// Maps a `trust_events` row to a [`TrustEvent`], failing closed.
fn trust_from_row(row: &Row<'_>) -> Result<TrustEvent, rusqlite::Error> {
    let reason: String = row.get("reason")?;
    Ok(TrustEvent {
        student_id: RegNo::new(row.get::<_, String>("student_id")?),
        delta: row.get("delta")?,
        reason: TrustReason::parse(&reason).ok_or_else(|| corrupt_row("reason", &reason))?,
        recorded_at: Timestamp::from_unix_millis(row.get("recorded_at")?),
    })
}

/// Maps a `gate_logs` row to a [`GateLog`], failing closed.
fn gate_log_from_row(row: &Row<'_>) -> Result<GateLog, rusqlite::Error> {
    let action: String = row.get("action")?;
    let source: String = row.get("source")?;
    Ok(GateLog {
        request_id: RequestId::new(row.get("request_id")?),
        student_id: RegNo::new(row.get::<_, String>("student_id")?),
        action: GateAction::parse(&action).ok_or_else(|| corrupt_row("action", &action))?,
        gatekeeper_id: outpass_core::ActorId::new(row.get::<_, String>("gatekeeper_id")?),
        recorded_at: Timestamp::from_unix_millis(row.get("recorded_at")?),
        comments: row.get("comments")?,
        source: LogSource::parse(&source).ok_or_else(|| corrupt_row("source", &source))?,
    })
}

/// Builds the `rusqlite` error used for unparseable enum columns.
fn corrupt_row(column: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidParameterName(format!("unknown {column} value: {value}"))
}

// ============================================================================
// SECTION: Student Directory
// ============================================================================

impl StudentDirectory for SqliteStore {
    fn lookup(&self, reg_no: &RegNo) -> Result<Option<StudentProfile>, StoreError> {
        let connection = self.conn()?;
        let profile = connection
            .query_row(
                "SELECT reg_no, name, category FROM students WHERE reg_no = ?1",
                params![reg_no.as_str()],
                |row| {
                    let category: String = row.get("category")?;
                    Ok(StudentProfile {
                        reg_no: RegNo::new(row.get::<_, String>("reg_no")?),
                        name: row.get("name")?,
                        category: StudentCategory::parse(&category)
                            .ok_or_else(|| corrupt_row("category", &category))?,
                    })
                },
            )
            .optional()
            .map_err(|err| db_err(&err))?;
        Ok(profile)
    }
}

// ============================================================================
// SECTION: Policy Store
// ============================================================================

impl PolicyStore for SqliteStore {
    fn get(&self, id: &PolicyId) -> Result<Option<GatePolicy>, StoreError> {
        let connection = self.conn()?;
        let json: Option<String> = connection
            .query_row(
                "SELECT policy_json FROM policies WHERE category = ?1 AND pass_kind = ?2",
                params![id.category.as_str(), id.pass_kind.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| db_err(&err))?;
        match json {
            None => Ok(None),
            Some(json) => {
                let policy: GatePolicy = serde_json::from_str(&json).map_err(|err| {
                    StoreError::Corrupt(format!("unparseable policy row: {err}"))
                })?;
                Ok(Some(policy))
            }
        }
    }

    fn put(&self, policy: &GatePolicy) -> Result<(), StoreError> {
        policy.validate().map_err(|err| StoreError::Invalid(err.to_string()))?;
        let json = serde_json::to_string(policy)
            .map_err(|err| StoreError::Invalid(format!("unserializable policy: {err}")))?;
        let connection = self.conn()?;
        connection
            .execute(
                "INSERT INTO policies (category, pass_kind, policy_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(category, pass_kind) DO UPDATE SET policy_json = ?3",
                params![policy.category.as_str(), policy.pass_kind.as_str(), json],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<GatePolicy>, StoreError> {
        let connection = self.conn()?;
        let mut stmt = connection
            .prepare("SELECT policy_json FROM policies ORDER BY category, pass_kind")
            .map_err(|err| db_err(&err))?;
        let rows = stmt
            .query_map(params![], |row| row.get::<_, String>(0))
            .map_err(|err| db_err(&err))?;
        let mut policies = Vec::new();
        for json in rows {
            let json = json.map_err(|err| db_err(&err))?;
            let policy: GatePolicy = serde_json::from_str(&json)
                .map_err(|err| StoreError::Corrupt(format!("unparseable policy row: {err}")))?;
            policies.push(policy);
        }
        Ok(policies)
    }

    fn remove(&self, id: &PolicyId) -> Result<bool, StoreError> {
        let connection = self.conn()?;
        let removed = connection
            .execute(
                "DELETE FROM policies WHERE category = ?1 AND pass_kind = ?2",
                params![id.category.as_str(), id.pass_kind.as_str()],
            )
            .map_err(|err| db_err(&err))?;
        Ok(removed > 0)
    }
}

// ============================================================================
// SECTION: Request Store
// ============================================================================

impl RequestStore for SqliteStore {
    fn create(&self, new: &NewPassRequest) -> Result<PassRequest, StoreError> {
        let connection = self.conn()?;
        // The partial unique index on non-terminal requests turns a
        // duplicate active pass into a constraint violation.
        connection
            .execute(
                "INSERT INTO requests
                     (student_id, category, pass_kind, reason, departure_at, return_at,
                      status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)",
                params![
                    new.student_id.as_str(),
                    new.category.as_str(),
                    new.pass_kind.as_str(),
                    new.reason,
                    new.departure_at.unix_millis(),
                    new.return_at.map(Timestamp::unix_millis),
                    new.created_at.unix_millis(),
                ],
            )
            .map_err(|err| db_err(&err))?;
        let id = connection.last_insert_rowid();
        let request = connection
            .query_row("SELECT * FROM requests WHERE id = ?1", params![id], request_from_row)
            .map_err(|err| db_err(&err))?;
        Ok(request)
    }

    fn load(&self, id: RequestId) -> Result<Option<PassRequest>, StoreError> {
        let connection = self.conn()?;
        let request = connection
            .query_row("SELECT * FROM requests WHERE id = ?1", params![id.value()], request_from_row)
            .optional()
            .map_err(|err| db_err(&err))?;
        Ok(request)
    }

    fn find_active(&self, student: &RegNo) -> Result<Option<PassRequest>, StoreError> {
        let connection = self.conn()?;
        let request = connection
            .query_row(
                &format!(
                    "SELECT * FROM requests
                     WHERE student_id = ?1 AND status NOT IN {TERMINAL_SET}"
                ),
                params![student.as_str()],
                request_from_row,
            )
            .optional()
            .map_err(|err| db_err(&err))?;
        Ok(request)
    }

    fn update_status(
        &self,
        id: RequestId,
        expected: PassStatus,
        next: PassStatus,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let connection = self.conn()?;
        let changed = connection
            .execute(
                "UPDATE requests SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4",
                params![next.as_str(), updated_at.unix_millis(), id.value(), expected.as_str()],
            )
            .map_err(|err| db_err(&err))?;
        Ok(changed == 1)
    }

    fn update_details(
        &self,
        id: RequestId,
        reason: &str,
        departure_at: Timestamp,
        return_at: Option<Timestamp>,
        updated_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let connection = self.conn()?;
        let changed = connection
            .execute(
                "UPDATE requests
                 SET reason = ?1, departure_at = ?2, return_at = ?3, updated_at = ?4
                 WHERE id = ?5 AND status = 'pending'",
                params![
                    reason,
                    departure_at.unix_millis(),
                    return_at.map(Timestamp::unix_millis),
                    updated_at.unix_millis(),
                    id.value(),
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(changed == 1)
    }

    fn append_event(&self, event: &ApprovalEvent) -> Result<(), StoreError> {
        let connection = self.conn()?;
        connection
            .execute(
                "INSERT INTO approval_events (request_id, stage, actor_id, recorded_at, comments)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.request_id.value(),
                    event.stage.as_str(),
                    event.actor_id.as_str(),
                    event.recorded_at.unix_millis(),
                    event.comments,
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn events(&self, id: RequestId) -> Result<Vec<ApprovalEvent>, StoreError> {
        let connection = self.conn()?;
        let mut stmt = connection
            .prepare(
                "SELECT request_id, stage, actor_id, recorded_at, comments
                 FROM approval_events WHERE request_id = ?1 ORDER BY seq",
            )
            .map_err(|err| db_err(&err))?;
        let rows =
            stmt.query_map(params![id.value()], event_from_row).map_err(|err| db_err(&err))?;
        collect_rows(rows)
    }

    fn list_by_student(
        &self,
        student: &RegNo,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PassRequest>, StoreError> {
        let connection = self.conn()?;
        let mut stmt = connection
            .prepare(
                "SELECT * FROM requests WHERE student_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
            )
            .map_err(|err| db_err(&err))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![student.as_str(), limit, offset], request_from_row)
            .map_err(|err| db_err(&err))?;
        collect_rows(rows)
    }

    fn list_non_terminal(&self) -> Result<Vec<PassRequest>, StoreError> {
        let connection = self.conn()?;
        let mut stmt = connection
            .prepare(&format!(
                "SELECT * FROM requests WHERE status NOT IN {TERMINAL_SET} ORDER BY id"
            ))
            .map_err(|err| db_err(&err))?;
        let rows = stmt.query_map(params![], request_from_row).map_err(|err| db_err(&err))?;
        collect_rows(rows)
    }
}

// ============================================================================
// SECTION: Trust Ledger
// ============================================================================

impl TrustLedger for SqliteStore {
    fn append(&self, event: &TrustEvent) -> Result<(), StoreError> {
        let connection = self.conn()?;
        connection
            .execute(
                "INSERT INTO trust_events (student_id, delta, reason, recorded_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    event.student_id.as_str(),
                    event.delta,
                    event.reason.as_str(),
                    event.recorded_at.unix_millis(),
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn events_for(&self, student: &RegNo) -> Result<Vec<TrustEvent>, StoreError> {
        let connection = self.conn()?;
        let mut stmt = connection
            .prepare(
                "SELECT student_id, delta, reason, recorded_at
                 FROM trust_events WHERE student_id = ?1 ORDER BY seq",
            )
            .map_err(|err| db_err(&err))?;
        let rows =
            stmt.query_map(params![student.as_str()], trust_from_row).map_err(|err| db_err(&err))?;
        collect_rows(rows)
    }
}

// ============================================================================
// SECTION: Gate Log Store
// ============================================================================

impl GateLogStore for SqliteStore {
    fn append(&self, log: &GateLog) -> Result<(), StoreError> {
        let connection = self.conn()?;
        connection
            .execute(
                "INSERT INTO gate_logs
                     (request_id, student_id, action, gatekeeper_id, recorded_at, comments, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    log.request_id.value(),
                    log.student_id.as_str(),
                    log.action.as_str(),
                    log.gatekeeper_id.as_str(),
                    log.recorded_at.unix_millis(),
                    log.comments,
                    log.source.as_str(),
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn exists(&self, request_id: RequestId, action: GateAction) -> Result<bool, StoreError> {
        let connection = self.conn()?;
        let found: Option<i64> = connection
            .query_row(
                "SELECT 1 FROM gate_logs WHERE request_id = ?1 AND action = ?2",
                params![request_id.value(), action.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| db_err(&err))?;
        Ok(found.is_some())
    }

    fn list_for(&self, request_id: RequestId) -> Result<Vec<GateLog>, StoreError> {
        let connection = self.conn()?;
        let mut stmt = connection
            .prepare(
                "SELECT request_id, student_id, action, gatekeeper_id, recorded_at, comments,
                        source
                 FROM gate_logs WHERE request_id = ?1 ORDER BY seq",
            )
            .map_err(|err| db_err(&err))?;
        let rows = stmt
            .query_map(params![request_id.value()], gate_log_from_row)
            .map_err(|err| db_err(&err))?;
        collect_rows(rows)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Collects a mapped row iterator, surfacing the first failure.
fn collect_rows<T>(
    rows: impl Iterator<Item = Result<T, rusqlite::Error>>,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|err| db_err(&err))?);
    }
    Ok(out)
}

/// Rejects directory paths before opening the database.
fn validate_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS students (
                    reg_no TEXT NOT NULL PRIMARY KEY,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS policies (
                    category TEXT NOT NULL,
                    pass_kind TEXT NOT NULL,
                    policy_json TEXT NOT NULL,
                    PRIMARY KEY (category, pass_kind)
                );
                CREATE TABLE IF NOT EXISTS requests (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    student_id TEXT NOT NULL,
                    category TEXT NOT NULL,
                    pass_kind TEXT NOT NULL,
                    reason TEXT NOT NULL,
                    departure_at INTEGER NOT NULL,
                    return_at INTEGER,
                    status TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_single_active
                    ON requests (student_id) WHERE status NOT IN {TERMINAL_SET};
                CREATE INDEX IF NOT EXISTS idx_requests_student
                    ON requests (student_id, created_at DESC);
                CREATE TABLE IF NOT EXISTS approval_events (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    request_id INTEGER NOT NULL,
                    stage TEXT NOT NULL,
                    actor_id TEXT NOT NULL,
                    recorded_at INTEGER NOT NULL,
                    comments TEXT,
                    FOREIGN KEY (request_id) REFERENCES requests(id) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_approval_events_request
                    ON approval_events (request_id, seq);
                CREATE TABLE IF NOT EXISTS trust_events (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    student_id TEXT NOT NULL,
                    delta INTEGER NOT NULL,
                    reason TEXT NOT NULL,
                    recorded_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_trust_events_student
                    ON trust_events (student_id, seq);
                CREATE TABLE IF NOT EXISTS gate_logs (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    request_id INTEGER NOT NULL,
                    student_id TEXT NOT NULL,
                    action TEXT NOT NULL,
                    gatekeeper_id TEXT NOT NULL,
                    recorded_at INTEGER NOT NULL,
                    comments TEXT,
                    source TEXT NOT NULL,
                    UNIQUE (request_id, action),
                    FOREIGN KEY (request_id) REFERENCES requests(id) ON DELETE CASCADE
                );"
            ))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
