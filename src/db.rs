// ==========================================
// College ERP - SQLite connection and schema
// ==========================================
// - Every connection gets the same PRAGMAs (foreign keys, busy_timeout)
// - init_schema is idempotent and records schema_version
// - status_log is append-only; triggers reject UPDATE and DELETE
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// Default busy_timeout (ms)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema_version written by `init_schema`.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Timestamp storage format (millisecond precision keeps status_log ordering stable).
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Applies the shared PRAGMAs.
///
/// foreign_keys and busy_timeout are per-connection settings in SQLite.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Opens a SQLite connection with the shared configuration.
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// In-memory database with schema, for tests and tooling.
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Reads schema_version (None if the table does not exist).
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// Creates all tables, indexes and triggers if missing.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let current = read_schema_version(conn)?;
    if current.map(|v| v < CURRENT_SCHEMA_VERSION).unwrap_or(true) {
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![CURRENT_SCHEMA_VERSION, format_ts(now_ts())],
        )?;
        tracing::info!(version = CURRENT_SCHEMA_VERSION, "schema initialised");
    }
    Ok(())
}

// ==========================================
// Timestamp helpers
// ==========================================

pub fn now_ts() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

pub fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Accepts both the millisecond format and plain "%Y-%m-%d %H:%M:%S".
pub fn parse_ts(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT,
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS department (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS batch (
    id TEXT PRIMARY KEY,
    department_id TEXT NOT NULL REFERENCES department(id),
    academic_year TEXT NOT NULL,
    current_semester INTEGER NOT NULL CHECK (current_semester BETWEEN 1 AND 8),
    auto_rollover INTEGER NOT NULL DEFAULT 0,
    archived INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student (
    id TEXT PRIMARY KEY,
    usn TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    batch_id TEXT NOT NULL REFERENCES batch(id),
    department_id TEXT NOT NULL REFERENCES department(id),
    semester INTEGER NOT NULL CHECK (semester BETWEEN 1 AND 8),
    section TEXT NOT NULL DEFAULT 'A',
    active INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_student_batch ON student(batch_id);

CREATE TABLE IF NOT EXISTS faculty (
    id TEXT PRIMARY KEY,
    employee_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    department_id TEXT NOT NULL REFERENCES department(id),
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS subject_category (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS subject (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    semester INTEGER NOT NULL CHECK (semester BETWEEN 1 AND 8),
    department_id TEXT NOT NULL REFERENCES department(id),
    category_id TEXT REFERENCES subject_category(id),
    credits INTEGER NOT NULL CHECK (credits >= 0),
    status TEXT NOT NULL DEFAULT 'draft'
        CHECK (status IN ('draft', 'active', 'locked', 'archived')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (code, department_id)
);

CREATE TABLE IF NOT EXISTS faculty_subject_mapping (
    id TEXT PRIMARY KEY,
    faculty_id TEXT NOT NULL REFERENCES faculty(id),
    subject_id TEXT NOT NULL REFERENCES subject(id),
    batch_id TEXT NOT NULL REFERENCES batch(id),
    section TEXT NOT NULL,
    academic_year TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'rejected')),
    active INTEGER NOT NULL DEFAULT 1,
    requested_by TEXT NOT NULL,
    reviewed_by TEXT,
    reviewed_at TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_mapping_subject ON faculty_subject_mapping(subject_id);
CREATE INDEX IF NOT EXISTS idx_mapping_batch ON faculty_subject_mapping(batch_id);

CREATE TABLE IF NOT EXISTS exam_component (
    id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL REFERENCES subject(id),
    name TEXT NOT NULL,
    max_marks REAL NOT NULL CHECK (max_marks > 0),
    weightage REAL NOT NULL CHECK (weightage > 0 AND weightage <= 100),
    created_at TEXT NOT NULL,
    UNIQUE (subject_id, name)
);

CREATE TABLE IF NOT EXISTS student_component_mark (
    student_id TEXT NOT NULL REFERENCES student(id),
    component_id TEXT NOT NULL REFERENCES exam_component(id),
    marks_obtained REAL NOT NULL CHECK (marks_obtained >= 0),
    entered_by TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (student_id, component_id)
);

CREATE TABLE IF NOT EXISTS attendance_entry (
    subject_id TEXT NOT NULL REFERENCES subject(id),
    student_id TEXT NOT NULL REFERENCES student(id),
    date TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('Present', 'Absent', 'Leave')),
    marked_by TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (subject_id, student_id, date)
);

CREATE TABLE IF NOT EXISTS status_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id TEXT NOT NULL REFERENCES subject(id),
    from_status TEXT,
    status TEXT NOT NULL,
    updated_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    is_override INTEGER NOT NULL DEFAULT 0,
    note TEXT
);
CREATE INDEX IF NOT EXISTS idx_status_log_subject ON status_log(subject_id, created_at, id);

CREATE TRIGGER IF NOT EXISTS trg_status_log_no_update
BEFORE UPDATE ON status_log
BEGIN
    SELECT RAISE(ABORT, 'status_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS trg_status_log_no_delete
BEFORE DELETE ON status_log
BEGIN
    SELECT RAISE(ABORT, 'status_log is append-only');
END;

CREATE TABLE IF NOT EXISTS app_user (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    login_type TEXT NOT NULL CHECK (login_type IN ('admin', 'faculty', 'student')),
    department_id TEXT REFERENCES department(id),
    failed_login_attempts INTEGER NOT NULL DEFAULT 0,
    locked_until TEXT,
    last_login_at TEXT
);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    payload_json TEXT,
    detail TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_log_entity ON action_log(entity_type, entity_id, action_ts);
CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);
"#;
