// ==========================================
// College ERP - Subject status history (read side)
// ==========================================
// Rows are written by SubjectRepository inside the transition
// transaction; the table itself refuses UPDATE and DELETE.
// ==========================================

use crate::db::parse_ts;
use crate::domain::status_log::StatusLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::subject_repo::status_column;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct StatusLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StatusLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Full history of one subject, oldest first.
    pub fn find_by_subject(&self, subject_id: &str) -> RepositoryResult<Vec<StatusLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, subject_id, from_status, status, updated_by, created_at, is_override, note
               FROM status_log
               WHERE subject_id = ?1
               ORDER BY created_at ASC, id ASC"#,
        )?;
        let logs = stmt
            .query_map(params![subject_id], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }
}

fn map_row(row: &Row) -> SqliteResult<StatusLog> {
    let from_status: Option<String> = row.get(2)?;
    let from_status = match from_status {
        Some(_) => Some(status_column(row, 2)?),
        None => None,
    };
    let created_at: String = row.get(5)?;
    Ok(StatusLog {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        from_status,
        status: status_column(row, 3)?,
        updated_by: row.get(4)?,
        created_at: parse_ts(&created_at).unwrap_or_default(),
        is_override: row.get(6)?,
        note: row.get(7)?,
    })
}
