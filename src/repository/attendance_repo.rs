// ==========================================
// College ERP - Attendance repository
// ==========================================

use crate::db::{format_date, format_ts};
use crate::domain::attendance::AttendanceEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Present / total counts of one student in one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTally {
    pub subject_id: String,
    pub subject_code: String,
    pub student_id: String,
    pub usn: String,
    pub student_name: String,
    pub present: i64,
    pub total: i64,
}

const TALLY_SQL: &str = r#"
    SELECT a.subject_id, s.code, a.student_id, st.usn, st.name,
           SUM(CASE WHEN a.status = 'Present' THEN 1 ELSE 0 END) AS present,
           COUNT(*) AS total
    FROM attendance_entry a
    JOIN subject s ON s.id = a.subject_id
    JOIN student st ON st.id = a.student_id
"#;

pub struct AttendanceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AttendanceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Inserts or replaces every entry in one transaction.
    pub fn upsert_entries(&self, entries: &[AttendanceEntry]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO attendance_entry
                       (subject_id, student_id, date, status, marked_by, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                   ON CONFLICT (subject_id, student_id, date) DO UPDATE SET
                       status = excluded.status,
                       marked_by = excluded.marked_by,
                       updated_at = excluded.updated_at"#,
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.subject_id,
                    entry.student_id,
                    format_date(entry.date),
                    entry.status.to_db_str(),
                    entry.marked_by,
                    format_ts(entry.updated_at),
                ])?;
            }
        }
        tx.commit()?;
        Ok(entries.len())
    }

    pub fn count_by_subject(&self, subject_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM attendance_entry WHERE subject_id = ?1",
            params![subject_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// One tally per subject the student has entries in.
    pub fn tally_for_student(&self, student_id: &str) -> RepositoryResult<Vec<AttendanceTally>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE a.student_id = ?1 GROUP BY a.subject_id, a.student_id ORDER BY s.code",
            TALLY_SQL
        );
        let mut stmt = conn.prepare(&sql)?;
        let tallies = stmt
            .query_map(params![student_id], map_tally)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(tallies)
    }

    /// One tally per student with entries in the subject.
    pub fn tally_for_subject(&self, subject_id: &str) -> RepositoryResult<Vec<AttendanceTally>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE a.subject_id = ?1 GROUP BY a.subject_id, a.student_id ORDER BY st.usn",
            TALLY_SQL
        );
        let mut stmt = conn.prepare(&sql)?;
        let tallies = stmt
            .query_map(params![subject_id], map_tally)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(tallies)
    }
}

fn map_tally(row: &rusqlite::Row) -> SqliteResult<AttendanceTally> {
    Ok(AttendanceTally {
        subject_id: row.get(0)?,
        subject_code: row.get(1)?,
        student_id: row.get(2)?,
        usn: row.get(3)?,
        student_name: row.get(4)?,
        present: row.get(5)?,
        total: row.get(6)?,
    })
}
