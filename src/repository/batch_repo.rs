// ==========================================
// College ERP - Batch repository
// ==========================================
// Semester changes go through compare-and-set UPDATEs:
// the WHERE clause carries the observed semester and the business
// preconditions, so two concurrent rollovers cannot both win.
// ==========================================

use crate::db::{format_ts, now_ts, parse_ts};
use crate::domain::action_log::ActionLog;
use crate::domain::batch::Batch;
use crate::domain::types::MAX_SEMESTER;
use crate::repository::action_log_repo::insert_on;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT id, department_id, academic_year, current_semester, auto_rollover,
           archived, created_at, updated_at
    FROM batch
"#;

pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, batch: &Batch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO batch (
                id, department_id, academic_year, current_semester,
                auto_rollover, archived, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                batch.id,
                batch.department_id,
                batch.academic_year,
                batch.current_semester,
                batch.auto_rollover,
                batch.archived,
                format_ts(batch.created_at),
                format_ts(batch.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let batch = conn.query_row(&sql, params![id], map_row).optional()?;
        Ok(batch)
    }

    /// Lists batches, newest admission year first.
    pub fn list(&self, department_id: Option<&str>, include_archived: bool) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            WHERE (?1 IS NULL OR department_id = ?1)
              AND (?2 = 1 OR archived = 0)
            ORDER BY id DESC"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(params![department_id, include_archived], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(batches)
    }

    /// Non-archived batches flagged for automatic rollover.
    pub fn find_auto_rollover_candidates(&self) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE auto_rollover = 1 AND archived = 0 ORDER BY id ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(batches)
    }

    /// Updates editable settings of a non-archived batch.
    pub fn update_settings(
        &self,
        id: &str,
        academic_year: &str,
        auto_rollover: bool,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE batch
               SET academic_year = ?1, auto_rollover = ?2, updated_at = ?3
               WHERE id = ?4 AND archived = 0"#,
            params![academic_year, auto_rollover, format_ts(now_ts()), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::CompareAndSetFailed {
                entity: "Batch".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Advances `current_semester` by one if it is still `expected_semester`,
    /// the batch is not archived and the ceiling is not reached. The audit
    /// row is written in the same transaction.
    ///
    /// # Errors
    /// - `CompareAndSetFailed`: no row matched; the caller re-reads to learn why
    pub fn rollover_if_current(
        &self,
        id: &str,
        expected_semester: i32,
        audit: &ActionLog,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"UPDATE batch
               SET current_semester = current_semester + 1, updated_at = ?1
               WHERE id = ?2
                 AND archived = 0
                 AND current_semester = ?3
                 AND current_semester < ?4"#,
            params![format_ts(now_ts()), id, expected_semester, MAX_SEMESTER],
        )?;
        if rows == 0 {
            return Err(RepositoryError::CompareAndSetFailed {
                entity: "Batch".to_string(),
                id: id.to_string(),
            });
        }

        insert_on(&tx, audit)?;
        tx.commit()?;
        Ok(())
    }

    /// Marks a batch archived, guarded so it only happens once and only
    /// while no active students or active faculty mappings reference it.
    pub fn archive_if_unreferenced(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE batch
               SET archived = 1, updated_at = ?1
               WHERE id = ?2
                 AND archived = 0
                 AND NOT EXISTS (SELECT 1 FROM student s WHERE s.batch_id = batch.id AND s.active = 1)
                 AND NOT EXISTS (
                     SELECT 1 FROM faculty_subject_mapping m
                     WHERE m.batch_id = batch.id AND m.active = 1
                 )"#,
            params![format_ts(now_ts()), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::CompareAndSetFailed {
                entity: "Batch".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Deletes a batch that no student references.
    pub fn delete_if_unreferenced(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"DELETE FROM batch
               WHERE id = ?1
                 AND NOT EXISTS (SELECT 1 FROM student s WHERE s.batch_id = batch.id)"#,
            params![id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::CompareAndSetFailed {
                entity: "Batch".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn count_active_by_department(&self, department_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM batch WHERE department_id = ?1 AND archived = 0",
            params![department_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

fn map_row(row: &Row) -> SqliteResult<Batch> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Batch {
        id: row.get(0)?,
        department_id: row.get(1)?,
        academic_year: row.get(2)?,
        current_semester: row.get(3)?,
        auto_rollover: row.get(4)?,
        archived: row.get(5)?,
        created_at: parse_ts(&created_at).unwrap_or_default(),
        updated_at: parse_ts(&updated_at).unwrap_or_default(),
    })
}
