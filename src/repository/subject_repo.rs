// ==========================================
// College ERP - Subject / category repository
// ==========================================
// Status changes are written together with their status_log row in one
// transaction. The UPDATE carries the observed status in its WHERE clause,
// so a concurrent transition makes this one fail instead of overwriting.
// Guarded steps also re-check their guard in the same WHERE clause.
// ==========================================

use crate::db::{format_ts, now_ts, parse_ts};
use crate::domain::status_log::{NewStatusLog, StatusLog};
use crate::domain::subject::{Subject, SubjectCategory};
use crate::domain::types::SubjectStatus;
use crate::engine::lifecycle::Guard;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT id, code, name, semester, department_id, category_id, credits,
           status, created_at, updated_at
    FROM subject
"#;

/// Filters for `SubjectRepository::list`; `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct SubjectFilter {
    pub department_id: Option<String>,
    pub semester: Option<i32>,
    pub status: Option<SubjectStatus>,
}

/// Editable fields of a draft subject.
#[derive(Debug, Clone)]
pub struct SubjectFieldUpdate {
    pub code: String,
    pub name: String,
    pub semester: i32,
    pub category_id: Option<String>,
    pub credits: i32,
}

pub struct SubjectRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SubjectRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // Subjects
    // ==========================================

    /// Inserts a draft subject and its initial history row.
    pub fn insert(&self, subject: &Subject, created_by: &str) -> RepositoryResult<StatusLog> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"INSERT INTO subject (
                id, code, name, semester, department_id, category_id, credits,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                subject.id,
                subject.code,
                subject.name,
                subject.semester,
                subject.department_id,
                subject.category_id,
                subject.credits,
                subject.status.to_db_str(),
                format_ts(subject.created_at),
                format_ts(subject.updated_at),
            ],
        )?;

        let entry = insert_status_log(
            &tx,
            &NewStatusLog {
                subject_id: subject.id.clone(),
                from_status: None,
                status: subject.status,
                updated_by: created_by.to_string(),
                is_override: false,
                note: None,
            },
        )?;

        tx.commit()?;
        Ok(entry)
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Subject>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    pub fn list(&self, filter: &SubjectFilter) -> RepositoryResult<Vec<Subject>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            WHERE (?1 IS NULL OR department_id = ?1)
              AND (?2 IS NULL OR semester = ?2)
              AND (?3 IS NULL OR status = ?3)
            ORDER BY semester, code"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let subjects = stmt
            .query_map(
                params![
                    filter.department_id,
                    filter.semester,
                    filter.status.map(|s| s.to_db_str()),
                ],
                map_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(subjects)
    }

    /// Rewrites the editable fields, only while the subject is still a draft.
    ///
    /// # Errors
    /// - `CompareAndSetFailed`: subject missing or no longer draft
    pub fn update_fields_if_draft(&self, id: &str, update: &SubjectFieldUpdate) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE subject
               SET code = ?1, name = ?2, semester = ?3, category_id = ?4,
                   credits = ?5, updated_at = ?6
               WHERE id = ?7 AND status = 'draft'"#,
            params![
                update.code,
                update.name,
                update.semester,
                update.category_id,
                update.credits,
                format_ts(now_ts()),
                id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::CompareAndSetFailed {
                entity: "Subject".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Moves a subject from `from` to `to` and appends the history row.
    ///
    /// Both writes commit together or not at all.
    ///
    /// # Errors
    /// - `CompareAndSetFailed`: the stored status is no longer `from`, or
    ///   `guard` no longer holds
    pub fn apply_transition(&self, change: &NewStatusLog, guard: Guard) -> RepositoryResult<StatusLog> {
        let from = change.from_status.ok_or_else(|| RepositoryError::FieldValueError {
            field: "from_status".to_string(),
            message: "a transition needs the observed status".to_string(),
        })?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let sql = format!(
            "UPDATE subject SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4{}",
            guard_predicate(guard)
        );
        let rows = tx.execute(
            &sql,
            params![
                change.status.to_db_str(),
                format_ts(now_ts()),
                change.subject_id,
                from.to_db_str(),
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::CompareAndSetFailed {
                entity: "Subject".to_string(),
                id: change.subject_id.clone(),
            });
        }

        let entry = insert_status_log(&tx, change)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Subject counts per status for one department.
    pub fn count_by_status(&self, department_id: &str) -> RepositoryResult<HashMap<SubjectStatus, i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM subject WHERE department_id = ?1 GROUP BY status",
        )?;
        let rows = stmt
            .query_map(params![department_id], |row| {
                Ok((status_column(row, 0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut counts: HashMap<SubjectStatus, i64> =
            SubjectStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for (status, n) in rows {
            counts.insert(status, n);
        }
        Ok(counts)
    }

    // ==========================================
    // Categories
    // ==========================================

    pub fn insert_category(&self, category: &SubjectCategory) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO subject_category (id, name) VALUES (?1, ?2)",
            params![category.id, category.name],
        )?;
        Ok(())
    }

    pub fn find_category(&self, id: &str) -> RepositoryResult<Option<SubjectCategory>> {
        let conn = self.get_conn()?;
        let category = conn
            .query_row(
                "SELECT id, name FROM subject_category WHERE id = ?1",
                params![id],
                |row| {
                    Ok(SubjectCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    pub fn list_categories(&self) -> RepositoryResult<Vec<SubjectCategory>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM subject_category ORDER BY name")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(SubjectCategory {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(categories)
    }
}

/// Appends one status_log row on an open connection or transaction.
pub(crate) fn insert_status_log(conn: &Connection, change: &NewStatusLog) -> RepositoryResult<StatusLog> {
    let created_at = now_ts();
    conn.execute(
        r#"INSERT INTO status_log (
            subject_id, from_status, status, updated_by, created_at, is_override, note
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        params![
            change.subject_id,
            change.from_status.map(|s| s.to_db_str()),
            change.status.to_db_str(),
            change.updated_by,
            format_ts(created_at),
            change.is_override,
            change.note,
        ],
    )?;

    Ok(StatusLog {
        id: conn.last_insert_rowid(),
        subject_id: change.subject_id.clone(),
        from_status: change.from_status,
        status: change.status,
        updated_by: change.updated_by.clone(),
        created_at,
        is_override: change.is_override,
        note: change.note.clone(),
    })
}

/// Reads a subject status column, rejecting values outside the lifecycle.
pub(crate) fn status_column(row: &Row, idx: usize) -> SqliteResult<SubjectStatus> {
    let raw: String = row.get(idx)?;
    SubjectStatus::from_db_str(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown subject status: {}", raw).into(),
        )
    })
}

fn map_row(row: &Row) -> SqliteResult<Subject> {
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Subject {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        semester: row.get(3)?,
        department_id: row.get(4)?,
        category_id: row.get(5)?,
        credits: row.get(6)?,
        status: status_column(row, 7)?,
        created_at: parse_ts(&created_at).unwrap_or_default(),
        updated_at: parse_ts(&updated_at).unwrap_or_default(),
    })
}

/// Extra WHERE conditions on `subject` that keep a guard true at write time.
fn guard_predicate(guard: Guard) -> &'static str {
    match guard {
        Guard::Always => "",
        Guard::CategoryAndApprovedFaculty => {
            r#" AND category_id IS NOT NULL
                AND EXISTS (
                    SELECT 1 FROM faculty_subject_mapping m
                    WHERE m.subject_id = subject.id AND m.status = 'approved' AND m.active = 1
                )"#
        }
        Guard::HasExamComponents => {
            " AND EXISTS (SELECT 1 FROM exam_component c WHERE c.subject_id = subject.id)"
        }
    }
}
