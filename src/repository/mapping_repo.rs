// ==========================================
// College ERP - Faculty-subject mapping repository
// ==========================================

use crate::db::{format_ts, now_ts, parse_ts};
use crate::domain::mapping::FacultySubjectMapping;
use crate::domain::types::MappingStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT id, faculty_id, subject_id, batch_id, section, academic_year,
           status, active, requested_by, reviewed_by, reviewed_at, created_at
    FROM faculty_subject_mapping
"#;

#[derive(Debug, Clone, Default)]
pub struct MappingFilter {
    pub subject_id: Option<String>,
    pub faculty_id: Option<String>,
    pub status: Option<MappingStatus>,
}

pub struct MappingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MappingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, mapping: &FacultySubjectMapping) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO faculty_subject_mapping (
                id, faculty_id, subject_id, batch_id, section, academic_year,
                status, active, requested_by, reviewed_by, reviewed_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                mapping.id,
                mapping.faculty_id,
                mapping.subject_id,
                mapping.batch_id,
                mapping.section,
                mapping.academic_year,
                mapping.status.to_db_str(),
                mapping.active,
                mapping.requested_by,
                mapping.reviewed_by,
                mapping.reviewed_at.map(format_ts),
                format_ts(mapping.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<FacultySubjectMapping>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    pub fn list(&self, filter: &MappingFilter) -> RepositoryResult<Vec<FacultySubjectMapping>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            WHERE (?1 IS NULL OR subject_id = ?1)
              AND (?2 IS NULL OR faculty_id = ?2)
              AND (?3 IS NULL OR status = ?3)
            ORDER BY created_at ASC"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mappings = stmt
            .query_map(
                params![
                    filter.subject_id,
                    filter.faculty_id,
                    filter.status.map(|s| s.to_db_str()),
                ],
                map_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(mappings)
    }

    /// Whether an active, non-rejected mapping already covers the same
    /// subject / batch / section.
    pub fn exists_open(&self, subject_id: &str, batch_id: &str, section: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                r#"SELECT 1 FROM faculty_subject_mapping
                   WHERE subject_id = ?1 AND batch_id = ?2 AND section = ?3
                     AND active = 1 AND status != 'rejected'
                   LIMIT 1"#,
                params![subject_id, batch_id, section],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    /// Records the review decision for a mapping that is still pending.
    ///
    /// # Errors
    /// - `CompareAndSetFailed`: mapping missing, already reviewed or inactive
    pub fn review_if_pending(
        &self,
        id: &str,
        decision: MappingStatus,
        reviewed_by: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE faculty_subject_mapping
               SET status = ?1, reviewed_by = ?2, reviewed_at = ?3
               WHERE id = ?4 AND status = 'pending' AND active = 1"#,
            params![decision.to_db_str(), reviewed_by, format_ts(now_ts()), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::CompareAndSetFailed {
                entity: "FacultySubjectMapping".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn deactivate(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE faculty_subject_mapping SET active = 0 WHERE id = ?1 AND active = 1",
            params![id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::CompareAndSetFailed {
                entity: "FacultySubjectMapping".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Approved and active mappings for a subject (activation guard input).
    pub fn count_effective_by_subject(&self, subject_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row(
            r#"SELECT COUNT(*) FROM faculty_subject_mapping
               WHERE subject_id = ?1 AND status = 'approved' AND active = 1"#,
            params![subject_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn count_active_by_batch(&self, batch_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM faculty_subject_mapping WHERE batch_id = ?1 AND active = 1",
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Pending requests against subjects of a department.
    pub fn count_pending_by_department(&self, department_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row(
            r#"SELECT COUNT(*) FROM faculty_subject_mapping m
               JOIN subject s ON s.id = m.subject_id
               WHERE s.department_id = ?1 AND m.status = 'pending' AND m.active = 1"#,
            params![department_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

fn map_row(row: &Row) -> SqliteResult<FacultySubjectMapping> {
    let raw_status: String = row.get(6)?;
    let status = MappingStatus::from_db_str(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            Type::Text,
            format!("unknown mapping status: {}", raw_status).into(),
        )
    })?;
    let reviewed_at: Option<String> = row.get(10)?;
    let created_at: String = row.get(11)?;

    Ok(FacultySubjectMapping {
        id: row.get(0)?,
        faculty_id: row.get(1)?,
        subject_id: row.get(2)?,
        batch_id: row.get(3)?,
        section: row.get(4)?,
        academic_year: row.get(5)?,
        status,
        active: row.get(7)?,
        requested_by: row.get(8)?,
        reviewed_by: row.get(9)?,
        reviewed_at: reviewed_at.as_deref().and_then(parse_ts),
        created_at: parse_ts(&created_at).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> MappingRepository {
        let conn = crate::db::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO department (id, code, name) VALUES ('D1', 'CSE', 'CS');
            INSERT INTO batch (id, department_id, academic_year, current_semester, created_at, updated_at)
                VALUES ('2022', 'D1', '2022-2023', 3, 'x', 'x');
            INSERT INTO faculty (id, employee_id, name, department_id) VALUES ('F1', 'E001', 'Rao', 'D1');
            INSERT INTO subject (id, code, name, semester, department_id, credits, created_at, updated_at)
                VALUES ('SUB1', 'CS301', 'DS', 3, 'D1', 4, 'x', 'x');
            "#,
        )
        .unwrap();
        MappingRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn pending() -> FacultySubjectMapping {
        FacultySubjectMapping::new_pending(
            "F1".into(),
            "SUB1".into(),
            "2022".into(),
            "A".into(),
            "2023-2024".into(),
            "F1".into(),
        )
    }

    #[test]
    fn test_review_only_once() {
        let repo = setup();
        let m = pending();
        repo.insert(&m).unwrap();
        assert_eq!(repo.count_pending_by_department("D1").unwrap(), 1);
        assert!(repo.exists_open("SUB1", "2022", "A").unwrap());

        repo.review_if_pending(&m.id, MappingStatus::Approved, "admin").unwrap();
        let stored = repo.find_by_id(&m.id).unwrap().unwrap();
        assert!(stored.is_effective());
        assert_eq!(stored.reviewed_by.as_deref(), Some("admin"));
        assert!(stored.reviewed_at.is_some());

        let err = repo.review_if_pending(&m.id, MappingStatus::Rejected, "admin").unwrap_err();
        assert!(matches!(err, RepositoryError::CompareAndSetFailed { .. }));
        assert_eq!(repo.count_effective_by_subject("SUB1").unwrap(), 1);
    }

    #[test]
    fn test_deactivate_removes_effect() {
        let repo = setup();
        let m = pending();
        repo.insert(&m).unwrap();
        repo.review_if_pending(&m.id, MappingStatus::Approved, "admin").unwrap();
        assert_eq!(repo.count_active_by_batch("2022").unwrap(), 1);

        repo.deactivate(&m.id).unwrap();
        assert_eq!(repo.count_effective_by_subject("SUB1").unwrap(), 0);
        assert_eq!(repo.count_active_by_batch("2022").unwrap(), 0);
        assert!(!repo.exists_open("SUB1", "2022", "A").unwrap());
        assert!(repo.deactivate(&m.id).is_err());
    }

    #[test]
    fn test_list_by_status() {
        let repo = setup();
        let a = pending();
        let mut b = pending();
        b.section = "B".into();
        repo.insert(&a).unwrap();
        repo.insert(&b).unwrap();
        repo.review_if_pending(&b.id, MappingStatus::Rejected, "admin").unwrap();

        let rejected = repo
            .list(&MappingFilter {
                status: Some(MappingStatus::Rejected),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].section, "B");
        assert!(!repo.exists_open("SUB1", "2022", "B").unwrap());
    }
}
