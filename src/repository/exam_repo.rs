// ==========================================
// College ERP - Exam components and marks repository
// ==========================================
// Marks for one component are upserted as a batch inside a single
// transaction: either every entry is stored or none is.
// ==========================================

use crate::db::{format_ts, parse_ts};
use crate::domain::exam::{ExamComponent, StudentComponentMark};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// One component score of a student, as read for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentMarkRow {
    pub subject_id: String,
    pub component_id: String,
    pub max_marks: f64,
    pub weightage: f64,
    pub marks_obtained: f64,
}

pub struct ExamRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExamRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== Components =====

    pub fn insert_component(&self, component: &ExamComponent) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO exam_component (id, subject_id, name, max_marks, weightage, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                component.id,
                component.subject_id,
                component.name,
                component.max_marks,
                component.weightage,
                format_ts(component.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_component(&self, id: &str) -> RepositoryResult<Option<ExamComponent>> {
        let conn = self.get_conn()?;
        let component = conn
            .query_row(
                r#"SELECT id, subject_id, name, max_marks, weightage, created_at
                   FROM exam_component WHERE id = ?1"#,
                params![id],
                map_component,
            )
            .optional()?;
        Ok(component)
    }

    pub fn list_components(&self, subject_id: &str) -> RepositoryResult<Vec<ExamComponent>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, subject_id, name, max_marks, weightage, created_at
               FROM exam_component WHERE subject_id = ?1
               ORDER BY created_at, name"#,
        )?;
        let components = stmt
            .query_map(params![subject_id], map_component)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(components)
    }

    pub fn count_components(&self, subject_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM exam_component WHERE subject_id = ?1",
            params![subject_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    // ===== Marks =====

    /// Inserts or replaces every mark in one transaction.
    pub fn upsert_marks(&self, marks: &[StudentComponentMark]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO student_component_mark
                       (student_id, component_id, marks_obtained, entered_by, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5)
                   ON CONFLICT (student_id, component_id) DO UPDATE SET
                       marks_obtained = excluded.marks_obtained,
                       entered_by = excluded.entered_by,
                       updated_at = excluded.updated_at"#,
            )?;
            for mark in marks {
                stmt.execute(params![
                    mark.student_id,
                    mark.component_id,
                    mark.marks_obtained,
                    mark.entered_by,
                    format_ts(mark.updated_at),
                ])?;
            }
        }
        tx.commit()?;
        Ok(marks.len())
    }

    pub fn list_marks(&self, component_id: &str) -> RepositoryResult<Vec<StudentComponentMark>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT student_id, component_id, marks_obtained, entered_by, updated_at
               FROM student_component_mark WHERE component_id = ?1
               ORDER BY student_id"#,
        )?;
        let marks = stmt
            .query_map(params![component_id], |row| {
                let updated_at: String = row.get(4)?;
                Ok(StudentComponentMark {
                    student_id: row.get(0)?,
                    component_id: row.get(1)?,
                    marks_obtained: row.get(2)?,
                    entered_by: row.get(3)?,
                    updated_at: parse_ts(&updated_at).unwrap_or_default(),
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(marks)
    }

    pub fn count_marks_by_subject(&self, subject_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row(
            r#"SELECT COUNT(*) FROM student_component_mark m
               JOIN exam_component c ON c.id = m.component_id
               WHERE c.subject_id = ?1"#,
            params![subject_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Recorded component marks of a student for subjects of one semester.
    pub fn student_marks_for_semester(
        &self,
        student_id: &str,
        semester: i32,
    ) -> RepositoryResult<Vec<ComponentMarkRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT c.subject_id, c.id, c.max_marks, c.weightage, m.marks_obtained
               FROM student_component_mark m
               JOIN exam_component c ON c.id = m.component_id
               JOIN subject s ON s.id = c.subject_id
               WHERE m.student_id = ?1 AND s.semester = ?2
               ORDER BY s.code, c.name"#,
        )?;
        let rows = stmt
            .query_map(params![student_id, semester], |row| {
                Ok(ComponentMarkRow {
                    subject_id: row.get(0)?,
                    component_id: row.get(1)?,
                    max_marks: row.get(2)?,
                    weightage: row.get(3)?,
                    marks_obtained: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_component(row: &Row) -> SqliteResult<ExamComponent> {
    let created_at: String = row.get(5)?;
    Ok(ExamComponent {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        name: row.get(2)?,
        max_marks: row.get(3)?,
        weightage: row.get(4)?,
        created_at: parse_ts(&created_at).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::now_ts;

    fn setup() -> ExamRepository {
        let conn = crate::db::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO department (id, code, name) VALUES ('D1', 'CSE', 'CS');
            INSERT INTO batch (id, department_id, academic_year, current_semester, created_at, updated_at)
                VALUES ('2022', 'D1', '2022-2023', 3, 'x', 'x');
            INSERT INTO student (id, usn, name, batch_id, department_id, semester)
                VALUES ('S1', 'U1', 'Asha', '2022', 'D1', 3),
                       ('S2', 'U2', 'Ravi', '2022', 'D1', 3);
            INSERT INTO subject (id, code, name, semester, department_id, credits, status, created_at, updated_at)
                VALUES ('SUB1', 'CS301', 'DS', 3, 'D1', 4, 'active', 'x', 'x');
            "#,
        )
        .unwrap();
        ExamRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn mark(student: &str, component: &str, marks: f64) -> StudentComponentMark {
        StudentComponentMark {
            student_id: student.into(),
            component_id: component.into(),
            marks_obtained: marks,
            entered_by: "F1".into(),
            updated_at: now_ts(),
        }
    }

    #[test]
    fn test_component_name_unique_per_subject() {
        let repo = setup();
        repo.insert_component(&ExamComponent::new("SUB1".into(), "CIE1".into(), 25.0, 20.0))
            .unwrap();
        let err = repo
            .insert_component(&ExamComponent::new("SUB1".into(), "CIE1".into(), 50.0, 30.0))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
        assert_eq!(repo.count_components("SUB1").unwrap(), 1);
    }

    #[test]
    fn test_upsert_replaces_existing_mark() {
        let repo = setup();
        let c = ExamComponent::new("SUB1".into(), "CIE1".into(), 25.0, 20.0);
        repo.insert_component(&c).unwrap();

        repo.upsert_marks(&[mark("S1", &c.id, 18.0), mark("S2", &c.id, 20.0)])
            .unwrap();
        repo.upsert_marks(&[mark("S1", &c.id, 21.5)]).unwrap();

        let marks = repo.list_marks(&c.id).unwrap();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].marks_obtained, 21.5);
        assert_eq!(repo.count_marks_by_subject("SUB1").unwrap(), 2);
    }

    #[test]
    fn test_failed_batch_leaves_no_partial_writes() {
        let repo = setup();
        let c = ExamComponent::new("SUB1".into(), "CIE1".into(), 25.0, 20.0);
        repo.insert_component(&c).unwrap();

        // Unknown student trips the foreign key on the second row.
        let result = repo.upsert_marks(&[mark("S1", &c.id, 10.0), mark("NOPE", &c.id, 10.0)]);
        assert!(result.is_err());
        assert!(repo.list_marks(&c.id).unwrap().is_empty());
    }

    #[test]
    fn test_student_marks_for_semester() {
        let repo = setup();
        let c = ExamComponent::new("SUB1".into(), "SEE".into(), 100.0, 50.0);
        repo.insert_component(&c).unwrap();
        repo.upsert_marks(&[mark("S1", &c.id, 72.0)]).unwrap();

        let rows = repo.student_marks_for_semester("S1", 3).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject_id, "SUB1");
        assert_eq!(rows[0].marks_obtained, 72.0);
        assert!(repo.student_marks_for_semester("S1", 4).unwrap().is_empty());
    }
}
