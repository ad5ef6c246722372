// ==========================================
// College ERP - Department / student / faculty repositories
// ==========================================

use crate::domain::people::{Department, Faculty, Student};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

fn lock(conn: &Arc<Mutex<Connection>>) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

// ==========================================
// DepartmentRepository
// ==========================================
pub struct DepartmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DepartmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn insert(&self, department: &Department) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO department (id, code, name) VALUES (?1, ?2, ?3)",
            params![department.id, department.code, department.name],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Department>> {
        let conn = lock(&self.conn)?;
        let department = conn
            .query_row(
                "SELECT id, code, name FROM department WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Department {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(department)
    }

    pub fn list(&self) -> RepositoryResult<Vec<Department>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT id, code, name FROM department ORDER BY code")?;
        let departments = stmt
            .query_map([], |row| {
                Ok(Department {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(departments)
    }
}

// ==========================================
// StudentRepository
// ==========================================
const STUDENT_COLUMNS: &str =
    "SELECT id, usn, name, batch_id, department_id, semester, section, active FROM student";

pub struct StudentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StudentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn insert(&self, student: &Student) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"INSERT INTO student (id, usn, name, batch_id, department_id, semester, section, active)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                student.id,
                student.usn,
                student.name,
                student.batch_id,
                student.department_id,
                student.semester,
                student.section,
                student.active,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Student>> {
        let conn = lock(&self.conn)?;
        let sql = format!("{} WHERE id = ?1", STUDENT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_student).optional()?)
    }

    pub fn find_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<Student>> {
        let conn = lock(&self.conn)?;
        let sql = format!("{} WHERE batch_id = ?1 ORDER BY usn", STUDENT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let students = stmt
            .query_map(params![batch_id], map_student)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(students)
    }

    pub fn deactivate(&self, id: &str) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("UPDATE student SET active = 0 WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Student", id));
        }
        Ok(())
    }

    pub fn count_active_by_batch(&self, batch_id: &str) -> RepositoryResult<i64> {
        let conn = lock(&self.conn)?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM student WHERE batch_id = ?1 AND active = 1",
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn count_by_batch(&self, batch_id: &str) -> RepositoryResult<i64> {
        let conn = lock(&self.conn)?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM student WHERE batch_id = ?1",
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn count_active_by_department(&self, department_id: &str) -> RepositoryResult<i64> {
        let conn = lock(&self.conn)?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM student WHERE department_id = ?1 AND active = 1",
            params![department_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

fn map_student(row: &Row) -> SqliteResult<Student> {
    Ok(Student {
        id: row.get(0)?,
        usn: row.get(1)?,
        name: row.get(2)?,
        batch_id: row.get(3)?,
        department_id: row.get(4)?,
        semester: row.get(5)?,
        section: row.get(6)?,
        active: row.get(7)?,
    })
}

// ==========================================
// FacultyRepository
// ==========================================
const FACULTY_COLUMNS: &str = "SELECT id, employee_id, name, department_id, active FROM faculty";

pub struct FacultyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FacultyRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn insert(&self, faculty: &Faculty) -> RepositoryResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"INSERT INTO faculty (id, employee_id, name, department_id, active)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                faculty.id,
                faculty.employee_id,
                faculty.name,
                faculty.department_id,
                faculty.active,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Faculty>> {
        let conn = lock(&self.conn)?;
        let sql = format!("{} WHERE id = ?1", FACULTY_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_faculty).optional()?)
    }

    pub fn list(&self, department_id: Option<&str>) -> RepositoryResult<Vec<Faculty>> {
        let conn = lock(&self.conn)?;
        let sql = format!(
            "{} WHERE (?1 IS NULL OR department_id = ?1) ORDER BY name",
            FACULTY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let faculty = stmt
            .query_map(params![department_id], map_faculty)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(faculty)
    }

    pub fn count_active_by_department(&self, department_id: &str) -> RepositoryResult<i64> {
        let conn = lock(&self.conn)?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM faculty WHERE department_id = ?1 AND active = 1",
            params![department_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

fn map_faculty(row: &Row) -> SqliteResult<Faculty> {
    Ok(Faculty {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        name: row.get(2)?,
        department_id: row.get(3)?,
        active: row.get(4)?,
    })
}
