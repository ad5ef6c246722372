// ==========================================
// College ERP - Departments, students and faculty API
// ==========================================

use serde::Deserialize;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::batch::is_valid_semester;
use crate::domain::people::{Department, Faculty, Student};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::error::RepositoryError;
use crate::repository::people_repo::{DepartmentRepository, FacultyRepository, StudentRepository};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub usn: String,
    pub name: String,
    pub batch_id: String,
    #[serde(default)]
    pub semester: Option<i32>,
    #[serde(default)]
    pub section: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFacultyRequest {
    pub employee_id: String,
    pub name: String,
    pub department_id: String,
}

pub struct PeopleApi {
    department_repo: Arc<DepartmentRepository>,
    student_repo: Arc<StudentRepository>,
    faculty_repo: Arc<FacultyRepository>,
    batch_repo: Arc<BatchRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl PeopleApi {
    pub fn new(
        department_repo: Arc<DepartmentRepository>,
        student_repo: Arc<StudentRepository>,
        faculty_repo: Arc<FacultyRepository>,
        batch_repo: Arc<BatchRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            department_repo,
            student_repo,
            faculty_repo,
            batch_repo,
            action_log_repo,
        }
    }

    // ===== Departments =====

    pub fn list_departments(&self) -> ApiResult<Vec<Department>> {
        Ok(self.department_repo.list()?)
    }

    pub fn create_department(&self, req: CreateDepartmentRequest, actor: &str) -> ApiResult<Department> {
        let code = req.code.trim().to_ascii_uppercase();
        let name = req.name.trim();
        if code.is_empty() || name.is_empty() {
            return Err(ApiError::InvalidInput("Department code and name are required".to_string()));
        }

        let department = Department {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            name: name.to_string(),
        };
        self.department_repo
            .insert(&department)
            .map_err(|e| conflict_on_duplicate(e, "Department code already exists"))?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateDepartment, "department", &department.id, actor)
                .with_detail(department.code.clone()),
        )?;
        tracing::info!(department = %department.code, actor, "department created");
        Ok(department)
    }

    // ===== Students =====

    pub fn list_students(&self, batch_id: &str) -> ApiResult<Vec<Student>> {
        Ok(self.student_repo.find_by_batch(batch_id)?)
    }

    /// Enrols a student in a non-archived batch. The semester defaults to
    /// the batch's current semester.
    pub fn create_student(&self, req: CreateStudentRequest, actor: &str) -> ApiResult<Student> {
        let usn = req.usn.trim().to_ascii_uppercase();
        let name = req.name.trim();
        if usn.is_empty() || name.is_empty() {
            return Err(ApiError::InvalidInput("USN and name are required".to_string()));
        }

        let batch = self
            .batch_repo
            .find_by_id(&req.batch_id)?
            .ok_or_else(|| ApiError::NotFound("Batch not found".to_string()))?;
        if batch.archived {
            return Err(ApiError::InvalidState(
                "Cannot enrol students in an archived batch".to_string(),
            ));
        }

        let semester = req.semester.unwrap_or(batch.current_semester);
        if !is_valid_semester(semester) {
            return Err(ApiError::InvalidInput("Semester must be between 1 and 8".to_string()));
        }
        let section = req
            .section
            .as_deref()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "A".to_string());

        let student = Student {
            id: uuid::Uuid::new_v4().to_string(),
            usn,
            name: name.to_string(),
            batch_id: batch.id,
            department_id: batch.department_id,
            semester,
            section,
            active: true,
        };
        self.student_repo
            .insert(&student)
            .map_err(|e| conflict_on_duplicate(e, "A student with this USN already exists"))?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateStudent, "student", &student.id, actor).with_payload(&student),
        )?;
        tracing::info!(usn = %student.usn, batch_id = %student.batch_id, actor, "student created");
        Ok(student)
    }

    pub fn deactivate_student(&self, id: &str, actor: &str) -> ApiResult<Student> {
        self.student_repo.deactivate(id).map_err(|e| match e {
            RepositoryError::NotFound { .. } => ApiError::NotFound("Student not found".to_string()),
            other => other.into(),
        })?;
        self.action_log_repo
            .insert(&ActionLog::new(ActionType::DeactivateStudent, "student", id, actor))?;
        self.student_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))
    }

    // ===== Faculty =====

    pub fn list_faculty(&self, department_id: Option<&str>) -> ApiResult<Vec<Faculty>> {
        Ok(self.faculty_repo.list(department_id)?)
    }

    pub fn create_faculty(&self, req: CreateFacultyRequest, actor: &str) -> ApiResult<Faculty> {
        let employee_id = req.employee_id.trim().to_ascii_uppercase();
        let name = req.name.trim();
        if employee_id.is_empty() || name.is_empty() {
            return Err(ApiError::InvalidInput("Employee id and name are required".to_string()));
        }
        if self.department_repo.find_by_id(&req.department_id)?.is_none() {
            return Err(ApiError::NotFound("Department not found".to_string()));
        }

        let faculty = Faculty {
            id: uuid::Uuid::new_v4().to_string(),
            employee_id,
            name: name.to_string(),
            department_id: req.department_id,
            active: true,
        };
        self.faculty_repo
            .insert(&faculty)
            .map_err(|e| conflict_on_duplicate(e, "A faculty member with this employee id already exists"))?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateFaculty, "faculty", &faculty.id, actor).with_payload(&faculty),
        )?;
        tracing::info!(employee_id = %faculty.employee_id, actor, "faculty created");
        Ok(faculty)
    }
}

fn conflict_on_duplicate(err: RepositoryError, message: &str) -> ApiError {
    match err {
        RepositoryError::UniqueConstraintViolation(_) => ApiError::Conflict(message.to_string()),
        other => other.into(),
    }
}
