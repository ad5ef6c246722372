use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::people_api::{CreateDepartmentRequest, CreateFacultyRequest, CreateStudentRequest};
use crate::app::state::SharedState;
use crate::domain::people::{Department, Faculty, Student};

use super::common::{blocking, ApiResponse, Reply};
use super::extract::{AuthUser, JsonBody};

// ==========================================
// Departments, students, faculty
// ==========================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuery {
    pub batch_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyQuery {
    pub department_id: Option<String>,
}

pub async fn list_departments(State(state): State<SharedState>, _user: AuthUser) -> Reply<Vec<Department>> {
    let departments = blocking(&state, |s| s.people_api.list_departments()).await?;
    Ok(ApiResponse::ok(departments))
}

pub async fn create_department(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateDepartmentRequest>,
) -> Reply<Department> {
    user.require_admin()?;
    let actor = user.actor();
    let department = blocking(&state, move |s| s.people_api.create_department(req, &actor)).await?;
    Ok(ApiResponse::created(department))
}

pub async fn list_students(
    State(state): State<SharedState>,
    _user: AuthUser,
    Query(query): Query<StudentQuery>,
) -> Reply<Vec<Student>> {
    let batch_id = query
        .batch_id
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidInput("batchId query parameter is required".to_string()))?;
    let students = blocking(&state, move |s| s.people_api.list_students(&batch_id)).await?;
    Ok(ApiResponse::ok(students))
}

pub async fn create_student(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateStudentRequest>,
) -> Reply<Student> {
    user.require_admin()?;
    let actor = user.actor();
    let student = blocking(&state, move |s| s.people_api.create_student(req, &actor)).await?;
    Ok(ApiResponse::created(student))
}

pub async fn deactivate_student(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Reply<Student> {
    user.require_admin()?;
    let actor = user.actor();
    let student = blocking(&state, move |s| s.people_api.deactivate_student(&id, &actor)).await?;
    Ok(ApiResponse::ok(student).with_message("Student deactivated"))
}

pub async fn list_faculty(
    State(state): State<SharedState>,
    _user: AuthUser,
    Query(query): Query<FacultyQuery>,
) -> Reply<Vec<Faculty>> {
    let faculty = blocking(&state, move |s| {
        s.people_api.list_faculty(query.department_id.as_deref())
    })
    .await?;
    Ok(ApiResponse::ok(faculty))
}

pub async fn create_faculty(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateFacultyRequest>,
) -> Reply<Faculty> {
    user.require_admin()?;
    let actor = user.actor();
    let faculty = blocking(&state, move |s| s.people_api.create_faculty(req, &actor)).await?;
    Ok(ApiResponse::created(faculty))
}
