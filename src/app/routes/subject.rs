use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::api::subject_api::{parse_status, CreateSubjectRequest, UpdateSubjectRequest};
use crate::app::state::SharedState;
use crate::domain::subject::{Subject, SubjectCategory};
use crate::repository::subject_repo::SubjectFilter;

use super::common::{blocking, ApiResponse, Reply};
use super::extract::{AuthUser, JsonBody};

// ==========================================
// Subjects and categories
// ==========================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectQuery {
    pub department_id: Option<String>,
    pub semester: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

pub async fn list_categories(State(state): State<SharedState>, _user: AuthUser) -> Reply<Vec<SubjectCategory>> {
    let categories = blocking(&state, |s| s.subject_api.list_categories()).await?;
    Ok(ApiResponse::ok(categories))
}

pub async fn create_category(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateCategoryRequest>,
) -> Reply<SubjectCategory> {
    user.require_admin()?;
    let actor = user.actor();
    let category = blocking(&state, move |s| s.subject_api.create_category(&req.name, &actor)).await?;
    Ok(ApiResponse::created(category))
}

pub async fn list_subjects(
    State(state): State<SharedState>,
    _user: AuthUser,
    Query(query): Query<SubjectQuery>,
) -> Reply<Vec<Subject>> {
    let filter = SubjectFilter {
        department_id: query.department_id,
        semester: query.semester,
        status: query.status.as_deref().map(parse_status).transpose()?,
    };
    let subjects = blocking(&state, move |s| s.subject_api.list_subjects(&filter)).await?;
    Ok(ApiResponse::ok(subjects))
}

pub async fn get_subject(State(state): State<SharedState>, _user: AuthUser, Path(id): Path<String>) -> Reply<Subject> {
    let subject = blocking(&state, move |s| s.subject_api.get_subject(&id)).await?;
    Ok(ApiResponse::ok(subject))
}

pub async fn create_subject(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateSubjectRequest>,
) -> Reply<Subject> {
    user.require_admin()?;
    let actor = user.actor();
    let subject = blocking(&state, move |s| s.subject_api.create_subject(req, &actor)).await?;
    Ok(ApiResponse::created(subject))
}

pub async fn update_subject(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateSubjectRequest>,
) -> Reply<Subject> {
    user.require_admin()?;
    let actor = user.actor();
    let subject = blocking(&state, move |s| s.subject_api.update_subject(&id, req, &actor)).await?;
    Ok(ApiResponse::ok(subject))
}
