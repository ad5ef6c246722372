use axum::extract::{Path, State};

use crate::api::mapping_api::MappingRequest;
use crate::app::state::SharedState;
use crate::domain::mapping::FacultySubjectMapping;

use super::common::{blocking, ApiResponse, Reply};
use super::extract::{AuthUser, JsonBody};

// ==========================================
// Faculty-subject mapping workflow
// ==========================================

pub async fn list_for_subject(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(subject_id): Path<String>,
) -> Reply<Vec<FacultySubjectMapping>> {
    let mappings = blocking(&state, move |s| s.mapping_api.list_mappings(&subject_id)).await?;
    Ok(ApiResponse::ok(mappings))
}

pub async fn list_pending(State(state): State<SharedState>, user: AuthUser) -> Reply<Vec<FacultySubjectMapping>> {
    user.require_admin()?;
    let mappings = blocking(&state, |s| s.mapping_api.list_pending()).await?;
    Ok(ApiResponse::ok(mappings))
}

pub async fn request_mapping(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(subject_id): Path<String>,
    JsonBody(req): JsonBody<MappingRequest>,
) -> Reply<FacultySubjectMapping> {
    user.require_staff()?;
    let actor = user.actor();
    let mapping = blocking(&state, move |s| s.mapping_api.request_mapping(&subject_id, req, &actor)).await?;
    Ok(ApiResponse::created(mapping).with_message("Mapping requested"))
}

pub async fn approve_mapping(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Reply<FacultySubjectMapping> {
    user.require_admin()?;
    let actor = user.actor();
    let mapping = blocking(&state, move |s| s.mapping_api.approve_mapping(&id, &actor)).await?;
    Ok(ApiResponse::ok(mapping).with_message("Mapping approved"))
}

pub async fn reject_mapping(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Reply<FacultySubjectMapping> {
    user.require_admin()?;
    let actor = user.actor();
    let mapping = blocking(&state, move |s| s.mapping_api.reject_mapping(&id, &actor)).await?;
    Ok(ApiResponse::ok(mapping).with_message("Mapping rejected"))
}

pub async fn deactivate_mapping(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Reply<FacultySubjectMapping> {
    user.require_admin()?;
    let actor = user.actor();
    let mapping = blocking(&state, move |s| s.mapping_api.deactivate_mapping(&id, &actor)).await?;
    Ok(ApiResponse::ok(mapping).with_message("Mapping deactivated"))
}
