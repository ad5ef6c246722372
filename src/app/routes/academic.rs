use axum::extract::{Path, State};
use serde::Serialize;

use crate::api::academic_api::{AttendanceRequest, CreateComponentRequest, MarkInput};
use crate::app::state::SharedState;
use crate::domain::exam::{ExamComponent, StudentComponentMark};

use super::common::{blocking, ApiResponse, Reply};
use super::extract::{AuthUser, JsonBody};

// ==========================================
// Exam components, marks, attendance
// ==========================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedCount {
    pub recorded: usize,
}

pub async fn list_components(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(subject_id): Path<String>,
) -> Reply<Vec<ExamComponent>> {
    let components = blocking(&state, move |s| s.academic_api.list_components(&subject_id)).await?;
    Ok(ApiResponse::ok(components))
}

pub async fn create_component(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(subject_id): Path<String>,
    JsonBody(req): JsonBody<CreateComponentRequest>,
) -> Reply<ExamComponent> {
    user.require_staff()?;
    let actor = user.actor();
    let component = blocking(&state, move |s| {
        s.academic_api.create_component(&subject_id, req, &actor)
    })
    .await?;
    Ok(ApiResponse::created(component))
}

pub async fn list_marks(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(component_id): Path<String>,
) -> Reply<Vec<StudentComponentMark>> {
    let marks = blocking(&state, move |s| s.academic_api.list_marks(&component_id)).await?;
    Ok(ApiResponse::ok(marks))
}

pub async fn record_marks(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(component_id): Path<String>,
    JsonBody(entries): JsonBody<Vec<MarkInput>>,
) -> Reply<RecordedCount> {
    user.require_staff()?;
    let actor = user.actor();
    let recorded = blocking(&state, move |s| {
        s.academic_api.record_marks(&component_id, &entries, &actor)
    })
    .await?;
    Ok(ApiResponse::ok(RecordedCount { recorded }).with_message("Marks recorded"))
}

pub async fn record_attendance(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(subject_id): Path<String>,
    JsonBody(req): JsonBody<AttendanceRequest>,
) -> Reply<RecordedCount> {
    user.require_staff()?;
    let actor = user.actor();
    let recorded = blocking(&state, move |s| {
        s.academic_api.record_attendance(&subject_id, &req, &actor)
    })
    .await?;
    Ok(ApiResponse::ok(RecordedCount { recorded }).with_message("Attendance recorded"))
}
