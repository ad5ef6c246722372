use axum::extract::{Path, Query, State};

use crate::api::report_api::{
    ActionLogQuery, DepartmentDashboard, SemesterSummary, StudentAttendanceReport,
    SubjectAttendanceSummary,
};
use crate::app::state::SharedState;
use crate::domain::action_log::ActionLog;

use super::common::{blocking, ApiResponse, Reply};
use super::extract::AuthUser;

// ==========================================
// Read-only reports
// ==========================================

pub async fn student_attendance(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(student_id): Path<String>,
) -> Reply<StudentAttendanceReport> {
    let report = blocking(&state, move |s| s.report_api.student_attendance(&student_id)).await?;
    Ok(ApiResponse::ok(report))
}

pub async fn student_semester_summary(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path((student_id, semester)): Path<(String, i32)>,
) -> Reply<SemesterSummary> {
    let summary = blocking(&state, move |s| {
        s.report_api.student_semester_summary(&student_id, semester)
    })
    .await?;
    Ok(ApiResponse::ok(summary))
}

pub async fn subject_attendance(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(subject_id): Path<String>,
) -> Reply<SubjectAttendanceSummary> {
    let summary = blocking(&state, move |s| s.report_api.subject_attendance_summary(&subject_id)).await?;
    Ok(ApiResponse::ok(summary))
}

pub async fn department_dashboard(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(department_id): Path<String>,
) -> Reply<DepartmentDashboard> {
    let dashboard = blocking(&state, move |s| s.report_api.department_dashboard(&department_id)).await?;
    Ok(ApiResponse::ok(dashboard))
}

pub async fn action_log(
    State(state): State<SharedState>,
    user: AuthUser,
    Query(query): Query<ActionLogQuery>,
) -> Reply<Vec<ActionLog>> {
    user.require_admin()?;
    let logs = blocking(&state, move |s| s.report_api.recent_actions(&query)).await?;
    Ok(ApiResponse::ok(logs))
}

pub async fn entity_history(
    State(state): State<SharedState>,
    user: AuthUser,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Reply<Vec<ActionLog>> {
    user.require_admin()?;
    let logs = blocking(&state, move |s| s.report_api.entity_history(&entity_type, &entity_id)).await?;
    Ok(ApiResponse::ok(logs))
}
