use axum::extract::{Path, State};
use serde::Deserialize;

use crate::api::lifecycle_api::StatusChange;
use crate::app::state::SharedState;
use crate::domain::status_log::StatusLog;
use crate::domain::types::SubjectStatus;
use crate::engine::lifecycle::TransitionValidation;

use super::common::{blocking, ApiResponse, Reply};
use super::extract::{AuthUser, JsonBody};

// ==========================================
// Subject lifecycle
// ==========================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTransitionRequest {
    pub target_status: SubjectStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub status: SubjectStatus,
    pub reason: String,
}

async fn transition(state: SharedState, user: AuthUser, id: String, target: SubjectStatus) -> Reply<StatusChange> {
    user.require_admin()?;
    let actor = user.actor();
    let change = blocking(&state, move |s| s.lifecycle_api.transition(&id, target, &actor)).await?;
    let message = format!("Subject is now {}", change.subject.status);
    Ok(ApiResponse::ok(change).with_message(message))
}

pub async fn activate(State(state): State<SharedState>, user: AuthUser, Path(id): Path<String>) -> Reply<StatusChange> {
    transition(state, user, id, SubjectStatus::Active).await
}

pub async fn lock(State(state): State<SharedState>, user: AuthUser, Path(id): Path<String>) -> Reply<StatusChange> {
    transition(state, user, id, SubjectStatus::Locked).await
}

pub async fn archive(State(state): State<SharedState>, user: AuthUser, Path(id): Path<String>) -> Reply<StatusChange> {
    transition(state, user, id, SubjectStatus::Archived).await
}

pub async fn override_status(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<OverrideRequest>,
) -> Reply<StatusChange> {
    user.require_admin()?;
    let actor = user.actor();
    let change = blocking(&state, move |s| {
        s.lifecycle_api.override_status(&id, req.status, &actor, &req.reason)
    })
    .await?;
    Ok(ApiResponse::ok(change).with_message("Status overridden"))
}

pub async fn validate_transition(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ValidateTransitionRequest>,
) -> Reply<TransitionValidation> {
    let validation = blocking(&state, move |s| {
        s.lifecycle_api.validate_transition(&id, req.target_status)
    })
    .await?;
    Ok(ApiResponse::ok(validation))
}

pub async fn status_history(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Reply<Vec<StatusLog>> {
    let history = blocking(&state, move |s| s.lifecycle_api.status_history(&id)).await?;
    Ok(ApiResponse::ok(history))
}
