use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::api::batch_api::{AutoRolloverOutcome, CreateBatchRequest, UpdateBatchRequest};
use crate::app::state::SharedState;
use crate::domain::batch::Batch;

use super::common::{blocking, ApiResponse, Reply};
use super::extract::{AuthUser, JsonBody};

// ==========================================
// Batch routes
// ==========================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchQuery {
    pub department_id: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
}

pub async fn list_batches(
    State(state): State<SharedState>,
    _user: AuthUser,
    Query(query): Query<BatchQuery>,
) -> Reply<Vec<Batch>> {
    let batches = blocking(&state, move |s| {
        s.batch_api
            .list_batches(query.department_id.as_deref(), query.include_archived)
    })
    .await?;
    Ok(ApiResponse::ok(batches))
}

pub async fn get_batch(State(state): State<SharedState>, _user: AuthUser, Path(id): Path<String>) -> Reply<Batch> {
    let batch = blocking(&state, move |s| s.batch_api.get_batch(&id)).await?;
    Ok(ApiResponse::ok(batch))
}

pub async fn create_batch(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateBatchRequest>,
) -> Reply<Batch> {
    user.require_admin()?;
    let actor = user.actor();
    let batch = blocking(&state, move |s| s.batch_api.create_batch(req, &actor)).await?;
    Ok(ApiResponse::created(batch))
}

pub async fn update_batch(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateBatchRequest>,
) -> Reply<Batch> {
    user.require_admin()?;
    let actor = user.actor();
    let batch = blocking(&state, move |s| s.batch_api.update_batch(&id, req, &actor)).await?;
    Ok(ApiResponse::ok(batch))
}

pub async fn delete_batch(State(state): State<SharedState>, user: AuthUser, Path(id): Path<String>) -> Reply<()> {
    user.require_admin()?;
    let actor = user.actor();
    blocking(&state, move |s| s.batch_api.delete_batch(&id, &actor)).await?;
    Ok(ApiResponse::message("Batch deleted"))
}

pub async fn rollover(State(state): State<SharedState>, user: AuthUser, Path(id): Path<String>) -> Reply<Batch> {
    user.require_admin()?;
    let actor = user.actor();
    let batch = blocking(&state, move |s| s.batch_api.rollover(&id, &actor)).await?;
    let message = format!("Batch rolled over to semester {}", batch.current_semester);
    Ok(ApiResponse::ok(batch).with_message(message))
}

pub async fn archive_batch(State(state): State<SharedState>, user: AuthUser, Path(id): Path<String>) -> Reply<Batch> {
    user.require_admin()?;
    let actor = user.actor();
    let batch = blocking(&state, move |s| s.batch_api.archive_batch(&id, &actor)).await?;
    Ok(ApiResponse::ok(batch).with_message("Batch archived"))
}

pub async fn auto_rollover(State(state): State<SharedState>, user: AuthUser) -> Reply<Vec<AutoRolloverOutcome>> {
    user.require_admin()?;
    let actor = user.actor();
    let outcomes = blocking(&state, move |s| s.batch_api.auto_rollover(&actor)).await?;
    Ok(ApiResponse::ok(outcomes))
}
