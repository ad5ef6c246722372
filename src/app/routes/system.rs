use axum::extract::{Path, State};
use serde::Serialize;

use crate::api::config_api::{ConfigItem, UpdateConfigRequest};
use crate::app::state::SharedState;

use super::common::{blocking, ApiResponse, Reply};
use super::extract::{AuthUser, JsonBody};

// ==========================================
// Health and runtime configuration
// ==========================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

pub async fn health() -> Reply<HealthStatus> {
    Ok(ApiResponse::ok(HealthStatus {
        status: "healthy",
        version: crate::VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn list_configs(State(state): State<SharedState>, user: AuthUser) -> Reply<Vec<ConfigItem>> {
    user.require_admin()?;
    let items = blocking(&state, |s| s.config_api.list_configs()).await?;
    Ok(ApiResponse::ok(items))
}

pub async fn update_config(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(key): Path<String>,
    JsonBody(req): JsonBody<UpdateConfigRequest>,
) -> Reply<ConfigItem> {
    user.require_admin()?;
    let actor = user.actor();
    let item = blocking(&state, move |s| s.config_api.update_config(&key, &req, &actor)).await?;
    Ok(ApiResponse::ok(item).with_message("Configuration updated"))
}
