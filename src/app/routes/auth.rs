use axum::extract::{Path, State};

use crate::api::auth_api::{Claims, LoginRequest, LoginResponse, RegisterUserRequest};
use crate::app::state::SharedState;
use crate::domain::user::User;

use super::common::{blocking, ApiResponse, Reply};
use super::extract::{AuthUser, JsonBody};

// ==========================================
// Authentication routes
// ==========================================

pub async fn login(
    State(state): State<SharedState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Reply<LoginResponse> {
    let response = blocking(&state, move |s| s.auth_api.login(&req)).await?;
    Ok(ApiResponse::ok(response).with_message("Login successful"))
}

pub async fn current_user(user: AuthUser) -> Reply<Claims> {
    Ok(ApiResponse::ok(user.0))
}

pub async fn register_user(
    State(state): State<SharedState>,
    user: AuthUser,
    JsonBody(req): JsonBody<RegisterUserRequest>,
) -> Reply<User> {
    user.require_admin()?;
    let actor = user.actor();
    let created = blocking(&state, move |s| s.auth_api.register_user(req, &actor)).await?;
    Ok(ApiResponse::created(created))
}

pub async fn unlock_user(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Reply<User> {
    user.require_admin()?;
    let actor = user.actor();
    let unlocked = blocking(&state, move |s| s.auth_api.unlock_user(&id, &actor)).await?;
    Ok(ApiResponse::ok(unlocked).with_message("Account unlocked"))
}
