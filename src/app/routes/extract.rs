use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};

use crate::api::auth_api::Claims;
use crate::api::error::{ApiError, ApiResult};
use crate::app::state::SharedState;
use crate::domain::types::LoginType;

// ==========================================
// Request extractors
// ==========================================

/// JSON body whose rejection is reported through the envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Caller identity from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state.auth_api.verify_token(token)?;
        Ok(AuthUser(claims))
    }
}

impl AuthUser {
    /// Name written to audit rows.
    pub fn actor(&self) -> String {
        self.0.username.clone()
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        self.require_any(&[LoginType::Admin])
    }

    /// Admin or faculty.
    pub fn require_staff(&self) -> ApiResult<()> {
        self.require_any(&[LoginType::Admin, LoginType::Faculty])
    }

    fn require_any(&self, allowed: &[LoginType]) -> ApiResult<()> {
        if allowed.contains(&self.0.login_type) {
            return Ok(());
        }
        tracing::warn!(username = %self.0.username, login_type = %self.0.login_type, "insufficient role");
        Err(ApiError::Forbidden("Insufficient permissions".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(login_type: LoginType) -> AuthUser {
        AuthUser(Claims {
            user_id: "u1".into(),
            username: "someone".into(),
            login_type,
            department_id: None,
            exp: 0,
            iat: 0,
        })
    }

    #[test]
    fn test_role_checks() {
        assert!(user(LoginType::Admin).require_admin().is_ok());
        assert!(user(LoginType::Admin).require_staff().is_ok());
        assert!(user(LoginType::Faculty).require_staff().is_ok());
        assert!(matches!(
            user(LoginType::Faculty).require_admin(),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            user(LoginType::Student).require_staff(),
            Err(ApiError::Forbidden(_))
        ));
    }
}
