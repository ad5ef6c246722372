use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::api::error::{ApiError, ApiResult};
use crate::app::state::SharedState;

// ==========================================
// Response envelope and error mapping
// ==========================================

/// `{success, message?, data?}` body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Handler return type.
pub type Reply<T> = Result<ApiResponse<T>, ApiError>;

pub(crate) fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::InvalidInput(_)
        | ApiError::InvalidState(_)
        | ApiError::TransitionRejected { .. }
        | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        ApiError::DatabaseError(_)
        | ApiError::DatabaseTransactionError(_)
        | ApiError::InternalError(_)
        | ApiError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self);

        if self.is_internal() {
            tracing::error!(code = self.code(), error = %self, "request failed");
            let body = ApiResponse::<()> {
                success: false,
                message: Some("Internal server error".to_string()),
                data: None,
                status,
            };
            return body.into_response();
        }

        let message = self.to_string();
        match self {
            ApiError::TransitionRejected { validation, .. } => ApiResponse {
                success: false,
                message: Some(message),
                data: Some(validation),
                status,
            }
            .into_response(),
            _ => ApiResponse::<()> {
                success: false,
                message: Some(message),
                data: None,
                status,
            }
            .into_response(),
        }
    }
}

/// Runs a synchronous API call on the blocking pool.
///
/// API methods hold the connection mutex and bcrypt is CPU bound, so
/// neither may run on a runtime worker.
pub async fn blocking<T, F>(state: &SharedState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&crate::app::state::AppState) -> ApiResult<T> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ApiError::InternalError(format!("blocking task failed: {}", e)))?
}
