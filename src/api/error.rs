// ==========================================
// College ERP - API layer error type
// ==========================================
// Converts repository failures into caller-facing errors. Every variant
// carries a human-readable reason; internal variants are logged in full
// and reported to clients generically by the HTTP layer.
// ==========================================

use crate::engine::lifecycle::TransitionValidation;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Business rule errors
    // ==========================================
    #[error("{0}")]
    InvalidInput(String),

    /// Operation not allowed in the entity's current state.
    #[error("{0}")]
    InvalidState(String),

    /// A lifecycle guard refused the transition; carries the full check set.
    #[error("{message}")]
    TransitionRejected {
        message: String,
        validation: TransitionValidation,
    },

    /// Duplicate unique key.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    // ==========================================
    // Auth errors
    // ==========================================
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    // ==========================================
    // Data access errors
    // ==========================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Database transaction failed: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // General
    // ==========================================
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// Stable machine-readable code for logs and clients.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::TransitionRejected { .. } => "TRANSITION_REJECTED",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }

    /// Whether the failure is the server's fault (details stay server-side).
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ApiError::DatabaseError(_)
                | ApiError::DatabaseTransactionError(_)
                | ApiError::InternalError(_)
                | ApiError::Other(_)
        )
    }
}

// ==========================================
// From RepositoryError
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::CompareAndSetFailed { entity, id } => {
                ApiError::Conflict(format!("{} {} was modified concurrently", entity, id))
            }
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} not found: {}", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("Duplicate record: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(_) => {
                ApiError::InvalidInput("Referenced record does not exist".to_string())
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("Value out of range: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("Invalid {}: {}", field, message))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("connection lock failed: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
