// ==========================================
// College ERP - Authentication API
// ==========================================
// Login flow:
//   lookup -> lock check -> bcrypt verify
//   -> failure bookkeeping via LockoutPolicy on a freshly locked row
//      (expired lock resets the counter)
//   -> success resets the counter and issues an HS256 token
// Lockout thresholds come from config_kv through PolicyConfigReader.
// ==========================================

use chrono::{Duration, NaiveDateTime};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::PolicyConfigReader;
use crate::db::now_ts;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::LoginType;
use crate::domain::user::User;
use crate::engine::lockout::{FailureOutcome, LockoutPolicy};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::RepositoryError;
use crate::repository::people_repo::DepartmentRepository;
use crate::repository::user_repo::UserRepository;

pub const MIN_PASSWORD_LEN: usize = 8;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

fn locked_error(until: NaiveDateTime) -> ApiError {
    ApiError::Forbidden(format!(
        "Account is locked until {} UTC",
        until.format("%Y-%m-%d %H:%M")
    ))
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub login_type: LoginType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.login_type == LoginType::Admin
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
    pub login_type: LoginType,
    #[serde(default)]
    pub department_id: Option<String>,
}

pub struct AuthApi {
    user_repo: Arc<UserRepository>,
    department_repo: Arc<DepartmentRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config: Arc<dyn PolicyConfigReader>,
    jwt_secret: String,
    hash_cost: u32,
}

impl AuthApi {
    pub fn new(
        user_repo: Arc<UserRepository>,
        department_repo: Arc<DepartmentRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config: Arc<dyn PolicyConfigReader>,
        jwt_secret: String,
    ) -> Self {
        Self {
            user_repo,
            department_repo,
            action_log_repo,
            config,
            jwt_secret,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Overrides the bcrypt cost (tests use the minimum).
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    fn policy(&self) -> ApiResult<LockoutPolicy> {
        let max_attempts = self
            .config
            .get_lockout_max_attempts()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let minutes = self
            .config
            .get_lockout_duration_minutes()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        Ok(LockoutPolicy::new(max_attempts, minutes))
    }

    // ==========================================
    // Login
    // ==========================================

    pub fn login(&self, req: &LoginRequest) -> ApiResult<LoginResponse> {
        self.login_at(req, now_ts())
    }

    /// Login evaluated at a given instant.
    ///
    /// # Errors
    /// - `Unauthorized`: unknown user or wrong password
    /// - `Forbidden`: account locked (also returned by the failure that locks it)
    pub fn login_at(&self, req: &LoginRequest, now: NaiveDateTime) -> ApiResult<LoginResponse> {
        let username = req.username.trim();
        if username.is_empty() || req.password.is_empty() {
            return Err(ApiError::InvalidInput("Username and password are required".to_string()));
        }

        let user = self
            .user_repo
            .find_by_username(username)?
            .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let policy = self.policy()?;
        if let Some(until) = user.locked_until.filter(|_| policy.is_locked(&user, now)) {
            tracing::warn!(username, locked_until = %until, "login attempt on locked account");
            return Err(locked_error(until));
        }

        let password_ok = bcrypt::verify(&req.password, &user.password_hash)
            .map_err(|e| ApiError::InternalError(format!("password hash check failed: {}", e)))?;
        if !password_ok {
            return Err(self.register_failure(&user, &policy, now));
        }

        self.user_repo.record_success(&user.id, now)?;
        let ttl_hours = self
            .config
            .get_token_ttl_hours()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let expires_at = now + Duration::hours(ttl_hours.max(1));
        let claims = Claims {
            user_id: user.id.clone(),
            username: user.username.clone(),
            login_type: user.login_type,
            department_id: user.department_id.clone(),
            exp: expires_at.and_utc().timestamp(),
            iat: now.and_utc().timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::InternalError(format!("token encoding failed: {}", e)))?;

        tracing::info!(username, login_type = %user.login_type, "login succeeded");
        let user = self
            .user_repo
            .find_by_id(&user.id)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        Ok(LoginResponse {
            token,
            expires_at,
            user,
        })
    }

    /// Persists one failed attempt and builds the error to return.
    fn register_failure(&self, user: &User, policy: &LockoutPolicy, now: NaiveDateTime) -> ApiError {
        let outcome = match self.user_repo.record_failure(&user.id, policy, now) {
            Ok(outcome) => outcome,
            Err(e) => return e.into(),
        };
        match outcome {
            FailureOutcome::Counted { attempts, remaining } => {
                tracing::warn!(username = %user.username, attempts, remaining, "login failed");
                ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())
            }
            FailureOutcome::Locked { attempts, locked_until } => {
                let audit = ActionLog::new(ActionType::AccountLocked, "user", &user.id, "system")
                    .with_payload(&serde_json::json!({
                        "attempts": attempts,
                        "lockedUntil": locked_until,
                    }));
                if let Err(e) = self.action_log_repo.insert(&audit) {
                    return e.into();
                }
                tracing::warn!(username = %user.username, attempts, %locked_until, "account locked");
                ApiError::Forbidden(format!(
                    "Too many failed attempts; account locked for {} minutes",
                    policy.lock_duration.num_minutes()
                ))
            }
            FailureOutcome::AlreadyLocked { locked_until } => {
                tracing::warn!(username = %user.username, %locked_until, "failed login on account locked meanwhile");
                locked_error(locked_until)
            }
        }
    }

    /// Decodes and validates a bearer token.
    pub fn verify_token(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })
    }

    // ==========================================
    // Account administration
    // ==========================================

    pub fn register_user(&self, req: RegisterUserRequest, actor: &str) -> ApiResult<User> {
        let username = req.username.trim();
        if username.is_empty() {
            return Err(ApiError::InvalidInput("Username is required".to_string()));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let department_id = match req.department_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(id) => {
                if self.department_repo.find_by_id(id)?.is_none() {
                    return Err(ApiError::NotFound("Department not found".to_string()));
                }
                Some(id.to_string())
            }
        };

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: self.hash_password(&req.password)?,
            login_type: req.login_type,
            department_id,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
        };
        self.user_repo.insert(&user).map_err(|e| match e {
            RepositoryError::UniqueConstraintViolation(_) => {
                ApiError::Conflict("Username already exists".to_string())
            }
            other => other.into(),
        })?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::RegisterUser, "user", &user.id, actor)
                .with_payload(&user),
        )?;
        tracing::info!(username = %user.username, login_type = %user.login_type, actor, "user registered");
        Ok(user)
    }

    pub fn unlock_user(&self, id: &str, actor: &str) -> ApiResult<User> {
        self.user_repo.unlock(id).map_err(|e| match e {
            RepositoryError::NotFound { .. } => ApiError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;
        self.action_log_repo
            .insert(&ActionLog::new(ActionType::UnlockUser, "user", id, actor))?;
        tracing::info!(user_id = id, actor, "user unlocked");
        self.user_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// Creates the first admin account when none exists yet.
    ///
    /// Returns `true` when an account was created.
    pub fn ensure_admin(&self, username: &str, password: &str) -> ApiResult<bool> {
        if self.user_repo.count_admins()? > 0 {
            return Ok(false);
        }
        self.register_user(
            RegisterUserRequest {
                username: username.to_string(),
                password: password.to_string(),
                login_type: LoginType::Admin,
                department_id: None,
            },
            "system",
        )?;
        Ok(true)
    }

    fn hash_password(&self, password: &str) -> ApiResult<String> {
        bcrypt::hash(password, self.hash_cost)
            .map_err(|e| ApiError::InternalError(format!("password hashing failed: {}", e)))
    }
}
