// ==========================================
// College ERP - User accounts
// ==========================================

use crate::domain::types::LoginType;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub login_type: LoginType,
    pub department_id: Option<String>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<NaiveDateTime>,
    pub last_login_at: Option<NaiveDateTime>,
}

impl User {
    pub fn is_locked_at(&self, now: NaiveDateTime) -> bool {
        self.locked_until.map(|until| until > now).unwrap_or(false)
    }
}
