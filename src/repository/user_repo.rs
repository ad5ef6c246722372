// ==========================================
// College ERP - User account repository
// ==========================================
// A failed login re-reads the row and writes the new counter inside one
// IMMEDIATE transaction, so parallel failures are applied one after another.
// ==========================================

use crate::db::{format_ts, parse_ts};
use crate::domain::types::LoginType;
use crate::domain::user::User;
use crate::engine::lockout::{FailureOutcome, LockoutPolicy};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, TransactionBehavior};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT id, username, password_hash, login_type, department_id,
           failed_login_attempts, locked_until, last_login_at
    FROM app_user
"#;

pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, user: &User) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO app_user (
                id, username, password_hash, login_type, department_id,
                failed_login_attempts, locked_until, last_login_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                user.id,
                user.username,
                user.password_hash,
                user.login_type.to_db_str(),
                user.department_id,
                user.failed_login_attempts,
                user.locked_until.map(format_ts),
                user.last_login_at.map(format_ts),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE username = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![username], map_row).optional()?)
    }

    pub fn count_admins(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM app_user WHERE login_type = 'admin'",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Counts one failed password check against the current stored row and
    /// persists the counter and, when the threshold is reached, the lock.
    pub fn record_failure(
        &self,
        id: &str,
        policy: &LockoutPolicy,
        now: NaiveDateTime,
    ) -> RepositoryResult<FailureOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let user = tx
            .query_row(&sql, params![id], map_row)
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("User", id))?;

        let outcome = policy.next_failure(&user, now);
        let (attempts, locked_until) = match outcome {
            FailureOutcome::Counted { attempts, .. } => (attempts, None),
            FailureOutcome::Locked { attempts, locked_until } => (attempts, Some(locked_until)),
            FailureOutcome::AlreadyLocked { .. } => return Ok(outcome),
        };
        tx.execute(
            "UPDATE app_user SET failed_login_attempts = ?1, locked_until = ?2 WHERE id = ?3",
            params![attempts, locked_until.map(format_ts), id],
        )?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Clears the counter and lock and stamps the login time.
    pub fn record_success(&self, id: &str, at: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE app_user
               SET failed_login_attempts = 0, locked_until = NULL, last_login_at = ?1
               WHERE id = ?2"#,
            params![format_ts(at), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("User", id));
        }
        Ok(())
    }

    pub fn unlock(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE app_user SET failed_login_attempts = 0, locked_until = NULL WHERE id = ?1",
            params![id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("User", id));
        }
        Ok(())
    }
}

fn map_row(row: &Row) -> SqliteResult<User> {
    let raw_type: String = row.get(3)?;
    let login_type = LoginType::from_db_str(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown login type: {}", raw_type).into(),
        )
    })?;
    let locked_until: Option<String> = row.get(6)?;
    let last_login_at: Option<String> = row.get(7)?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        login_type,
        department_id: row.get(4)?,
        failed_login_attempts: row.get(5)?,
        locked_until: locked_until.as_deref().and_then(parse_ts),
        last_login_at: last_login_at.as_deref().and_then(parse_ts),
    })
}
