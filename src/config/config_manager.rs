// ==========================================
// College ERP - Configuration manager
// ==========================================
// Business parameters stored in config_kv (scope_id + key -> value).
// Missing or malformed values fall back to the built-in defaults.
// ==========================================

use crate::config::policy_config_trait::PolicyConfigReader;
use crate::db::{format_ts, now_ts, open_sqlite_connection};
use crate::engine::lockout::{DEFAULT_LOCK_MINUTES, DEFAULT_MAX_ATTEMPTS};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// Default access-token lifetime (hours).
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 12;

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Builds a manager over an existing connection.
    ///
    /// The shared PRAGMAs are re-applied (idempotent).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let guard = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Reads a global value (None when unset).
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// Inserts or overwrites a global value.
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?1, ?2, ?3)
               ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = ?3"#,
            params![key, value, format_ts(now_ts())],
        )?;
        tracing::info!(config_key = key, value = value, "config value updated");
        Ok(())
    }

    /// All global values, keyed by config key.
    pub fn get_config_snapshot(&self) -> Result<HashMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut snapshot = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    fn parse_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: std::str::FromStr + std::fmt::Display + Copy,
    {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        Ok(raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %raw, "malformed config value, using default");
            default
        }))
    }
}

// ==========================================
// PolicyConfigReader implementation
// ==========================================
impl PolicyConfigReader for ConfigManager {
    fn get_lockout_max_attempts(&self) -> Result<i32, Box<dyn Error>> {
        self.parse_or_default(config_keys::LOCKOUT_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)
    }

    fn get_lockout_duration_minutes(&self) -> Result<i64, Box<dyn Error>> {
        self.parse_or_default(config_keys::LOCKOUT_DURATION_MINUTES, DEFAULT_LOCK_MINUTES)
    }

    fn get_token_ttl_hours(&self) -> Result<i64, Box<dyn Error>> {
        self.parse_or_default(config_keys::AUTH_TOKEN_TTL_HOURS, DEFAULT_TOKEN_TTL_HOURS)
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    // Login lockout
    pub const LOCKOUT_MAX_ATTEMPTS: &str = "lockout.max_attempts";
    pub const LOCKOUT_DURATION_MINUTES: &str = "lockout.duration_minutes";

    // Tokens
    pub const AUTH_TOKEN_TTL_HOURS: &str = "auth.token_ttl_hours";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = crate::db::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = manager();
        assert_eq!(config.get_lockout_max_attempts().unwrap(), 5);
        assert_eq!(config.get_lockout_duration_minutes().unwrap(), 30);
        assert_eq!(config.get_token_ttl_hours().unwrap(), 12);
        assert!(config.get_config_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_overrides_and_malformed_values() {
        let config = manager();
        config.set_global_config_value(config_keys::LOCKOUT_MAX_ATTEMPTS, "3").unwrap();
        config
            .set_global_config_value(config_keys::LOCKOUT_DURATION_MINUTES, "soon")
            .unwrap();

        assert_eq!(config.get_lockout_max_attempts().unwrap(), 3);
        assert_eq!(config.get_lockout_duration_minutes().unwrap(), 30);
        assert_eq!(config.get_config_snapshot().unwrap().len(), 2);
    }
}
