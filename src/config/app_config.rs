// ==========================================
// College ERP - Process configuration
// ==========================================
// Read once at startup from the environment:
//   ERP_PORT         listen port (default 5000)
//   ERP_DB_PATH      SQLite file (default: per-user data dir)
//   ERP_JWT_SECRET   token signing secret (required in release builds)
//   ERP_CORS_ORIGIN  allowed browser origin (optional, any when unset)
//   ERP_BCRYPT_COST  password hashing cost (default bcrypt::DEFAULT_COST)
//   ERP_ADMIN_USERNAME / ERP_ADMIN_PASSWORD
//                    first admin account, created only while none exists
// ==========================================

use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 5000;

const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

#[cfg(debug_assertions)]
const DEV_JWT_SECRET: &str = "college-erp-dev-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("{0} must be set")]
    Missing(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub cors_origin: Option<String>,
    pub password_hash_cost: u32,
    pub bootstrap_admin: Option<AdminBootstrap>,
}

/// Credentials for the first admin account.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let port = match var("ERP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "ERP_PORT".to_string(),
                message: e.to_string(),
            })?,
            None => {
                info!("ERP_PORT not set, using default: {}", DEFAULT_PORT);
                DEFAULT_PORT
            }
        };

        Ok(Self {
            port,
            db_path: var("ERP_DB_PATH").unwrap_or_else(get_default_db_path),
            jwt_secret: load_jwt_secret()?,
            cors_origin: var("ERP_CORS_ORIGIN"),
            password_hash_cost: load_hash_cost()?,
            bootstrap_admin: match (var("ERP_ADMIN_USERNAME"), var("ERP_ADMIN_PASSWORD")) {
                (Some(username), Some(password)) => Some(AdminBootstrap { username, password }),
                (Some(_), None) => return Err(ConfigError::Missing("ERP_ADMIN_PASSWORD".to_string())),
                _ => None,
            },
        })
    }

    /// Configuration for tests and tooling: given database, fixed secret.
    pub fn for_database(db_path: &str, jwt_secret: &str) -> Self {
        Self {
            port: 0,
            db_path: db_path.to_string(),
            jwt_secret: jwt_secret.to_string(),
            cors_origin: None,
            password_hash_cost: bcrypt::DEFAULT_COST,
            bootstrap_admin: None,
        }
    }
}

/// Non-empty, trimmed environment variable.
fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn load_jwt_secret() -> Result<String, ConfigError> {
    match var("ERP_JWT_SECRET") {
        Some(secret) => Ok(secret),
        None => {
            #[cfg(debug_assertions)]
            {
                warn!("ERP_JWT_SECRET not set, using the development secret");
                Ok(DEV_JWT_SECRET.to_string())
            }
            #[cfg(not(debug_assertions))]
            {
                Err(ConfigError::Missing("ERP_JWT_SECRET".to_string()))
            }
        }
    }
}

fn load_hash_cost() -> Result<u32, ConfigError> {
    let Some(raw) = var("ERP_BCRYPT_COST") else {
        return Ok(bcrypt::DEFAULT_COST);
    };
    let cost = raw.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
        key: "ERP_BCRYPT_COST".to_string(),
        message: e.to_string(),
    })?;
    if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) {
        return Err(ConfigError::InvalidValue {
            key: "ERP_BCRYPT_COST".to_string(),
            message: format!("must be between {} and {}", MIN_HASH_COST, MAX_HASH_COST),
        });
    }
    Ok(cost)
}

/// Default database location under the user data directory.
///
/// Debug builds use a separate directory so development data never mixes
/// with a real installation.
pub fn get_default_db_path() -> String {
    let mut path = PathBuf::from("./college_erp.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        let dir = data_dir.join("college-erp-dev");
        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("college-erp");

        match std::fs::create_dir_all(&dir) {
            Ok(()) => path = dir.join("college_erp.db"),
            Err(e) => warn!(error = %e, "cannot create data directory, using working directory"),
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_db_path_is_a_db_file() {
        let path = get_default_db_path();
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_for_database() {
        let config = AppConfig::for_database(":memory:", "secret");
        assert_eq!(config.db_path, ":memory:");
        assert!(config.cors_origin.is_none());
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_bootstrap_debug_hides_password() {
        let admin = AdminBootstrap {
            username: "root".to_string(),
            password: "hunter22".to_string(),
        };
        let printed = format!("{:?}", admin);
        assert!(printed.contains("root"));
        assert!(!printed.contains("hunter22"));
    }
}
