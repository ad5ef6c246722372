// ==========================================
// College ERP - Configuration layer
// ==========================================
// Two tiers:
// - AppConfig: process settings from the environment
// - ConfigManager: business parameters in the config_kv table
// ==========================================

pub mod app_config;
pub mod config_manager;
pub mod policy_config_trait;

pub use app_config::{get_default_db_path, AdminBootstrap, AppConfig, ConfigError};
pub use config_manager::{config_keys, ConfigManager, DEFAULT_TOKEN_TTL_HOURS};
pub use policy_config_trait::PolicyConfigReader;
