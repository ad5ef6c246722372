// ==========================================
// College ERP - Configuration API
// ==========================================
// Admin view over the config_kv business parameters. Only known keys
// can be written, and every write is audited.
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::{config_keys, ConfigManager, DEFAULT_TOKEN_TTL_HOURS};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::engine::lockout::{DEFAULT_LOCK_MINUTES, DEFAULT_MAX_ATTEMPTS};
use crate::repository::action_log_repo::ActionLogRepository;

/// One configurable parameter with its effective value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
    pub default_value: String,
    pub overridden: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigRequest {
    pub value: String,
    pub reason: String,
}

/// (key, default, max)
fn known_keys() -> [(&'static str, i64, i64); 3] {
    [
        (config_keys::LOCKOUT_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS as i64, 100),
        (config_keys::LOCKOUT_DURATION_MINUTES, DEFAULT_LOCK_MINUTES, 24 * 60),
        (config_keys::AUTH_TOKEN_TTL_HOURS, DEFAULT_TOKEN_TTL_HOURS, 24 * 30),
    ]
}

pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            config_manager,
            action_log_repo,
        }
    }

    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let snapshot = self
            .config_manager
            .get_config_snapshot()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        Ok(known_keys()
            .iter()
            .map(|(key, default, _)| {
                let stored = snapshot.get(*key);
                ConfigItem {
                    key: key.to_string(),
                    value: stored.cloned().unwrap_or_else(|| default.to_string()),
                    default_value: default.to_string(),
                    overridden: stored.is_some(),
                }
            })
            .collect())
    }

    /// Writes one parameter.
    ///
    /// # Errors
    /// - `NotFound`: unknown key
    /// - `InvalidInput`: empty reason, or value not an integer in range
    pub fn update_config(&self, key: &str, req: &UpdateConfigRequest, actor: &str) -> ApiResult<ConfigItem> {
        let (_, default, max) = known_keys()
            .into_iter()
            .find(|(k, _, _)| *k == key)
            .ok_or_else(|| ApiError::NotFound(format!("Unknown config key: {}", key)))?;

        if req.reason.trim().is_empty() {
            return Err(ApiError::InvalidInput("A reason is required".to_string()));
        }
        let value: i64 = req
            .value
            .trim()
            .parse()
            .map_err(|_| ApiError::InvalidInput(format!("{} must be an integer", key)))?;
        if !(1..=max).contains(&value) {
            return Err(ApiError::InvalidInput(format!("{} must be between 1 and {}", key, max)));
        }

        let previous = self
            .config_manager
            .get_global_config_value(key)
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        self.config_manager
            .set_global_config_value(key, &value.to_string())
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::UpdateConfig, "config", key, actor)
                .with_payload(&serde_json::json!({
                    "previous": previous,
                    "value": value,
                }))
                .with_detail(req.reason.trim()),
        )?;

        Ok(ConfigItem {
            key: key.to_string(),
            value: value.to_string(),
            default_value: default.to_string(),
            overridden: true,
        })
    }
}
