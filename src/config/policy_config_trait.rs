// ==========================================
// College ERP - Policy configuration reader trait
// ==========================================
// Read-only view of the business parameters the auth flow needs.
// Implemented by ConfigManager (config_kv table); tests substitute
// fixed values.
// ==========================================

use std::error::Error;

pub trait PolicyConfigReader: Send + Sync {
    /// Consecutive failed logins before the account is locked.
    ///
    /// # Default
    /// - 5
    fn get_lockout_max_attempts(&self) -> Result<i32, Box<dyn Error>>;

    /// Lock duration once the threshold is reached.
    ///
    /// # Default
    /// - 30
    fn get_lockout_duration_minutes(&self) -> Result<i64, Box<dyn Error>>;

    /// Lifetime of issued access tokens.
    ///
    /// # Default
    /// - 12
    fn get_token_ttl_hours(&self) -> Result<i64, Box<dyn Error>>;
}
