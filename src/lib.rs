// ==========================================
// College ERP - Core library
// ==========================================
// Academic lifecycle backend: batches and semester rollover,
// subject status state machine, faculty mappings, marks and
// attendance entry, login lockout, reporting.
// ==========================================

// Domain - entities and types
pub mod domain;

// Repositories - data access
pub mod repository;

// Engines - pure business rules
pub mod engine;

// Configuration
pub mod config;

// Database bootstrap (connection PRAGMAs, schema)
pub mod db;

pub mod logging;

// APIs - business operations
pub mod api;

// Application - state wiring and HTTP
pub mod app;

// ==========================================
// Re-exports
// ==========================================

pub use domain::types::{AttendanceStatus, LoginType, MappingStatus, SubjectStatus};
pub use domain::{ActionLog, ActionType};
pub use engine::{LockoutPolicy, RolloverEngine, SubjectLifecycle};
pub use api::{ApiError, ApiResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "College ERP";
