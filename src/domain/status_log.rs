// ==========================================
// College ERP - Subject status log
// ==========================================
// Append-only: one row per status change, never updated or removed.
// ==========================================

use crate::domain::types::SubjectStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLog {
    pub id: i64,
    pub subject_id: String,
    pub from_status: Option<SubjectStatus>,
    pub status: SubjectStatus,
    pub updated_by: String,
    pub created_at: NaiveDateTime,
    pub is_override: bool,
    pub note: Option<String>,
}

/// Row to append; the id and timestamp are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewStatusLog {
    pub subject_id: String,
    pub from_status: Option<SubjectStatus>,
    pub status: SubjectStatus,
    pub updated_by: String,
    pub is_override: bool,
    pub note: Option<String>,
}
