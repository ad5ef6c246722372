// ==========================================
// College ERP - Attendance entries
// ==========================================

use crate::domain::types::AttendanceStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One student's attendance for one subject on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub subject_id: String,
    pub student_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_by: String,
    pub updated_at: NaiveDateTime,
}
