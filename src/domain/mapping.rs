// ==========================================
// College ERP - Faculty-subject mapping
// ==========================================
// Approval workflow: pending -> approved | rejected.
// Independent of the subject lifecycle except as an activation check.
// ==========================================

use crate::domain::types::MappingStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultySubjectMapping {
    pub id: String,
    pub faculty_id: String,
    pub subject_id: String,
    pub batch_id: String,
    pub section: String,
    pub academic_year: String,
    pub status: MappingStatus,
    pub active: bool,
    pub requested_by: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl FacultySubjectMapping {
    pub fn new_pending(
        faculty_id: String,
        subject_id: String,
        batch_id: String,
        section: String,
        academic_year: String,
        requested_by: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            faculty_id,
            subject_id,
            batch_id,
            section,
            academic_year,
            status: MappingStatus::Pending,
            active: true,
            requested_by,
            reviewed_by: None,
            reviewed_at: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Counts towards subject activation.
    pub fn is_effective(&self) -> bool {
        self.active && self.status == MappingStatus::Approved
    }
}
