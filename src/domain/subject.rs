// ==========================================
// College ERP - Subject domain model
// ==========================================

use crate::domain::types::SubjectStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub code: String,
    pub name: String,
    pub semester: i32,
    pub department_id: String,
    pub category_id: Option<String>,
    pub credits: i32,
    pub status: SubjectStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Subject {
    /// New subjects always start as drafts.
    pub fn new_draft(
        code: String,
        name: String,
        semester: i32,
        department_id: String,
        category_id: Option<String>,
        credits: i32,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            name,
            semester,
            department_id,
            category_id,
            credits,
            status: SubjectStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_category(&self) -> bool {
        self.category_id
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectCategory {
    pub id: String,
    pub name: String,
}
