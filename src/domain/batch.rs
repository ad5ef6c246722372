// ==========================================
// College ERP - Batch domain model
// ==========================================
// A batch is a cohort identified by its admission year ("2022").
// The batch owns its semester counter; nothing else writes it.
// ==========================================

use crate::domain::types::{MAX_SEMESTER, MIN_SEMESTER};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub department_id: String,
    pub academic_year: String, // "YYYY-YYYY"
    pub current_semester: i32, // 1..=8
    pub auto_rollover: bool,
    pub archived: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Batch {
    pub fn new(
        id: String,
        department_id: String,
        academic_year: String,
        current_semester: i32,
        auto_rollover: bool,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            department_id,
            academic_year,
            current_semester,
            auto_rollover,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_final_semester(&self) -> bool {
        self.current_semester >= MAX_SEMESTER
    }
}

/// Validates the "YYYY-YYYY" academic year format; the second year must
/// follow the first.
pub fn is_valid_academic_year(value: &str) -> bool {
    let Some((start, end)) = value.split_once('-') else {
        return false;
    };
    if start.len() != 4 || end.len() != 4 {
        return false;
    }
    match (start.parse::<i32>(), end.parse::<i32>()) {
        (Ok(s), Ok(e)) => e == s + 1,
        _ => false,
    }
}

/// Batch ids are four-digit admission years.
pub fn is_valid_batch_id(value: &str) -> bool {
    value.len() == 4 && value.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_semester(semester: i32) -> bool {
    (MIN_SEMESTER..=MAX_SEMESTER).contains(&semester)
}
