// ==========================================
// College ERP - Exam components and marks
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A gradable unit of a subject (CIE1, Assignment, SEE...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamComponent {
    pub id: String,
    pub subject_id: String,
    pub name: String,
    pub max_marks: f64,
    pub weightage: f64, // percent, (0, 100]
    pub created_at: NaiveDateTime,
}

impl ExamComponent {
    pub fn new(subject_id: String, name: String, max_marks: f64, weightage: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id,
            name,
            max_marks,
            weightage,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn accepts(&self, marks: f64) -> bool {
        marks.is_finite() && marks >= 0.0 && marks <= self.max_marks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentComponentMark {
    pub student_id: String,
    pub component_id: String,
    pub marks_obtained: f64,
    pub entered_by: String,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_accepts_range() {
        let c = ExamComponent::new("S1".into(), "CIE1".into(), 25.0, 20.0);
        assert!(c.accepts(0.0));
        assert!(c.accepts(25.0));
        assert!(!c.accepts(25.5));
        assert!(!c.accepts(-1.0));
        assert!(!c.accepts(f64::NAN));
    }
}
