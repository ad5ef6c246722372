// ==========================================
// College ERP - Batch semester rollover rule
// ==========================================
// Input: a batch snapshot
// Output: the semester step to apply, or the reason it is refused
// Rule: not archived AND current_semester < MAX_SEMESTER
// Student.semester is NOT advanced here.
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::types::MAX_SEMESTER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semester step accepted by the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverStep {
    pub previous_semester: i32,
    pub new_semester: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverRejection {
    Archived,
    FinalSemester { current_semester: i32 },
}

impl fmt::Display for RolloverRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolloverRejection::Archived => {
                write!(f, "Cannot rollover semester for an archived batch")
            }
            RolloverRejection::FinalSemester { current_semester } => write!(
                f,
                "Batch is already in final semester ({}/{})",
                current_semester, MAX_SEMESTER
            ),
        }
    }
}

// ==========================================
// RolloverEngine
// ==========================================
/// Stateless; persistence is the caller's job.
pub struct RolloverEngine {}

impl RolloverEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// Decides whether `batch` may advance one semester.
    ///
    /// The archived check wins over the ceiling check, so an archived batch
    /// in semester 8 reports "archived".
    pub fn check(&self, batch: &Batch) -> Result<RolloverStep, RolloverRejection> {
        if batch.archived {
            return Err(RolloverRejection::Archived);
        }
        if batch.current_semester >= MAX_SEMESTER {
            return Err(RolloverRejection::FinalSemester {
                current_semester: batch.current_semester,
            });
        }
        Ok(RolloverStep {
            previous_semester: batch.current_semester,
            new_semester: batch.current_semester + 1,
        })
    }
}

impl Default for RolloverEngine {
    fn default() -> Self {
        Self::new()
    }
}
