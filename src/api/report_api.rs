// ==========================================
// College ERP - Reporting API
// ==========================================
// Read-only views over attendance and marks. All math lives in
// engine::aggregation; this layer only gathers rows.
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::people::Student;
use crate::domain::types::{SubjectStatus, MAX_SEMESTER, MIN_SEMESTER};
use crate::engine::aggregation::{
    attendance_percentage, grade_point, round2, sgpa, weighted_percentage, ComponentScore,
    CreditedGrade,
};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::attendance_repo::AttendanceRepository;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::exam_repo::ExamRepository;
use crate::repository::mapping_repo::MappingRepository;
use crate::repository::people_repo::{DepartmentRepository, FacultyRepository, StudentRepository};
use crate::repository::subject_repo::{SubjectFilter, SubjectRepository};

pub const DEFAULT_ACTION_LOG_LIMIT: i32 = 50;
/// Upper bound for action log listings.
pub const MAX_ACTION_LOG_LIMIT: i32 = 500;

// ==========================================
// Report DTOs
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAttendance {
    pub subject_id: String,
    pub subject_code: String,
    pub present: i64,
    pub total: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceReport {
    pub student_id: String,
    pub usn: String,
    pub subjects: Vec<SubjectAttendance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceRow {
    pub student_id: String,
    pub usn: String,
    pub name: String,
    pub present: i64,
    pub total: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAttendanceSummary {
    pub subject_id: String,
    pub subject_code: String,
    pub students: Vec<StudentAttendanceRow>,
    /// Mean of the per-student percentages; 0 with no students.
    pub class_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject_id: String,
    pub subject_code: String,
    pub subject_name: String,
    pub credits: i32,
    pub components_recorded: usize,
    pub weighted_percentage: f64,
    pub grade_point: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSummary {
    pub student_id: String,
    pub usn: String,
    pub semester: i32,
    pub subjects: Vec<SubjectResult>,
    pub total_credits: i32,
    pub sgpa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDashboard {
    pub department_id: String,
    pub active_students: i64,
    pub active_faculty: i64,
    pub active_batches: i64,
    pub subjects_by_status: HashMap<SubjectStatus, i64>,
    pub pending_mappings: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogQuery {
    pub actor: Option<String>,
    pub action_type: Option<String>,
    pub limit: Option<i32>,
}

// ==========================================
// ReportApi
// ==========================================

pub struct ReportApi {
    department_repo: Arc<DepartmentRepository>,
    student_repo: Arc<StudentRepository>,
    faculty_repo: Arc<FacultyRepository>,
    batch_repo: Arc<BatchRepository>,
    subject_repo: Arc<SubjectRepository>,
    mapping_repo: Arc<MappingRepository>,
    exam_repo: Arc<ExamRepository>,
    attendance_repo: Arc<AttendanceRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ReportApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        department_repo: Arc<DepartmentRepository>,
        student_repo: Arc<StudentRepository>,
        faculty_repo: Arc<FacultyRepository>,
        batch_repo: Arc<BatchRepository>,
        subject_repo: Arc<SubjectRepository>,
        mapping_repo: Arc<MappingRepository>,
        exam_repo: Arc<ExamRepository>,
        attendance_repo: Arc<AttendanceRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            department_repo,
            student_repo,
            faculty_repo,
            batch_repo,
            subject_repo,
            mapping_repo,
            exam_repo,
            attendance_repo,
            action_log_repo,
        }
    }

    fn require_student(&self, student_id: &str) -> ApiResult<Student> {
        self.student_repo
            .find_by_id(student_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Student not found: {}", student_id)))
    }

    /// Attendance per subject for one student.
    pub fn student_attendance(&self, student_id: &str) -> ApiResult<StudentAttendanceReport> {
        let student = self.require_student(student_id)?;
        let subjects = self
            .attendance_repo
            .tally_for_student(student_id)?
            .into_iter()
            .map(|t| SubjectAttendance {
                percentage: attendance_percentage(t.present, t.total),
                subject_id: t.subject_id,
                subject_code: t.subject_code,
                present: t.present,
                total: t.total,
            })
            .collect();

        Ok(StudentAttendanceReport {
            student_id: student.id,
            usn: student.usn,
            subjects,
        })
    }

    /// Attendance per student for one subject, with the class average.
    pub fn subject_attendance_summary(&self, subject_id: &str) -> ApiResult<SubjectAttendanceSummary> {
        let subject = self
            .subject_repo
            .find_by_id(subject_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Subject not found: {}", subject_id)))?;

        let students: Vec<StudentAttendanceRow> = self
            .attendance_repo
            .tally_for_subject(subject_id)?
            .into_iter()
            .map(|t| StudentAttendanceRow {
                percentage: attendance_percentage(t.present, t.total),
                student_id: t.student_id,
                usn: t.usn,
                name: t.student_name,
                present: t.present,
                total: t.total,
            })
            .collect();

        let class_average = if students.is_empty() {
            0.0
        } else {
            round2(students.iter().map(|s| s.percentage).sum::<f64>() / students.len() as f64)
        };

        Ok(SubjectAttendanceSummary {
            subject_id: subject.id,
            subject_code: subject.code,
            students,
            class_average,
        })
    }

    /// Weighted percentage and grade point per subject of the student's
    /// department in `semester`, plus SGPA.
    ///
    /// Subjects without any recorded component still count their credits
    /// with grade point 0.
    pub fn student_semester_summary(&self, student_id: &str, semester: i32) -> ApiResult<SemesterSummary> {
        if !(MIN_SEMESTER..=MAX_SEMESTER).contains(&semester) {
            return Err(ApiError::InvalidInput(format!(
                "Semester must be between {} and {}",
                MIN_SEMESTER, MAX_SEMESTER
            )));
        }
        let student = self.require_student(student_id)?;

        let subjects = self.subject_repo.list(&SubjectFilter {
            department_id: Some(student.department_id.clone()),
            semester: Some(semester),
            status: None,
        })?;

        let mut scores: HashMap<String, Vec<ComponentScore>> = HashMap::new();
        for row in self.exam_repo.student_marks_for_semester(student_id, semester)? {
            scores.entry(row.subject_id).or_default().push(ComponentScore {
                marks_obtained: row.marks_obtained,
                max_marks: row.max_marks,
                weightage: row.weightage,
            });
        }

        let results: Vec<SubjectResult> = subjects
            .into_iter()
            .filter(|s| s.status != SubjectStatus::Draft)
            .map(|s| {
                let subject_scores = scores.remove(&s.id).unwrap_or_default();
                let pct = weighted_percentage(&subject_scores);
                SubjectResult {
                    components_recorded: subject_scores.len(),
                    weighted_percentage: pct,
                    grade_point: grade_point(pct),
                    subject_id: s.id,
                    subject_code: s.code,
                    subject_name: s.name,
                    credits: s.credits,
                }
            })
            .collect();

        let grades: Vec<CreditedGrade> = results
            .iter()
            .map(|r| CreditedGrade {
                grade_point: r.grade_point,
                credits: r.credits,
            })
            .collect();

        Ok(SemesterSummary {
            student_id: student.id,
            usn: student.usn,
            semester,
            total_credits: results.iter().map(|r| r.credits.max(0)).sum(),
            sgpa: sgpa(&grades),
            subjects: results,
        })
    }

    pub fn department_dashboard(&self, department_id: &str) -> ApiResult<DepartmentDashboard> {
        if self.department_repo.find_by_id(department_id)?.is_none() {
            return Err(ApiError::NotFound(format!("Department not found: {}", department_id)));
        }

        Ok(DepartmentDashboard {
            department_id: department_id.to_string(),
            active_students: self.student_repo.count_active_by_department(department_id)?,
            active_faculty: self.faculty_repo.count_active_by_department(department_id)?,
            active_batches: self.batch_repo.count_active_by_department(department_id)?,
            subjects_by_status: self.subject_repo.count_by_status(department_id)?,
            pending_mappings: self.mapping_repo.count_pending_by_department(department_id)?,
        })
    }

    // ==========================================
    // Action log queries
    // ==========================================

    /// Most recent audit rows, optionally narrowed to one actor or one
    /// action type (actor wins when both are given).
    pub fn recent_actions(&self, query: &ActionLogQuery) -> ApiResult<Vec<ActionLog>> {
        let limit = query.limit.unwrap_or(DEFAULT_ACTION_LOG_LIMIT);
        if limit <= 0 || limit > MAX_ACTION_LOG_LIMIT {
            return Err(ApiError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_ACTION_LOG_LIMIT
            )));
        }
        let logs = match (query.actor.as_deref(), query.action_type.as_deref()) {
            (Some(actor), _) => self.action_log_repo.find_by_actor(actor, limit)?,
            (None, Some(action_type)) => self.action_log_repo.find_by_action_type(action_type, limit)?,
            (None, None) => self.action_log_repo.find_recent(limit)?,
        };
        Ok(logs)
    }

    pub fn entity_history(&self, entity_type: &str, entity_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_entity(entity_type, entity_id)?)
    }
}
